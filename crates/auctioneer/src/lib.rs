//! auctioneer: places instances on representatives by auction.
//!
//! # Architecture
//!
//! ```text
//! hold_auctions_for (one task per instance, Semaphore-bounded)
//!   └── AuctionCommunicator
//!       ├── Auctioneer          (in-process: algorithms::run over a RepPoolClient)
//!       └── HttpRemoteAuctions  (POST /auction to a random auctioneer host)
//!                 └── server::build_router → Auctioneer
//! ```
//!
//! The protocol is picked per request from [`auction_core::Algorithm`].

pub mod algorithms;
pub mod auctioneer;
pub mod distributor;
pub mod error;
pub mod remote;
pub mod server;

pub use algorithms::{AuctionContext, AuctionOutcome};
pub use auctioneer::{AuctionCommunicator, Auctioneer};
pub use distributor::{fetch_and_sort_instances, hold_auctions_for};
pub use error::{AuctioneerError, AuctioneerResult};
pub use remote::HttpRemoteAuctions;
pub use server::{build_router, spawn_server};
