//! auction-client: how auctioneers talk to representatives.
//!
//! [`RepPoolClient`] is the only surface the auction algorithms see. Every
//! per-representative failure, including a missed deadline, comes back as a
//! [`VoteResult`](auction_core::VoteResult) with a non-empty `error` rather
//! than as an `Err`, so a round always gets one answer per representative it
//! asked.

pub mod broadcast;
pub mod client;
pub mod error;
pub mod inprocess;

pub use broadcast::broadcast;
pub use client::{ClientFuture, RepPoolClient, TestRepPoolClient};
pub use error::{ClientError, ClientResult};
pub use inprocess::{InProcessClient, NetworkConditions};
