//! auction-core: shared data model for decentralized auction placement.
//!
//! Every other crate in the workspace speaks in these types: the
//! representatives hold [`Instance`]s, transports answer with
//! [`VoteResults`], auctioneers consume an [`AuctionRequest`] and produce an
//! [`AuctionResult`], and a batch of results is summarized in a [`Report`].

pub mod auction;
pub mod config;
pub mod report;
pub mod rng;
pub mod rules;
pub mod types;

pub use auction::{AuctionRequest, AuctionResult};
pub use config::{ConfigError, ConfigResult, SimulationConfig};
pub use report::{Report, Stat, sort_by_app_guid};
pub use rng::SharedRng;
pub use rules::{Algorithm, AuctionRules, BiddingPool, UnknownAlgorithm};
pub use types::*;
