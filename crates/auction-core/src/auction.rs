//! The per-instance auction envelope.
//!
//! Both types travel as JSON between a distributor and a remote
//! auctioneer, so they stay plain serde structs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rules::AuctionRules;
use crate::types::{Instance, RepGuids};

/// One instance to place, who may bid on it, and the rules in force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionRequest {
    pub instance: Instance,
    pub rep_guids: RepGuids,
    pub rules: AuctionRules,
}

impl AuctionRequest {
    pub fn new(instance: Instance, rep_guids: RepGuids, rules: AuctionRules) -> Self {
        Self {
            instance,
            rep_guids,
            rules,
        }
    }
}

/// Outcome of one auction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionResult {
    pub instance: Instance,
    /// `None` when no representative took the instance within the rounds.
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub num_rounds: u32,
    #[serde(default)]
    pub num_communications: u32,
    /// Time spent inside the bidding protocol.
    #[serde(default)]
    pub bidding_duration: Duration,
    /// Time from the start of the batch until this auction finished.
    #[serde(default)]
    pub duration: Duration,
}

impl AuctionResult {
    /// Zero-value result: nothing placed, nothing measured.
    pub fn unresolved(instance: Instance) -> Self {
        Self {
            instance,
            winner: None,
            num_rounds: 0,
            num_communications: 0,
            bidding_duration: Duration::ZERO,
            duration: Duration::ZERO,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.winner.is_some()
    }
}
