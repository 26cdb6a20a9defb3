//! Auction rules: which protocol runs and how hard it tries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The bidding protocols an auctioneer can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Random,
    PickBest,
    PickAmongBest,
    ReserveNBest,
    AllReserve,
    AllRevote,
    Hesitate,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::Random,
        Algorithm::PickBest,
        Algorithm::PickAmongBest,
        Algorithm::ReserveNBest,
        Algorithm::AllReserve,
        Algorithm::AllRevote,
        Algorithm::Hesitate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Random => "random",
            Algorithm::PickBest => "pick_best",
            Algorithm::PickAmongBest => "pick_among_best",
            Algorithm::ReserveNBest => "reserve_n_best",
            Algorithm::AllReserve => "all_reserve",
            Algorithm::AllRevote => "all_revote",
            Algorithm::Hesitate => "hesitate",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("unknown algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

/// How many representatives are consulted per round.
///
/// An integer is an absolute count; a float is a fraction of the
/// population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BiddingPool {
    Count(usize),
    Fraction(f64),
}

impl BiddingPool {
    /// A pool must consult someone: a positive count or a fraction in
    /// (0, 1].
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            BiddingPool::Count(0) => Err("bidding pool count must be positive".into()),
            BiddingPool::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                Err(format!("bidding pool fraction must be in (0, 1]: {f}"))
            }
            _ => Ok(()),
        }
    }

    /// Pool size for a population of `population` representatives.
    pub fn size(&self, population: usize) -> usize {
        match *self {
            BiddingPool::Count(n) => n.min(population),
            BiddingPool::Fraction(f) => {
                if population == 0 {
                    return 0;
                }
                let n = (f * population as f64).ceil();
                (n.max(1.0) as usize).min(population)
            }
        }
    }
}

impl fmt::Display for BiddingPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiddingPool::Count(n) => write!(f, "{n}"),
            BiddingPool::Fraction(x) => write!(f, "{x:.2}"),
        }
    }
}

impl FromStr for BiddingPool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pool = match (s.parse::<usize>(), s.parse::<f64>()) {
            (Ok(n), _) => BiddingPool::Count(n),
            (_, Ok(f)) => BiddingPool::Fraction(f),
            _ => {
                return Err(format!(
                    "bidding pool must be a count or a fraction in (0, 1]: {s}"
                ));
            }
        };
        pool.validate()?;
        Ok(pool)
    }
}

/// Configuration shared by every auction in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionRules {
    pub algorithm: Algorithm,
    pub max_rounds: u32,
    pub max_bidding_pool: BiddingPool,
    /// Cap on simultaneously running auctions at the distributor.
    pub max_concurrent: usize,
    /// How many of the best voters `pick_among_best` and `reserve_n_best`
    /// keep.
    #[serde(default = "default_shortlist_size")]
    pub shortlist_size: usize,
}

fn default_shortlist_size() -> usize {
    5
}

impl AuctionRules {
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

impl Default for AuctionRules {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::AllRevote,
            max_rounds: 100,
            max_bidding_pool: BiddingPool::Count(20),
            max_concurrent: 20,
            shortlist_size: default_shortlist_size(),
        }
    }
}
