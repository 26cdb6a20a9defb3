//! Batch report: results of every auction plus where instances ended up.
//!
//! The distribution score is the population standard deviation of
//! per-representative instance counts divided by their mean. Zero means
//! perfectly even.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auction::AuctionResult;
use crate::types::Instance;

/// Summary statistics over one measured quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub total: f64,
}

impl Stat {
    /// Statistics of `data`; all zero for an empty slice.
    pub fn new(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self::default();
        }
        let total: f64 = data.iter().sum();
        let mean = total / data.len() as f64;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / data.len() as f64;
        Self {
            min: data.iter().copied().fold(f64::INFINITY, f64::min),
            max: data.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean,
            std_dev: variance.sqrt(),
            total,
        }
    }

    /// Standard deviation over mean, or 0 when the mean is 0.
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            self.std_dev / self.mean
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub rep_guids: Vec<String>,
    pub auction_results: Vec<AuctionResult>,
    /// Each representative's held instances after the batch, sorted by app.
    pub instances_by_rep: BTreeMap<String, Vec<Instance>>,
    pub auction_duration: Duration,
}

impl Report {
    pub fn n_auctions(&self) -> usize {
        self.auction_results.len()
    }

    pub fn n_reps(&self) -> usize {
        self.rep_guids.len()
    }

    pub fn n_placed(&self) -> usize {
        self.auction_results.iter().filter(|r| r.is_placed()).count()
    }

    fn auctioned_guids(&self) -> HashSet<&str> {
        self.auction_results
            .iter()
            .map(|r| r.instance.instance_guid.as_str())
            .collect()
    }

    /// Auctioned instances that no representative ended up holding.
    pub fn n_missing_instances(&self) -> usize {
        let auctioned = self.auctioned_guids();
        let running = self
            .instances_by_rep
            .values()
            .flatten()
            .filter(|i| auctioned.contains(i.instance_guid.as_str()))
            .count();
        self.n_auctions().saturating_sub(running)
    }

    /// Distribution score of the instances that were already placed before
    /// the batch.
    pub fn initial_distribution_score(&self) -> f64 {
        let auctioned = self.auctioned_guids();
        let counts: Vec<f64> = self
            .instances_by_rep
            .values()
            .map(|held| {
                held.iter()
                    .filter(|i| !auctioned.contains(i.instance_guid.as_str()))
                    .count() as f64
            })
            .collect();
        Stat::new(&counts).coefficient_of_variation()
    }

    pub fn distribution_score(&self) -> f64 {
        let counts: Vec<f64> = self
            .instances_by_rep
            .values()
            .map(|held| held.len() as f64)
            .collect();
        Stat::new(&counts).coefficient_of_variation()
    }

    pub fn auctions_per_second(&self) -> f64 {
        let secs = self.auction_duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.n_auctions() as f64 / secs
        }
    }

    pub fn comm_stats(&self) -> Stat {
        self.stat_of(|r| f64::from(r.num_communications))
    }

    pub fn rounds_stats(&self) -> Stat {
        self.stat_of(|r| f64::from(r.num_rounds))
    }

    pub fn bidding_time_stats(&self) -> Stat {
        self.stat_of(|r| r.bidding_duration.as_secs_f64())
    }

    pub fn wait_time_stats(&self) -> Stat {
        self.stat_of(|r| r.duration.as_secs_f64())
    }

    fn stat_of(&self, f: impl Fn(&AuctionResult) -> f64) -> Stat {
        let data: Vec<f64> = self.auction_results.iter().map(f).collect();
        Stat::new(&data)
    }
}

/// Sort instances by owning application guid (stable).
pub fn sort_by_app_guid(instances: &mut [Instance]) {
    instances.sort_by(|a, b| a.app_guid.cmp(&b.app_guid));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(inst: &Instance, winner: &str, comms: u32) -> AuctionResult {
        AuctionResult {
            winner: Some(winner.to_string()),
            num_rounds: 1,
            num_communications: comms,
            ..AuctionResult::unresolved(inst.clone())
        }
    }

    #[test]
    fn stat_of_known_values() {
        let s = Stat::new(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.std_dev, 2.0);
        assert_eq!(s.total, 40.0);
    }

    #[test]
    fn stat_of_nothing_is_zero() {
        let s = Stat::new(&[]);
        assert_eq!(s, Stat::default());
        assert_eq!(s.coefficient_of_variation(), 0.0);
    }

    #[test]
    fn distribution_scores() {
        let old_a = Instance::with_guid("old", "INS-old-a", 1);
        let old_b = Instance::with_guid("old", "INS-old-b", 1);
        let new_a = Instance::with_guid("new", "INS-new-a", 1);
        let new_b = Instance::with_guid("new", "INS-new-b", 1);

        let mut report = Report {
            rep_guids: vec!["r1".into(), "r2".into()],
            auction_results: vec![placed(&new_a, "r2", 4), placed(&new_b, "r2", 6)],
            ..Report::default()
        };
        report
            .instances_by_rep
            .insert("r1".into(), vec![old_a.clone(), old_b.clone()]);
        report
            .instances_by_rep
            .insert("r2".into(), vec![new_a.clone(), new_b.clone()]);

        // Before: 2 vs 0. After: 2 vs 2.
        assert_eq!(report.initial_distribution_score(), 1.0);
        assert_eq!(report.distribution_score(), 0.0);
        assert_eq!(report.n_missing_instances(), 0);
        assert_eq!(report.n_placed(), 2);
        assert_eq!(report.comm_stats().mean, 5.0);
        assert_eq!(report.rounds_stats().total, 2.0);
    }

    #[test]
    fn missing_instances_are_counted() {
        let inst = Instance::with_guid("a", "INS-lost", 1);
        let report = Report {
            rep_guids: vec!["r1".into()],
            auction_results: vec![AuctionResult::unresolved(inst)],
            instances_by_rep: BTreeMap::from([("r1".to_string(), Vec::new())]),
            auction_duration: Duration::from_secs(2),
        };
        assert_eq!(report.n_missing_instances(), 1);
        assert_eq!(report.n_placed(), 0);
        assert_eq!(report.auctions_per_second(), 0.5);
    }

    #[test]
    fn sorts_by_app_guid() {
        let mut instances = vec![
            Instance::with_guid("b", "1", 1),
            Instance::with_guid("a", "2", 1),
            Instance::with_guid("c", "3", 1),
        ];
        sort_by_app_guid(&mut instances);
        let apps: Vec<&str> = instances.iter().map(|i| i.app_guid.as_str()).collect();
        assert_eq!(apps, ["a", "b", "c"]);
    }
}
