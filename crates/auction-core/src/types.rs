//! Shared types used across the auction crates.

use std::collections::HashSet;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::rng::SharedRng;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// One deployable unit of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub app_guid: String,
    pub instance_guid: String,
    pub required_resources: u32,
    /// True while a representative holds the instance without a final claim.
    #[serde(default)]
    pub tentative: bool,
}

impl Instance {
    /// Create an instance with a freshly allocated `INS-<n>` guid.
    pub fn new(app_guid: impl Into<String>, required_resources: u32) -> Self {
        let n = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        Self::with_guid(app_guid, format!("INS-{n}"), required_resources)
    }

    pub fn with_guid(
        app_guid: impl Into<String>,
        instance_guid: impl Into<String>,
        required_resources: u32,
    ) -> Self {
        Self {
            app_guid: app_guid.into(),
            instance_guid: instance_guid.into(),
            required_resources,
            tentative: false,
        }
    }
}

/// An ordered population of representative guids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepGuids(Vec<String>);

impl RepGuids {
    pub fn new(guids: Vec<String>) -> Self {
        Self(guids)
    }

    /// `n` guids drawn uniformly without replacement; the whole population
    /// when it has no more than `n` members.
    pub fn random_subset(&self, n: usize, rng: &SharedRng) -> RepGuids {
        RepGuids(rng.sample(&self.0, n))
    }

    /// The population minus the given guids, order preserved.
    pub fn without(&self, guids: &[&str]) -> RepGuids {
        let excluded: HashSet<&str> = guids.iter().copied().collect();
        RepGuids(
            self.0
                .iter()
                .filter(|g| !excluded.contains(g.as_str()))
                .cloned()
                .collect(),
        )
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for RepGuids {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for RepGuids {
    fn from(guids: Vec<String>) -> Self {
        Self(guids)
    }
}

impl<'a> From<&'a [&'a str]> for RepGuids {
    fn from(guids: &'a [&'a str]) -> Self {
        Self(guids.iter().map(|g| g.to_string()).collect())
    }
}

impl FromIterator<String> for RepGuids {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One representative's answer to a score or reservation request.
///
/// An empty `error` means the representative bid; anything else (capacity
/// exhaustion, timeout, transport failure) means it did not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteResult {
    pub rep: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub error: String,
}

impl VoteResult {
    pub fn scored(rep: impl Into<String>, score: f64) -> Self {
        Self {
            rep: rep.into(),
            score,
            error: String::new(),
        }
    }

    pub fn failed(rep: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            rep: rep.into(),
            score: 0.0,
            error: error.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }
}

/// A round's worth of [`VoteResult`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteResults(Vec<VoteResult>);

impl VoteResults {
    pub fn new(results: Vec<VoteResult>) -> Self {
        Self(results)
    }

    /// True when nobody bid, including the empty round.
    pub fn all_failed(&self) -> bool {
        !self.0.iter().any(VoteResult::is_ok)
    }

    pub fn filter_errors(self) -> Self {
        Self(self.0.into_iter().filter(VoteResult::is_ok).collect())
    }

    pub fn shuffle(mut self, rng: &SharedRng) -> Self {
        rng.shuffle(&mut self.0);
        self
    }

    /// Stable ascending sort by score.
    pub fn sort(mut self) -> Self {
        self.0.sort_by(|a, b| a.score.total_cmp(&b.score));
        self
    }

    /// Successful bids, best first, equal scores in random order.
    pub fn ranked(self, rng: &SharedRng) -> Self {
        self.filter_errors().shuffle(rng).sort()
    }

    /// Keep at most the first `n` entries.
    pub fn truncate(mut self, n: usize) -> Self {
        self.0.truncate(n);
        self
    }

    pub fn reps(&self) -> RepGuids {
        self.0.iter().map(|r| r.rep.clone()).collect()
    }

    pub fn into_inner(self) -> Vec<VoteResult> {
        self.0
    }
}

impl Deref for VoteResults {
    type Target = [VoteResult];

    fn deref(&self) -> &[VoteResult] {
        &self.0
    }
}

impl From<Vec<VoteResult>> for VoteResults {
    fn from(results: Vec<VoteResult>) -> Self {
        Self(results)
    }
}

impl FromIterator<VoteResult> for VoteResults {
    fn from_iter<I: IntoIterator<Item = VoteResult>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for VoteResults {
    type Item = VoteResult;
    type IntoIter = std::vec::IntoIter<VoteResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guids(names: &[&str]) -> RepGuids {
        RepGuids::from(names)
    }

    #[test]
    fn instances_get_distinct_guids() {
        let a = Instance::new("app", 1);
        let b = Instance::new("app", 1);
        assert_ne!(a.instance_guid, b.instance_guid);
        assert!(a.instance_guid.starts_with("INS-"));
        assert!(!a.tentative);
    }

    #[test]
    fn random_subset_is_drawn_from_population() {
        let rng = SharedRng::seeded(9);
        let population = guids(&["a", "b", "c", "d", "e", "f"]);

        let subset = population.random_subset(3, &rng);
        assert_eq!(subset.len(), 3);
        assert!(subset.iter().all(|g| population.contains(g)));
    }

    #[test]
    fn random_subset_of_small_population_is_everyone() {
        let rng = SharedRng::seeded(9);
        let population = guids(&["a", "b"]);
        assert_eq!(population.random_subset(5, &rng), population);
    }

    #[test]
    fn without_removes_named_guids() {
        let population = guids(&["a", "b", "c", "b"]);
        assert_eq!(population.without(&["b"]), guids(&["a", "c"]));
        assert_eq!(population.without(&[]), population);
    }

    #[test]
    fn all_failed_counts_empty_round() {
        assert!(VoteResults::default().all_failed());
        let v = VoteResults::new(vec![
            VoteResult::failed("a", "timeout"),
            VoteResult::failed("b", "insufficient resources"),
        ]);
        assert!(v.all_failed());

        let v = VoteResults::new(vec![
            VoteResult::failed("a", "timeout"),
            VoteResult::scored("b", 0.5),
        ]);
        assert!(!v.all_failed());
    }

    #[test]
    fn ranked_drops_errors_and_sorts_ascending() {
        let rng = SharedRng::seeded(4);
        let v = VoteResults::new(vec![
            VoteResult::scored("high", 2.0),
            VoteResult::failed("broken", "timeout"),
            VoteResult::scored("low", 0.1),
            VoteResult::scored("mid", 1.0),
        ]);

        let ranked = v.ranked(&rng);
        assert_eq!(ranked.reps(), guids(&["low", "mid", "high"]));
    }

    #[test]
    fn sort_is_stable_for_equal_scores() {
        let v = VoteResults::new(vec![
            VoteResult::scored("a", 1.0),
            VoteResult::scored("b", 0.0),
            VoteResult::scored("c", 1.0),
            VoteResult::scored("d", 1.0),
        ]);
        assert_eq!(v.sort().reps(), guids(&["b", "a", "c", "d"]));
    }

    #[test]
    fn equal_scores_are_ordered_randomly() {
        let rng = SharedRng::seeded(21);
        let mut firsts = HashSet::new();
        for _ in 0..200 {
            let v: VoteResults = ["a", "b", "c", "d"]
                .iter()
                .map(|g| VoteResult::scored(*g, 1.0))
                .collect();
            firsts.insert(v.ranked(&rng)[0].rep.clone());
        }
        assert_eq!(firsts.len(), 4, "every tied rep should come first sometimes");
    }

    #[test]
    fn vote_results_round_trip_as_plain_array() {
        let v = VoteResults::new(vec![VoteResult::scored("a", 0.25)]);
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.starts_with('['));
        let back: VoteResults = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
