//! Shared random source.
//!
//! Subset selection, tie-break shuffles, remote host selection and the
//! simulated network all draw from a [`SharedRng`] handed to them
//! explicitly. Clones share one generator, so a seeded handle makes a whole
//! run reproducible as long as the draw order is.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Cloneable, thread-safe handle to a single random generator.
#[derive(Clone)]
pub struct SharedRng {
    inner: Arc<Mutex<StdRng>>,
}

impl SharedRng {
    /// Generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic generator for tests and repeatable experiments.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rng)),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Fisher–Yates shuffle in place.
    pub fn shuffle<T>(&self, items: &mut [T]) {
        self.with(|rng| items.shuffle(rng));
    }

    /// Uniform index in `0..n`, or `None` when `n` is zero.
    pub fn index(&self, n: usize) -> Option<usize> {
        if n == 0 {
            return None;
        }
        Some(self.with(|rng| rng.gen_range(0..n)))
    }

    /// Uniform float in `[0, 1)`.
    pub fn unit(&self) -> f64 {
        self.with(|rng| rng.gen_range(0.0..1.0))
    }

    /// `amount` items drawn uniformly without replacement.
    ///
    /// Returns every item (in original order) when `amount` is not smaller
    /// than the input.
    pub fn sample<T: Clone>(&self, items: &[T], amount: usize) -> Vec<T> {
        if amount >= items.len() {
            return items.to_vec();
        }
        self.with(|rng| {
            rand::seq::index::sample(rng, items.len(), amount)
                .into_iter()
                .map(|i| items[i].clone())
                .collect()
        })
    }

    /// Uniform duration in `[min, max]`.
    pub fn duration_between(&self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let span = (max - min).as_secs_f64();
        min + Duration::from_secs_f64(self.unit() * span)
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl fmt::Debug for SharedRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRng").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_handles_are_reproducible() {
        let a = SharedRng::seeded(7);
        let b = SharedRng::seeded(7);

        let mut xs: Vec<u32> = (0..20).collect();
        let mut ys = xs.clone();
        a.shuffle(&mut xs);
        b.shuffle(&mut ys);

        assert_eq!(xs, ys);
    }

    #[test]
    fn clones_share_one_stream() {
        let a = SharedRng::seeded(1);
        let b = a.clone();
        let fresh = SharedRng::seeded(1);

        let first = a.unit();
        let second = b.unit();

        assert_eq!(first, fresh.unit());
        assert_eq!(second, fresh.unit());
    }

    #[test]
    fn index_of_empty_range_is_none() {
        let rng = SharedRng::seeded(3);
        assert_eq!(rng.index(0), None);
        for _ in 0..100 {
            assert!(rng.index(4).unwrap() < 4);
        }
    }

    #[test]
    fn sample_draws_without_replacement() {
        let rng = SharedRng::seeded(11);
        let items: Vec<u32> = (0..50).collect();

        let picked = rng.sample(&items, 10);
        assert_eq!(picked.len(), 10);

        let mut deduped = picked.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), 10);
    }

    #[test]
    fn sample_larger_than_input_returns_everything() {
        let rng = SharedRng::seeded(11);
        let items = vec!["a", "b", "c"];
        assert_eq!(rng.sample(&items, 5), items);
        assert_eq!(rng.sample(&items, 3), items);
    }

    #[test]
    fn duration_between_stays_in_bounds() {
        let rng = SharedRng::seeded(5);
        let min = Duration::from_millis(2);
        let max = Duration::from_millis(12);
        for _ in 0..200 {
            let d = rng.duration_between(min, max);
            assert!(d >= min && d <= max, "{d:?} out of range");
        }
        assert_eq!(rng.duration_between(max, min), max);
    }
}
