//! The representative ledger.
//!
//! Scores are lower-is-better: the used fraction of capacity plus the
//! number of instances of the same app already held, so an app's instances
//! spread across representatives before any one of them fills up.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use auction_core::Instance;
use auction_store::{CoordinationStore, StoreNode, claim_key};
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};

/// Value a claim key holds while its auction is open.
pub const CLAIM_OPEN: &[u8] = b"marco";
/// Value a claim key holds once a representative has won it.
pub const CLAIM_TAKEN: &[u8] = b"polo";

/// Longest a representative waits before racing for a claim key.
pub const MAX_HESITATION: Duration = Duration::from_secs(1);

/// Held instances keyed by instance guid.
#[derive(Default)]
struct Holdings {
    instances: HashMap<String, Instance>,
}

impl Holdings {
    fn used_resources(&self) -> u32 {
        self.instances.values().map(|i| i.required_resources).sum()
    }

    fn count_for_app(&self, app_guid: &str) -> usize {
        self.instances
            .values()
            .filter(|i| i.app_guid == app_guid)
            .count()
    }

    fn has_room_for(&self, instance: &Instance, total: u32) -> bool {
        self.used_resources().saturating_add(instance.required_resources) <= total
    }

    /// A claimed instance is never reserved again. A leftover tentative hold
    /// of the same instance is dropped so it is not counted twice.
    fn make_reservable(&mut self, instance: &Instance, total: u32) -> LedgerResult<()> {
        match self.instances.get(&instance.instance_guid) {
            Some(held) if !held.tentative => {
                return Err(LedgerError::AlreadyHeld(instance.instance_guid.clone()));
            }
            Some(_) => {
                self.instances.remove(&instance.instance_guid);
            }
            None => {}
        }
        if !self.has_room_for(instance, total) {
            return Err(LedgerError::InsufficientResources);
        }
        Ok(())
    }

    fn used_fraction(&self, total: u32) -> f64 {
        if total == 0 {
            0.0
        } else {
            f64::from(self.used_resources()) / f64::from(total)
        }
    }

    fn score(&self, instance: &Instance, total: u32) -> f64 {
        self.used_fraction(total) + self.count_for_app(&instance.app_guid) as f64
    }

    fn reserve(&mut self, instance: &Instance) {
        let mut held = instance.clone();
        held.tentative = true;
        self.instances.insert(held.instance_guid.clone(), held);
    }
}

/// One node's view of its own capacity.
pub struct Representative {
    guid: String,
    total_resources: u32,
    holdings: Mutex<Holdings>,
    claim_store: Option<Arc<dyn CoordinationStore>>,
}

impl Representative {
    pub fn new(guid: impl Into<String>, total_resources: u32) -> Self {
        Self {
            guid: guid.into(),
            total_resources,
            holdings: Mutex::new(Holdings::default()),
            claim_store: None,
        }
    }

    /// Attach the coordination store used by [`Self::hesitate_and_claim`].
    pub fn with_claim_store(mut self, store: Arc<dyn CoordinationStore>) -> Self {
        self.claim_store = Some(store);
        self
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn total_resources(&self) -> u32 {
        self.total_resources
    }

    fn lock(&self) -> MutexGuard<'_, Holdings> {
        self.holdings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn used_resources(&self) -> u32 {
        self.lock().used_resources()
    }

    /// Score `instance` without reserving anything.
    pub fn score(&self, instance: &Instance) -> LedgerResult<f64> {
        let holdings = self.lock();
        if !holdings.has_room_for(instance, self.total_resources) {
            return Err(LedgerError::InsufficientResources);
        }
        Ok(holdings.score(instance, self.total_resources))
    }

    /// Score `instance` and, if it fits, hold it tentatively in the same
    /// critical section. The score is computed before the hold is added.
    /// An instance this representative has already claimed is refused.
    pub fn score_then_tentatively_reserve(&self, instance: &Instance) -> LedgerResult<f64> {
        let mut holdings = self.lock();
        holdings.make_reservable(instance, self.total_resources)?;
        let score = holdings.score(instance, self.total_resources);
        holdings.reserve(instance);
        debug!(rep = %self.guid, instance = %instance.instance_guid, score, "tentatively reserved");
        Ok(score)
    }

    pub fn release_reservation(&self, instance: &Instance) -> LedgerResult<()> {
        let mut holdings = self.lock();
        match holdings.instances.get(&instance.instance_guid) {
            None => Err(LedgerError::NoReservation(instance.instance_guid.clone())),
            Some(held) if !held.tentative => {
                Err(LedgerError::NotTentative(instance.instance_guid.clone()))
            }
            Some(_) => {
                holdings.instances.remove(&instance.instance_guid);
                debug!(rep = %self.guid, instance = %instance.instance_guid, "reservation released");
                Ok(())
            }
        }
    }

    /// Finalize a held instance. Claiming an already claimed instance is a
    /// no-op success.
    pub fn claim(&self, instance: &Instance) -> LedgerResult<()> {
        let mut holdings = self.lock();
        match holdings.instances.get_mut(&instance.instance_guid) {
            None => Err(LedgerError::NoReservation(instance.instance_guid.clone())),
            Some(held) => {
                held.tentative = false;
                debug!(rep = %self.guid, instance = %instance.instance_guid, "claimed");
                Ok(())
            }
        }
    }

    /// Reserve, wait in proportion to current load, then race for the
    /// instance's claim key in the coordination store. On a lost race the
    /// reservation is rolled back.
    ///
    /// The wait is one millisecond per instance of the same app already held
    /// plus `floor(10 * used / total)` milliseconds, capped at
    /// [`MAX_HESITATION`], so emptier and less clustered representatives
    /// tend to reach the store first.
    pub async fn hesitate_and_claim(&self, instance: &Instance) -> LedgerResult<()> {
        let store = self.claim_store.as_ref().ok_or(LedgerError::NoClaimStore)?;

        let delay = {
            let mut holdings = self.lock();
            if holdings.instances.contains_key(&instance.instance_guid) {
                return Err(LedgerError::AlreadyHeld(instance.instance_guid.clone()));
            }
            if !holdings.has_room_for(instance, self.total_resources) {
                return Err(LedgerError::InsufficientResources);
            }
            let load_ms = (holdings.used_fraction(self.total_resources) * 10.0).floor() as u64;
            let app_ms = holdings.count_for_app(&instance.app_guid) as u64;
            holdings.reserve(instance);
            Duration::from_millis(app_ms.saturating_add(load_ms)).min(MAX_HESITATION)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let key = claim_key(&instance.app_guid, &instance.instance_guid);
        let swapped = store.compare_and_swap(
            &StoreNode::new(key.clone(), CLAIM_OPEN),
            &StoreNode::new(key, CLAIM_TAKEN),
        );

        let mut holdings = self.lock();
        match swapped {
            Ok(()) => {
                if let Some(held) = holdings.instances.get_mut(&instance.instance_guid) {
                    held.tentative = false;
                }
                debug!(rep = %self.guid, instance = %instance.instance_guid, ?delay, "won claim");
                Ok(())
            }
            Err(e) => {
                let ours = holdings
                    .instances
                    .get(&instance.instance_guid)
                    .is_some_and(|held| held.tentative);
                if ours {
                    holdings.instances.remove(&instance.instance_guid);
                }
                if e.is_conflict() {
                    debug!(rep = %self.guid, instance = %instance.instance_guid, "lost claim race");
                    Err(LedgerError::ClaimConflict(instance.instance_guid.clone()))
                } else {
                    warn!(rep = %self.guid, instance = %instance.instance_guid, error = %e, "claim store failed");
                    Err(LedgerError::Store(e))
                }
            }
        }
    }

    /// Drop every held instance.
    pub fn reset(&self) {
        self.lock().instances.clear();
    }

    /// Replace the held set wholesale.
    pub fn set_instances(&self, instances: Vec<Instance>) {
        let mut holdings = self.lock();
        holdings.instances = instances
            .into_iter()
            .map(|i| (i.instance_guid.clone(), i))
            .collect();
    }

    /// Snapshot of the held set, in no particular order.
    pub fn instances(&self) -> Vec<Instance> {
        self.lock().instances.values().cloned().collect()
    }
}

impl fmt::Debug for Representative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Representative")
            .field("guid", &self.guid)
            .field("total_resources", &self.total_resources)
            .field("has_claim_store", &self.claim_store.is_some())
            .finish_non_exhaustive()
    }
}
