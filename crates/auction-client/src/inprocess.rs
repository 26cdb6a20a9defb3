//! In-process transport with simulated latency and loss.
//!
//! Representatives live in the same process. Every call still pays a random
//! latency drawn from the configured range, and designated flaky
//! representatives drop calls with a configured probability, so algorithms
//! can be compared under realistic message loss without a network.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use auction_core::config::NetworkConfig;
use auction_core::{Instance, RepGuids, SharedRng, VoteResult, VoteResults};
use auction_rep::{MAX_HESITATION, Representative};
use tracing::{debug, error};

use crate::broadcast::broadcast;
use crate::client::{ClientFuture, RepPoolClient, TestRepPoolClient};
use crate::error::{ClientError, ClientResult};

/// Slack on top of the simulated timeout before a broadcast gives up.
const DEADLINE_GRACE: Duration = Duration::from_millis(250);

/// Upper bound on a hesitate round. Representatives delay on their own for
/// at most [`MAX_HESITATION`], so no claim race outlives the round.
const HESITATE_DEADLINE: Duration = MAX_HESITATION.saturating_add(Duration::from_secs(1));

/// Simulated network behaviour.
#[derive(Debug, Clone)]
pub struct NetworkConditions {
    pub latency_min: Duration,
    pub latency_max: Duration,
    pub timeout: Duration,
    /// Chance that a flaky representative drops a call.
    pub flakiness: f64,
    pub flaky_reps: HashSet<String>,
}

impl NetworkConditions {
    /// No latency and no loss.
    pub fn instant() -> Self {
        Self {
            latency_min: Duration::ZERO,
            latency_max: Duration::ZERO,
            timeout: Duration::from_secs(1),
            flakiness: 0.0,
            flaky_reps: HashSet::new(),
        }
    }

    pub fn from_config(config: &NetworkConfig, flaky_reps: impl IntoIterator<Item = String>) -> Self {
        Self {
            latency_min: config.latency_min(),
            latency_max: config.latency_max(),
            timeout: config.timeout(),
            flakiness: config.flakiness,
            flaky_reps: flaky_reps.into_iter().collect(),
        }
    }

    fn deadline(&self) -> Duration {
        self.timeout + DEADLINE_GRACE
    }

    /// Pay the simulated cost of one call. Returns false when the call is
    /// lost, after waiting out the timeout.
    async fn deliver(&self, guid: &str, rng: &SharedRng) -> bool {
        if self.flaky_reps.contains(guid) && rng.unit() < self.flakiness {
            tokio::time::sleep(self.timeout).await;
            return false;
        }
        let latency = rng.duration_between(self.latency_min, self.latency_max);
        if latency > self.timeout {
            tokio::time::sleep(self.timeout).await;
            return false;
        }
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        true
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::from_config(&NetworkConfig::default(), Vec::new())
    }
}

/// Which ledger call a broadcast performs.
#[derive(Debug, Clone, Copy)]
enum Call {
    Vote,
    Reserve,
    Release,
}

/// Transport that calls [`Representative`]s directly.
#[derive(Clone)]
pub struct InProcessClient {
    reps: Arc<HashMap<String, Arc<Representative>>>,
    network: Arc<NetworkConditions>,
    rng: SharedRng,
}

impl InProcessClient {
    pub fn new(
        reps: impl IntoIterator<Item = Arc<Representative>>,
        network: NetworkConditions,
        rng: SharedRng,
    ) -> Self {
        let reps = reps
            .into_iter()
            .map(|rep| (rep.guid().to_string(), rep))
            .collect();
        Self {
            reps: Arc::new(reps),
            network: Arc::new(network),
            rng,
        }
    }

    pub fn rep(&self, guid: &str) -> Option<&Arc<Representative>> {
        self.reps.get(guid)
    }

    /// Every known representative guid, sorted.
    pub fn guids(&self) -> RepGuids {
        let mut guids: Vec<String> = self.reps.keys().cloned().collect();
        guids.sort();
        RepGuids::new(guids)
    }

    fn lookup(&self, guid: &str) -> ClientResult<&Arc<Representative>> {
        self.reps
            .get(guid)
            .ok_or_else(|| ClientError::UnknownRep(guid.to_string()))
    }

    async fn fan_out(&self, call: Call, guids: &[String], instance: &Instance) -> VoteResults {
        broadcast(guids, self.network.deadline(), |guid| {
            let rep = self.reps.get(&guid).cloned();
            let network = Arc::clone(&self.network);
            let rng = self.rng.clone();
            let instance = instance.clone();
            async move {
                let Some(rep) = rep else {
                    return VoteResult::failed(guid, "unknown representative");
                };
                let delivered = network.deliver(&guid, &rng).await;
                let outcome = match call {
                    // A release always lands; only its latency is simulated.
                    Call::Release => rep.release_reservation(&instance).map(|()| 0.0),
                    _ if !delivered => return VoteResult::failed(guid, "timeout"),
                    Call::Vote => rep.score(&instance),
                    Call::Reserve => rep.score_then_tentatively_reserve(&instance),
                };
                match outcome {
                    Ok(score) => VoteResult::scored(guid, score),
                    Err(e) => VoteResult::failed(guid, e.to_string()),
                }
            }
        })
        .await
    }
}

impl RepPoolClient for InProcessClient {
    fn vote<'a>(&'a self, guids: &'a [String], instance: &'a Instance) -> ClientFuture<'a, VoteResults> {
        Box::pin(self.fan_out(Call::Vote, guids, instance))
    }

    fn reserve_and_recast_vote<'a>(
        &'a self,
        guids: &'a [String],
        instance: &'a Instance,
    ) -> ClientFuture<'a, VoteResults> {
        Box::pin(self.fan_out(Call::Reserve, guids, instance))
    }

    fn release<'a>(&'a self, guids: &'a [String], instance: &'a Instance) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            let results = self.fan_out(Call::Release, guids, instance).await;
            for failed in results.iter().filter(|r| !r.is_ok()) {
                error!(
                    rep = %failed.rep,
                    instance = %instance.instance_guid,
                    error = %failed.error,
                    "release failed"
                );
            }
        })
    }

    fn claim<'a>(&'a self, guid: &'a str, instance: &'a Instance) -> ClientFuture<'a, ClientResult<()>> {
        Box::pin(async move {
            let rep = self.lookup(guid)?;
            self.network.deliver(guid, &self.rng).await;
            rep.claim(instance)?;
            Ok(())
        })
    }

    fn hesitate_and_claim<'a>(
        &'a self,
        guids: &'a [String],
        instance: &'a Instance,
    ) -> ClientFuture<'a, VoteResults> {
        Box::pin(broadcast(guids, HESITATE_DEADLINE, move |guid| {
            let rep = self.reps.get(&guid).cloned();
            let instance = instance.clone();
            async move {
                let Some(rep) = rep else {
                    return VoteResult::failed(guid, "unknown representative");
                };
                match rep.hesitate_and_claim(&instance).await {
                    Ok(()) => VoteResult::scored(guid, 1.0),
                    Err(e) => {
                        debug!(rep = %guid, error = %e, "hesitate failed");
                        VoteResult::failed(guid, e.to_string())
                    }
                }
            }
        }))
    }
}

impl TestRepPoolClient for InProcessClient {
    fn total_resources<'a>(&'a self, guid: &'a str) -> ClientFuture<'a, ClientResult<u32>> {
        Box::pin(async move { Ok(self.lookup(guid)?.total_resources()) })
    }

    fn instances<'a>(&'a self, guid: &'a str) -> ClientFuture<'a, ClientResult<Vec<Instance>>> {
        Box::pin(async move { Ok(self.lookup(guid)?.instances()) })
    }

    fn set_instances<'a>(
        &'a self,
        guid: &'a str,
        instances: Vec<Instance>,
    ) -> ClientFuture<'a, ClientResult<()>> {
        Box::pin(async move {
            self.lookup(guid)?.set_instances(instances);
            Ok(())
        })
    }

    fn reset<'a>(&'a self, guid: &'a str) -> ClientFuture<'a, ClientResult<()>> {
        Box::pin(async move {
            self.lookup(guid)?.reset();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_store::{ClaimStore, CoordinationStore, StoreNode, claim_key};

    fn client_with(reps: &[(&str, u32)], network: NetworkConditions) -> InProcessClient {
        let reps = reps
            .iter()
            .map(|(guid, total)| Arc::new(Representative::new(*guid, *total)));
        InProcessClient::new(reps, network, SharedRng::seeded(8))
    }

    fn guids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn vote_answers_for_every_guid() {
        let client = client_with(&[("a", 10), ("b", 1)], NetworkConditions::instant());
        let inst = Instance::with_guid("app", "i1", 5);

        let results = client.vote(&guids(&["a", "b", "ghost"]), &inst).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].score, 0.0);
        assert!(results[0].is_ok());
        assert_eq!(results[1].error, "insufficient resources for instance");
        assert_eq!(results[2].error, "unknown representative");
        // Voting holds nothing.
        assert!(client.rep("a").unwrap().instances().is_empty());
    }

    #[tokio::test]
    async fn reserve_then_claim_and_release() {
        let client = client_with(&[("a", 10), ("b", 10)], NetworkConditions::instant());
        let inst = Instance::with_guid("app", "i1", 5);

        let results = client
            .reserve_and_recast_vote(&guids(&["a", "b"]), &inst)
            .await;
        assert!(results.iter().all(VoteResult::is_ok));

        client.claim("a", &inst).await.unwrap();
        client.release(&guids(&["b"]), &inst).await;

        assert_eq!(client.instances("a").await.unwrap().len(), 1);
        assert!(client.instances("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn claim_without_reservation_is_a_protocol_violation() {
        let client = client_with(&[("a", 10)], NetworkConditions::instant());
        let err = client
            .claim("a", &Instance::with_guid("app", "i1", 1))
            .await
            .unwrap_err();
        assert!(err.is_protocol_violation());

        let err = client
            .claim("ghost", &Instance::with_guid("app", "i1", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnknownRep(_)));
    }

    #[tokio::test]
    async fn release_of_unheld_instance_does_not_fail_the_caller() {
        let client = client_with(&[("a", 10)], NetworkConditions::instant());
        client
            .release(&guids(&["a"]), &Instance::with_guid("app", "i1", 1))
            .await;
        assert!(client.instances("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn flaky_rep_times_out() {
        let network = NetworkConditions {
            timeout: Duration::from_millis(10),
            flakiness: 1.0,
            flaky_reps: HashSet::from(["flaky".to_string()]),
            ..NetworkConditions::instant()
        };
        let client = client_with(&[("flaky", 10), ("steady", 10)], network);
        let inst = Instance::with_guid("app", "i1", 1);

        let results = client
            .reserve_and_recast_vote(&guids(&["flaky", "steady"]), &inst)
            .await;
        assert_eq!(results[0].error, "timeout");
        assert!(results[1].is_ok());
        // The dropped call reserved nothing.
        assert!(client.rep("flaky").unwrap().instances().is_empty());
    }

    #[tokio::test]
    async fn latency_over_timeout_is_a_timeout() {
        let network = NetworkConditions {
            latency_min: Duration::from_millis(30),
            latency_max: Duration::from_millis(40),
            timeout: Duration::from_millis(5),
            ..NetworkConditions::instant()
        };
        let client = client_with(&[("a", 10)], network);

        let results = client
            .vote(&guids(&["a"]), &Instance::with_guid("app", "i1", 1))
            .await;
        assert_eq!(results[0].error, "timeout");
    }

    #[tokio::test]
    async fn hesitate_marks_single_winner_with_score_one() {
        let store = Arc::new(ClaimStore::open_in_memory().unwrap());
        let reps = ["a", "b", "c"].map(|guid| {
            Arc::new(Representative::new(guid, 10).with_claim_store(store.clone()))
        });
        let client = InProcessClient::new(reps, NetworkConditions::instant(), SharedRng::seeded(2));
        let inst = Instance::with_guid("app", "i1", 1);
        store
            .create(&StoreNode::new(claim_key("app", "i1"), auction_rep::CLAIM_OPEN))
            .unwrap();

        let results = client
            .hesitate_and_claim(&guids(&["a", "b", "c"]), &inst)
            .await;
        let winners: Vec<&VoteResult> = results.iter().filter(|r| r.score == 1.0).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(results.iter().filter(|r| !r.is_ok()).count(), 2);
    }

    #[tokio::test]
    async fn test_client_setup_calls() {
        let client = client_with(&[("a", 42)], NetworkConditions::instant());
        assert_eq!(client.total_resources("a").await.unwrap(), 42);

        client
            .set_instances("a", vec![Instance::with_guid("app", "i1", 2)])
            .await
            .unwrap();
        assert_eq!(client.instances("a").await.unwrap().len(), 1);

        client.reset("a").await.unwrap();
        assert!(client.instances("a").await.unwrap().is_empty());
        assert!(client.reset("ghost").await.is_err());
        assert_eq!(client.guids().len(), 1);
    }
}
