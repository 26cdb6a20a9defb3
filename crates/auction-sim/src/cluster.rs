//! Builds the simulated cluster and workload from a [`SimulationConfig`].

use std::sync::Arc;

use anyhow::Context;
use auction_client::{InProcessClient, NetworkConditions};
use auction_core::{Instance, RepGuids, SharedRng, SimulationConfig};
use auction_rep::Representative;
use auction_store::{ClaimStore, CoordinationStore};
use tracing::{debug, info};

/// Representatives, their transport, and the instances still to place.
pub struct SimCluster {
    pub client: Arc<InProcessClient>,
    pub store: Arc<ClaimStore>,
    pub rep_guids: RepGuids,
    pub workload: Vec<Instance>,
}

fn rep_guid(n: usize) -> String {
    format!("REP-{n:04}")
}

fn app_guid(n: usize) -> String {
    format!("APP-{n:04}")
}

impl SimCluster {
    /// The first `workload.empty_reps` representatives start empty; the rest
    /// are seeded with `initial_instances_per_rep` instances of random apps,
    /// as far as their capacity allows.
    pub fn build(config: &SimulationConfig, rng: &SharedRng) -> anyhow::Result<Self> {
        let store = Arc::new(ClaimStore::open_in_memory().context("opening claim store")?);
        let shared: Arc<dyn CoordinationStore> = store.clone();

        let reps: Vec<Arc<Representative>> = (0..config.cluster.reps)
            .map(|n| {
                Arc::new(
                    Representative::new(rep_guid(n), config.cluster.resources_per_rep)
                        .with_claim_store(shared.clone()),
                )
            })
            .collect();
        let rep_guids: RepGuids = reps.iter().map(|r| r.guid().to_string()).collect();

        let workload_cfg = &config.workload;
        let mut seeded = 0;
        for rep in reps.iter().skip(workload_cfg.empty_reps) {
            let mut held = Vec::new();
            let mut used = 0u32;
            for _ in 0..workload_cfg.initial_instances_per_rep {
                let next = used.saturating_add(workload_cfg.resources_per_instance);
                if next > rep.total_resources() {
                    break;
                }
                let app = rng.index(workload_cfg.apps.max(1)).unwrap_or(0);
                held.push(Instance::new(app_guid(app), workload_cfg.resources_per_instance));
                used = next;
            }
            seeded += held.len();
            rep.set_instances(held);
        }

        let flaky = rng.sample(&rep_guids[..], config.network.flaky_reps);
        if !flaky.is_empty() {
            debug!(reps = ?flaky, "flaky representatives");
        }
        let network = NetworkConditions::from_config(&config.network, flaky);
        let client = Arc::new(InProcessClient::new(reps, network, rng.clone()));

        let workload: Vec<Instance> = (0..workload_cfg.instances)
            .map(|n| {
                Instance::new(
                    app_guid(n % workload_cfg.apps.max(1)),
                    workload_cfg.resources_per_instance,
                )
            })
            .collect();

        info!(
            reps = rep_guids.len(),
            preexisting = seeded,
            to_place = workload.len(),
            flaky = config.network.flaky_reps,
            "cluster ready"
        );

        Ok(Self {
            client,
            store,
            rep_guids,
            workload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.cluster.reps = 4;
        config.cluster.resources_per_rep = 3;
        config.workload.instances = 9;
        config.workload.apps = 2;
        config.workload.initial_instances_per_rep = 5;
        config.workload.empty_reps = 1;
        config
    }

    #[test]
    fn empty_reps_stay_empty_and_seeding_respects_capacity() {
        let sim = SimCluster::build(&config(), &SharedRng::seeded(1)).unwrap();

        assert_eq!(sim.rep_guids.len(), 4);
        let first = sim.client.rep(&sim.rep_guids[0]).unwrap();
        assert!(first.instances().is_empty());
        for guid in sim.rep_guids.iter().skip(1) {
            let rep = sim.client.rep(guid).unwrap();
            assert_eq!(rep.instances().len(), 3);
            assert_eq!(rep.used_resources(), 3);
        }
    }

    #[test]
    fn workload_spreads_over_apps() {
        let sim = SimCluster::build(&config(), &SharedRng::seeded(2)).unwrap();

        assert_eq!(sim.workload.len(), 9);
        let first_app = sim.workload.iter().filter(|i| i.app_guid == "APP-0000").count();
        assert_eq!(first_app, 5);
        assert!(sim.workload.iter().all(|i| i.required_resources == 1));
    }

    #[test]
    fn reps_share_one_claim_store() {
        let sim = SimCluster::build(&config(), &SharedRng::seeded(3)).unwrap();
        assert!(sim.store.is_empty().unwrap());
    }
}
