use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use auction_core::{Algorithm, BiddingPool, Report, SharedRng, SimulationConfig, Stat};
use auctioneer::{
    AuctionCommunicator, Auctioneer, HttpRemoteAuctions, hold_auctions_for, spawn_server,
};
use clap::Args;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cluster::SimCluster;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Simulation config file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bidding protocol, e.g. `all_revote` or `pick_best`.
    #[arg(short, long)]
    pub algorithm: Option<Algorithm>,

    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Bidders per round: a count (`20`) or a fraction (`0.25`).
    #[arg(long)]
    pub pool: Option<BiddingPool>,

    /// Auctions in flight at once.
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    #[arg(long)]
    pub shortlist_size: Option<usize>,

    #[arg(long)]
    pub reps: Option<usize>,

    #[arg(long)]
    pub resources_per_rep: Option<u32>,

    /// Instances to place.
    #[arg(long)]
    pub instances: Option<usize>,

    #[arg(long)]
    pub apps: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Run auctions on this many local HTTP auctioneers instead of in
    /// process.
    #[arg(long, default_value = "0")]
    pub remote_auctioneers: usize,

    /// Write the full report as JSON.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    /// Flags win over the config file.
    fn apply(&self, config: &mut SimulationConfig) {
        let rules = &mut config.rules;
        if let Some(algorithm) = self.algorithm {
            rules.algorithm = algorithm;
        }
        if let Some(max_rounds) = self.max_rounds {
            rules.max_rounds = max_rounds;
        }
        if let Some(pool) = self.pool {
            rules.max_bidding_pool = pool;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            rules.max_concurrent = max_concurrent;
        }
        if let Some(shortlist_size) = self.shortlist_size {
            rules.shortlist_size = shortlist_size;
        }
        if let Some(reps) = self.reps {
            config.cluster.reps = reps;
        }
        if let Some(resources) = self.resources_per_rep {
            config.cluster.resources_per_rep = resources;
        }
        if let Some(instances) = self.instances {
            config.workload.instances = instances;
        }
        if let Some(apps) = self.apps {
            config.workload.apps = apps;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let rng = match config.seed {
        Some(seed) => SharedRng::seeded(seed),
        None => SharedRng::from_entropy(),
    };
    let sim = SimCluster::build(&config, &rng)?;

    let local = Arc::new(
        Auctioneer::new(sim.client.clone(), rng.clone()).with_claim_store(sim.store.clone()),
    );

    let mut servers: Vec<JoinHandle<()>> = Vec::new();
    let communicator: Arc<dyn AuctionCommunicator> = if args.remote_auctioneers == 0 {
        local
    } else {
        let mut hosts = Vec::with_capacity(args.remote_auctioneers);
        let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
        for _ in 0..args.remote_auctioneers {
            let (bound, handle) = spawn_server(addr, local.clone(), config.rules.max_concurrent)
                .await
                .context("starting auctioneer server")?;
            hosts.push(bound.to_string());
            servers.push(handle);
        }
        info!(hosts = ?hosts, "routing auctions over HTTP");
        Arc::new(HttpRemoteAuctions::new(hosts, rng.clone()))
    };

    let report = hold_auctions_for(
        sim.client.as_ref(),
        sim.workload,
        sim.rep_guids,
        config.rules.clone(),
        communicator,
    )
    .await;

    for server in servers {
        server.abort();
    }
    info!(claim_keys = sim.store.len()?, "batch finished");

    print_summary(&config, &report);

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("  Report: {}", path.display());
    }
    Ok(())
}

fn stat_line(label: &str, stat: &Stat, unit: &str) -> String {
    format!(
        "  {label:<14} mean {:>9.3}{unit}  min {:>9.3}{unit}  max {:>9.3}{unit}  total {:>11.3}{unit}",
        stat.mean, stat.min, stat.max, stat.total
    )
}

fn print_summary(config: &SimulationConfig, report: &Report) {
    let rules = &config.rules;
    println!(
        "{} | rounds {} | pool {} | concurrency {}",
        rules.algorithm, rules.max_rounds, rules.max_bidding_pool, rules.max_concurrent
    );
    println!(
        "  {} auctions over {} reps: {} placed, {} missing",
        report.n_auctions(),
        report.n_reps(),
        report.n_placed(),
        report.n_missing_instances()
    );
    println!(
        "  distribution   initial {:.3}  final {:.3}",
        report.initial_distribution_score(),
        report.distribution_score()
    );
    println!("{}", stat_line("communications", &report.comm_stats(), ""));
    println!("{}", stat_line("rounds", &report.rounds_stats(), ""));
    println!("{}", stat_line("bidding time", &report.bidding_time_stats(), "s"));
    println!("{}", stat_line("wait time", &report.wait_time_stats(), "s"));
    println!(
        "  took {:.3}s ({:.1} auctions/s)",
        report.auction_duration.as_secs_f64(),
        report.auctions_per_second()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let mut config = SimulationConfig::default();
        let args = RunArgs {
            algorithm: Some(Algorithm::Hesitate),
            pool: Some(BiddingPool::Fraction(0.5)),
            reps: Some(7),
            seed: Some(42),
            ..RunArgs::default()
        };

        args.apply(&mut config);

        assert_eq!(config.rules.algorithm, Algorithm::Hesitate);
        assert_eq!(config.rules.max_bidding_pool, BiddingPool::Fraction(0.5));
        assert_eq!(config.cluster.reps, 7);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.rules.max_rounds, 100);
    }

    fn small_run(algorithm: Algorithm, remote_auctioneers: usize) -> RunArgs {
        RunArgs {
            algorithm: Some(algorithm),
            reps: Some(5),
            resources_per_rep: Some(10),
            instances: Some(20),
            apps: Some(4),
            seed: Some(9),
            remote_auctioneers,
            ..RunArgs::default()
        }
    }

    #[tokio::test]
    async fn in_process_run_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let args = RunArgs {
            report: Some(path.clone()),
            ..small_run(Algorithm::PickAmongBest, 0)
        };

        run(args).await.unwrap();

        let report: Report = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report.n_auctions(), 20);
        assert_eq!(report.n_reps(), 5);
    }

    #[tokio::test]
    async fn remote_run_completes() {
        run(small_run(Algorithm::AllReserve, 2)).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_overrides_are_rejected() {
        let args = RunArgs {
            reps: Some(0),
            ..RunArgs::default()
        };
        assert!(run(args).await.is_err());
    }
}
