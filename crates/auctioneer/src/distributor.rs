//! Batch distributor: one auction per instance, bounded concurrency.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use auction_client::TestRepPoolClient;
use auction_core::{
    AuctionRequest, AuctionResult, AuctionRules, Instance, RepGuids, Report, sort_by_app_guid,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::auctioneer::AuctionCommunicator;

/// Auction every instance against `rep_guids` and report where things
/// landed.
///
/// At most `rules.max_concurrent` auctions are in flight at once (a limit
/// of zero is treated as one). Each result's `duration` is measured from
/// the start of the batch. Once every auction is done, each
/// representative's holdings are fetched through `client` and sorted by
/// app guid.
pub async fn hold_auctions_for(
    client: &dyn TestRepPoolClient,
    instances: Vec<Instance>,
    rep_guids: RepGuids,
    rules: AuctionRules,
    communicator: Arc<dyn AuctionCommunicator>,
) -> Report {
    let total = instances.len();
    info!(
        auctions = total,
        reps = rep_guids.len(),
        algorithm = %rules.algorithm,
        max_concurrent = rules.max_concurrent,
        "starting auctions"
    );

    let started = Instant::now();
    let permits = Arc::new(Semaphore::new(rules.max_concurrent.max(1)));
    let mut set = JoinSet::new();

    for instance in instances {
        let request = AuctionRequest::new(instance, rep_guids.clone(), rules.clone());
        let permits = Arc::clone(&permits);
        let communicator = Arc::clone(&communicator);
        set.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return AuctionResult::unresolved(request.instance);
            };
            let mut result = communicator.communicate(request).await;
            result.duration = started.elapsed();
            result
        });
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(result) => {
                debug!(
                    done = results.len() + 1,
                    total,
                    instance = %result.instance.instance_guid,
                    placed = result.is_placed(),
                    "auction complete"
                );
                results.push(result);
            }
            Err(e) => error!(error = %e, "auction task failed"),
        }
    }
    let auction_duration = started.elapsed();

    let instances_by_rep = fetch_and_sort_instances(client, &rep_guids).await;

    let report = Report {
        rep_guids: rep_guids.into_inner(),
        auction_results: results,
        instances_by_rep,
        auction_duration,
    };
    info!(
        auctions = report.n_auctions(),
        placed = report.n_placed(),
        missing = report.n_missing_instances(),
        ?auction_duration,
        "auctions finished"
    );
    report
}

/// Every representative's holdings, each list sorted by app guid. A
/// representative that cannot be asked shows up with nothing.
pub async fn fetch_and_sort_instances(
    client: &dyn TestRepPoolClient,
    rep_guids: &[String],
) -> BTreeMap<String, Vec<Instance>> {
    let mut by_rep = BTreeMap::new();
    for guid in rep_guids {
        let mut held = match client.instances(guid).await {
            Ok(held) => held,
            Err(e) => {
                warn!(rep = %guid, error = %e, "failed to fetch instances");
                Vec::new()
            }
        };
        sort_by_app_guid(&mut held);
        by_rep.insert(guid.clone(), held);
    }
    by_rep
}
