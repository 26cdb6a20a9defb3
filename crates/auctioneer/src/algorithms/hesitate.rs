//! Let the pool race for the instance's claim key.
//!
//! Each round opens the key, then every bidder reserves, waits in
//! proportion to its own load and tries to swap the key closed. The store
//! lets exactly one swap through; that representative answers with a score
//! of 1.

use auction_core::{AuctionRequest, Instance};
use auction_rep::CLAIM_OPEN;
use auction_store::{StoreError, StoreNode, claim_key};
use tracing::warn;

use super::{AuctionContext, AuctionOutcome, Tally};

const WINNING_SCORE: f64 = 1.0;

pub(super) async fn auction(ctx: &AuctionContext<'_>, request: &AuctionRequest) -> AuctionOutcome {
    let instance = &request.instance;
    let mut tally = Tally::default();

    for round in 1..=request.rules.max_rounds {
        let pool = ctx.bidding_pool(request);
        open_claim(ctx, instance);

        tally.add(pool.len());
        let results = ctx.client.hesitate_and_claim(&pool, instance).await;
        if let Some(winner) = results
            .iter()
            .find(|r| r.is_ok() && r.score == WINNING_SCORE)
        {
            return tally.won(winner.rep.clone(), round);
        }
    }

    tally.exhausted(request.rules.max_rounds)
}

/// Make sure the instance's claim key exists. A key left by an earlier
/// round is fine.
fn open_claim(ctx: &AuctionContext<'_>, instance: &Instance) {
    let Some(store) = ctx.claim_store else {
        return;
    };
    let node = StoreNode::new(
        claim_key(&instance.app_guid, &instance.instance_guid),
        CLAIM_OPEN,
    );
    match store.create(&node) {
        Ok(()) | Err(StoreError::KeyExists(_)) => {}
        Err(e) => warn!(key = %node.key, error = %e, "failed to open claim key"),
    }
}
