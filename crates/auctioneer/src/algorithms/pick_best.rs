//! Vote the pool, then reserve on the single lowest score.

use auction_core::{AuctionRequest, VoteResult};

use super::{AuctionContext, AuctionOutcome, Tally};

pub(super) async fn auction(ctx: &AuctionContext<'_>, request: &AuctionRequest) -> AuctionOutcome {
    let instance = &request.instance;
    let mut tally = Tally::default();

    for round in 1..=request.rules.max_rounds {
        let pool = ctx.bidding_pool(request);

        tally.add(pool.len());
        let ranked = ctx.client.vote(&pool, instance).await.ranked(ctx.rng);
        let Some(best) = ranked.first() else {
            continue;
        };

        let winner = [best.rep.clone()];
        tally.add(1);
        let recast = ctx.client.reserve_and_recast_vote(&winner, instance).await;
        if !recast.first().is_some_and(VoteResult::is_ok) {
            continue;
        }

        if ctx.claim(&winner[0], instance, &mut tally).await {
            let [winner] = winner;
            return tally.won(winner, round);
        }
    }

    tally.exhausted(request.rules.max_rounds)
}
