//! Vote the pool, then re-check the provisional winner against everyone
//! else before claiming.
//!
//! While the winner reserves, the rest of the pool votes again. If any of
//! them now beats the winner's recast score, the winner was chosen on stale
//! information: its hold is released and the round starts over.

use auction_core::AuctionRequest;
use tracing::debug;

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
        let others = pool.without(&[best.rep.as_str()]);
        tally.add(1 + others.len());
        let (recast, revote) = tokio::join!(
            ctx.client.reserve_and_recast_vote(&winner, instance),
            ctx.client.vote(&others, instance),
        );

        let Some(recast) = recast.first().filter(|r| r.is_ok()) else {
            continue;
        };

        let challengers = revote.ranked(ctx.rng);
        let beaten_by = challengers.first().filter(|c| c.score < recast.score);
        if let Some(challenger) = beaten_by {
            debug!(
                winner = %winner[0],
                challenger = %challenger.rep,
                round,
                "provisional winner beaten on revote"
            );
            tally.add(1);
            ctx.client.release(&winner, instance).await;
            continue;
        }

        if ctx.claim(&winner[0], instance, &mut tally).await {
            let [winner] = winner;
            return tally.won(winner, round);
        }
    }

    tally.exhausted(request.rules.max_rounds)
}
