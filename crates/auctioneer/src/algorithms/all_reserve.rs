//! Reserve on the entire pool without voting first, claim the best recast
//! score and release everyone else.

use auction_core::AuctionRequest;

use super::{AuctionContext, AuctionOutcome, Tally};

pub(super) async fn auction(ctx: &AuctionContext<'_>, request: &AuctionRequest) -> AuctionOutcome {
    let instance = &request.instance;
    let mut tally = Tally::default();

    for round in 1..=request.rules.max_rounds {
        let pool = ctx.bidding_pool(request);

        tally.add(pool.len());
        let ordered = ctx
            .client
            .reserve_and_recast_vote(&pool, instance)
            .await
            .ranked(ctx.rng)
            .reps();
        let Some((winner, losers)) = ordered.split_first() else {
            continue;
        };

        tally.add(losers.len());
        let (claimed, ()) = tokio::join!(
            ctx.claim(winner, instance, &mut tally),
            async {
                if !losers.is_empty() {
                    ctx.client.release(losers, instance).await;
                }
            }
        );
        if claimed {
            return tally.won(winner.clone(), round);
        }
    }

    tally.exhausted(request.rules.max_rounds)
}
