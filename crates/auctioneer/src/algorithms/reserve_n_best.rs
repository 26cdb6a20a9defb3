//! Vote the pool, then reserve on the whole shortlist at once and keep the
//! best recast score.

use auction_core::AuctionRequest;

use super::{AuctionContext, AuctionOutcome, Tally, shortlist_len};

pub(super) async fn auction(ctx: &AuctionContext<'_>, request: &AuctionRequest) -> AuctionOutcome {
    let instance = &request.instance;
    let mut tally = Tally::default();

    for round in 1..=request.rules.max_rounds {
        let pool = ctx.bidding_pool(request);

        tally.add(pool.len());
        let shortlist = ctx
            .client
            .vote(&pool, instance)
            .await
            .ranked(ctx.rng)
            .truncate(shortlist_len(request))
            .reps();
        if shortlist.is_empty() {
            continue;
        }

        tally.add(shortlist.len());
        let ordered = ctx
            .client
            .reserve_and_recast_vote(&shortlist, instance)
            .await
            .ranked(ctx.rng)
            .reps();
        let Some((winner, losers)) = ordered.split_first() else {
            continue;
        };

        let claimed = ctx.claim(winner, instance, &mut tally).await;
        if !losers.is_empty() {
            tally.add(losers.len());
            ctx.client.release(losers, instance).await;
        }
        if claimed {
            return tally.won(winner.clone(), round);
        }
    }

    tally.exhausted(request.rules.max_rounds)
}
