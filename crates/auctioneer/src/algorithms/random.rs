//! Pick one representative uniformly from the whole population.

use auction_core::{AuctionRequest, VoteResult};

use super::{AuctionContext, AuctionOutcome, Tally};

pub(super) async fn auction(ctx: &AuctionContext<'_>, request: &AuctionRequest) -> AuctionOutcome {
    let instance = &request.instance;
    let mut tally = Tally::default();

    for round in 1..=request.rules.max_rounds {
        let pick = request.rep_guids.random_subset(1, ctx.rng);
        if pick.is_empty() {
            continue;
        }

        tally.add(pick.len());
        let recast = ctx.client.reserve_and_recast_vote(&pick, instance).await;
        if !recast.first().is_some_and(VoteResult::is_ok) {
            continue;
        }

        if ctx.claim(&pick[0], instance, &mut tally).await {
            return tally.won(pick[0].clone(), round);
        }
    }

    tally.exhausted(request.rules.max_rounds)
}
