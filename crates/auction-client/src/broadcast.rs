//! Fan a request out to many representatives and gather the answers.

use std::future::Future;
use std::time::Duration;

use auction_core::{VoteResult, VoteResults};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Run `call` once per guid concurrently and wait up to `deadline` for the
/// answers.
///
/// The result holds one entry per guid, in request order. A guid whose call
/// missed the deadline gets a `"timeout"` error; one whose task died gets
/// `"no answer"`. Calls still running at the deadline are detached rather
/// than aborted so that none is interrupted halfway through a ledger update.
pub async fn broadcast<F, Fut>(guids: &[String], deadline: Duration, call: F) -> VoteResults
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = VoteResult> + Send + 'static,
{
    if guids.is_empty() {
        return VoteResults::default();
    }

    let mut set = JoinSet::new();
    for (idx, guid) in guids.iter().enumerate() {
        let fut = call(guid.clone());
        set.spawn(async move { (idx, fut.await) });
    }

    let mut answers: Vec<Option<VoteResult>> = vec![None; guids.len()];
    let gathered = tokio::time::timeout(deadline, async {
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, result)) => answers[idx] = Some(result),
                Err(e) => warn!(error = %e, "broadcast task failed"),
            }
        }
    })
    .await;

    let timed_out = gathered.is_err();
    if timed_out {
        debug!(pending = set.len(), ?deadline, "broadcast deadline passed");
        set.detach_all();
    }

    answers
        .into_iter()
        .zip(guids)
        .map(|(answer, guid)| {
            answer.unwrap_or_else(|| {
                VoteResult::failed(guid.clone(), if timed_out { "timeout" } else { "no answer" })
            })
        })
        .collect()
}
