//! Batch scheduler.
//!
//! Items are split into contiguous groups of at most `batch_size`. Groups run
//! strictly one after another; inside a group every worker future is polled
//! concurrently and the group settles only when all of them have finished.
//! This bounds the number of in-flight external calls to the batch size.
//!
//! Workers return their own `Result`; a failing item never cancels its
//! siblings or later groups.

use std::future::Future;

use futures::future::join_all;
use tracing::debug;

/// Applies `worker` to every item, `batch_size` at a time.
///
/// Outcomes are returned in item order. A `batch_size` of zero is treated as
/// one.
pub async fn run_batches<T, O, F, Fut>(items: Vec<T>, batch_size: usize, worker: F) -> Vec<O>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = O>,
{
    let batch_size = batch_size.max(1);
    let total = items.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut items = items.into_iter().peekable();
    let mut round = 0usize;

    while items.peek().is_some() {
        round += 1;
        let group: Vec<Fut> = items.by_ref().take(batch_size).map(&worker).collect();
        debug!(round, size = group.len(), total, "Starting batch");
        outcomes.extend(join_all(group).await);
    }

    outcomes
}

/// Number of scheduling rounds [`run_batches`] uses for `items` items.
pub fn round_count(items: usize, batch_size: usize) -> usize {
    items.div_ceil(batch_size.max(1))
}
