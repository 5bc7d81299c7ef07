// THEORY:
// Per-label work (one label's row of the similarity graph, one label's mask
// inclusion decision) is independent of every other label's result. This module
// is the worker pool for that kind of work.
//
// The rules that keep it race-free:
// 1.  Labels are de-duplicated before any task is spawned, so no two tasks ever
//     own the same label.
// 2.  Shared inputs are handed over as an immutable `Arc` and must be fully
//     computed before the pool starts.
// 3.  Each task returns its own results; nothing is written into shared state.
//     The caller applies the results after the join.
//
// Partitions are sized from `num_cpus`, and each runs on tokio's blocking pool
// because the work is CPU-bound.

use crate::core_modules::label_grid::Label;
use crate::error::{Result, VisionError};
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Number of partitions the label list is split into.
pub fn partition_count() -> usize {
    num_cpus::get().max(1)
}

/// Splits de-duplicated labels into at most `partitions` contiguous chunks.
pub fn partition_labels(labels: impl IntoIterator<Item = Label>, partitions: usize) -> Vec<Vec<Label>> {
    let unique: Vec<Label> = labels.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    if unique.is_empty() {
        return Vec::new();
    }
    let chunk_size = unique.len().div_ceil(partitions.max(1));
    unique.chunks(chunk_size).map(<[Label]>::to_vec).collect()
}

/// Runs `worker` once per unique label and returns `(label, result)` pairs in
/// ascending label order. The first worker error is returned.
pub async fn run_label_tasks<S, T, F>(
    labels: impl IntoIterator<Item = Label>,
    shared: Arc<S>,
    worker: F,
) -> Result<Vec<(Label, T)>>
where
    S: Send + Sync + 'static,
    T: Send + 'static,
    F: Fn(Label, &S) -> Result<T> + Send + Sync + 'static,
{
    let worker = Arc::new(worker);
    let partitions = partition_labels(labels, partition_count());
    debug!("running label tasks across {} partitions", partitions.len());

    let handles: Vec<_> = partitions
        .into_iter()
        .map(|partition| {
            let shared = Arc::clone(&shared);
            let worker = Arc::clone(&worker);
            tokio::task::spawn_blocking(move || {
                partition
                    .into_iter()
                    .map(|label| worker(label, &shared).map(|result| (label, result)))
                    .collect::<Result<Vec<_>>>()
            })
        })
        .collect();

    let mut results = Vec::new();
    for joined in futures::future::join_all(handles).await {
        let partition = joined.map_err(|e| VisionError::task(e.to_string()))??;
        results.extend(partition);
    }
    Ok(results)
}
