//! Windowed fan-out for batch requests
//!
//! Items are processed in windows of at most `window_size`. Windows run one
//! after another; items inside a window run concurrently. A failing item
//! never stops its neighbours.

use std::future::Future;

use futures::future::join_all;
use serde::Serialize;
use tracing::debug;

use crate::operations::OperationHandle;

/// Concurrent upstream calls per batch window
pub const BATCH_CONCURRENCY: usize = 5;

/// Per-item failure inside a batch response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemError {
    pub index: usize,
    pub error: String,
}

/// Run `f` over `items` window by window, keeping input order
///
/// `f` receives the item's index in the full input. When a progress handle is
/// given its succeeded and failed counters are updated after every window.
pub async fn run_in_windows<'a, I, T, F, Fut>(
    items: &'a [I],
    window_size: usize,
    progress: Option<&OperationHandle>,
    f: F,
) -> Vec<Result<T, String>>
where
    F: Fn(usize, &'a I) -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let window_size = window_size.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut failed = 0;

    for (window_index, window) in items.chunks(window_size).enumerate() {
        let offset = window_index * window_size;
        let outcomes = join_all(
            window
                .iter()
                .enumerate()
                .map(|(i, item)| f(offset + i, item)),
        )
        .await;

        failed += outcomes.iter().filter(|o| o.is_err()).count();
        results.extend(outcomes);

        let succeeded = results.len() - failed;
        debug!(
            window = window_index,
            attempted = results.len(),
            succeeded,
            failed,
            "Batch window finished"
        );
        if let Some(handle) = progress {
            handle.record_progress(succeeded, failed).await;
        }
    }

    results
}

/// Split window outcomes into aligned slots and an error list
pub fn collect_outcomes<T>(outcomes: Vec<Result<T, String>>) -> (Vec<Option<T>>, Vec<BatchItemError>) {
    let mut slots = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(value) => slots.push(Some(value)),
            Err(error) => {
                slots.push(None);
                errors.push(BatchItemError { index, error });
            }
        }
    }
    (slots, errors)
}
