//! Progress records for batch operations
//!
//! Every batch request registers an operation when it starts and updates it
//! after each concurrency window. Records are kept in memory so the
//! operation endpoint can report progress and outcome by id.
//!
//! A handle dropped before `finish` (the request future was cancelled) marks
//! its record `aborted`, so no record stays `running` forever.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Records kept before the oldest are dropped
pub const DEFAULT_MAX_RECORDS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Running,
    Completed,
    CompletedWithErrors,
    /// The request was dropped before the batch finished
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    pub operation_id: String,
    /// What kind of batch, e.g. `generate` or `analyze`
    pub kind: String,
    pub status: OperationStatus,
    pub total_count: usize,
    /// Items that succeeded so far
    pub processed_count: usize,
    pub failed_count: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Start order within the tracker
    #[serde(skip)]
    sequence: u64,
}

impl OperationRecord {
    /// Milliseconds from start to end, or to `now` while running
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).num_milliseconds().max(0)
    }

    pub fn is_running(&self) -> bool {
        self.status == OperationStatus::Running
    }
}

pub struct OperationTracker {
    records: RwLock<HashMap<String, OperationRecord>>,
    max_records: usize,
    next_sequence: AtomicU64,
}

impl Default for OperationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::with_max_records(DEFAULT_MAX_RECORDS)
    }

    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            max_records: max_records.max(1),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Register a running operation and hand back its handle
    pub async fn start(self: &Arc<Self>, kind: &str, total_count: usize) -> OperationHandle {
        let id = Uuid::new_v4().to_string();
        let record = OperationRecord {
            operation_id: id.clone(),
            kind: kind.to_string(),
            status: OperationStatus::Running,
            total_count,
            processed_count: 0,
            failed_count: 0,
            started_at: Utc::now(),
            ended_at: None,
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
        };

        let mut records = self.records.write().await;
        while records.len() >= self.max_records {
            if !Self::evict_oldest(&mut records) {
                break;
            }
        }
        records.insert(id.clone(), record);
        debug!(operation_id = %id, kind, total_count, "Operation started");

        OperationHandle {
            tracker: Arc::clone(self),
            id,
            finished: AtomicBool::new(false),
        }
    }

    pub async fn get(&self, id: &str) -> Option<OperationRecord> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn active_count(&self) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.is_running())
            .count()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop the oldest finished record, or the oldest of any status when
    /// every record is still running
    fn evict_oldest(records: &mut HashMap<String, OperationRecord>) -> bool {
        let oldest = records
            .values()
            .filter(|r| !r.is_running())
            .min_by_key(|r| r.sequence)
            .or_else(|| records.values().min_by_key(|r| r.sequence))
            .map(|r| r.operation_id.clone());
        match oldest {
            Some(id) => {
                debug!(operation_id = %id, "Evicted operation record");
                records.remove(&id);
                true
            }
            None => false,
        }
    }

    fn mark_aborted(records: &mut HashMap<String, OperationRecord>, id: &str) {
        if let Some(record) = records.get_mut(id) {
            if record.is_running() {
                record.status = OperationStatus::Aborted;
                record.ended_at = Some(Utc::now());
            }
        }
    }

    async fn update<F>(&self, id: &str, apply: F)
    where
        F: FnOnce(&mut OperationRecord),
    {
        if let Some(record) = self.records.write().await.get_mut(id) {
            apply(record);
        }
    }
}

/// Write access to one operation's record
pub struct OperationHandle {
    tracker: Arc<OperationTracker>,
    id: String,
    finished: AtomicBool,
}

impl OperationHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Overwrite the running counters
    pub async fn record_progress(&self, processed: usize, failed: usize) {
        self.tracker
            .update(&self.id, |record| {
                record.processed_count = processed;
                record.failed_count = failed;
            })
            .await;
    }

    /// Mark the operation finished with its final counters
    pub async fn finish(&self, processed: usize, failed: usize) {
        self.finished.store(true, Ordering::SeqCst);
        self.tracker
            .update(&self.id, |record| {
                record.processed_count = processed;
                record.failed_count = failed;
                record.status = if failed == 0 {
                    OperationStatus::Completed
                } else {
                    OperationStatus::CompletedWithErrors
                };
                record.ended_at = Some(Utc::now());
            })
            .await;
        debug!(operation_id = %self.id, processed, failed, "Operation finished");
    }
}

impl Drop for OperationHandle {
    fn drop(&mut self) {
        if self.finished.load(Ordering::SeqCst) {
            return;
        }
        warn!(operation_id = %self.id, "Operation dropped before finishing");

        if let Ok(mut records) = self.tracker.records.try_write() {
            OperationTracker::mark_aborted(&mut records, &self.id);
            return;
        }

        // Lock is busy: finish the bookkeeping on the runtime
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let tracker = Arc::clone(&self.tracker);
            let id = std::mem::take(&mut self.id);
            runtime.spawn(async move {
                let mut records = tracker.records.write().await;
                OperationTracker::mark_aborted(&mut records, &id);
            });
        }
    }
}
