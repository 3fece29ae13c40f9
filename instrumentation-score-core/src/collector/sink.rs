//! Append-only accumulator shared by concurrent collection tasks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

use crate::models::{CollectionFailure, MetricRecord};

#[derive(Debug, Default)]
struct SinkState {
    records: Vec<MetricRecord>,
    errors: Vec<CollectionFailure>,
}

/// Records and soft errors behind a single mutex.
#[derive(Debug, Default)]
pub(crate) struct CollectionSink {
    state: Mutex<SinkState>,
}

impl CollectionSink {
    // A panicking task cannot leave a half-pushed Vec, so poisoned state is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push_record(&self, record: MetricRecord) {
        self.lock().records.push(record);
    }

    pub(crate) fn push_error(&self, failure: CollectionFailure) {
        self.lock().errors.push(failure);
    }

    /// Takes everything accumulated so far.
    pub(crate) fn take(&self) -> (Vec<MetricRecord>, Vec<CollectionFailure>) {
        let state = std::mem::take(&mut *self.lock());
        (state.records, state.errors)
    }
}

/// Counts processed metrics and logs every `interval` completions.
#[derive(Debug)]
pub(crate) struct Progress {
    processed: AtomicUsize,
    total: usize,
    interval: usize,
}

impl Progress {
    pub(crate) fn new(total: usize, interval: usize) -> Self {
        Self {
            processed: AtomicUsize::new(0),
            total,
            interval: interval.max(1),
        }
    }

    pub(crate) fn tick(&self) {
        let done = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.interval == 0 || done == self.total {
            let percent = if self.total == 0 {
                100.0
            } else {
                done as f64 / self.total as f64 * 100.0
            };
            info!("Processing metrics: {}/{} ({:.1}%)", done, self.total, percent);
        }
    }

    pub(crate) fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }
}
