//! Progress reporting.
//!
//! Long assemblies can report each written frame through a
//! [`ProgressCallback`] attached to
//! [`AssembleOptions`](crate::AssembleOptions).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framestitch::{AssembleOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% complete", info.operation);
//!         }
//!     }
//! }
//!
//! let options = AssembleOptions::default().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The kind of operation currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Writing indexed images into a video.
    Assembly,
}

/// A snapshot of progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many frames have been processed so far.
    pub current: u64,
    /// Total frames expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Record index of the frame just written.
    pub current_index: Option<i64>,
}

/// Trait for receiving progress updates.
///
/// Callbacks observe but cannot halt the operation.
pub trait ProgressCallback: Send + Sync {
    /// Called after each unit of work.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Internal helper that tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one completed item and fire the callback.
    pub(crate) fn advance(&mut self, index: Option<i64>) {
        self.current += 1;
        self.report(index);
    }

    fn report(&self, index: Option<i64>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current as f32 / t as f32) * 100.0);

        let estimated_remaining = if self.current > 0 {
            self.total.and_then(|t| {
                let remaining = t.saturating_sub(self.current);
                let per_item = elapsed.as_secs_f64() / self.current as f64;
                Duration::try_from_secs_f64(per_item * remaining as f64).ok()
            })
        } else {
            None
        };

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_index: index,
        };

        self.callback.on_progress(&info);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<(u64, Option<f32>, Option<i64>)>>);

    impl ProgressCallback for Collect {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0
                .lock()
                .unwrap()
                .push((info.current, info.percentage, info.current_index));
        }
    }

    #[test]
    fn reports_every_advance_with_percentage() {
        let collected = Arc::new(Collect::default());
        let mut tracker = ProgressTracker::new(collected.clone(), OperationType::Assembly, Some(4));
        tracker.advance(Some(10));
        tracker.advance(Some(20));

        let seen = collected.0.lock().unwrap().clone();
        assert_eq!(seen, vec![(1, Some(25.0), Some(10)), (2, Some(50.0), Some(20))]);
    }

    #[derive(Default)]
    struct LastEstimate(Mutex<Option<(u64, Option<Duration>)>>);

    impl ProgressCallback for LastEstimate {
        fn on_progress(&self, info: &ProgressInfo) {
            *self.0.lock().unwrap() = Some((info.current, info.estimated_remaining));
        }
    }

    #[test]
    fn estimate_survives_counts_beyond_u32() {
        let last = Arc::new(LastEstimate::default());
        let mut tracker = ProgressTracker::new(last.clone(), OperationType::Assembly, Some(1 << 33));
        tracker.current = u64::from(u32::MAX);
        tracker.advance(None);

        let (current, estimate) = last.0.lock().unwrap().unwrap();
        assert_eq!(current, 1 << 32);
        assert!(estimate.is_some());
    }
}
