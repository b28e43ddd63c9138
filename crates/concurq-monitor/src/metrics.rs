//! Metrics sampling and stall detection.

use concurq_workqueue::{StatusCounts, TaskDispatcher};

/// One observation of the pipeline. Each field is read independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSample {
    pub queue_size: usize,
    pub active_workers: usize,
    pub total_workers: usize,
    pub processed: u64,
    pub counts: StatusCounts,
}

impl MetricsSample {
    pub fn collect(dispatcher: &TaskDispatcher) -> Self {
        let stats = dispatcher.pool_stats();
        Self {
            queue_size: dispatcher.queue().len(),
            active_workers: stats.active(),
            total_workers: stats.total(),
            processed: dispatcher.processed_count(),
            counts: dispatcher.statuses().counts(),
        }
    }

    /// Work is in flight but nothing can make progress.
    pub fn stalled(&self) -> bool {
        detect_stall(self.counts.processing, self.queue_size, self.active_workers)
    }

    pub fn format_line(&self) -> String {
        format!(
            "MONITOR - Queue Size: {} | Active Workers: {}/{} | Processed Tasks (Total): {} | Task Statuses: {}",
            self.queue_size, self.active_workers, self.total_workers, self.processed, self.counts
        )
    }
}

/// True when tasks are PROCESSING, the queue is empty and no worker is active.
pub fn detect_stall(processing: usize, queue_len: usize, active_workers: usize) -> bool {
    processing > 0 && queue_len == 0 && active_workers == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(queue_size: usize, active: usize, processing: usize) -> MetricsSample {
        MetricsSample {
            queue_size,
            active_workers: active,
            total_workers: 5,
            processed: 12,
            counts: StatusCounts {
                processing,
                completed: 12,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_detect_stall() {
        assert!(detect_stall(2, 0, 0));
        assert!(!detect_stall(0, 0, 0));
        assert!(!detect_stall(2, 1, 0));
        assert!(!detect_stall(2, 0, 1));
    }

    #[test]
    fn test_sample_stalled() {
        assert!(sample(0, 0, 2).stalled());
        assert!(!sample(0, 2, 2).stalled());
    }

    #[test]
    fn test_format_line() {
        assert_eq!(
            sample(3, 2, 2).format_line(),
            "MONITOR - Queue Size: 3 | Active Workers: 2/5 | Processed Tasks (Total): 12 | Task Statuses: PROCESSING:2 COMPLETED:12"
        );
    }
}
