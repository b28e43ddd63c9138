//! Periodic monitor loop.

use std::sync::Arc;
use std::time::Duration;

use concurq_config::MonitorConfig;
use concurq_workqueue::TaskDispatcher;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::MonitorError;
use crate::exporter::SnapshotExporter;
use crate::metrics::MetricsSample;
use crate::snapshot::StatusSnapshot;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Samples a dispatcher on one cadence and exports status snapshots on another.
pub struct TaskMonitor {
    dispatcher: Arc<TaskDispatcher>,
    sample_interval: Duration,
    export_interval: Duration,
    exporter: Option<Arc<dyn SnapshotExporter>>,
}

impl TaskMonitor {
    pub fn new(
        dispatcher: Arc<TaskDispatcher>,
        config: &MonitorConfig,
        exporter: Option<Arc<dyn SnapshotExporter>>,
    ) -> Self {
        Self {
            dispatcher,
            sample_interval: config.sample_interval().max(MIN_PERIOD),
            export_interval: config.export_interval().max(MIN_PERIOD),
            exporter,
        }
    }

    /// Take one sample, log it and warn if the pipeline looks stalled.
    pub fn sample(&self) -> MetricsSample {
        let sample = MetricsSample::collect(&self.dispatcher);
        info!("{}", sample.format_line());

        if sample.stalled() {
            warn!(
                "MONITOR - Potential system stall detected! {} tasks in PROCESSING state, but queue is empty and no active workers.",
                sample.counts.processing
            );
        }
        sample
    }

    /// Export the current statuses. Returns false when there was nothing to
    /// export or no exporter is configured.
    pub async fn export_now(&self) -> Result<bool, MonitorError> {
        let Some(exporter) = &self.exporter else {
            return Ok(false);
        };

        let snapshot = StatusSnapshot::from_store(self.dispatcher.statuses());
        if snapshot.is_empty() {
            info!("No tasks to export");
            return Ok(false);
        }

        exporter.export(&snapshot).await?;
        info!(
            "Exported {} task statuses to {}",
            snapshot.total_tasks,
            exporter.destination()
        );
        Ok(true)
    }

    /// Run until `cancel` fires. Export failures are logged and never stop the loop.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            sample_interval = ?self.sample_interval,
            export_interval = ?self.export_interval,
            "Task monitor started"
        );

        let mut sample_tick = tokio::time::interval(self.sample_interval);
        sample_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut export_tick =
            tokio::time::interval_at(Instant::now() + self.export_interval, self.export_interval);
        export_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sample_tick.tick() => {
                    self.sample();
                }
                _ = export_tick.tick() => {
                    if let Err(e) = self.export_now().await {
                        error!("Failed to export task statuses: {}", e);
                    }
                }
            }
        }

        info!("Task monitor stopped");
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
