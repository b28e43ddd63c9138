//! `run` and `check-config` subcommand handlers.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use concurq_config::{Config, ConfigLoader, ConfigValidator, LockOrderMode};
use concurq_monitor::{JsonFileExporter, SnapshotExporter, TaskMonitor};
use concurq_workqueue::TaskDispatcher;

/// Validate `config`, logging every warning. Fails on the first error.
fn validate(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let warnings = ConfigValidator::validate(config)?.into_result()?;
    for warning in &warnings {
        warn!("Config warning at {}: {}", warning.path, warning.message);
    }
    Ok(())
}

/// Apply command-line overrides on top of the loaded configuration.
pub(crate) fn apply_overrides(
    config: &mut Config,
    lock_order: Option<LockOrderMode>,
    duration_secs: Option<u64>,
) {
    if let Some(lock_order) = lock_order {
        config.dispatcher.lock_order = lock_order;
    }
    if let Some(duration_secs) = duration_secs {
        config.simulation.duration_secs = duration_secs;
    }
}

/// Run the pipeline until the configured duration elapses or Ctrl-C.
pub(crate) async fn run_pipeline(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    validate(&config)?;

    info!("Starting concurq v{}", env!("CARGO_PKG_VERSION"));

    let dispatcher = Arc::new(TaskDispatcher::new(config.dispatcher.clone())?);
    dispatcher.start_workers()?;
    for producer in &config.producers {
        dispatcher.start_producer(&producer.name, producer.task_count, producer.interval())?;
    }

    let exporter = config.monitor.export_path.as_ref().map(|path| {
        let path = ConfigLoader::expand_path(&path.to_string_lossy());
        Arc::new(JsonFileExporter::new(path)) as Arc<dyn SnapshotExporter>
    });
    let monitor_cancel = CancellationToken::new();
    let monitor = TaskMonitor::new(dispatcher.clone(), &config.monitor, exporter)
        .spawn(monitor_cancel.clone());

    let duration = Duration::from_secs(config.simulation.duration_secs);
    info!("Simulation running for {:?}", duration);
    tokio::select! {
        _ = tokio::time::sleep(duration) => {
            info!("Simulation duration elapsed");
        }
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Ctrl-C received"),
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
        }
    }

    monitor_cancel.cancel();
    if let Err(e) = monitor.await {
        error!("Monitor task failed: {}", e);
    }

    let report = dispatcher.shutdown().await;
    let counts = dispatcher.statuses().counts();
    info!(
        processed = dispatcher.processed_count(),
        drained = report.drained.len(),
        "Final task statuses: {}",
        counts
    );
    if report.degraded {
        warn!("Shutdown was degraded; some workers did not terminate");
    }

    Ok(())
}

/// Validate the configuration and print the outcome.
pub(crate) fn check_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let result = ConfigValidator::validate(config)?;

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if result.is_valid() {
        println!(
            "Configuration OK ({} workers, capacity {}, {} producers, lock order {})",
            config.dispatcher.worker_pool_size,
            config.dispatcher.queue_capacity,
            config.producers.len(),
            config.dispatcher.lock_order
        );
        Ok(())
    } else {
        Err(format!("{} configuration error(s)", result.errors.len()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        apply_overrides(&mut config, Some(LockOrderMode::Conflicting), Some(3));
        assert_eq!(config.dispatcher.lock_order, LockOrderMode::Conflicting);
        assert_eq!(config.simulation.duration_secs, 3);

        apply_overrides(&mut config, None, None);
        assert_eq!(config.simulation.duration_secs, 3);
    }

    #[test]
    fn test_check_config() {
        assert!(check_config(&Config::default()).is_ok());

        let mut invalid = Config::default();
        invalid.dispatcher.worker_pool_size = 0;
        assert!(check_config(&invalid).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_run_completes() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.simulation.duration_secs = 2;
        config.monitor.sample_interval_ms = 500;
        config.monitor.export_interval_ms = 1000;
        config.monitor.export_path = Some(dir.path().join("task_statuses.json"));
        config.dispatcher.graceful_timeout_ms = 100;
        config.dispatcher.forced_timeout_ms = 100;

        run_pipeline(config).await.unwrap();
        assert!(dir.path().join("task_statuses.json").exists());
    }
}
