//! concurq - concurrent job-processing pipeline
//!
//! Main entry point for the concurq CLI.

mod cli;
mod cmd_run;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use concurq_config::{ConfigLoader, LoggingConfig};

use crate::cli::{Cli, Commands};
use crate::cmd_run::{apply_overrides, check_config, run_pipeline};

/// Initialize tracing with console output and, when a log directory is
/// configured, a daily-rotated log file.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match &logging.log_dir {
        Some(dir) => {
            let log_dir = PathBuf::from(ConfigLoader::expand_path(&dir.to_string_lossy()));
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("concurq")
                .filename_suffix("log")
                .max_log_files(7)
                .build(&log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keeps the background writer alive for the program duration
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = ConfigLoader::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::CheckConfig) => check_config(&config),
        Some(Commands::Run {
            lock_order,
            duration_secs,
        }) => {
            apply_overrides(&mut config, lock_order, duration_secs);
            init_tracing(&config.logging)?;
            run_pipeline(config).await
        }
        None => {
            init_tracing(&config.logging)?;
            info!("No command given, running with configured defaults");
            run_pipeline(config).await
        }
    }
}
