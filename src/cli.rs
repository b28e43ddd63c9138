//! CLI definitions for concurq.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use concurq_config::LockOrderMode;

/// concurq CLI.
#[derive(Parser)]
#[command(name = "concurq")]
#[command(about = "Concurrent job-processing pipeline simulator")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long, global = true, env = "CONCURQ_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the pipeline for a fixed duration (default)
    Run {
        /// Lock acquisition order: fixed or conflicting
        #[arg(long)]
        lock_order: Option<LockOrderMode>,

        /// Seconds to run before shutting down
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// Validate the configuration and print warnings
    CheckConfig,
}
