//! Snapshot exporters.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::MonitorError;
use crate::snapshot::StatusSnapshot;

/// Destination for status snapshots.
#[async_trait]
pub trait SnapshotExporter: Send + Sync {
    /// Human-readable destination, for log lines.
    fn destination(&self) -> String;

    /// Write the snapshot, replacing any previous one.
    async fn export(&self, snapshot: &StatusSnapshot) -> Result<(), MonitorError>;
}

/// Writes the snapshot as pretty-printed JSON to a single file.
///
/// The file is replaced atomically through a sibling temp file and a rename,
/// so readers never observe a partial document.
#[derive(Debug, Clone)]
pub struct JsonFileExporter {
    path: PathBuf,
}

impl JsonFileExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotExporter for JsonFileExporter {
    fn destination(&self) -> String {
        self.path.display().to_string()
    }

    async fn export(&self, snapshot: &StatusSnapshot) -> Result<(), MonitorError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let temp = self.temp_path();

        tokio::fs::write(&temp, json).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(MonitorError::Export(format!(
                "could not replace {}: {}",
                self.path.display(),
                e
            )));
        }

        debug!(path = %self.path.display(), tasks = snapshot.total_tasks, "Snapshot written");
        Ok(())
    }
}
