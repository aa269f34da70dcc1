use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

use super::SnapshotSink;
use crate::valuation::SnapshotDocument;

/// Writes each snapshot as pretty-printed JSON into a directory.
///
/// Directory structure:
/// ```text
/// snapshots/
///   portfolio_snapshot_20240115_093000.json
///   portfolio_snapshot_20240116_181512.json
/// ```
pub struct JsonFileSnapshotSink {
    base_path: PathBuf,
}

impl JsonFileSnapshotSink {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path the given snapshot is written to.
    pub fn snapshot_file(&self, snapshot: &SnapshotDocument) -> PathBuf {
        self.base_path.join(snapshot.file_name())
    }

    /// Read a snapshot previously written by this sink.
    pub async fn load(&self, path: &Path) -> Result<SnapshotDocument> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SnapshotSink for JsonFileSnapshotSink {
    async fn persist(&self, snapshot: &SnapshotDocument) -> Result<String> {
        let path = self.snapshot_file(snapshot);
        self.write_json(&path, snapshot).await?;
        Ok(path.display().to_string())
    }
}
