mod json_file;
mod memory;

pub use json_file::JsonFileSnapshotSink;
pub use memory::MemorySnapshotSink;

use anyhow::Result;

use crate::valuation::SnapshotDocument;

/// Destination for exported portfolio snapshots.
#[async_trait::async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Persist `snapshot`, returning a human-readable location
    /// (file path, object key, ...).
    async fn persist(&self, snapshot: &SnapshotDocument) -> Result<String>;
}
