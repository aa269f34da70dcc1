//! In-memory snapshot sink for testing.

use anyhow::Result;
use tokio::sync::Mutex;

use crate::valuation::SnapshotDocument;

use super::SnapshotSink;

#[derive(Default)]
pub struct MemorySnapshotSink {
    snapshots: Mutex<Vec<SnapshotDocument>>,
}

impl MemorySnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshots(&self) -> Vec<SnapshotDocument> {
        self.snapshots.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl SnapshotSink for MemorySnapshotSink {
    async fn persist(&self, snapshot: &SnapshotDocument) -> Result<String> {
        let mut snapshots = self.snapshots.lock().await;
        snapshots.push(snapshot.clone());
        Ok(format!("memory:{}", snapshots.len() - 1))
    }
}
