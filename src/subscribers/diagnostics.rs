//! # DiagnosticWriter: post-mortem snapshots
//!
//! On [`EventKind::StructuralAnomaly`] the writer dumps the instance snapshot to
//! `<dir>/<unit id>.alloc.json` as pretty JSON. Every other event is ignored.
//!
//! Writes happen on the subscriber's own worker, never on the outcome path: a
//! failed write is logged and forgotten.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::scheduler::InstanceSnapshot;
use crate::subscribers::Subscribe;

/// Persists structural-anomaly snapshots to a directory.
#[derive(Debug, Clone)]
pub struct DiagnosticWriter {
    dir: PathBuf,
}

impl DiagnosticWriter {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a snapshot is written to.
    pub fn path_for(&self, snapshot: &InstanceSnapshot) -> PathBuf {
        self.dir.join(format!("{}.alloc.json", snapshot.file_stem()))
    }

    async fn write(&self, snapshot: &InstanceSnapshot) -> std::io::Result<PathBuf> {
        let path = self.path_for(snapshot);
        let body = snapshot.to_pretty_json().map_err(std::io::Error::other)?;
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Subscribe for DiagnosticWriter {
    async fn on_event(&self, e: &Event) {
        if e.kind != EventKind::StructuralAnomaly {
            return;
        }
        let Some(snapshot) = e.snapshot.as_deref() else {
            return;
        };
        match self.write(snapshot).await {
            Ok(path) => tracing::info!(path = %path.display(), "wrote instance snapshot"),
            Err(err) => tracing::warn!(
                dispatch = snapshot.dispatch.as_str(),
                %err,
                "failed to write instance snapshot"
            ),
        }
    }

    fn name(&self) -> &'static str {
        "DiagnosticWriter"
    }

    fn queue_capacity(&self) -> usize {
        64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use serde_json::json;

    use crate::scheduler::{DispatchHandle, RunningUnit};

    fn snapshot() -> Arc<InstanceSnapshot> {
        Arc::new(InstanceSnapshot {
            dispatch: DispatchHandle::new("sleeper/dispatch-7"),
            units: vec![RunningUnit {
                id: "alloc-7".into(),
                task_states: BTreeMap::new(),
                raw: json!({"ID": "alloc-7", "TaskStates": {}}),
            }],
        })
    }

    #[tokio::test]
    async fn writes_snapshot_named_after_unit() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DiagnosticWriter::new(dir.path());

        let ev = Event::new(EventKind::StructuralAnomaly).with_snapshot(snapshot());
        writer.on_event(&ev).await;

        let body = std::fs::read_to_string(dir.path().join("alloc-7.alloc.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed[0]["ID"], "alloc-7");
    }

    #[tokio::test]
    async fn unwritable_directory_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DiagnosticWriter::new(dir.path().join("does/not/exist"));

        let ev = Event::new(EventKind::StructuralAnomaly).with_snapshot(snapshot());
        writer.on_event(&ev).await;
        assert!(!writer.path_for(&snapshot()).exists());
    }

    #[tokio::test]
    async fn ignores_other_events() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DiagnosticWriter::new(dir.path());
        writer.on_event(&Event::new(EventKind::WorkerStarted)).await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
