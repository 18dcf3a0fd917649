//! Identifiers and task-state model shared by every scheduler client.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a registered job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier the scheduler assigns to one dispatched instance.
///
/// Owned by the poll cycle that created it and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DispatchHandle(Arc<str>);

impl DispatchHandle {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DispatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A job definition in the scheduler's own representation.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    /// Job identifier, as declared by the definition.
    pub id: JobId,
    /// Canonical body accepted by the register call.
    pub body: Value,
}

/// One diagnostic event attached to a task, in the order the scheduler recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub display_message: String,
}

impl TaskEvent {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            display_message: msg.into(),
        }
    }
}

/// Per-task state inside a running unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    /// Lifecycle name as reported (`pending`, `running`, `dead`).
    pub state: String,
    /// Set once the task has failed.
    pub failed: bool,
    /// Diagnostic events, oldest first.
    pub events: Vec<TaskEvent>,
}

impl TaskState {
    /// Lifecycle name of the terminal state.
    pub const DEAD: &'static str = "dead";

    /// True when the task will not transition further.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state == Self::DEAD
    }

    /// Concatenates every event message as `<msg>`, space separated, oldest first.
    pub fn bracketed_events(&self) -> String {
        self.events
            .iter()
            .map(|e| format!("<{}>", e.display_message))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One placed unit (allocation) of a dispatched instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningUnit {
    /// Unit identifier; names the diagnostic snapshot file.
    pub id: String,
    /// State of every task in the unit, keyed by task name.
    pub task_states: BTreeMap<String, TaskState>,
    /// Full scheduler view of the unit, kept verbatim for post-mortems.
    #[serde(default)]
    pub raw: Value,
}

/// Everything the scheduler reported about an instance on one tick.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSnapshot {
    pub dispatch: DispatchHandle,
    pub units: Vec<RunningUnit>,
}

impl InstanceSnapshot {
    /// Identifier used to name the snapshot on disk (first unit, else the dispatch id).
    pub fn file_stem(&self) -> String {
        match self.units.first() {
            Some(unit) => unit.id.clone(),
            None => self.dispatch.as_str().replace('/', "_"),
        }
    }

    /// Pretty JSON of the raw unit views.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let raw: Vec<&Value> = self.units.iter().map(|u| &u.raw).collect();
        serde_json::to_string_pretty(&raw)
    }
}

/// Coarse state of a dispatched instance, derived from the named task each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl InstanceState {
    /// Derives the instance state from the named task's view.
    pub fn from_task(task: &TaskState) -> Self {
        match task.state.as_str() {
            TaskState::DEAD if task.failed => InstanceState::Failed,
            TaskState::DEAD => InstanceState::Succeeded,
            "pending" => InstanceState::Pending,
            "running" => InstanceState::Running,
            _ => InstanceState::Unknown,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceState::Succeeded | InstanceState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::Succeeded => "succeeded",
            InstanceState::Failed => "failed",
            InstanceState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
