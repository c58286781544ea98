use serde::{Deserialize, Serialize};

use crate::ids::{SessionId, TaskId};
use crate::policy::AgentRole;

/// Status kind reported by the execution host for a session. Narrowed at
/// ingress: anything the host sends that we don't recognize becomes `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatusKind {
    Idle,
    Busy,
    Retry,
    Completed,
    Error,
    Cancelled,
    Other,
}

impl SessionStatusKind {
    pub fn from_raw(s: &str) -> Self {
        match s {
            "idle" => Self::Idle,
            "busy" => Self::Busy,
            "retry" => Self::Retry,
            "completed" => Self::Completed,
            "error" => Self::Error,
            "cancelled" => Self::Cancelled,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Retry => "retry",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
            Self::Other => "other",
        }
    }
}

impl Serialize for SessionStatusKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SessionStatusKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_raw(&raw))
    }
}

/// One event from the host's status feed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionStatusEvent {
    pub session_id: SessionId,
    pub status: SessionStatusKind,
}

/// Task lifecycle events broadcast to external consumers (the server's
/// WebSocket bridge, the loop controller, notification sinks).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskEvent {
    #[serde(rename = "task_launched")]
    TaskLaunched {
        task_id: TaskId,
        role: AgentRole,
        parent_session_id: SessionId,
    },

    #[serde(rename = "task_started")]
    TaskStarted {
        task_id: TaskId,
        session_id: SessionId,
    },

    #[serde(rename = "task_completed")]
    TaskCompleted { task_id: TaskId },

    #[serde(rename = "task_failed")]
    TaskFailed { task_id: TaskId, error: String },

    #[serde(rename = "task_cancelled")]
    TaskCancelled { task_id: TaskId },
}

impl TaskEvent {
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::TaskLaunched { task_id, .. }
            | Self::TaskStarted { task_id, .. }
            | Self::TaskCompleted { task_id }
            | Self::TaskFailed { task_id, .. }
            | Self::TaskCancelled { task_id } => task_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TaskLaunched { .. } => "task_launched",
            Self::TaskStarted { .. } => "task_started",
            Self::TaskCompleted { .. } => "task_completed",
            Self::TaskFailed { .. } => "task_failed",
            Self::TaskCancelled { .. } => "task_cancelled",
        }
    }
}
