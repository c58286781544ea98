use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{SessionId, TaskId};
use crate::policy::AgentRole;

/// Task lifecycle states. Monotonic: pending → starting → running →
/// {completed | failed | cancelled}; nothing ever leaves a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Starting,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One spawned agent subtask, from launch to a terminal outcome.
///
/// Owned exclusively by the task registry; mutated only by the dispatcher,
/// the completion resolver, and the cancellation path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Absent until the execution host creates the session.
    pub session_id: Option<SessionId>,
    pub description: String,
    pub role: AgentRole,
    pub status: TaskStatus,
    /// Present iff status is `completed`.
    pub result: Option<String>,
    /// Present iff status is `failed`.
    pub error: Option<String>,
    pub parent_session_id: SessionId,
    pub prompt: String,
    /// Snapshot of the concurrency limit in effect at launch.
    pub max_concurrent_starts: usize,
    pub started_at: DateTime<Utc>,
    /// Set iff status is terminal.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        role: AgentRole,
        prompt: impl Into<String>,
        description: impl Into<String>,
        parent_session_id: SessionId,
        max_concurrent_starts: usize,
    ) -> Self {
        Self {
            id: TaskId::new(),
            session_id: None,
            description: description.into(),
            role,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            parent_session_id,
            prompt: prompt.into(),
            max_concurrent_starts,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
