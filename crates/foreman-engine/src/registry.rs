use chrono::Utc;
use dashmap::DashMap;

use foreman_core::ids::{SessionId, TaskId};
use foreman_core::task::{Task, TaskStatus};

/// Canonical in-memory store of task records.
///
/// Transitions are guarded here: `mark_*` only advance from the expected
/// state, and every `finalize_*` is a no-op against an already-terminal
/// record, so a cancellation racing a late completion cannot corrupt a
/// result that already landed.
pub struct TaskRegistry {
    tasks: DashMap<TaskId, Task>,
    by_session: DashMap<SessionId, TaskId>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
            by_session: DashMap::new(),
        }
    }

    pub fn insert(&self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.get(id).map(|t| t.clone())
    }

    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.tasks.get(id).map(|t| t.status)
    }

    pub fn task_for_session(&self, session_id: &SessionId) -> Option<TaskId> {
        self.by_session.get(session_id).map(|id| id.clone())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn non_terminal_ids(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|entry| !entry.status.is_terminal())
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// pending → starting. False if the task is gone or was cancelled while
    /// queued.
    pub fn mark_starting(&self, id: &TaskId) -> bool {
        match self.tasks.get_mut(id) {
            Some(mut task) if task.status == TaskStatus::Pending => {
                task.status = TaskStatus::Starting;
                true
            }
            _ => false,
        }
    }

    /// starting → running, recording the established session. False if the
    /// task was cancelled while session creation was in flight.
    pub fn mark_running(&self, id: &TaskId, session_id: SessionId) -> bool {
        match self.tasks.get_mut(id) {
            Some(mut task) if task.status == TaskStatus::Starting => {
                task.status = TaskStatus::Running;
                task.session_id = Some(session_id.clone());
                drop(task);
                self.by_session.insert(session_id, id.clone());
                true
            }
            _ => false,
        }
    }

    pub fn finalize_completed(&self, id: &TaskId, result: String) -> Option<Task> {
        self.finalize(id, |task| {
            task.status = TaskStatus::Completed;
            task.result = Some(result);
        })
    }

    pub fn finalize_failed(&self, id: &TaskId, error: String) -> Option<Task> {
        self.finalize(id, |task| {
            task.status = TaskStatus::Failed;
            task.error = Some(error);
        })
    }

    pub fn finalize_cancelled(&self, id: &TaskId) -> Option<Task> {
        self.finalize(id, |task| {
            task.status = TaskStatus::Cancelled;
        })
    }

    /// Shared terminal transition: returns the updated record, or `None` if
    /// the task is missing or already terminal. Also drops the session
    /// index so late status events for the session match nothing.
    fn finalize(&self, id: &TaskId, apply: impl FnOnce(&mut Task)) -> Option<Task> {
        let snapshot = {
            let mut task = self.tasks.get_mut(id)?;
            if task.status.is_terminal() {
                return None;
            }
            apply(&mut task);
            task.completed_at = Some(Utc::now());
            task.clone()
        };
        if let Some(session_id) = &snapshot.session_id {
            self.by_session.remove(session_id);
        }
        Some(snapshot)
    }

    pub fn clear(&self) {
        self.tasks.clear();
        self.by_session.clear();
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
