use dashmap::DashMap;
use tokio::sync::oneshot;

use foreman_core::ids::TaskId;
use foreman_core::task::Task;

/// Single-shot completion waiters, at most one per task id.
///
/// Registering a waiter for an id that already has one replaces it; the
/// displaced receiver wakes with a channel error and falls back to reading
/// the current record. Resolution happens exactly once, by finalization or
/// by the caller's timeout, whichever comes first.
pub struct WaiterRegistry {
    waiters: DashMap<TaskId, oneshot::Sender<Task>>,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self {
            waiters: DashMap::new(),
        }
    }

    pub fn register(&self, id: TaskId) -> oneshot::Receiver<Task> {
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(id, tx);
        rx
    }

    /// Wake the waiter for `id` with the final record, if one is registered.
    pub fn resolve(&self, id: &TaskId, task: Task) {
        if let Some((_, tx)) = self.waiters.remove(id) {
            // Receiver may have timed out and dropped — that's fine.
            let _ = tx.send(task);
        }
    }

    /// Drop the waiter for `id` without resolving it.
    pub fn discard(&self, id: &TaskId) -> bool {
        self.waiters.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    pub fn clear(&self) {
        self.waiters.clear();
    }
}

impl Default for WaiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
