//! The task orchestrator — ties the registry, start queue, fallback
//! executor, completion resolver, waiter registry, and policy engine
//! together behind the public operations.
//!
//! `launch` is fire-and-forget: it returns before the external session
//! exists, and all later progress is observed through status events,
//! waiters, or the broadcast feed. Logical races across suspension points
//! (a cancellation landing while session creation is in flight) are
//! resolved by re-checking task status after every await; in-flight host
//! calls are discarded on return, never aborted.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use foreman_core::config::OrchestratorConfig;
use foreman_core::events::{SessionStatusEvent, SessionStatusKind, TaskEvent};
use foreman_core::host::AgentHost;
use foreman_core::ids::{SessionId, TaskId};
use foreman_core::policy::AgentRole;
use foreman_core::task::{Task, TaskStatus};

use crate::error::OrchestratorError;
use crate::fallback::FallbackExecutor;
use crate::policy::PolicyEngine;
use crate::queue::StartQueue;
use crate::registry::TaskRegistry;
use crate::resolver::{extract_result_text, EMPTY_RESULT_PLACEHOLDER};
use crate::waiters::WaiterRegistry;

/// Parameters for launching one agent subtask.
#[derive(Clone, Debug)]
pub struct LaunchParams {
    pub role: AgentRole,
    pub prompt: String,
    pub description: String,
    pub parent_session_id: SessionId,
}

struct Inner {
    registry: TaskRegistry,
    queue: StartQueue,
    waiters: WaiterRegistry,
    policy: PolicyEngine,
    fallback: FallbackExecutor,
    host: Arc<dyn AgentHost>,
    config: OrchestratorConfig,
    event_tx: broadcast::Sender<TaskEvent>,
}

/// Handle to one orchestrator instance. Cheap to clone; all state is shared
/// behind the handle and nothing is global, so instances coexist in tests.
#[derive(Clone)]
pub struct TaskOrchestrator {
    inner: Arc<Inner>,
}

impl TaskOrchestrator {
    pub fn new(
        host: Arc<dyn AgentHost>,
        config: OrchestratorConfig,
        event_tx: broadcast::Sender<TaskEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: TaskRegistry::new(),
                queue: StartQueue::new(config.max_concurrent_starts),
                waiters: WaiterRegistry::new(),
                policy: PolicyEngine::new(config.policy.clone()),
                fallback: FallbackExecutor::new(Arc::clone(&host), config.fallback.clone()),
                host,
                config,
                event_tx,
            }),
        }
    }

    /// Create a task record and enqueue it for dispatch. Never touches the
    /// host and never suspends: the returned record is `pending`, or
    /// `starting` if a concurrency slot admitted it immediately.
    pub fn launch(&self, params: LaunchParams) -> Task {
        let task = Task::new(
            params.role.clone(),
            params.prompt,
            params.description,
            params.parent_session_id.clone(),
            self.inner.config.max_concurrent_starts,
        );
        let id = task.id.clone();
        self.inner.registry.insert(task.clone());

        info!(task_id = %id, role = %params.role, "task launched");
        self.emit(TaskEvent::TaskLaunched {
            task_id: id.clone(),
            role: params.role,
            parent_session_id: params.parent_session_id,
        });

        self.inner.queue.push(id.clone());
        self.drain();

        self.inner.registry.get(&id).unwrap_or(task)
    }

    /// Current record for a task, or `None`. Never blocks.
    pub fn get_task(&self, id: &TaskId) -> Option<Task> {
        self.inner.registry.get(id)
    }

    /// Wait until the task finalizes or `timeout_ms` elapses, whichever
    /// comes first; on timeout the current (possibly non-terminal) record
    /// is returned. `timeout_ms = 0` waits indefinitely. `None` for an
    /// unknown id.
    pub async fn wait_for_completion(&self, id: &TaskId, timeout_ms: u64) -> Option<Task> {
        let task = self.inner.registry.get(id)?;
        if task.is_terminal() {
            return Some(task);
        }

        let rx = self.inner.waiters.register(id.clone());
        // Finalization may have landed between the check and registration.
        if let Some(task) = self.inner.registry.get(id) {
            if task.is_terminal() {
                self.inner.waiters.discard(id);
                return Some(task);
            }
        }

        if timeout_ms == 0 {
            match rx.await {
                Ok(task) => Some(task),
                // Waiter displaced or discarded — fall back to the record.
                Err(_) => self.inner.registry.get(id),
            }
        } else {
            match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), rx).await {
                Ok(Ok(task)) => Some(task),
                Ok(Err(_)) => self.inner.registry.get(id),
                Err(_) => {
                    self.inner.waiters.discard(id);
                    self.inner.registry.get(id)
                }
            }
        }
    }

    /// Cancel one task, or every pending/starting/running task when no id
    /// is given. Returns how many tasks were actually cancelled; terminal
    /// tasks are untouched and count zero.
    pub fn cancel(&self, id: Option<&TaskId>) -> usize {
        match id {
            Some(id) => usize::from(self.cancel_one(id)),
            None => self
                .inner
                .registry
                .non_terminal_ids()
                .iter()
                .filter(|id| self.cancel_one(id))
                .count(),
        }
    }

    fn cancel_one(&self, id: &TaskId) -> bool {
        // Mark cancelled before touching the queue, closing the race with a
        // starter that is mid-dispatch. Idempotent against terminal states.
        let Some(task) = self.inner.registry.finalize_cancelled(id) else {
            return false;
        };
        self.inner.queue.remove(id);
        if let Some(session_id) = &task.session_id {
            self.inner.policy.unbind(session_id);
        }
        self.inner.waiters.resolve(id, task);

        info!(task_id = %id, "task cancelled");
        self.emit(TaskEvent::TaskCancelled {
            task_id: id.clone(),
        });
        true
    }

    /// May the session spawn a subtask with `candidate` role?
    pub fn is_agent_allowed(&self, session_id: &SessionId, candidate: &AgentRole) -> bool {
        self.inner.policy.is_agent_allowed(session_id, candidate)
    }

    /// The full set of roles the session may spawn (empty for leaf roles).
    pub fn allowed_subagents(&self, session_id: &SessionId) -> Vec<AgentRole> {
        self.inner.policy.allowed_subagents(session_id)
    }

    /// Synchronous policy gate for the calling layer: a disallowed role is
    /// rejected with the caller's allowed set before any task is created.
    pub fn authorize_spawn(
        &self,
        parent_session_id: &SessionId,
        role: &AgentRole,
    ) -> Result<(), OrchestratorError> {
        if self.is_agent_allowed(parent_session_id, role) {
            return Ok(());
        }
        let allowed = self
            .allowed_subagents(parent_session_id)
            .iter()
            .map(AgentRole::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(OrchestratorError::DelegationDenied {
            role: role.clone(),
            allowed,
        })
    }

    /// Entry point for the host's status-event feed. Only `idle` for a
    /// session bound to a running task triggers resolution; everything else
    /// is ignored.
    pub async fn handle_status_event(&self, event: SessionStatusEvent) {
        if event.status != SessionStatusKind::Idle {
            debug!(session_id = %event.session_id, status = ?event.status, "ignoring status event");
            return;
        }
        let Some(task_id) = self.inner.registry.task_for_session(&event.session_id) else {
            debug!(session_id = %event.session_id, "idle event for unmatched session");
            return;
        };
        if self.inner.registry.status(&task_id) != Some(TaskStatus::Running) {
            return;
        }
        self.resolve_completion(task_id, event.session_id).await;
    }

    /// Subscribe to the task lifecycle feed.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Clear every store this orchestrator owns: registry, queue, waiters,
    /// and session bindings. Pending waiters wake with the records they can
    /// still read.
    pub fn cleanup(&self) {
        self.inner.queue.clear();
        self.inner.registry.clear();
        self.inner.waiters.clear();
        self.inner.policy.clear();
    }

    pub fn task_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn active_starts(&self) -> usize {
        self.inner.queue.active_starts()
    }

    pub fn queued_count(&self) -> usize {
        self.inner.queue.queued_len()
    }

    pub fn binding_count(&self) -> usize {
        self.inner.policy.binding_count()
    }

    /// Admit and dispatch queued tasks while concurrency slots are free.
    /// Each start attempt releases its slot when it finishes and re-drains,
    /// so the queue keeps flowing without polling.
    fn drain(&self) {
        while let Some(id) = self.inner.queue.try_admit() {
            if !self.inner.registry.mark_starting(&id) {
                // Cancelled (or gone) while queued — give the slot back.
                self.inner.queue.release();
                continue;
            }
            let this = self.clone();
            tokio::spawn(async move {
                this.start_task(id).await;
                this.inner.queue.release();
                this.drain();
            });
        }
    }

    /// Create the session, bind its role, and deliver the initial
    /// instruction. Task status is re-checked after every suspension point;
    /// a cancellation that lands mid-flight wins and the host call's result
    /// is discarded.
    async fn start_task(&self, id: TaskId) {
        let Some(task) = self.inner.registry.get(&id) else {
            return;
        };
        if task.status != TaskStatus::Starting {
            return;
        }

        let session_id = match self.inner.host.create_session(&task.parent_session_id).await {
            Ok(session_id) => session_id,
            Err(error) => {
                // Admission failure: fatal, the fallback chain is not
                // consulted for a missing execution context.
                warn!(task_id = %id, error = %error, "session creation failed");
                self.finalize_failed(&id, format!("session creation failed: {error}"));
                return;
            }
        };

        if !self.inner.registry.mark_running(&id, session_id.clone()) {
            debug!(task_id = %id, "task no longer starting, discarding session");
            return;
        }
        self.inner
            .policy
            .bind(session_id.clone(), task.role.clone());

        info!(task_id = %id, session_id = %session_id, role = %task.role, "task running");
        self.emit(TaskEvent::TaskStarted {
            task_id: id.clone(),
            session_id: session_id.clone(),
        });

        let flags = self.inner.policy.flags_for_role(&task.role);
        match self
            .inner
            .fallback
            .deliver(&session_id, &task.role, &task.prompt, flags)
            .await
        {
            Ok(model) => {
                if self.inner.registry.status(&id) == Some(TaskStatus::Running) {
                    info!(task_id = %id, model = %model, "instruction delivered");
                }
            }
            Err(error) => {
                self.finalize_failed(&id, error.to_string());
            }
        }
    }

    /// Fetch the transcript for a finished session and finalize the task
    /// with the extracted result (or the retrieval error).
    async fn resolve_completion(&self, id: TaskId, session_id: SessionId) {
        match self.inner.host.session_messages(&session_id).await {
            Ok(messages) => {
                let text = extract_result_text(&messages);
                let result = if text.is_empty() {
                    EMPTY_RESULT_PLACEHOLDER.to_owned()
                } else {
                    text
                };
                self.finalize_completed(&id, result);
            }
            Err(error) => {
                warn!(task_id = %id, error = %error, "transcript retrieval failed");
                self.finalize_failed(&id, format!("transcript retrieval failed: {error}"));
            }
        }
    }

    fn finalize_completed(&self, id: &TaskId, result: String) {
        let Some(task) = self.inner.registry.finalize_completed(id, result) else {
            return;
        };
        self.post_finalize(&task);
        info!(task_id = %id, "task completed");
        self.emit(TaskEvent::TaskCompleted {
            task_id: id.clone(),
        });
        self.notify_parent(&task, format!("Agent task {id} completed."));
    }

    fn finalize_failed(&self, id: &TaskId, error: String) {
        let Some(task) = self.inner.registry.finalize_failed(id, error.clone()) else {
            return;
        };
        self.post_finalize(&task);
        warn!(task_id = %id, error = %error, "task failed");
        self.emit(TaskEvent::TaskFailed {
            task_id: id.clone(),
            error: error.clone(),
        });
        self.notify_parent(&task, format!("Agent task {id} failed: {error}"));
    }

    fn post_finalize(&self, task: &Task) {
        if let Some(session_id) = &task.session_id {
            self.inner.policy.unbind(session_id);
        }
        self.inner.waiters.resolve(&task.id, task.clone());
    }

    /// Best-effort parent notification: failures are logged, never
    /// escalated, never retried.
    fn notify_parent(&self, task: &Task, text: String) {
        let host = Arc::clone(&self.inner.host);
        let parent = task.parent_session_id.clone();
        let task_id = task.id.clone();
        tokio::spawn(async move {
            if let Err(error) = host.notify(&parent, &text).await {
                warn!(task_id = %task_id, error = %error, "parent notification failed");
            }
        });
    }

    fn emit(&self, event: TaskEvent) {
        // No receivers is normal before the first subscriber connects.
        let _ = self.inner.event_tx.send(event);
    }
}
