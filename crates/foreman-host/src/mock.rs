use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use foreman_core::errors::HostError;
use foreman_core::host::{AgentHost, Instruction, SessionMessage};
use foreman_core::ids::SessionId;

/// Pre-programmed outcome for one instruction delivery.
pub enum MockDelivery {
    Succeed,
    Fail(HostError),
    /// Wait a duration, then resolve to the inner outcome. Used to exercise
    /// the per-attempt delivery timeout.
    Delayed(Duration, Box<MockDelivery>),
}

impl MockDelivery {
    pub fn delayed(delay: Duration, inner: MockDelivery) -> Self {
        Self::Delayed(delay, Box::new(inner))
    }
}

/// Scripted host for deterministic tests without a real substrate.
///
/// Scripted queues are consumed in order; once a queue is empty the host
/// defaults to success (a fresh session id, an accepted delivery, an empty
/// transcript). Every delivery attempt is recorded before it resolves, so
/// attempts that time out on the caller's side still count.
#[derive(Default)]
pub struct MockHost {
    create_results: Mutex<VecDeque<Result<SessionId, HostError>>>,
    deliveries: Mutex<VecDeque<MockDelivery>>,
    messages: Mutex<HashMap<SessionId, Result<Vec<SessionMessage>, HostError>>>,
    notifications: Mutex<Vec<(SessionId, String)>>,
    fail_notifications: AtomicBool,
    delivery_log: Mutex<Vec<(SessionId, String)>>,
    sessions_created: AtomicUsize,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome of the next session creation.
    pub fn script_create(&self, result: Result<SessionId, HostError>) {
        self.create_results.lock().push_back(result);
    }

    /// Script the outcome of the next instruction delivery.
    pub fn script_delivery(&self, delivery: MockDelivery) {
        self.deliveries.lock().push_back(delivery);
    }

    /// Set the transcript returned for a session.
    pub fn set_messages(&self, session_id: SessionId, messages: Vec<SessionMessage>) {
        self.messages.lock().insert(session_id, Ok(messages));
    }

    /// Make transcript retrieval fail for a session.
    pub fn set_messages_error(&self, session_id: SessionId, error: HostError) {
        self.messages.lock().insert(session_id, Err(error));
    }

    /// Make all notifications fail from now on.
    pub fn fail_notifications(&self) {
        self.fail_notifications.store(true, Ordering::Relaxed);
    }

    /// Every delivery attempt so far, as (session, model) pairs.
    pub fn delivery_attempts(&self) -> Vec<(SessionId, String)> {
        self.delivery_log.lock().clone()
    }

    /// Every notification accepted so far.
    pub fn notifications(&self) -> Vec<(SessionId, String)> {
        self.notifications.lock().clone()
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AgentHost for MockHost {
    async fn create_session(&self, _parent: &SessionId) -> Result<SessionId, HostError> {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
        match self.create_results.lock().pop_front() {
            Some(result) => result,
            None => Ok(SessionId::new()),
        }
    }

    async fn send_instruction(
        &self,
        session_id: &SessionId,
        instruction: &Instruction,
    ) -> Result<(), HostError> {
        self.delivery_log
            .lock()
            .push((session_id.clone(), instruction.model.clone()));
        let next = self
            .deliveries
            .lock()
            .pop_front()
            .unwrap_or(MockDelivery::Succeed);
        resolve_delivery(next).await
    }

    async fn session_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<SessionMessage>, HostError> {
        match self.messages.lock().get(session_id) {
            Some(Ok(messages)) => Ok(messages.clone()),
            Some(Err(error)) => Err(error.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn notify(&self, session_id: &SessionId, text: &str) -> Result<(), HostError> {
        if self.fail_notifications.load(Ordering::Relaxed) {
            return Err(HostError::DeliveryFailed("notification channel down".into()));
        }
        self.notifications
            .lock()
            .push((session_id.clone(), text.to_owned()));
        Ok(())
    }
}

/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve_delivery(delivery: MockDelivery) -> Result<(), HostError> {
    let mut current = delivery;
    loop {
        match current {
            MockDelivery::Succeed => return Ok(()),
            MockDelivery::Fail(error) => return Err(error),
            MockDelivery::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                current = *inner;
            }
        }
    }
}
