use dashmap::DashMap;

use foreman_core::ids::SessionId;
use foreman_core::policy::{AgentRole, DelegationFlags, DelegationPolicy};

/// Runtime policy engine: the static delegation table plus the live
/// session → role binding map.
///
/// The binding map is deliberately independent of the task registry — a
/// child's capability lookup depends only on its own session id, never on
/// knowledge of its parent task. A session with no recorded binding (an
/// unknown or root session) resolves to the distinguished root role.
pub struct PolicyEngine {
    policy: DelegationPolicy,
    bindings: DashMap<SessionId, AgentRole>,
}

impl PolicyEngine {
    pub fn new(policy: DelegationPolicy) -> Self {
        Self {
            policy,
            bindings: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &DelegationPolicy {
        &self.policy
    }

    /// Record the role a session runs as. Created once per task, at session
    /// establishment.
    pub fn bind(&self, session_id: SessionId, role: AgentRole) {
        self.bindings.insert(session_id, role);
    }

    /// Drop a binding at task finalization, bounding memory growth.
    pub fn unbind(&self, session_id: &SessionId) {
        self.bindings.remove(session_id);
    }

    pub fn role_for(&self, session_id: &SessionId) -> AgentRole {
        self.bindings
            .get(session_id)
            .map(|role| role.clone())
            .unwrap_or_else(|| self.policy.root_role().clone())
    }

    pub fn is_agent_allowed(&self, session_id: &SessionId, candidate: &AgentRole) -> bool {
        self.policy.permits(&self.role_for(session_id), candidate)
    }

    pub fn allowed_subagents(&self, session_id: &SessionId) -> Vec<AgentRole> {
        self.policy.allowed_for(&self.role_for(session_id))
    }

    pub fn flags_for_role(&self, role: &AgentRole) -> DelegationFlags {
        self.policy.flags_for(role)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn clear(&self) {
        self.bindings.clear();
    }
}
