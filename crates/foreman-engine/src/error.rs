use foreman_core::errors::HostError;
use foreman_core::ids::TaskId;
use foreman_core::policy::AgentRole;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("host error: {0}")]
    Host(#[from] HostError),

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("role '{role}' may not be spawned by this session; allowed roles: [{allowed}]")]
    DelegationDenied { role: AgentRole, allowed: String },

    #[error("caller session required")]
    MissingCallerSession,

    #[error("fallback chain exhausted after {attempts} attempts: {last_error}")]
    FallbackExhausted { attempts: usize, last_error: String },

    #[error("{0}")]
    Internal(String),
}
