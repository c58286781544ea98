use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policy::{AgentRole, DelegationPolicy};

pub const DEFAULT_MAX_CONCURRENT_STARTS: usize = 10;
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 15_000;

/// Per-role ordered lists of execution targets, tried in sequence until one
/// accepts the initial instruction, plus the shared per-attempt timeout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Role-specific chains. Roles not listed use `default_chain`.
    pub chains: HashMap<AgentRole, Vec<String>>,
    pub default_chain: Vec<String>,
    pub attempt_timeout_ms: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            chains: HashMap::new(),
            default_chain: vec!["claude-sonnet-4-5".into(), "claude-haiku-4-5".into()],
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
        }
    }
}

impl FallbackConfig {
    pub fn chain_for(&self, role: &AgentRole) -> &[String] {
        self.chains
            .get(role)
            .map(Vec::as_slice)
            .unwrap_or(&self.default_chain)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Everything the orchestrator is configured with. Injected as typed data;
/// this subsystem owns no file format.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub max_concurrent_starts: usize,
    pub fallback: FallbackConfig,
    pub policy: DelegationPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_starts: DEFAULT_MAX_CONCURRENT_STARTS,
            fallback: FallbackConfig::default(),
            policy: DelegationPolicy::default(),
        }
    }
}
