use std::sync::Arc;

use tracing::warn;

use foreman_core::config::FallbackConfig;
use foreman_core::host::{AgentHost, Instruction};
use foreman_core::ids::SessionId;
use foreman_core::policy::{AgentRole, DelegationFlags};

use crate::error::OrchestratorError;

/// Delivers an initial instruction through the role's ranked chain of
/// execution targets, advancing on failure or timeout until one accepts.
///
/// The chain recovers delivery failures only; session-creation failures are
/// fatal upstream and never reach here.
pub struct FallbackExecutor {
    host: Arc<dyn AgentHost>,
    config: FallbackConfig,
}

impl FallbackExecutor {
    pub fn new(host: Arc<dyn AgentHost>, config: FallbackConfig) -> Self {
        Self { host, config }
    }

    /// Returns the execution target that accepted the instruction.
    pub async fn deliver(
        &self,
        session_id: &SessionId,
        role: &AgentRole,
        prompt: &str,
        flags: DelegationFlags,
    ) -> Result<String, OrchestratorError> {
        let chain = self.config.chain_for(role);
        let timeout = self.config.attempt_timeout();
        let mut last_error = String::from("no execution targets configured");

        for model in chain {
            let instruction = Instruction {
                role: role.clone(),
                prompt: prompt.to_owned(),
                model: model.clone(),
                flags,
            };
            match tokio::time::timeout(
                timeout,
                self.host.send_instruction(session_id, &instruction),
            )
            .await
            {
                Ok(Ok(())) => return Ok(model.clone()),
                Ok(Err(error)) => {
                    warn!(
                        session_id = %session_id,
                        model = %model,
                        error = %error,
                        "instruction delivery failed, advancing fallback chain"
                    );
                    last_error = error.to_string();
                }
                Err(_) => {
                    warn!(
                        session_id = %session_id,
                        model = %model,
                        timeout_ms = timeout.as_millis() as u64,
                        "instruction delivery timed out, advancing fallback chain"
                    );
                    last_error = format!("timed out after {}ms", timeout.as_millis());
                }
            }
        }

        Err(OrchestratorError::FallbackExhausted {
            attempts: chain.len(),
            last_error,
        })
    }
}
