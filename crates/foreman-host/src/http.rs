use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use foreman_core::errors::HostError;
use foreman_core::host::{AgentHost, Instruction, SessionMessage};
use foreman_core::ids::SessionId;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for an execution host exposing the session API as JSON.
///
/// Endpoints:
/// - `POST   {base}/v1/sessions`                      → create a session
/// - `POST   {base}/v1/sessions/{id}/instructions`    → deliver an instruction
/// - `GET    {base}/v1/sessions/{id}/messages`        → fetch the transcript
/// - `POST   {base}/v1/sessions/{id}/notifications`   → post a notification
pub struct HttpHost {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    parent_session_id: &'a SessionId,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    messages: Vec<SessionMessage>,
}

#[derive(Serialize)]
struct NotifyRequest<'a> {
    text: &'a str,
}

impl HttpHost {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            request_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, error: reqwest::Error) -> HostError {
        if error.is_timeout() {
            HostError::Timeout(self.request_timeout)
        } else {
            HostError::NetworkError(error.to_string())
        }
    }
}

#[async_trait]
impl AgentHost for HttpHost {
    async fn create_session(&self, parent: &SessionId) -> Result<SessionId, HostError> {
        let response = self
            .client
            .post(self.url("/v1/sessions"))
            .timeout(self.request_timeout)
            .json(&CreateSessionRequest {
                parent_session_id: parent,
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(HostError::SessionCreationFailed(format!(
                "status {status}: {body}"
            )));
        }

        let body: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| HostError::ProtocolError(e.to_string()))?;

        match body.session_id {
            Some(id) if !id.is_empty() => {
                tracing::debug!(parent = %parent, session_id = %id, "session created");
                Ok(SessionId::from_raw(id))
            }
            _ => Err(HostError::MissingSessionId),
        }
    }

    async fn send_instruction(
        &self,
        session_id: &SessionId,
        instruction: &Instruction,
    ) -> Result<(), HostError> {
        let response = self
            .client
            .post(self.url(&format!("/v1/sessions/{session_id}/instructions")))
            .timeout(self.request_timeout)
            .json(instruction)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status().is_success() {
            tracing::debug!(session_id = %session_id, model = %instruction.model, "instruction accepted");
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if status == 404 {
            Err(HostError::SessionNotFound(session_id.to_string()))
        } else {
            Err(HostError::DeliveryFailed(format!("status {status}: {body}")))
        }
    }

    async fn session_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<SessionMessage>, HostError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/sessions/{session_id}/messages")))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(HostError::from_status(status, body));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| HostError::ProtocolError(e.to_string()))?;
        Ok(body.messages)
    }

    async fn notify(&self, session_id: &SessionId, text: &str) -> Result<(), HostError> {
        let response = self
            .client
            .post(self.url(&format!("/v1/sessions/{session_id}/notifications")))
            .timeout(self.request_timeout)
            .json(&NotifyRequest { text })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(HostError::DeliveryFailed(format!("status {status}: {body}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_trimmed() {
        let host = HttpHost::new("http://localhost:9393///");
        assert_eq!(host.url("/v1/sessions"), "http://localhost:9393/v1/sessions");
    }

    #[test]
    fn create_session_response_with_id() {
        let body: CreateSessionResponse =
            serde_json::from_str(r#"{"session_id":"sess_abc"}"#).unwrap();
        assert_eq!(body.session_id.as_deref(), Some("sess_abc"));
    }

    #[test]
    fn create_session_response_without_id() {
        let body: CreateSessionResponse = serde_json::from_str(r#"{"session_id":null}"#).unwrap();
        assert!(body.session_id.is_none());
    }

    #[test]
    fn messages_response_parses_transcript() {
        let json = r#"{"messages":[{"role":"assistant","content":[{"type":"text","text":"hi"}]}]}"#;
        let body: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.messages.len(), 1);
    }

    #[test]
    fn default_timeout_applied() {
        let host = HttpHost::new("http://localhost:9393");
        assert_eq!(host.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        let host = HttpHost::with_timeout("http://localhost:9393", Duration::from_secs(5));
        assert_eq!(host.request_timeout, Duration::from_secs(5));
    }
}
