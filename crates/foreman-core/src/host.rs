use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::HostError;
use crate::ids::SessionId;
use crate::policy::{AgentRole, DelegationFlags};

/// The initial instruction delivered to a freshly created session: the
/// prompt, the role it runs as, the execution target (model) to use, and
/// the delegation capabilities granted to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instruction {
    pub role: AgentRole,
    pub prompt: String,
    pub model: String,
    pub flags: DelegationFlags,
}

/// Author of a transcript entry. Unknown authors collapse to `Other` at
/// ingress rather than leaking loosely typed payloads inward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Other,
}

impl MessageRole {
    pub fn from_raw(s: &str) -> Self {
        match s {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "system" => Self::System,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Other => "other",
        }
    }
}

impl Serialize for MessageRole {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageRole {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_raw(&raw))
    }
}

/// One content fragment of a transcript entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// One role-tagged entry of a session transcript.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: MessageRole,
    pub content: Vec<ContentPart>,
}

impl SessionMessage {
    pub fn assistant<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: MessageRole::Assistant,
            content: fragments
                .into_iter()
                .map(|text| ContentPart::Text { text: text.into() })
                .collect(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }
}

/// Boundary to the external agent-execution substrate that owns sessions.
///
/// The orchestrator consumes exactly four operations; status events arrive
/// separately through whatever feed the host exposes (see
/// [`crate::events::SessionStatusEvent`]).
#[async_trait]
pub trait AgentHost: Send + Sync {
    /// Create a new session scoped to `parent`.
    async fn create_session(&self, parent: &SessionId) -> Result<SessionId, HostError>;

    /// Deliver the initial instruction to a session. May fail or time out
    /// per execution target; the caller decides whether to fall back.
    async fn send_instruction(
        &self,
        session_id: &SessionId,
        instruction: &Instruction,
    ) -> Result<(), HostError>;

    /// Fetch the full ordered transcript of a session.
    async fn session_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<SessionMessage>, HostError>;

    /// Best-effort notification to a session (used for parent updates).
    async fn notify(&self, session_id: &SessionId, text: &str) -> Result<(), HostError>;
}
