use std::time::Duration;

/// Errors surfaced by the execution-host boundary.
///
/// Admission failures (session creation) are fatal to a task; delivery
/// failures are recovered by the fallback chain; everything else is
/// classified for logging.
#[derive(Clone, Debug, thiserror::Error)]
pub enum HostError {
    #[error("session creation failed: {0}")]
    SessionCreationFailed(String),
    #[error("host returned no session id")]
    MissingSessionId,
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("protocol error: {0}")]
    ProtocolError(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl HostError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::SessionCreationFailed(_) => "session_creation_failed",
            Self::MissingSessionId => "missing_session_id",
            Self::DeliveryFailed(_) => "delivery_failed",
            Self::SessionNotFound(_) => "session_not_found",
            Self::NetworkError(_) => "network_error",
            Self::ProtocolError(_) => "protocol_error",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Classify an HTTP status from the host into an error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            404 => Self::SessionNotFound(body),
            400..=499 => Self::ProtocolError(format!("status {status}: {body}")),
            500..=599 => Self::NetworkError(format!("status {status}: {body}")),
            _ => Self::ProtocolError(format!("unexpected status {status}: {body}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_strings() {
        assert_eq!(HostError::MissingSessionId.error_kind(), "missing_session_id");
        assert_eq!(
            HostError::DeliveryFailed("x".into()).error_kind(),
            "delivery_failed"
        );
        assert_eq!(
            HostError::Timeout(Duration::from_secs(15)).error_kind(),
            "timeout"
        );
    }

    #[test]
    fn from_status_mapping() {
        assert!(matches!(
            HostError::from_status(404, "gone".into()),
            HostError::SessionNotFound(_)
        ));
        assert!(matches!(
            HostError::from_status(422, "bad".into()),
            HostError::ProtocolError(_)
        ));
        assert!(matches!(
            HostError::from_status(503, "down".into()),
            HostError::NetworkError(_)
        ));
    }

    #[test]
    fn display_includes_detail() {
        let err = HostError::SessionCreationFailed("quota exceeded".into());
        assert_eq!(err.to_string(), "session creation failed: quota exceeded");
    }
}
