//! Session error taxonomy.

use std::time::Duration;

/// Errors surfaced by the transport session.
///
/// `ProcessSpawnFailed` and `HandshakeFailed` are fatal to a run; the rest
/// are per-request and are absorbed by the query facade.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to spawn language server `{command}`: {reason}")]
    ProcessSpawnFailed { command: String, reason: String },

    #[error("language server handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("request `{method}` timed out after {}ms", timeout.as_millis())]
    Timeout { method: String, timeout: Duration },

    #[error("server error {code}: {message}")]
    RemoteError { code: i64, message: String },

    #[error("language server process exited")]
    ProcessExited,

    #[error("session not started: handshake has not completed")]
    NotStarted,

    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

impl SessionError {
    /// Whether this error ends the session (as opposed to one request).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ProcessSpawnFailed { .. } | Self::HandshakeFailed(_) | Self::ProcessExited
        )
    }
}
