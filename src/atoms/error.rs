// ── Roost Atoms: Error Types ───────────────────────────────────────────────
// Single canonical error enum for the client, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by failure source (transport, auth, API…).
//   • `#[from]` wires std/external error conversions automatically.
//   • `kind()` folds variants into the four buckets the presentation layer
//     cares about; `Outcome` is the uniform `{success, error}` boundary shape.
//   • No variant carries credentials (auth tokens, passwords) in its message.

use serde::Serialize;
use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ChatError {
    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// SQLite / rusqlite failure in the local preference store.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Missing, expired or rejected credentials.
    #[error("Auth error: {0}")]
    Auth(String),

    /// The server answered, but with an error payload or a non-success status.
    #[error("API error: {endpoint}: {message}")]
    Api {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    /// Client configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A named local entity (room, session…) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    #[error("{0}")]
    Other(String),
}

/// Coarse classification used for banners and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Auth,
    Api,
    Local,
}

// ── Convenience constructors ───────────────────────────────────────────────

impl ChatError {
    /// API error without an HTTP status (envelope said `success: false`).
    pub fn api(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            status: None,
            message: message.into(),
        }
    }

    /// API error carrying the HTTP status code it arrived with.
    pub fn api_status(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::Network(_) => ErrorKind::Transport,
            ChatError::Auth(_) => ErrorKind::Auth,
            ChatError::Api { .. } => ErrorKind::Api,
            _ => ErrorKind::Local,
        }
    }

    /// Transport failures and throttled/5xx responses may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ChatError::Api { status: Some(s), .. } => is_retryable_status(*s),
            _ => false,
        }
    }
}

/// Check if an HTTP status code represents a transient/retryable error.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

// ── Migration bridge: String → ChatError ───────────────────────────────────

impl From<String> for ChatError {
    fn from(s: String) -> Self {
        ChatError::Other(s)
    }
}

impl From<&str> for ChatError {
    fn from(s: &str) -> Self {
        ChatError::Other(s.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All client operations return this type.
pub type ChatResult<T> = Result<T, ChatError>;

impl From<ChatError> for String {
    fn from(e: ChatError) -> Self {
        e.to_string()
    }
}

// ── Boundary shape ─────────────────────────────────────────────────────────

/// Uniform `{success, data, error}` result handed to the presentation layer.
/// Errors never travel past this point as `Err`.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Whether the UI should offer a retry action.
    pub retryable: bool,
}

impl<T> From<ChatResult<T>> for Outcome<T> {
    fn from(result: ChatResult<T>) -> Self {
        match result {
            Ok(data) => Outcome {
                success: true,
                data: Some(data),
                error: None,
                kind: None,
                retryable: false,
            },
            Err(e) => Outcome {
                success: false,
                data: None,
                retryable: e.is_retryable() || e.kind() == ErrorKind::Transport,
                kind: Some(e.kind()),
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_classify_as_api() {
        let e = ChatError::api("chat.update", "not allowed");
        assert_eq!(e.kind(), ErrorKind::Api);
        assert!(!e.is_retryable());
        assert_eq!(e.to_string(), "API error: chat.update: not allowed");
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(ChatError::api_status("rooms.get", 503, "unavailable").is_retryable());
        assert!(ChatError::api_status("rooms.get", 429, "slow down").is_retryable());
        assert!(!ChatError::api_status("rooms.get", 400, "bad").is_retryable());
    }

    #[test]
    fn outcome_wraps_success_and_failure() {
        let ok: Outcome<u32> = Ok(7).into();
        assert!(ok.success);
        assert_eq!(ok.data, Some(7));
        assert!(ok.error.is_none());

        let err: Outcome<u32> = Err(ChatError::Auth("token expired".into())).into();
        assert!(!err.success);
        assert_eq!(err.kind, Some(ErrorKind::Auth));
        assert_eq!(err.error.as_deref(), Some("Auth error: token expired"));
        assert!(!err.retryable);
    }

    #[test]
    fn strings_convert_into_other() {
        let e: ChatError = "boom".into();
        assert!(matches!(e, ChatError::Other(ref m) if m == "boom"));
        assert_eq!(e.kind(), ErrorKind::Local);
    }
}
