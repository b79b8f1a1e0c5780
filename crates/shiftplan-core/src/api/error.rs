use std::fmt;

use serde_json::Value;

/// Error categories for API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Request rejected as unauthorized (401). Ends the session.
    AuthExpired,
    /// Login rejected by the backend.
    CredentialInvalid,
    /// Transport failure (connect, timeout, TLS).
    NetworkUnavailable,
    /// Any other non-2xx status.
    ServerError,
    /// Response body did not match the expected shape.
    Parse,
    /// Result discarded because the session or cache moved on while in flight.
    Superseded,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::AuthExpired => write!(f, "auth_expired"),
            ApiErrorKind::CredentialInvalid => write!(f, "credential_invalid"),
            ApiErrorKind::NetworkUnavailable => write!(f, "network_unavailable"),
            ApiErrorKind::ServerError => write!(f, "server_error"),
            ApiErrorKind::Parse => write!(f, "parse"),
            ApiErrorKind::Superseded => write!(f, "superseded"),
        }
    }
}

/// Displayable API failure.
///
/// Cloneable so a single failed load can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// HTTP status, when the server answered
    pub status: Option<u16>,
    /// One-line message suitable for display
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn auth_expired() -> Self {
        Self {
            kind: ApiErrorKind::AuthExpired,
            status: Some(401),
            message: "Session expired".to_string(),
        }
    }

    /// Login rejection. Uses the body's message when it has one.
    pub fn credential_invalid(status: u16, body: &str) -> Self {
        let kind = if status >= 500 {
            ApiErrorKind::ServerError
        } else {
            ApiErrorKind::CredentialInvalid
        };
        Self {
            kind,
            status: Some(status),
            message: body_message(body).unwrap_or_else(|| "Login failed".to_string()),
        }
    }

    /// Non-2xx status. `fallback` is shown when the body carries no message.
    pub fn http_status(status: u16, body: &str, fallback: &str) -> Self {
        let message = body_message(body).unwrap_or_else(|| format!("{fallback} (HTTP {status})"));
        Self {
            kind: ApiErrorKind::ServerError,
            status: Some(status),
            message,
        }
    }

    pub fn network(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Request timed out".to_string()
        } else if err.is_connect() {
            "Could not reach the server".to_string()
        } else {
            format!("Network error: {err}")
        };
        Self::new(ApiErrorKind::NetworkUnavailable, message)
    }

    pub fn parse(what: &str, err: &impl fmt::Display) -> Self {
        Self::new(ApiErrorKind::Parse, format!("Invalid {what} response: {err}"))
    }

    pub fn superseded() -> Self {
        Self::new(
            ApiErrorKind::Superseded,
            "Session changed while the request was in flight",
        )
    }

    pub fn is_auth_expired(&self) -> bool {
        self.kind == ApiErrorKind::AuthExpired
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Extracts a human message from a JSON error body.
///
/// Looks at `message`, `detail` and `error` in that order; `error` may itself
/// be an object carrying `message`.
pub(crate) fn body_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    ["message", "detail", "error"].iter().find_map(|field| {
        match json.get(field)? {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Object(inner) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    })
}
