use thiserror::Error;

use crate::source::SourceKind;

/// Why a model call failed. Only used for logging; every kind is shown to the
/// user the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Auth,
    RateLimit,
    ContextLength,
    Network,
    Timeout,
    BadResponse,
    Other,
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RemoteErrorKind::Auth => "auth",
            RemoteErrorKind::RateLimit => "rate-limit",
            RemoteErrorKind::ContextLength => "context-length",
            RemoteErrorKind::Network => "network",
            RemoteErrorKind::Timeout => "timeout",
            RemoteErrorKind::BadResponse => "bad-response",
            RemoteErrorKind::Other => "other",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP response from a model API.
    pub fn from_status(provider: &str, status: reqwest::StatusCode, body: &str) -> Self {
        let kind = match status.as_u16() {
            401 | 403 => RemoteErrorKind::Auth,
            429 => RemoteErrorKind::RateLimit,
            408 | 504 => RemoteErrorKind::Timeout,
            400 | 413 | 422 if mentions_context_length(body) => RemoteErrorKind::ContextLength,
            _ => RemoteErrorKind::Other,
        };
        Self::new(kind, format!("{provider} API returned {status}: {body}"))
    }
}

fn mentions_context_length(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    ["context length", "context_length", "maximum context", "too many tokens", "too long"]
        .iter()
        .any(|needle| lower.contains(needle))
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            RemoteErrorKind::Timeout
        } else if err.is_decode() {
            RemoteErrorKind::BadResponse
        } else if err.is_connect() || err.is_request() {
            RemoteErrorKind::Network
        } else {
            RemoteErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

/// Terminal failure of a single summarization request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("couldn't fetch content from {kind}: {reason}")]
    ContentUnavailable { kind: SourceKind, reason: String },

    #[error("{0}")]
    RemoteServiceFailure(#[from] RemoteError),
}

impl PipelineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PipelineError::InvalidInput(msg.into())
    }

    pub fn unavailable(kind: SourceKind, reason: impl Into<String>) -> Self {
        PipelineError::ContentUnavailable {
            kind,
            reason: reason.into(),
        }
    }

    /// Stable short name, used in JSON output and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::ContentUnavailable { .. } => "content_unavailable",
            PipelineError::RemoteServiceFailure(_) => "remote_service_failure",
        }
    }
}
