// 🚨 Error taxonomy
// Every failure the ledger client can observe, grouped by who handles it:
//
//   ProtocolError   → dispatcher logs + drops the message, stream continues
//   SubmissionError → form keeps its fields, user sees an alert
//   TransportError  → push session ends (no reconnect)
//   ConfigError     → binary refuses to start

use thiserror::Error;

// ============================================================================
// PROTOCOL ERRORS (inbound push messages)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// Payload is not well-formed JSON, or a required field is missing / mistyped
    #[error("malformed push message: {0}")]
    Malformed(String),

    /// Payload decoded but carried a `Type` we don't know
    #[error("unknown message type {0:?}")]
    UnknownType(String),

    /// Payload decoded but a field violates its contract (e.g. empty category)
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

impl ProtocolError {
    /// Short stable label, used for counters and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::Malformed(_) => "malformed",
            ProtocolError::UnknownType(_) => "unknown_type",
            ProtocolError::InvalidField { .. } => "invalid_field",
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Malformed(err.to_string())
    }
}

// ============================================================================
// SUBMISSION ERRORS (outbound one-shot request)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    /// Server answered with a non-success status
    #[error("server rejected expense (status {status})")]
    Rejected { status: u16 },

    /// Request never got an answer
    #[error("submission failed: {0}")]
    Transport(String),
}

// ============================================================================
// FORM ERRORS (local field validation before submitting)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("amount {0:?} is not a number")]
    InvalidAmount(String),
}

// ============================================================================
// TRANSPORT ERRORS (push channel)
// ============================================================================

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("push channel connect failed: {0}")]
    ConnectionFailed(String),

    #[error("push channel closed: {0}")]
    Closed(String),
}

// ============================================================================
// CONFIG ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid server url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported url scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),

    #[error("budget amount must be positive, got {0}")]
    NonPositiveBudget(f64),

    #[error("threshold must be within (0, 1], got {0}")]
    ThresholdOutOfRange(f64),
}
