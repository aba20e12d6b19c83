//! Ledger error taxonomy.
//!
//! Every failed call is mapped onto one of these variants at the point of the
//! remote call. Callers turn them into a user-visible notice with
//! [`LedgerError::user_message`]; none of them is fatal.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The change collides with existing state (e.g. user already a member).
    #[error("conflict: {}", display_message(.message.as_deref()))]
    Conflict { message: Option<String> },
    /// Unknown user, group or route.
    #[error("not found: {}", display_message(.message.as_deref()))]
    NotFound { message: Option<String> },
    /// Missing, expired or rejected bearer token.
    #[error("unauthorized: {}", display_message(.message.as_deref()))]
    Unauthorized { message: Option<String> },
    #[error("ledger error {status}: {}", display_message(.message.as_deref()))]
    Server {
        status: u16,
        message: Option<String>,
    },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid ledger URL: {0}")]
    InvalidUrl(String),
}

fn display_message(message: Option<&str>) -> &str {
    message.unwrap_or("no message")
}

impl LedgerError {
    /// Classify a non-success response.
    ///
    /// 400s are only promoted to `Conflict` when the ledger says the thing
    /// already exists; the ledger uses 400 for both validation and duplicates.
    #[must_use]
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        match status {
            StatusCode::CONFLICT => Self::Conflict { message },
            StatusCode::NOT_FOUND => Self::NotFound { message },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized { message },
            StatusCode::BAD_REQUEST if mentions_duplicate(message.as_deref()) => {
                Self::Conflict { message }
            }
            other => Self::Server {
                status: other.as_u16(),
                message,
            },
        }
    }

    /// The human-readable reason the ledger gave, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Conflict { message }
            | Self::NotFound { message }
            | Self::Unauthorized { message }
            | Self::Server { message, .. } => message.as_deref(),
            Self::Network(_) | Self::Decode(_) | Self::InvalidUrl(_) => None,
        }
    }

    /// Server-provided message verbatim, or `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn mentions_duplicate(message: Option<&str>) -> bool {
    message.is_some_and(|m| m.to_ascii_lowercase().contains("already"))
}

/// Pull `message` (or the older `msg`) out of an error body.
#[must_use]
pub fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "msg"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
