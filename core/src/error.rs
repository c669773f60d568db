//! Error types for the tasks API client.
//!
//! # Design
//! `Unauthorized` gets a dedicated variant because it is the one failure the
//! caller reacts to structurally (clear the session, go to the login page).
//! Every other non-2xx response lands in `Api` with the code, message and
//! details from the server's error envelope, or the `UNKNOWN` default when
//! the envelope is missing. Transport failures carry no code and no status.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::session::SessionError;

pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const UNKNOWN: &str = "UNKNOWN";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const DEFAULT_MESSAGE: &str = "An error occurred";

/// Errors returned by `ApiClient` parse methods and the `TasksApi` facade.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 401 on a call that did not opt out of the
    /// unauthenticated signal.
    #[error("Not authenticated")]
    Unauthorized,

    /// Any other non-2xx response.
    #[error("{message} ({code}, HTTP {status})")]
    Api {
        code: String,
        message: String,
        status: u16,
        details: Option<Vec<Value>>,
    },

    /// The payload was rejected before a request was built.
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Vec<Value>>,
    },

    /// No cached identity; the user has to sign in first.
    #[error("not signed in")]
    SignedOut,

    /// The request never produced an HTTP response.
    #[error("transport failed: {0}")]
    Transport(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("session store: {0}")]
    Session(#[from] SessionError),
}

impl ApiError {
    /// Machine-readable code, when the failure has one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized => Some(UNAUTHORIZED),
            ApiError::Api { code, .. } => Some(code.as_str()),
            ApiError::Validation { .. } => Some(VALIDATION_ERROR),
            _ => None,
        }
    }

    /// HTTP status, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn details(&self) -> Option<&[Value]> {
        match self {
            ApiError::Api { details, .. } | ApiError::Validation { details, .. } => {
                details.as_deref()
            }
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub(crate) fn validation(field: &str, message: &str) -> Self {
        ApiError::Validation {
            message: message.to_string(),
            details: Some(vec![serde_json::json!({ "field": field, "message": message })]),
        }
    }
}

/// The server's standard non-success body: `{"error": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, deserialize_with = "details_array")]
    pub details: Option<Vec<Value>>,
}

/// Only an array is a details list; any other shape reads as `None`.
fn details_array<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(items),
        _ => None,
    })
}

impl Default for ErrorBody {
    fn default() -> Self {
        Self {
            code: UNKNOWN.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
            details: None,
        }
    }
}

impl ErrorBody {
    /// Extract the envelope from a response body, falling back to the
    /// `UNKNOWN` default when it is missing or malformed.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error)
            .unwrap_or_default()
    }

    pub fn into_api_error(self, status: u16) -> ApiError {
        ApiError::Api {
            code: self.code,
            message: self.message,
            status,
            details: self.details,
        }
    }
}
