use thiserror::Error;

use crate::lro::LroStatus;

/// Errors that can occur when interacting with Azure Resource Manager.
#[derive(Error, Debug)]
pub enum ArmError {
    /// A required parameter was empty or violated a constraint.
    ///
    /// Raised before any network I/O.
    #[error("invalid parameter {parameter}: {reason}")]
    Validation { parameter: String, reason: String },

    /// The HTTP request failed at the transport level.
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response status was not in the operation's accepted set.
    #[error(
        "HTTP error: {status} ({}) - {message}",
        .code.as_deref().unwrap_or("unknown")
    )]
    ResponseStatus {
        status: u16,
        code: Option<String>,
        message: String,
        body: String,
    },

    /// The response body could not be parsed into the expected shape.
    #[error("Deserialization error: {source}")]
    Deserialization {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// The request payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The long-running operation reached a failed terminal state.
    #[error("long-running operation {status}: {code} - {message}")]
    OperationFailed {
        status: LroStatus,
        code: String,
        message: String,
    },

    /// A resume token could not be turned back into a poller.
    #[error("invalid resume token: {0}")]
    InvalidResumeToken(String),

    /// A polling header carried a URL that is missing or not absolute.
    #[error("invalid polling URL: {0}")]
    InvalidPollingUrl(String),

    /// The poller has not reached a terminal state yet.
    #[error("long-running operation has not reached a terminal state")]
    PollerNotDone,

    /// Polling stopped because the caller cancelled it.
    #[error("polling cancelled by caller")]
    Cancelled,

    /// Polling stopped because the caller's deadline elapsed.
    #[error("polling deadline exceeded")]
    DeadlineExceeded,

    /// The endpoint URL is invalid.
    #[error("Invalid endpoint URL: {message}")]
    InvalidEndpoint {
        message: String,
        #[source]
        source: Option<url::ParseError>,
    },

    /// A required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl ArmError {
    /// Build a [`ArmError::Validation`] for `parameter`.
    pub fn validation(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`ArmError::InvalidEndpoint`] wrapping a URL parse failure.
    pub fn invalid_endpoint_with_source(message: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
            source: Some(source),
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ResponseStatus { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the service answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type alias for ARM operations.
pub type ArmResult<T> = std::result::Result<T, ArmError>;
