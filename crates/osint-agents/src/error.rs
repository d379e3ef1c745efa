use std::fmt;

use osint_models::{Operation, ProviderId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The closed set of failure kinds every provider failure is mapped onto.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingApiKey,
    RateLimited,
    ParseError,
    UpstreamError,
    UnsupportedOperation,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingApiKey => "MISSING_API_KEY",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::UpstreamError => "UPSTREAM_ERROR",
            ErrorCode::UnsupportedOperation => "UNSUPPORTED_OPERATION",
        }
    }

    /// Transient upstream trouble worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::RateLimited | ErrorCode::UpstreamError)
    }

    /// Failures that need user action. These always reach the caller, even from
    /// operations that otherwise degrade to placeholder data.
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            ErrorCode::MissingApiKey | ErrorCode::UnsupportedOperation
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified provider failure. Built once where the failure is understood and
/// passed upward unchanged.
#[derive(Error, Debug)]
#[error("{code} from {provider} during {operation}: {message}")]
pub struct ProviderError {
    code: ErrorCode,
    provider: ProviderId,
    operation: Operation,
    message: String,
    status: Option<u16>,
    #[source]
    cause: Option<BoxError>,
}

impl ProviderError {
    pub fn new(
        code: ErrorCode,
        provider: ProviderId,
        operation: Operation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            provider,
            operation,
            message: message.into(),
            status: None,
            cause: None,
        }
    }

    pub fn unsupported(provider: ProviderId, operation: Operation) -> Self {
        Self::new(
            ErrorCode::UnsupportedOperation,
            provider,
            operation,
            format!("{provider} does not support {operation}"),
        )
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

/// Map a failure message onto an error code. First match wins.
///
/// Matching is case-sensitive: the markers are upper-case tokens, and a
/// case-insensitive "RATE" would match words such as "generate".
pub fn code_for_message(message: &str) -> ErrorCode {
    if message.contains("MISSING_API_KEY") {
        ErrorCode::MissingApiKey
    } else if message.contains("429") || message.contains("RATE") {
        ErrorCode::RateLimited
    } else if message.contains("PARSE") {
        ErrorCode::ParseError
    } else if message.contains("UNSUPPORTED") {
        ErrorCode::UnsupportedOperation
    } else {
        ErrorCode::UpstreamError
    }
}

/// Classify an arbitrary error. A `ProviderError` passes through untouched, so an
/// already classified failure is never wrapped twice.
pub fn classify(err: BoxError, provider: ProviderId, operation: Operation) -> ProviderError {
    match err.downcast::<ProviderError>() {
        Ok(typed) => *typed,
        Err(other) => {
            let message = other.to_string();
            ProviderError::new(code_for_message(&message), provider, operation, message)
                .with_cause(other)
        }
    }
}
