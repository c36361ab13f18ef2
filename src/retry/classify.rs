//! Decides whether an attempt succeeded, should be retried, or is final.

use std::fmt;
use std::ops::RangeInclusive;

use crate::http::{AttemptResult, ErrorCode, HttpResponse, RequestError};

/// Status codes worth another attempt: rate limiting and server errors.
pub const RETRIABLE_STATUS: &[RangeInclusive<u16>] = &[429..=429, 500..=599];

/// Transport error codes worth another attempt.
pub const RETRIABLE_ERROR_CODES: &[ErrorCode] = &[
    ErrorCode::ConnectionReset,
    ErrorCode::HostNotFound,
    ErrorCode::SocketTimeout,
    ErrorCode::Timeout,
    ErrorCode::ConnectionRefused,
    ErrorCode::HostUnreachable,
    ErrorCode::BrokenPipe,
    ErrorCode::DnsTemporaryFailure,
];

pub fn is_retriable_status(status: u16) -> bool {
    RETRIABLE_STATUS.iter().any(|range| range.contains(&status))
}

impl ErrorCode {
    pub fn is_retriable(&self) -> bool {
        RETRIABLE_ERROR_CODES.contains(self)
    }
}

/// Why an attempt is being retried.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryReason {
    Status { status: u16, status_text: String },
    Network(RequestError),
}

impl RetryReason {
    /// The error reported to the caller if this is the last attempt.
    pub fn into_error(self) -> RequestError {
        match self {
            RetryReason::Status {
                status,
                status_text,
            } => RequestError::Status {
                status,
                status_text,
            },
            RetryReason::Network(error) => error,
        }
    }
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::Status {
                status,
                status_text,
            } => write!(f, "{} - {}", status, status_text),
            RetryReason::Network(error) => write!(f, "{}", error),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Outcome<'a> {
    Success(&'a HttpResponse),
    Retry(RetryReason),
    Terminal(&'a RequestError),
}

/// Classifies one attempt. Pure: the result depends only on the status
/// code and error code of `attempt`.
pub fn classify(attempt: &AttemptResult) -> Outcome<'_> {
    if let Some(response) = attempt.response() {
        let status = response.status.as_u16();
        if is_retriable_status(status) {
            return Outcome::Retry(RetryReason::Status {
                status,
                status_text: response.status_text.clone(),
            });
        }
    }

    match attempt {
        AttemptResult::Response(response) => Outcome::Success(response),
        AttemptResult::Error(error) | AttemptResult::Failed { error, .. } => {
            match error.code() {
                Some(code) if code.is_retriable() => {
                    Outcome::Retry(RetryReason::Network(error.clone()))
                }
                _ => Outcome::Terminal(error),
            }
        }
    }
}
