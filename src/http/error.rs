//! Errors produced by a single request attempt.

use std::fmt;

/// Machine-readable transport error codes, named after the POSIX / libuv
/// codes network stacks report them as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `ECONNRESET`
    ConnectionReset,
    /// `ENOTFOUND`
    HostNotFound,
    /// `ESOCKETTIMEDOUT`
    SocketTimeout,
    /// `ETIMEDOUT`
    Timeout,
    /// `ECONNREFUSED`
    ConnectionRefused,
    /// `EHOSTUNREACH`
    HostUnreachable,
    /// `EPIPE`
    BrokenPipe,
    /// `EAI_AGAIN`
    DnsTemporaryFailure,
    /// `ECONNABORTED`
    ConnectionAborted,
    /// `ENETUNREACH`
    NetworkUnreachable,
    /// `EADDRNOTAVAIL`
    AddressNotAvailable,
    /// `EACCES`
    PermissionDenied,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 12] = [
        ErrorCode::ConnectionReset,
        ErrorCode::HostNotFound,
        ErrorCode::SocketTimeout,
        ErrorCode::Timeout,
        ErrorCode::ConnectionRefused,
        ErrorCode::HostUnreachable,
        ErrorCode::BrokenPipe,
        ErrorCode::DnsTemporaryFailure,
        ErrorCode::ConnectionAborted,
        ErrorCode::NetworkUnreachable,
        ErrorCode::AddressNotAvailable,
        ErrorCode::PermissionDenied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConnectionReset => "ECONNRESET",
            ErrorCode::HostNotFound => "ENOTFOUND",
            ErrorCode::SocketTimeout => "ESOCKETTIMEDOUT",
            ErrorCode::Timeout => "ETIMEDOUT",
            ErrorCode::ConnectionRefused => "ECONNREFUSED",
            ErrorCode::HostUnreachable => "EHOSTUNREACH",
            ErrorCode::BrokenPipe => "EPIPE",
            ErrorCode::DnsTemporaryFailure => "EAI_AGAIN",
            ErrorCode::ConnectionAborted => "ECONNABORTED",
            ErrorCode::NetworkUnreachable => "ENETUNREACH",
            ErrorCode::AddressNotAvailable => "EADDRNOTAVAIL",
            ErrorCode::PermissionDenied => "EACCES",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one request attempt, or of the whole call once retries stop.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// The base URL or URI could not be resolved into an absolute URL.
    InvalidUrl {
        base_url: Option<String>,
        uri: String,
        message: String,
    },
    /// The server answered with an error status (>= 400).
    Status { status: u16, status_text: String },
    /// Transport-level failure; `code` is set when it could be identified.
    Network {
        code: Option<ErrorCode>,
        message: String,
    },
    /// The response body did not match its declared content type.
    Decode { message: String },
    /// The request could not be built or sent for a non-network reason.
    Client { message: String },
}

impl RequestError {
    pub fn network(code: Option<ErrorCode>, message: impl Into<String>) -> Self {
        RequestError::Network {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            RequestError::Network { code, .. } => *code,
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidUrl {
                base_url,
                uri,
                message,
            } => match base_url {
                Some(base) => write!(f, "Invalid URL '{}' (base '{}'): {}", uri, base, message),
                None => write!(f, "Invalid URL '{}': {}", uri, message),
            },
            RequestError::Status {
                status,
                status_text,
            } => write!(f, "{} - {}", status, status_text),
            RequestError::Network {
                code: Some(code),
                message,
            } => write!(f, "{}: {}", code, message),
            RequestError::Network {
                code: None,
                message,
            } => write!(f, "Network error: {}", message),
            RequestError::Decode { message } => {
                write!(f, "Failed to decode response body: {}", message)
            }
            RequestError::Client { message } => write!(f, "Request error: {}", message),
        }
    }
}

impl std::error::Error for RequestError {}
