//! Issues single request attempts over `reqwest`.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::io::ErrorKind;

use super::error::{ErrorCode, RequestError};
use super::request::{RequestBody, RequestSpec};
use super::response::{AttemptResult, HttpResponse, ResponseBody};

/// Default `User-Agent` sent by [`HttpClient::with_defaults`].
pub const USER_AGENT: &str = concat!("retreq/", env!("RETREQ_VERSION"));

/// Performs exactly one attempt of a request. Never retries by itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SendAttempt: Send + Sync {
    async fn send(&self, spec: &RequestSpec) -> AttemptResult;
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_defaults() -> Result<Self, RequestError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RequestError::Client {
                message: describe(&e),
            })?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl SendAttempt for HttpClient {
    #[tracing::instrument(skip(self, spec), fields(method = %spec.method, uri = %spec.uri))]
    async fn send(&self, spec: &RequestSpec) -> AttemptResult {
        let url = match spec.resolve_url() {
            Ok(url) => url,
            Err(e) => return AttemptResult::Error(e),
        };

        debug!("{} {}...", spec.method, url);

        let request = self
            .client
            .request(spec.method.clone(), url)
            .basic_auth(&spec.auth.user, Some(&spec.auth.pass))
            .headers(spec.headers.clone());

        let request = match &spec.body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Text(text) => request.body(text.clone()),
            RequestBody::Bytes(bytes) => request.body(bytes.clone()),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return AttemptResult::Error(from_reqwest(&e)),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => return AttemptResult::Error(from_reqwest(&e)),
        };

        debug!("{} ({} bytes)", status, bytes.len());

        match ResponseBody::parse(content_type.as_deref(), bytes) {
            Ok(body) => AttemptResult::from_response(HttpResponse::new(status, headers, body)),
            Err(decode_error) => {
                let response = HttpResponse::new(status, headers, ResponseBody::Empty);
                // An error status says more than an unparsable error page.
                let error = response.status_error().unwrap_or(decode_error);
                AttemptResult::Failed { response, error }
            }
        }
    }
}

/// Converts a `reqwest` error into a [`RequestError`], recovering the
/// transport error code when one can be identified.
pub fn from_reqwest(error: &reqwest::Error) -> RequestError {
    if error.is_builder() {
        return RequestError::Client {
            message: describe(error),
        };
    }
    if error.is_decode() {
        return RequestError::Decode {
            message: describe(error),
        };
    }
    RequestError::network(error_code(error), describe(error))
}

fn error_code(error: &reqwest::Error) -> Option<ErrorCode> {
    if error.is_timeout() {
        return Some(if error.is_connect() {
            ErrorCode::Timeout
        } else {
            ErrorCode::SocketTimeout
        });
    }

    let mut messages = Vec::new();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(e) = source {
        if let Some(code) = e
            .downcast_ref::<std::io::Error>()
            .and_then(|io| code_from_io_kind(io.kind()))
        {
            return Some(code);
        }
        messages.push(e.to_string());
        source = e.source();
    }

    code_from_layers(&messages)
}

/// Matches the innermost layer first; outer layers such as "dns error"
/// only summarize what the resolver said underneath.
fn code_from_layers(layers: &[String]) -> Option<ErrorCode> {
    layers.iter().rev().find_map(|m| code_from_message(m))
}

pub fn code_from_io_kind(kind: ErrorKind) -> Option<ErrorCode> {
    let code = match kind {
        ErrorKind::ConnectionReset => ErrorCode::ConnectionReset,
        ErrorKind::ConnectionRefused => ErrorCode::ConnectionRefused,
        ErrorKind::ConnectionAborted => ErrorCode::ConnectionAborted,
        ErrorKind::BrokenPipe => ErrorCode::BrokenPipe,
        ErrorKind::TimedOut => ErrorCode::Timeout,
        ErrorKind::HostUnreachable => ErrorCode::HostUnreachable,
        ErrorKind::NetworkUnreachable => ErrorCode::NetworkUnreachable,
        ErrorKind::AddrNotAvailable => ErrorCode::AddressNotAvailable,
        ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
        _ => return None,
    };
    Some(code)
}

/// Resolver and socket messages, checked in order. The temporary DNS
/// failure must precede the generic lookup failure.
const MESSAGE_PATTERNS: &[(&str, ErrorCode)] = &[
    ("temporary failure in name resolution", ErrorCode::DnsTemporaryFailure),
    ("name resolution is temporarily", ErrorCode::DnsTemporaryFailure),
    ("name or service not known", ErrorCode::HostNotFound),
    ("nodename nor servname", ErrorCode::HostNotFound),
    ("no such host", ErrorCode::HostNotFound),
    ("failed to lookup address", ErrorCode::HostNotFound),
    ("dns error", ErrorCode::HostNotFound),
    ("connection refused", ErrorCode::ConnectionRefused),
    ("connection reset", ErrorCode::ConnectionReset),
    ("connection closed before message completed", ErrorCode::ConnectionReset),
    ("broken pipe", ErrorCode::BrokenPipe),
    ("no route to host", ErrorCode::HostUnreachable),
    ("host is unreachable", ErrorCode::HostUnreachable),
    ("network is unreachable", ErrorCode::NetworkUnreachable),
    ("timed out", ErrorCode::Timeout),
];

pub fn code_from_message(message: &str) -> Option<ErrorCode> {
    let message = message.to_ascii_lowercase();
    MESSAGE_PATTERNS
        .iter()
        .find(|(pattern, _)| message.contains(pattern))
        .map(|(_, code)| *code)
}

/// Joins an error with all of its sources, since `reqwest` only prints
/// the outermost layer.
fn describe(error: &reqwest::Error) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = std::error::Error::source(error);
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}
