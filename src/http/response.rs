//! Responses and per-attempt results.

use reqwest::StatusCode;
use reqwest::header::HeaderMap;

use super::error::RequestError;

/// Parsed response payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl ResponseBody {
    /// Picks a representation from the `Content-Type` header.
    ///
    /// JSON content types must parse; everything else is infallible.
    pub fn parse(content_type: Option<&str>, bytes: Vec<u8>) -> Result<Self, RequestError> {
        if bytes.is_empty() {
            return Ok(ResponseBody::Empty);
        }

        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if mime == "application/json" || mime.ends_with("+json") {
            return serde_json::from_slice(&bytes)
                .map(ResponseBody::Json)
                .map_err(|e| RequestError::Decode {
                    message: e.to_string(),
                });
        }

        let textual = mime.starts_with("text/")
            || mime == "application/xml"
            || mime == "application/x-www-form-urlencoded";
        if textual {
            return Ok(ResponseBody::Text(
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        }

        Ok(ResponseBody::Bytes(bytes))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// Canonical reason phrase for the code, empty for unknown codes.
    /// `reqwest` does not expose the phrase the server actually sent, so a
    /// custom phrase such as "503 Down For Maintenance" reads "Service
    /// Unavailable" here.
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        }
    }

    /// Builds a response with no headers, mostly useful for tests and mocks.
    pub fn with_status(status: u16, body: ResponseBody) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, HeaderMap::new(), body)
    }

    /// The error the HTTP client reports for this response, if any.
    pub fn status_error(&self) -> Option<RequestError> {
        if self.status.as_u16() >= 400 {
            Some(RequestError::Status {
                status: self.status.as_u16(),
                status_text: self.status_text.clone(),
            })
        } else {
            None
        }
    }
}

/// Raw result of one attempt. At least one of response or error is present.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptResult {
    Response(HttpResponse),
    Error(RequestError),
    Failed {
        response: HttpResponse,
        error: RequestError,
    },
}

impl AttemptResult {
    /// Wraps a received response, attaching a status error for codes >= 400.
    pub fn from_response(response: HttpResponse) -> Self {
        match response.status_error() {
            Some(error) => AttemptResult::Failed { response, error },
            None => AttemptResult::Response(response),
        }
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            AttemptResult::Response(response) | AttemptResult::Failed { response, .. } => {
                Some(response)
            }
            AttemptResult::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&RequestError> {
        match self {
            AttemptResult::Error(error) | AttemptResult::Failed { error, .. } => Some(error),
            AttemptResult::Response(_) => None,
        }
    }

    pub fn into_parts(self) -> (Option<HttpResponse>, Option<RequestError>) {
        match self {
            AttemptResult::Response(response) => (Some(response), None),
            AttemptResult::Error(error) => (None, Some(error)),
            AttemptResult::Failed { response, error } => (Some(response), Some(error)),
        }
    }
}
