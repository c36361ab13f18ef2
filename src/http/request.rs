//! Description of the request that gets replayed on every attempt.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};

use super::error::RequestError;

/// HTTP Basic credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth {
    pub user: String,
    pub pass: String,
}

impl Auth {
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }
}

/// Request payload. Passed to the HTTP client unmodified.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Path or absolute URL.
    pub uri: String,
    pub base_url: Option<String>,
    pub auth: Auth,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl RequestSpec {
    pub fn new(uri: impl Into<String>, auth: Auth) -> Self {
        Self {
            method: Method::GET,
            uri: uri.into(),
            base_url: None,
            auth,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Resolves `uri` against `base_url` with standard URL resolution rules.
    ///
    /// An absolute `uri` wins over the base, but a malformed base is still
    /// rejected. Without a base, `uri` must itself be absolute.
    pub fn resolve_url(&self) -> Result<Url, RequestError> {
        let invalid = |message: String| RequestError::InvalidUrl {
            base_url: self.base_url.clone(),
            uri: self.uri.clone(),
            message,
        };

        match &self.base_url {
            Some(base) => {
                let base = Url::parse(base).map_err(|e| invalid(format!("bad base URL: {}", e)))?;
                base.join(&self.uri).map_err(|e| invalid(e.to_string()))
            }
            None => Url::parse(&self.uri).map_err(|e| invalid(e.to_string())),
        }
    }
}
