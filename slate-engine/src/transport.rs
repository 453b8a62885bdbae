//! The wire boundary: one request shape, one async trait.
//!
//! The engine never constructs URLs or speaks HTTP itself; it builds
//! `ApiRequest` values and hands them to whatever `Transport` the host
//! wired in. Implementations map the request onto a real HTTP client, a
//! local store, or a test double.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;

/// HTTP-shaped method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One request to the backing store.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the store root, e.g. `/books/records/01ABC`.
    pub path: String,
    /// Query pairs in emission order. Keys may repeat.
    pub query: Vec<(String, String)>,
    pub body: Option<JsonValue>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// The first value under a query key, if any.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Path split into non-empty segments.
    pub fn path_segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// A request/response channel to the backing store.
///
/// Implementations return the raw response body; envelope decoding is the
/// engine's job. Failures to complete the exchange at all surface as
/// [`EngineError::Transport`](crate::error::EngineError::Transport).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<JsonValue>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_wire_names() {
        assert_eq!(Method::Patch.as_str(), "PATCH");
        let json = serde_json::to_string(&Method::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
    }

    #[test]
    fn request_helpers() {
        let request = ApiRequest::new(Method::Get, "/books/records")
            .with_query(vec![("viewId".into(), "v1".into()), ("page".into(), "2".into())]);
        assert_eq!(request.query_value("viewId"), Some("v1"));
        assert_eq!(request.query_value("missing"), None);
        assert_eq!(request.path_segments(), ["books", "records"]);
    }
}
