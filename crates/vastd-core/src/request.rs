//! HTTP Request types

use crate::{Error, Result};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Instant;

/// HTTP Methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Connect,
    Trace,
}

impl Method {
    /// Parse from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "CONNECT" => Ok(Method::Connect),
            "TRACE" => Ok(Method::Trace),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP Request
///
/// Only what the service reads: no body, since every route is a `GET`.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// Request headers (stack-allocated for small header counts)
    pub headers: SmallVec<[(String, String); 16]>,
    /// When the request reached the service
    pub received_at: Instant,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: SmallVec::new(),
            received_at: Instant::now(),
        }
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse query string into key-value pairs
    ///
    /// Keys and values are percent-decoded once and `+` reads as a space.
    /// A key without `=` maps to an empty value. When a key repeats, the
    /// last occurrence wins.
    pub fn query_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some(query) = &self.query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                params.insert(decode_component(key), decode_component(value));
            }
        }
        params
    }
}

/// Builder for constructing requests
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Create a new builder
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request: Request::new(method, path),
        }
    }

    /// Set query string
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.request.query = Some(query.into());
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.push((name.into(), value.into()));
        self
    }

    /// Build the request
    pub fn build(self) -> Request {
        self.request
    }
}

/// Decode one `application/x-www-form-urlencoded` component
///
/// Malformed `%` escapes pass through untouched and invalid UTF-8 is
/// replaced, so decoding never fails.
fn decode_component(s: &str) -> String {
    let spaced: Cow<'_, str> = if s.contains('+') {
        Cow::Owned(s.replace('+', " "))
    } else {
        Cow::Borrowed(s)
    };
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::from_str("GET").unwrap(), Method::Get);
        assert_eq!(Method::from_str("head").unwrap(), Method::Head);
        assert!(Method::from_str("INVALID").is_err());
    }

    #[test]
    fn test_request_header() {
        let req = RequestBuilder::new(Method::Get, "/")
            .header("X-Request-ID", "abc")
            .build();

        assert_eq!(req.header("x-request-id"), Some("abc"));
        assert_eq!(req.header("X-REQUEST-ID"), Some("abc"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn test_query_params() {
        let req = RequestBuilder::new(Method::Get, "/track")
            .query("event=start&session_id=abc&page_url=%2Ffoo%3Fbar")
            .build();

        let params = req.query_params();
        assert_eq!(params.get("event"), Some(&"start".to_string()));
        assert_eq!(params.get("session_id"), Some(&"abc".to_string()));
        assert_eq!(params.get("page_url"), Some(&"/foo?bar".to_string()));
    }

    #[test]
    fn test_query_plus_and_utf8() {
        let req = RequestBuilder::new(Method::Get, "/")
            .query("q=caf%C3%A9+au+lait")
            .build();

        assert_eq!(req.query_params().get("q").map(String::as_str), Some("café au lait"));
    }

    #[test]
    fn test_query_malformed_escapes() {
        let req = RequestBuilder::new(Method::Get, "/")
            .query("a=100%&b=%zz&c=%FF")
            .build();

        let params = req.query_params();
        assert_eq!(params.get("a"), Some(&"100%".to_string()));
        assert_eq!(params.get("b"), Some(&"%zz".to_string()));
        assert_eq!(params.get("c"), Some(&"\u{FFFD}".to_string()));
    }

    #[test]
    fn test_query_edge_cases() {
        let req = RequestBuilder::new(Method::Get, "/")
            .query("flag&&x=1&x=2")
            .build();

        let params = req.query_params();
        assert_eq!(params.get("flag"), Some(&String::new()));
        assert_eq!(params.get("x"), Some(&"2".to_string()));
        assert_eq!(params.len(), 2);

        let bare = Request::new(Method::Get, "/");
        assert!(bare.query_params().is_empty());
    }
}
