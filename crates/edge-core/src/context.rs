//! Request context for a single edge invocation.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::cookie::{parse_cookie_header, Cookie};

/// Unique request identifier for log correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let mut rng = rand::thread_rng();
        let id = format!("{:x}-{:08x}-{:08x}", millis, rng.gen::<u32>(), rng.gen::<u32>());
        Self(id)
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HTTP method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    /// Convert to HTTP method string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a method string is not one we route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

/// One viewer request as observed at the edge.
///
/// Cookies are kept in the order the client sent them; routing decisions
/// depend on that order when a client sends the same cookie twice.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRequest {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Request path, without the query string.
    pub uri: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Request headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Parsed cookies in arrival order.
    pub cookies: Vec<Cookie>,
}

impl EdgeRequest {
    /// Create a GET request for `uri` with no headers and no cookies.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::generate(),
            method: Method::Get,
            uri: uri.into(),
            query: None,
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    /// Build a request from raw header pairs.
    ///
    /// Every `Cookie` header is parsed, in header order, into the cookie list.
    pub fn from_parts(method: Method, uri: impl Into<String>, headers: Vec<(String, String)>) -> Self {
        let cookies = headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(http::header::COOKIE.as_str()))
            .flat_map(|(_, value)| parse_cookie_header(value))
            .collect();

        Self {
            request_id: RequestId::generate(),
            method,
            uri: uri.into(),
            query: None,
            headers,
            cookies,
        }
    }

    /// Set the request ID.
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Set the HTTP method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the query string. An empty string clears it.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = if query.is_empty() { None } else { Some(query) };
        self
    }

    /// Add a header. Does not touch the parsed cookie list.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push(Cookie::new(name, value));
        self
    }

    /// Get a header value by name (case-insensitive, first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get the first cookie with the given name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Path plus query string, as it would appear on the request line.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.uri, q),
            None => self.uri.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generate_uniqueness() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_request_id_display() {
        let id = RequestId::from_string("req-1");
        assert_eq!(id.to_string(), "req-1");
        assert_eq!(id.as_str(), "req-1");
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("OPTIONS".parse::<Method>().unwrap(), Method::Options);
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn test_new_request_is_empty() {
        let req = EdgeRequest::new("/");
        assert_eq!(req.method, Method::Get);
        assert!(req.cookies.is_empty());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_from_parts_parses_all_cookie_headers_in_order() {
        let req = EdgeRequest::from_parts(
            Method::Get,
            "/",
            vec![
                ("Cookie".to_string(), "a=1; X-Experiment-Name=B".to_string()),
                ("accept".to_string(), "text/html".to_string()),
                ("cookie".to_string(), "X-Experiment-Name=A".to_string()),
            ],
        );

        let names: Vec<&str> = req.cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "X-Experiment-Name", "X-Experiment-Name"]);
        assert_eq!(req.cookie("X-Experiment-Name"), Some("B"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = EdgeRequest::new("/").with_header("Accept", "text/html");
        assert_eq!(req.header("accept"), Some("text/html"));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn test_path_and_query() {
        let req = EdgeRequest::new("/blue/index.html").with_query("utm=1");
        assert_eq!(req.path_and_query(), "/blue/index.html?utm=1");

        let req = EdgeRequest::new("/").with_query("");
        assert_eq!(req.path_and_query(), "/");
    }
}
