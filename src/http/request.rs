/// HTTP request methods.
///
/// Only used to describe a request in logs. Every method receives the same
/// response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    PATCH,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Example
    ///
    /// ```
    /// # use wisecow::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Some(Method::GET));
    /// assert_eq!(Method::parse("get"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }
}

/// The first line a client sent.
///
/// Its arrival is what triggers a response; the content is never validated.
/// `method`, `path` and `version` are a best-effort split of `raw` and are
/// `None` for anything that does not look like an HTTP request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// The line without its terminator.
    pub raw: String,
    pub method: Option<Method>,
    pub path: Option<String>,
    pub version: Option<String>,
}

impl RequestLine {
    /// Wraps a received line. Never fails.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut parts = raw.split_whitespace();

        let method = parts.next().and_then(Method::parse);
        let (path, version) = match method {
            Some(_) => (
                parts.next().map(str::to_string),
                parts.next().filter(|v| v.starts_with("HTTP/")).map(str::to_string),
            ),
            None => (None, None),
        };

        Self {
            raw,
            method,
            path,
            version,
        }
    }

    /// Whether the line is a well-formed `METHOD path HTTP/x` triple.
    pub fn is_http(&self) -> bool {
        self.method.is_some() && self.path.is_some() && self.version.is_some()
    }
}
