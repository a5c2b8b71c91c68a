//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `dispatch::build_request` produces
//! an `HttpRequest` and `dispatch::parse_response` consumes an
//! `HttpResponse`; whoever sits in between (the bundled reqwest transport,
//! a test double, or a host with its own HTTP stack) performs the I/O.
//!
//! Every Etherpad API call is a `GET` with its arguments in the query string,
//! so a request is just a URL plus headers.

/// An HTTP `GET` request described as plain data.
///
/// `url` contains the API key in its query string: do not log it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// A response with no headers, mostly useful to hosts and tests.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
