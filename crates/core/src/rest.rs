//! Transport-neutral request and response types handed to collaborators.

use std::time::Duration;

/// An inbound request as seen by a [`RequestDispatcher`](crate::RequestDispatcher)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestRequest {
    /// HTTP method, upper case
    pub method: String,
    /// Request path and query
    pub uri: String,
    /// Request headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Full request body
    pub body: Vec<u8>,
}

impl RestRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            ..Default::default()
        }
    }

    /// Path component of the URI
    pub fn path(&self) -> &str {
        self.uri.split('?').next().unwrap_or_default()
    }

    /// First header value matching `name`, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// The dispatcher's answer to a [`RestRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RestResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// One completed request, as recorded by an [`AccessLogger`](crate::AccessLogger)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogEntry {
    pub method: String,
    pub uri: String,
    pub status: u16,
    pub request_headers: Vec<(String, String)>,
    pub response_headers: Vec<(String, String)>,
    pub request_bytes: usize,
    pub response_bytes: usize,
    pub latency: Duration,
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
