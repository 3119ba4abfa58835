//! Public access logging
//!
//! Emits one `info` event per request on the `public_access` target so the
//! subscriber can route access logs separately from diagnostics.

use tracing::info;

use crate::collaborators::AccessLogger;
use crate::rest::AccessLogEntry;

/// Tracing target used for access log events
pub const ACCESS_LOG_TARGET: &str = "public_access";

/// Access logger that records a configured subset of headers
#[derive(Debug, Clone, Default)]
pub struct PublicAccessLogger {
    request_headers: Vec<String>,
    response_headers: Vec<String>,
}

impl PublicAccessLogger {
    /// Create a logger copying the named request and response headers
    pub fn new(request_headers: Vec<String>, response_headers: Vec<String>) -> Self {
        Self {
            request_headers,
            response_headers,
        }
    }

    pub fn request_headers(&self) -> &[String] {
        &self.request_headers
    }

    pub fn response_headers(&self) -> &[String] {
        &self.response_headers
    }

    /// Render the access log line for an entry
    pub fn format(&self, entry: &AccessLogEntry) -> String {
        let mut line = format!("{} {}", entry.method, entry.uri);
        line.push_str(&select_headers("Request", &self.request_headers, &entry.request_headers));
        line.push_str(&format!(", status={}", entry.status));
        line.push_str(&select_headers("Response", &self.response_headers, &entry.response_headers));
        line.push_str(&format!(
            ", in={}B, out={}B, latency={}ms",
            entry.request_bytes,
            entry.response_bytes,
            entry.latency.as_millis()
        ));
        line
    }
}

fn select_headers(label: &str, wanted: &[String], headers: &[(String, String)]) -> String {
    let selected: Vec<String> = wanted
        .iter()
        .filter_map(|name| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(k, v)| format!("[{}={}]", k, v))
        })
        .collect();
    if selected.is_empty() {
        String::new()
    } else {
        format!(", {} Headers {}", label, selected.join(" "))
    }
}

impl AccessLogger for PublicAccessLogger {
    fn log(&self, entry: &AccessLogEntry) {
        info!(target: ACCESS_LOG_TARGET, status = entry.status, "{}", self.format(entry));
    }
}
