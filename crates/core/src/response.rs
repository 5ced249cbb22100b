//! Response snapshots as stored in and served from the cache.

use bytes::Bytes;
use url::Url;

/// A fully buffered response: status, headers and body.
///
/// Snapshots are what the stores persist and what the engine hands back to
/// the host, whether the response came from the network or from a store.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// RFC 3339 timestamp of the network fetch.
    pub fetched_at: String,
}

impl ResponseSnapshot {
    pub fn new(url: Url, status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            url,
            status,
            headers: Vec::new(),
            body: body.into(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// True for 2xx statuses.
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
