//! Request keys and their content-addressed row ids.

use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

use crate::request::{Request, normalize};

/// Store key: `GET <normalized url>`.
///
/// The fetch strategies key requests only through [`RequestKey::from_request`],
/// so a non-GET request is never written to or read from a store.
/// [`RequestKey::for_url`] is for URLs the engine itself fetches with GET.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey(String);

impl RequestKey {
    /// Key for an intercepted request, `None` for non-GET methods.
    pub fn from_request(request: &Request) -> Option<Self> {
        if !request.method.is_get() {
            return None;
        }
        Some(Self::for_url(&request.url))
    }

    /// Key for a GET of `url`.
    pub fn for_url(url: &Url) -> Self {
        let normalized = normalize(url.clone()).unwrap_or_else(|_| url.clone());
        Self(format!("GET {normalized}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA-256 hex digest used as the SQLite row id.
    pub fn hash(&self) -> String {
        compute_key_hash(&self.0)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the content-addressed id for a request key.
pub fn compute_key_hash(request_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request_key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;

    #[test]
    fn test_key_format() {
        let req = Request::get("https://Example.com/app/icon.svg#frag").unwrap();
        let key = RequestKey::from_request(&req).unwrap();
        assert_eq!(key.as_str(), "GET https://example.com/app/icon.svg");
    }

    #[test]
    fn test_non_get_has_no_key() {
        let req = Request::new(Method::Post, "https://example.com/v1/media").unwrap();
        assert!(RequestKey::from_request(&req).is_none());
        let req = Request::new(Method::Head, "https://example.com/v1/media").unwrap();
        assert!(RequestKey::from_request(&req).is_none());
    }

    #[test]
    fn test_navigation_and_subresource_share_key() {
        let nav = Request::navigate("https://example.com/app/").unwrap();
        let sub = Request::get("https://example.com/app/").unwrap();
        assert_eq!(RequestKey::from_request(&nav), RequestKey::from_request(&sub));
    }

    #[test]
    fn test_hash_format_and_stability() {
        let a = compute_key_hash("GET https://example.com/");
        let b = compute_key_hash("GET https://example.com/");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, compute_key_hash("GET https://example.com/?q=1"));
    }
}
