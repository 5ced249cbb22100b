//! The URL prefix an engine instance is responsible for.

use url::Url;

use crate::Error;
use crate::request::canonicalize;

/// Base URL governing which requests are intercepted and how manifest
/// paths resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    base: Url,
}

impl Scope {
    /// Parse a scope base URL. The path is forced to end with `/` so that
    /// relative manifest paths resolve inside it.
    pub fn parse(base: &str) -> Result<Self, Error> {
        let mut url = canonicalize(base).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        url.set_query(None);
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self { base: url })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.base.origin()
    }

    /// Same origin and path under the base path.
    pub fn contains(&self, url: &Url) -> bool {
        self.is_same_origin(url) && url.path().starts_with(self.base.path())
    }

    /// Resolve a scope-relative path (e.g. `./index.html`) to an absolute URL.
    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("empty scope-relative path".into()));
        }
        let mut url = self
            .base
            .join(trimmed)
            .map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;
        url.set_fragment(None);
        Ok(url)
    }
}
