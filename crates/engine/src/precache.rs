//! Install-time population of the static store.

use stowaway_client::Fetcher;
use stowaway_core::{CacheMode, Error, KeyValueStore, Request, RequestKey, Scope};

use crate::strategy::is_cacheable;

/// Ordered scope-relative paths fetched at install. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrecacheManifest {
    paths: Vec<String>,
}

impl PrecacheManifest {
    pub fn new<I, S>(paths: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if let Some(pos) = paths.iter().position(|p| p.trim().is_empty()) {
            return Err(Error::InvalidInput(format!("manifest entry {pos} is empty")));
        }
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// A manifest entry that could not be cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheFailure {
    /// Resolved URL, or the raw path when resolution failed.
    pub url: String,
    pub reason: String,
}

/// What an install-time precache run achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecacheReport {
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
}

impl PrecacheReport {
    fn fail(&mut self, url: impl Into<String>, reason: impl Into<String>) {
        let failure = PrecacheFailure { url: url.into(), reason: reason.into() };
        tracing::warn!(url = %failure.url, reason = %failure.reason, "precache entry skipped");
        self.failed.push(failure);
    }
}

/// Fetch every manifest entry from the origin, bypassing HTTP caches, and
/// store the ok responses.
///
/// A failing entry is recorded and skipped; it never prevents the others
/// from being cached. Entries resolving outside the scope, and responses
/// that end up on another origin, count as failures. Only a store error
/// aborts the run.
pub async fn precache(
    manifest: &PrecacheManifest, scope: &Scope, fetcher: &dyn Fetcher, store: &dyn KeyValueStore,
) -> Result<PrecacheReport, Error> {
    let mut report = PrecacheReport::default();

    for path in manifest.paths() {
        let url = match scope.resolve(path) {
            Ok(url) => url,
            Err(e) => {
                report.fail(path.as_str(), e.to_string());
                continue;
            }
        };

        if !scope.contains(&url) {
            report.fail(url.as_str(), "outside scope");
            continue;
        }

        let request = match Request::from_url(url.clone()) {
            Ok(request) => request.with_cache(CacheMode::Reload),
            Err(e) => {
                report.fail(url.as_str(), e.to_string());
                continue;
            }
        };

        let response = match fetcher.fetch(&request).await {
            Ok(response) => response,
            Err(e) => {
                report.fail(url.as_str(), e.to_string());
                continue;
            }
        };

        if !response.is_ok() {
            report.fail(url.as_str(), format!("status {}", response.status));
            continue;
        }

        if !is_cacheable(scope, &request, &response) {
            report.fail(url.as_str(), format!("redirected off-origin to {}", response.url));
            continue;
        }

        store.put(&RequestKey::for_url(&request.url), &response).await?;
        tracing::debug!(url = %request.url, store = store.name(), "precached");
        report.cached.push(request.url.to_string());
    }

    tracing::info!(
        cached = report.cached.len(),
        failed = report.failed.len(),
        store = store.name(),
        "precache complete"
    );

    Ok(report)
}
