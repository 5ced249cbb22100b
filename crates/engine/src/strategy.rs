//! The three fetch strategies and the cacheability rule they share.

use std::fmt;
use std::sync::Arc;

use stowaway_client::Fetcher;
use stowaway_core::{Error, KeyValueStore, Request, RequestKey, ResponseSnapshot, Scope, StoreSet};

use crate::writes::WriteTracker;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
        }
    }
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response together with its source.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub response: ResponseSnapshot,
    pub source: ResponseSource,
}

impl Outcome {
    fn network(response: ResponseSnapshot) -> Self {
        Self { response, source: ResponseSource::Network }
    }

    fn cache(response: ResponseSnapshot) -> Self {
        Self { response, source: ResponseSource::Cache }
    }
}

/// Everything a strategy needs for one request. The store set is the one of
/// the generation that accepted the request.
pub struct StrategyContext<'a> {
    pub stores: &'a StoreSet,
    pub fetcher: &'a dyn Fetcher,
    pub scope: &'a Scope,
    pub writes: &'a WriteTracker,
    /// Key of the offline shell document.
    pub shell_key: &'a RequestKey,
    /// Key of the scope root document.
    pub root_key: &'a RequestKey,
}

/// Ok status, and both the request URL and the final URL share the scope's origin.
pub fn is_cacheable(scope: &Scope, request: &Request, response: &ResponseSnapshot) -> bool {
    response.is_ok() && scope.is_same_origin(&request.url) && scope.is_same_origin(&response.url)
}

/// A store read error counts as a miss; the next tier decides.
async fn lookup(store: &dyn KeyValueStore, key: &RequestKey) -> Option<ResponseSnapshot> {
    match store.get(key).await {
        Ok(Some(hit)) => {
            tracing::debug!(store = store.name(), %key, "cache hit");
            Some(hit)
        }
        Ok(None) => {
            tracing::debug!(store = store.name(), %key, "cache miss");
            None
        }
        Err(e) => {
            tracing::warn!(store = store.name(), %key, error = %e, "store read failed");
            None
        }
    }
}

impl StrategyContext<'_> {
    fn store_in_background(
        &self, store: &Arc<dyn KeyValueStore>, key: RequestKey, request: &Request, response: &ResponseSnapshot,
    ) {
        if is_cacheable(self.scope, request, response) {
            self.writes.spawn_put(store.clone(), key, response.clone());
        }
    }

    /// Static store first; the network only on a miss.
    pub async fn cache_first(&self, request: &Request) -> Result<Outcome, Error> {
        let Some(key) = RequestKey::from_request(request) else {
            return self.pass_through(request).await;
        };

        if let Some(hit) = lookup(self.stores.static_store.as_ref(), &key).await {
            return Ok(Outcome::cache(hit));
        }

        let response = self.fetcher.fetch(request).await?;
        self.store_in_background(&self.stores.static_store, key, request, &response);
        Ok(Outcome::network(response))
    }

    /// Network first; the runtime store answers only when the transport fails.
    pub async fn network_then_cache(&self, request: &Request) -> Result<Outcome, Error> {
        let Some(key) = RequestKey::from_request(request) else {
            return self.pass_through(request).await;
        };

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_in_background(&self.stores.runtime_store, key, request, &response);
                Ok(Outcome::network(response))
            }
            Err(e) if e.is_network() => match lookup(self.stores.runtime_store.as_ref(), &key).await {
                Some(hit) => Ok(Outcome::cache(hit)),
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Network first; on failure the exact page, then the offline shell, then
    /// the scope root, all from the static store.
    pub async fn navigation_fallback(&self, request: &Request) -> Result<Outcome, Error> {
        let Some(exact) = RequestKey::from_request(request) else {
            return self.pass_through(request).await;
        };

        let err = match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_in_background(&self.stores.static_store, exact, request, &response);
                return Ok(Outcome::network(response));
            }
            Err(e) if e.is_network() => e,
            Err(e) => return Err(e),
        };

        for key in [&exact, self.shell_key, self.root_key] {
            if let Some(hit) = lookup(self.stores.static_store.as_ref(), key).await {
                tracing::debug!(url = %request.url, served = %key, "navigation served from fallback chain");
                return Ok(Outcome::cache(hit));
            }
        }

        Err(err)
    }

    /// Straight to the network; nothing is read or written.
    pub async fn pass_through(&self, request: &Request) -> Result<Outcome, Error> {
        self.fetcher.fetch(request).await.map(Outcome::network)
    }
}
