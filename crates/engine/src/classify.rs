//! Request classification: which strategy, if any, serves a request.

use std::collections::HashSet;
use std::fmt;

use stowaway_core::{Request, Scope};

/// Outcome of classifying an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Static store first, network only on a miss.
    CacheFirst,
    /// Network first, runtime store on transport failure.
    NetworkThenCache,
    /// Network first, then exact key / offline shell / scope root in the static store.
    NavigationFallback,
    /// Not intercepted; goes straight to the network, never stored.
    PassThrough,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::CacheFirst => "cache-first",
            Route::NetworkThenCache => "network-then-cache",
            Route::NavigationFallback => "navigation-fallback",
            Route::PassThrough => "pass-through",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps requests to routes by method, mode, origin and path shape.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    scope: Scope,
    static_extensions: HashSet<String>,
}

impl RequestClassifier {
    pub fn new<I, S>(scope: Scope, static_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let static_extensions = static_extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { scope, static_extensions }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Decision order: method, navigation, origin, static extension, scope.
    pub fn classify(&self, request: &Request) -> Route {
        if !request.method.is_get() {
            return Route::PassThrough;
        }

        if request.is_navigation() {
            return Route::NavigationFallback;
        }

        if !self.scope.is_same_origin(&request.url) {
            return Route::PassThrough;
        }

        if self.is_static_asset(request.url.path()) {
            return Route::CacheFirst;
        }

        if self.scope.contains(&request.url) {
            return Route::NetworkThenCache;
        }

        Route::PassThrough
    }

    fn is_static_asset(&self, path: &str) -> bool {
        let file = path.rsplit('/').next().unwrap_or_default();
        match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self.static_extensions.contains(&ext.to_ascii_lowercase()),
            _ => false,
        }
    }
}
