//! The engine facade the host talks to.

use std::sync::Arc;

use stowaway_client::Fetcher;
use stowaway_core::config::default_static_extensions;
use stowaway_core::{
    AppConfig, CacheStorage, ControlMessage, Error, Request, RequestKey, ResponseSnapshot, Scope, StoreRole,
};

use crate::classify::{RequestClassifier, Route};
use crate::lifecycle::{InstallReport, LifecycleController, LifecycleStatus, MessageOutcome};
use crate::precache::PrecacheManifest;
use crate::strategy::{Outcome, ResponseSource, StrategyContext};
use crate::writes::WriteTracker;

/// Static configuration of an engine instance.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub scope: Scope,
    pub manifest: PrecacheManifest,
    /// Scope-relative path of the document served to failed navigations.
    pub offline_shell: String,
    pub store_prefix: String,
    pub static_extensions: Vec<String>,
}

impl EngineOptions {
    pub fn new(scope: Scope, manifest: PrecacheManifest) -> Self {
        Self {
            scope,
            manifest,
            offline_shell: "./index.html".to_string(),
            store_prefix: "stowaway".to_string(),
            static_extensions: default_static_extensions(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self {
            scope: config.scope()?,
            manifest: PrecacheManifest::new(config.manifest.iter().cloned())?,
            offline_shell: config.offline_shell.clone(),
            store_prefix: config.store_prefix.clone(),
            static_extensions: config.static_extensions.clone(),
        })
    }

    pub fn with_offline_shell(mut self, path: impl Into<String>) -> Self {
        self.offline_shell = path.into();
        self
    }
}

/// Lifecycle events delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Install(String),
    SkipWaiting,
}

#[derive(Debug, Clone)]
pub enum LifecycleOutcome {
    Installed(InstallReport),
    /// Tag of the generation that became active, if one was waiting.
    Activated(Option<String>),
}

/// A response handed back to the host.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub source: ResponseSource,
    pub route: Route,
    /// Generation that served the request; `None` for pass-through.
    pub generation: Option<String>,
}

/// Offline cache engine for one scope.
///
/// Requests are classified, pinned to the generation active when they
/// arrive, and served by the matching strategy. Store writes happen in the
/// background; [`CacheEngine::flush_writes`] waits for them.
pub struct CacheEngine {
    classifier: RequestClassifier,
    lifecycle: LifecycleController,
    fetcher: Arc<dyn Fetcher>,
    writes: WriteTracker,
    shell_key: RequestKey,
    root_key: RequestKey,
}

impl CacheEngine {
    pub fn new(options: EngineOptions, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let shell_key = RequestKey::for_url(&options.scope.resolve(&options.offline_shell)?);
        let root_key = RequestKey::for_url(options.scope.base());

        let classifier = RequestClassifier::new(options.scope.clone(), &options.static_extensions);
        let lifecycle =
            LifecycleController::new(storage, fetcher.clone(), options.scope, options.manifest, options.store_prefix);

        Ok(Self { classifier, lifecycle, fetcher, writes: WriteTracker::new(), shell_key, root_key })
    }

    pub fn scope(&self) -> &Scope {
        self.classifier.scope()
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    /// Serve one intercepted request.
    pub async fn handle_request(&self, request: &Request) -> Result<Served, Error> {
        let route = self.classifier.classify(request);

        let pinned = match route {
            Route::PassThrough => None,
            _ => self.lifecycle.begin_request().await,
        };

        let Some(pinned) = pinned else {
            tracing::debug!(method = %request.method, url = %request.url, "pass-through");
            let response = self.fetcher.fetch(request).await?;
            return Ok(Served {
                response,
                source: ResponseSource::Network,
                route: Route::PassThrough,
                generation: None,
            });
        };

        let generation = pinned.generation();
        let ctx = StrategyContext {
            stores: generation.stores(),
            fetcher: self.fetcher.as_ref(),
            scope: self.classifier.scope(),
            writes: &self.writes,
            shell_key: &self.shell_key,
            root_key: &self.root_key,
        };

        let Outcome { response, source } = match route {
            Route::CacheFirst => ctx.cache_first(request).await?,
            Route::NetworkThenCache => ctx.network_then_cache(request).await?,
            Route::NavigationFallback => ctx.navigation_fallback(request).await?,
            Route::PassThrough => ctx.pass_through(request).await?,
        };

        tracing::debug!(
            url = %request.url,
            %route,
            %source,
            status = response.status,
            generation = generation.tag(),
            "served"
        );

        Ok(Served { response, source, route, generation: Some(generation.tag().to_string()) })
    }

    pub async fn handle_lifecycle(&self, event: LifecycleEvent) -> Result<LifecycleOutcome, Error> {
        match event {
            LifecycleEvent::Install(tag) => self.lifecycle.install(&tag).await.map(LifecycleOutcome::Installed),
            LifecycleEvent::SkipWaiting => self.lifecycle.skip_waiting().await.map(LifecycleOutcome::Activated),
        }
    }

    pub async fn handle_message(&self, message: ControlMessage) -> Result<MessageOutcome, Error> {
        self.lifecycle.handle_message(message).await
    }

    /// Deliver a raw host message. Unrecognized shapes are ignored.
    pub async fn handle_raw_message(&self, raw: &serde_json::Value) -> Result<MessageOutcome, Error> {
        match ControlMessage::parse(raw) {
            Some(message) => self.handle_message(message).await,
            None => {
                tracing::debug!(%raw, "ignoring unrecognized message");
                Ok(MessageOutcome::Ignored)
            }
        }
    }

    /// Exact-key lookup in the active generation's store for `role`.
    pub async fn lookup(&self, role: StoreRole, url: &str) -> Result<Option<ResponseSnapshot>, Error> {
        let request = Request::get(url)?;
        let active = self.lifecycle.active().await.ok_or(Error::NoActiveGeneration)?;
        active.stores().get(role).get(&RequestKey::for_url(&request.url)).await
    }

    pub async fn status(&self) -> Result<LifecycleStatus, Error> {
        self.lifecycle.status().await
    }

    /// Wait for every background store write spawned so far.
    pub async fn flush_writes(&self) {
        self.writes.flush().await;
    }
}
