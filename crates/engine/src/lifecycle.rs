//! Generation lifecycle: install, wait, activate, retire.
//!
//! ### State machine
//! ```text
//! Installing -> Waiting -> Activating -> Active -> Retired
//!      |            |
//!      +-> Retired  +-> Retired (replaced by a newer install)
//! ```
//!
//! ### Invariants
//! - Install and activation are serialized by one mutex; the request path
//!   never takes it.
//! - After activation the storage holds exactly the active generation's
//!   static and runtime stores.
//! - A superseded generation retires once its last in-flight request ends.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{Mutex, RwLock, watch};

use stowaway_client::Fetcher;
use stowaway_core::{CacheStorage, ControlMessage, Error, Scope, StoreNames, StoreSet};

use crate::precache::{PrecacheManifest, PrecacheReport, precache};

/// Lifecycle state of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Active,
    Retired,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Retired => "retired",
        }
    }

    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Installing, Waiting)
                | (Installing, Retired)
                | (Waiting, Activating)
                | (Waiting, Retired)
                | (Activating, Active)
                | (Active, Retired)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One versioned instance of the engine and the stores it owns.
#[derive(Debug)]
pub struct Generation {
    tag: String,
    names: StoreNames,
    stores: StoreSet,
    state: watch::Sender<LifecycleState>,
    in_flight: AtomicUsize,
    superseded: AtomicBool,
}

impl Generation {
    fn new(tag: String, names: StoreNames, stores: StoreSet) -> Arc<Self> {
        let (state, _) = watch::channel(LifecycleState::Installing);
        Arc::new(Self {
            tag,
            names,
            stores,
            state,
            in_flight: AtomicUsize::new(0),
            superseded: AtomicBool::new(false),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn names(&self) -> &StoreNames {
        &self.names
    }

    pub fn stores(&self) -> &StoreSet {
        &self.stores
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn transition(&self, next: LifecycleState) -> Result<(), Error> {
        let mut from = None;
        let changed = self.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                *current = next;
                true
            } else {
                from = Some(*current);
                false
            }
        });

        if changed {
            tracing::info!(generation = %self.tag, state = %next, "lifecycle transition");
            return Ok(());
        }

        let from = from.unwrap_or(next);
        Err(Error::InvalidTransition { from: from.to_string(), to: next.to_string() })
    }

    /// Count a request against this generation until the guard drops.
    fn begin_request(self: &Arc<Self>) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight { generation: self.clone() }
    }

    fn supersede(&self) {
        self.superseded.store(true, Ordering::SeqCst);
        self.retire_if_idle();
    }

    fn retire_if_idle(&self) {
        if !self.superseded.load(Ordering::SeqCst) || self.in_flight() != 0 {
            return;
        }
        // Both the last request and `supersede` may get here.
        if self.state() == LifecycleState::Active
            && let Err(e) = self.transition(LifecycleState::Retired)
        {
            tracing::debug!(generation = %self.tag, error = %e, "retire skipped");
        }
    }
}

/// Keeps a generation's store set alive and counted for one request.
#[derive(Debug)]
pub struct InFlight {
    generation: Arc<Generation>,
}

impl InFlight {
    pub fn generation(&self) -> &Arc<Generation> {
        &self.generation
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.generation.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.generation.retire_if_idle();
        }
    }
}

/// Result of an install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub generation: String,
    /// `Active` when the install auto-activated, otherwise `Waiting`.
    pub state: LifecycleState,
    pub precache: PrecacheReport,
}

/// What a control message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The waiting generation with this tag is now active.
    Activated(String),
    NothingWaiting,
    /// Number of runtime entries removed.
    RuntimeCleared(u64),
    /// Unrecognized message shape.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationStatus {
    pub tag: String,
    pub state: LifecycleState,
    pub static_store: String,
    pub runtime_store: String,
    pub in_flight: usize,
}

impl From<&Generation> for GenerationStatus {
    fn from(generation: &Generation) -> Self {
        Self {
            tag: generation.tag.clone(),
            state: generation.state(),
            static_store: generation.names.static_name.clone(),
            runtime_store: generation.names.runtime_name.clone(),
            in_flight: generation.in_flight(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleStatus {
    pub active: Option<GenerationStatus>,
    pub waiting: Option<GenerationStatus>,
    /// Every store name currently in the storage namespace.
    pub store_names: Vec<String>,
}

/// Drives generations through the lifecycle and owns the active one.
pub struct LifecycleController {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    scope: Scope,
    manifest: PrecacheManifest,
    store_prefix: String,
    phase: Mutex<()>,
    active: RwLock<Option<Arc<Generation>>>,
    waiting: RwLock<Option<Arc<Generation>>>,
}

impl LifecycleController {
    pub fn new(
        storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, scope: Scope, manifest: PrecacheManifest,
        store_prefix: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            fetcher,
            scope,
            manifest,
            store_prefix: store_prefix.into(),
            phase: Mutex::new(()),
            active: RwLock::new(None),
            waiting: RwLock::new(None),
        }
    }

    pub async fn active(&self) -> Option<Arc<Generation>> {
        self.active.read().await.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<Generation>> {
        self.waiting.read().await.clone()
    }

    /// Pin the active generation for one request. `None` when nothing is active.
    pub async fn begin_request(&self) -> Option<InFlight> {
        let active = self.active.read().await;
        active.as_ref().map(|generation| generation.begin_request())
    }

    /// Install generation `tag`: open its stores, precache the manifest, and
    /// park it as waiting. Activates immediately when nothing is active.
    pub async fn install(&self, tag: &str) -> Result<InstallReport, Error> {
        let tag = tag.trim();
        if tag.is_empty() || tag.chars().any(char::is_whitespace) {
            return Err(Error::InvalidInput(format!("invalid generation tag {tag:?}")));
        }

        let _phase = self.phase.lock().await;

        if let Some(active) = self.active().await
            && active.tag == tag
        {
            return Err(Error::InvalidInput(format!("generation {tag} is already active")));
        }

        let names = StoreNames::for_generation(&self.store_prefix, tag);
        let stores = StoreSet::open(self.storage.as_ref(), &names).await?;
        let generation = Generation::new(tag.to_string(), names, stores);
        tracing::info!(generation = tag, entries = self.manifest.len(), "installing");

        let report = match precache(
            &self.manifest,
            &self.scope,
            self.fetcher.as_ref(),
            generation.stores.static_store.as_ref(),
        )
        .await
        {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(generation = tag, error = %e, "install failed");
                generation.transition(LifecycleState::Retired)?;
                return Err(e);
            }
        };

        generation.transition(LifecycleState::Waiting)?;

        let replaced = self.waiting.write().await.replace(generation.clone());
        if let Some(previous) = replaced {
            tracing::info!(generation = %previous.tag, by = tag, "waiting generation replaced");
            previous.transition(LifecycleState::Retired)?;
        }

        if self.active.read().await.is_none() {
            self.activate_waiting().await?;
        }

        Ok(InstallReport { generation: tag.to_string(), state: generation.state(), precache: report })
    }

    /// Activate the waiting generation now. Returns its tag, or `None` when
    /// nothing is waiting.
    pub async fn skip_waiting(&self) -> Result<Option<String>, Error> {
        let _phase = self.phase.lock().await;
        let activated = self.activate_waiting().await?;
        Ok(activated.map(|g| g.tag.clone()))
    }

    /// Caller holds `phase`.
    async fn activate_waiting(&self) -> Result<Option<Arc<Generation>>, Error> {
        let Some(next) = self.waiting.write().await.take() else {
            tracing::debug!("no waiting generation to activate");
            return Ok(None);
        };

        next.transition(LifecycleState::Activating)?;
        self.collect_garbage(&next.names).await;

        let previous = self.active.write().await.replace(next.clone());
        next.transition(LifecycleState::Active)?;

        if let Some(previous) = previous {
            tracing::info!(
                generation = %previous.tag,
                in_flight = previous.in_flight(),
                "generation superseded"
            );
            previous.supersede();
        }

        Ok(Some(next))
    }

    /// Delete every store outside `keep`. Failures are logged, not fatal.
    async fn collect_garbage(&self, keep: &StoreNames) -> Vec<String> {
        let names = match self.storage.names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate stores");
                return Vec::new();
            }
        };

        let mut deleted = Vec::new();
        for name in names.into_iter().filter(|n| !keep.is_current(n)) {
            match self.storage.delete(&name).await {
                Ok(_) => deleted.push(name),
                Err(e) => tracing::warn!(store = %name, error = %e, "could not delete stale store"),
            }
        }

        if !deleted.is_empty() {
            tracing::info!(deleted = ?deleted, "stale stores removed");
        }
        deleted
    }

    /// Remove every entry of the active runtime store. The static store is untouched.
    pub async fn clear_runtime(&self) -> Result<u64, Error> {
        let active = self.active().await.ok_or(Error::NoActiveGeneration)?;
        let removed = active.stores.runtime_store.clear().await?;
        tracing::info!(generation = %active.tag, removed, "runtime store cleared");
        Ok(removed)
    }

    pub async fn handle_message(&self, message: ControlMessage) -> Result<MessageOutcome, Error> {
        tracing::debug!(?message, "control message");
        match message {
            ControlMessage::SkipWaiting => Ok(match self.skip_waiting().await? {
                Some(tag) => MessageOutcome::Activated(tag),
                None => MessageOutcome::NothingWaiting,
            }),
            ControlMessage::ClearRuntimeCache => self.clear_runtime().await.map(MessageOutcome::RuntimeCleared),
        }
    }

    pub async fn status(&self) -> Result<LifecycleStatus, Error> {
        Ok(LifecycleStatus {
            active: self.active().await.map(|g| GenerationStatus::from(g.as_ref())),
            waiting: self.waiting().await.map(|g| GenerationStatus::from(g.as_ref())),
            store_names: self.storage.names().await?,
        })
    }
}
