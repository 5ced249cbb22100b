//! Offline cache engine: request routing, fetch strategies and the
//! generation lifecycle, on top of the stores in `stowaway-core`.
//!
//! ```text
//! Request -> RequestClassifier -> Route
//!              CacheFirst          static store, then network
//!              NetworkThenCache    network, then runtime store
//!              NavigationFallback  network, then page / shell / root
//!              PassThrough         network only
//! ```

pub mod classify;
pub mod engine;
pub mod lifecycle;
pub mod precache;
pub mod strategy;
pub mod writes;

#[cfg(test)]
mod test_support;

pub use classify::{RequestClassifier, Route};
pub use engine::{CacheEngine, EngineOptions, LifecycleEvent, LifecycleOutcome, Served};
pub use lifecycle::{
    Generation, GenerationStatus, InstallReport, LifecycleController, LifecycleState, LifecycleStatus, MessageOutcome,
};
pub use precache::{PrecacheFailure, PrecacheManifest, PrecacheReport};
pub use strategy::ResponseSource;
pub use writes::WriteTracker;
