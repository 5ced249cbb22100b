//! Request-keyed response stores and the namespace that holds them.
//!
//! A [`CacheStorage`] is a set of named [`KeyValueStore`]s. Two backends ship
//! with the crate:
//!
//! - [`MemoryStorage`]: process-local maps behind tokio `RwLock`s
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, versioned migrations
//!
//! Stores are named after their role and generation (see [`StoreNames`]).

pub mod connection;
pub mod entries;
pub mod key;
pub mod memory;
pub mod migrations;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;
use crate::response::ResponseSnapshot;

pub use connection::CacheDb;
pub use entries::SqliteStore;
pub use key::{RequestKey, compute_key_hash};
pub use memory::{MemoryStorage, MemoryStore};

/// A named store of response snapshots keyed by request.
#[async_trait]
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Exact-key lookup. A miss is `Ok(None)`.
    async fn get(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error>;

    /// Insert or overwrite the entry for `key`.
    async fn put(&self, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error>;

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error>;

    /// Request keys currently held, in no particular order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Remove every entry. Returns the number removed.
    async fn clear(&self) -> Result<u64, Error>;
}

/// The namespace of stores: open, enumerate, delete.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store by name, creating it if needed.
    async fn open(&self, name: &str) -> Result<Arc<dyn KeyValueStore>, Error>;

    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Delete a store and all of its entries.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    async fn names(&self) -> Result<Vec<String>, Error>;
}

/// Logical role of a store within a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreRole {
    Static,
    Runtime,
}

impl StoreRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreRole::Static => "static",
            StoreRole::Runtime => "runtime",
        }
    }
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store names of one generation: `<prefix>-static-<tag>` and `<prefix>-runtime-<tag>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    pub static_name: String,
    pub runtime_name: String,
}

impl StoreNames {
    pub fn for_generation(prefix: &str, generation: &str) -> Self {
        Self {
            static_name: format!("{prefix}-{}-{generation}", StoreRole::Static),
            runtime_name: format!("{prefix}-{}-{generation}", StoreRole::Runtime),
        }
    }

    pub fn get(&self, role: StoreRole) -> &str {
        match role {
            StoreRole::Static => &self.static_name,
            StoreRole::Runtime => &self.runtime_name,
        }
    }

    /// Whether `name` is one of this generation's two stores.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_name || name == self.runtime_name
    }
}

/// Borrowed handles to the two stores of a generation.
#[derive(Debug, Clone)]
pub struct StoreSet {
    pub static_store: Arc<dyn KeyValueStore>,
    pub runtime_store: Arc<dyn KeyValueStore>,
}

impl StoreSet {
    pub async fn open(storage: &dyn CacheStorage, names: &StoreNames) -> Result<Self, Error> {
        Ok(Self {
            static_store: storage.open(&names.static_name).await?,
            runtime_store: storage.open(&names.runtime_name).await?,
        })
    }

    pub fn get(&self, role: StoreRole) -> &Arc<dyn KeyValueStore> {
        match role {
            StoreRole::Static => &self.static_store,
            StoreRole::Runtime => &self.runtime_store,
        }
    }
}
