//! In-memory store backend.
//!
//! Uses HashMaps behind tokio RwLocks for concurrent access. A handle
//! returned by [`MemoryStorage::open`] stays usable after its store is
//! deleted from the registry, but its contents are no longer reachable by
//! name.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheStorage, KeyValueStore, RequestKey};
use crate::Error;
use crate::response::ResponseSnapshot;

#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    entries: RwLock<HashMap<String, ResponseSnapshot>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entries: RwLock::new(HashMap::new()) }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        Ok(self.entries.read().await.get(key.as_str()).cloned())
    }

    async fn put(&self, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error> {
        self.entries
            .write()
            .await
            .insert(key.as_str().to_string(), response.clone());
        Ok(())
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        Ok(self.entries.write().await.remove(key.as_str()).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<u64, Error> {
        let mut entries = self.entries.write().await;
        let count = entries.len() as u64;
        entries.clear();
        Ok(count)
    }
}

/// Registry of named in-memory stores.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    stores: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn KeyValueStore>, Error> {
        {
            let stores = self.stores.read().await;
            if let Some(store) = stores.get(name) {
                let store: Arc<dyn KeyValueStore> = store.clone();
                return Ok(store);
            }
        }

        let mut stores = self.stores.write().await;
        let store: Arc<dyn KeyValueStore> = stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::new(name)))
            .clone();
        Ok(store)
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(self.stores.read().await.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        Ok(self.stores.write().await.remove(name).is_some())
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        let mut names: Vec<String> = self.stores.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
