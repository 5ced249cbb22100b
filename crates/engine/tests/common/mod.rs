//! A scripted origin server and engine builders shared by the scenario tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use stowaway_client::Fetcher;
use stowaway_core::{CacheDb, CacheStorage, Error, MemoryStorage, Request, ResponseSnapshot, Scope};
use stowaway_engine::{CacheEngine, EngineOptions, PrecacheManifest};

pub const SCOPE: &str = "https://app.example.com/";

/// Origin stand-in: fixed bodies per URL, 404 otherwise, and a network switch.
/// Fetches of held URLs park until [`Origin::release_held`].
#[derive(Debug, Default)]
pub struct Origin {
    pages: Mutex<HashMap<String, (u16, String)>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    per_url: Mutex<HashMap<String, usize>>,
    held: Mutex<HashSet<String>>,
    parked: AtomicUsize,
    parked_changed: Notify,
    released: AtomicBool,
    release: Notify,
}

impl Origin {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, status: u16, body: &str) {
        self.pages.lock().unwrap().insert(url.to_string(), (status, body.to_string()));
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.per_url.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn hold(&self, url: &str) {
        self.held.lock().unwrap().insert(url.to_string());
    }

    /// Wait until `count` fetches are parked on held URLs.
    pub async fn wait_parked(&self, count: usize) {
        loop {
            let changed = self.parked_changed.notified();
            if self.parked.load(Ordering::SeqCst) >= count {
                return;
            }
            changed.await;
        }
    }

    pub fn release_held(&self) {
        self.released.store(true, Ordering::SeqCst);
        self.release.notify_waiters();
    }
}

#[async_trait]
impl Fetcher for Origin {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.per_url.lock().unwrap().entry(request.url.to_string()).or_default() += 1;

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: network unreachable", request.url)));
        }

        let held = self.held.lock().unwrap().contains(request.url.as_str());
        if held {
            let released = self.release.notified();
            if !self.released.load(Ordering::SeqCst) {
                self.parked.fetch_add(1, Ordering::SeqCst);
                self.parked_changed.notify_waiters();
                released.await;
            }
        }

        let page = self.pages.lock().unwrap().get(request.url.as_str()).cloned();
        let (status, body) = page.unwrap_or((404, String::new()));
        Ok(ResponseSnapshot::new(request.url.clone(), status, body))
    }
}

/// Origin serving the default app shell, stylesheet and media API.
pub fn app_origin() -> Arc<Origin> {
    let origin = Origin::new();
    origin.serve(SCOPE, 200, "<html>root</html>");
    origin.serve(&format!("{SCOPE}index.html"), 200, "<html>shell</html>");
    origin.serve(&format!("{SCOPE}app.css"), 200, "body{}");
    origin.serve(&format!("{SCOPE}icon.svg"), 200, "<svg/>");
    origin.serve(&format!("{SCOPE}v1/media"), 200, r#"[{"id":1}]"#);
    origin
}

pub fn options(manifest: &[&str]) -> EngineOptions {
    EngineOptions::new(
        Scope::parse(SCOPE).unwrap(),
        PrecacheManifest::new(manifest.iter().copied()).unwrap(),
    )
}

pub async fn sqlite_storage() -> Arc<CacheDb> {
    Arc::new(CacheDb::open_in_memory().await.unwrap())
}

pub fn memory_storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

pub fn engine(storage: Arc<dyn CacheStorage>, origin: Arc<Origin>, manifest: &[&str]) -> CacheEngine {
    CacheEngine::new(options(manifest), storage, origin).unwrap()
}
