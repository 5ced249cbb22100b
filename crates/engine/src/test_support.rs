//! In-process fetcher used by the engine's unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use stowaway_client::Fetcher;
use stowaway_core::{Error, Request, ResponseSnapshot};

#[derive(Debug, Clone)]
enum Scripted {
    Respond { status: u16, body: String, final_url: Option<String> },
    Fail,
}

/// Answers from a fixed URL table, counts calls and can be switched offline.
/// Unscripted URLs answer 404.
///
/// With the gate closed, the next fetch parks until [`ScriptedFetcher::open_gate`].
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Scripted>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    seen: Mutex<Vec<Request>>,
    gated: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(self, url: &str, entry: Scripted) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), entry);
        self
    }

    pub fn ok(self, url: &str, body: &str) -> Self {
        self.status_with_body(url, 200, body)
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.status_with_body(url, status, "")
    }

    pub fn status_with_body(self, url: &str, status: u16, body: &str) -> Self {
        self.script(url, Scripted::Respond { status, body: body.to_string(), final_url: None })
    }

    pub fn redirect(self, url: &str, final_url: &str, body: &str) -> Self {
        self.script(
            url,
            Scripted::Respond { status: 200, body: body.to_string(), final_url: Some(final_url.to_string()) },
        )
    }

    pub fn fail(self, url: &str) -> Self {
        self.script(url, Scripted::Fail)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }

    pub fn close_gate(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn open_gate(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    /// Resolves once a fetch is parked at the closed gate.
    pub async fn gate_entered(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }

        let entry = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        match entry {
            Some(Scripted::Respond { status, body, final_url }) => {
                let url = match final_url {
                    Some(u) => Url::parse(&u).unwrap(),
                    None => request.url.clone(),
                };
                Ok(ResponseSnapshot::new(url, status, body))
            }
            Some(Scripted::Fail) => Err(Error::Network(format!("{}: connection refused", request.url))),
            None => Ok(ResponseSnapshot::new(request.url.clone(), 404, "")),
        }
    }
}
