//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mcp-offline server.

pub mod cache;
pub mod control;
pub mod fetch;
pub mod status;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stowaway_core::{Error, ResponseSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

/// A response snapshot as returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub headers: Vec<HeaderPair>,
    pub content_type: Option<String>,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
    /// Body length in bytes.
    pub body_bytes: usize,
    /// ISO8601 timestamp of the network fetch that produced the body.
    pub fetched_at: String,
}

impl From<&ResponseSnapshot> for ResponseView {
    fn from(response: &ResponseSnapshot) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status,
            headers: response
                .headers
                .iter()
                .map(|(name, value)| HeaderPair { name: name.clone(), value: value.clone() })
                .collect(),
            content_type: response.content_type().map(str::to_string),
            body: std::str::from_utf8(&response.body).ok().map(str::to_string),
            body_bytes: response.body.len(),
            fetched_at: response.fetched_at.clone(),
        }
    }
}

/// Serialize a tool output as the single text content of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rmcp::model::CallToolResult;
    use stowaway_client::Fetcher;
    use stowaway_core::{Error, MemoryStorage, Request, ResponseSnapshot, Scope};
    use stowaway_engine::{CacheEngine, EngineOptions, LifecycleEvent, PrecacheManifest};

    pub const SCOPE: &str = "https://app.example.com/";

    #[derive(Default)]
    pub struct StubOrigin {
        pages: Mutex<HashMap<String, (u16, &'static str)>>,
        offline: AtomicBool,
    }

    impl StubOrigin {
        pub fn serve(&self, url: &str, status: u16, body: &'static str) {
            self.pages.lock().unwrap().insert(url.to_string(), (status, body));
        }

        pub fn go_offline(&self) {
            self.offline.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Fetcher for StubOrigin {
        async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::Network(format!("{}: offline", request.url)));
            }
            let (status, body) = self
                .pages
                .lock()
                .unwrap()
                .get(request.url.as_str())
                .copied()
                .unwrap_or((404, ""));
            Ok(ResponseSnapshot::new(request.url.clone(), status, body).with_header("content-type", "text/html"))
        }
    }

    /// An engine over memory stores with generation `v1` installed.
    pub async fn installed_engine() -> (Arc<CacheEngine>, Arc<StubOrigin>) {
        let origin = Arc::new(StubOrigin::default());
        origin.serve(SCOPE, 200, "<html>root</html>");
        origin.serve(&format!("{SCOPE}index.html"), 200, "<html>shell</html>");
        origin.serve(&format!("{SCOPE}api/items"), 200, "[]");

        let options = EngineOptions::new(
            Scope::parse(SCOPE).unwrap(),
            PrecacheManifest::new(["./", "./index.html"]).unwrap(),
        );
        let engine = CacheEngine::new(options, Arc::new(MemoryStorage::new()), origin.clone()).unwrap();
        engine.handle_lifecycle(LifecycleEvent::Install("v1".into())).await.unwrap();
        (Arc::new(engine), origin)
    }

    pub fn text(result: &CallToolResult) -> String {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content")
            .to_string()
    }

    pub fn json(result: &CallToolResult) -> serde_json::Value {
        serde_json::from_str(&text(result)).unwrap()
    }
}
