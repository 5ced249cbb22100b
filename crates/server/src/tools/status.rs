//! offline_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stowaway_engine::{CacheEngine, GenerationStatus};

use super::json_result;

/// The offline_status tool takes no parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OfflineStatusParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationView {
    pub tag: String,
    pub state: String,
    pub static_store: String,
    pub runtime_store: String,
    pub in_flight: usize,
}

impl From<GenerationStatus> for GenerationView {
    fn from(status: GenerationStatus) -> Self {
        Self {
            tag: status.tag,
            state: status.state.to_string(),
            static_store: status.static_store,
            runtime_store: status.runtime_store,
            in_flight: status.in_flight,
        }
    }
}

/// Output structure for the offline_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineStatusOutput {
    /// Scope base URL.
    pub scope: String,
    pub active: Option<GenerationView>,
    pub waiting: Option<GenerationView>,
    /// Every store currently present in the storage backend.
    pub store_names: Vec<String>,
}

/// Implementation of the offline_status tool.
pub async fn status_impl(engine: &CacheEngine, _params: OfflineStatusParams) -> Result<CallToolResult, McpError> {
    let status = engine.status().await?;

    let output = OfflineStatusOutput {
        scope: engine.scope().base().to_string(),
        active: status.active.map(GenerationView::from),
        waiting: status.waiting.map(GenerationView::from),
        store_names: status.store_names,
    };

    json_result(&output)
}
