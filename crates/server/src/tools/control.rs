//! offline_control tool implementation.
//!
//! Delivers a raw control message to the lifecycle controller.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stowaway_engine::{CacheEngine, MessageOutcome};

use super::json_result;

/// Input parameters for the offline_control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineControlParams {
    /// Message object, e.g. `{"type": "SKIP_WAITING"}` or `{"type": "CLEAR_RUNTIME_CACHE"}`.
    pub message: serde_json::Value,
}

/// Output structure for the offline_control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineControlOutput {
    /// One of "activated", "nothing_waiting", "runtime_cleared", "ignored".
    pub outcome: String,
    /// Newly active generation, for "activated".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
    /// Entries removed, for "runtime_cleared".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<u64>,
}

impl From<MessageOutcome> for OfflineControlOutput {
    fn from(outcome: MessageOutcome) -> Self {
        let (name, generation, removed) = match outcome {
            MessageOutcome::Activated(tag) => ("activated", Some(tag), None),
            MessageOutcome::NothingWaiting => ("nothing_waiting", None, None),
            MessageOutcome::RuntimeCleared(n) => ("runtime_cleared", None, Some(n)),
            MessageOutcome::Ignored => ("ignored", None, None),
        };
        Self { outcome: name.to_string(), generation, removed }
    }
}

/// Implementation of the offline_control tool.
pub async fn control_impl(engine: &CacheEngine, params: OfflineControlParams) -> Result<CallToolResult, McpError> {
    let outcome = engine.handle_raw_message(&params.message).await?;
    json_result(&OfflineControlOutput::from(outcome))
}
