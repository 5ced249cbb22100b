//! Out-of-band control messages sent by the host application.

use serde::{Deserialize, Serialize};

/// Control command consumed by the lifecycle controller.
///
/// Wire form: `{"type": "SKIP_WAITING"}` or `{"type": "CLEAR_RUNTIME_CACHE"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    ClearRuntimeCache,
}

impl ControlMessage {
    /// Parse a raw message. Unrecognized shapes yield `None`.
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
