//! cache_get tool implementation.
//!
//! Exact-key lookup of a URL in the active generation's static or runtime store.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stowaway_core::{Error, StoreRole};
use stowaway_engine::CacheEngine;

use crate::tools::{ResponseView, json_result};

/// Which store of the active generation to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CacheRole {
    Static,
    Runtime,
}

impl From<CacheRole> for StoreRole {
    fn from(role: CacheRole) -> Self {
        match role {
            CacheRole::Static => StoreRole::Static,
            CacheRole::Runtime => StoreRole::Runtime,
        }
    }
}

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL whose GET response to look up.
    pub url: String,
    /// "static" or "runtime".
    pub role: CacheRole,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub role: CacheRole,
    /// The cached response.
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(engine: &CacheEngine, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let response = engine
        .lookup(params.role.into(), &params.url)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("GET {} in {:?} store", params.url, params.role)))?;

    let output = CacheGetOutput { role: params.role, response: ResponseView::from(&response) };
    json_result(&output)
}
