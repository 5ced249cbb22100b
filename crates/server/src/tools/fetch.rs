//! offline_fetch tool implementation.
//!
//! Serves one request through the engine, exactly as an intercepted request
//! from the host application would be.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stowaway_core::{Error, Method, Request, RequestMode};
use stowaway_engine::CacheEngine;

use super::{ResponseView, json_result};

/// Input parameters for the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    /// The URL to request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Treat the request as a full-document navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Optional request body, forwarded for non-GET methods.
    #[serde(default)]
    pub body: Option<String>,
}

/// Output structure for the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchOutput {
    /// The URL requested, canonicalized.
    pub request_url: String,
    /// "network" or "cache".
    pub source: String,
    /// Strategy that served the request.
    pub route: String,
    /// Generation that served the request; absent for pass-through.
    pub generation: Option<String>,
    pub response: ResponseView,
}

/// Implementation of the offline_fetch tool.
pub async fn fetch_impl(engine: &CacheEngine, params: OfflineFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method = match params.method.as_deref() {
        Some(m) if !m.trim().is_empty() => m.parse::<Method>().unwrap_or_default(),
        _ => Method::Get,
    };

    let mut request = Request::new(method, &params.url).map_err(Error::from)?;
    if params.navigate {
        request = request.with_mode(RequestMode::Navigate);
    }
    if let Some(body) = params.body {
        request = request.with_body(body.into_bytes());
    }

    let served = engine.handle_request(&request).await?;

    let output = OfflineFetchOutput {
        request_url: request.url.to_string(),
        source: served.source.to_string(),
        route: served.route.to_string(),
        generation: served.generation,
        response: ResponseView::from(&served.response),
    };

    json_result(&output)
}
