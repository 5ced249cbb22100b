//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the engine.
use std::sync::Arc;

use crate::tools::{
    cache::{CacheGetParams, get_impl},
    control::{OfflineControlParams, control_impl},
    fetch::{OfflineFetchParams, fetch_impl},
    status::{OfflineStatusParams, status_impl},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use stowaway_engine::CacheEngine;

/// The main MCP server handler for mcp-offline.
#[derive(Clone)]
pub struct OfflineServer {
    tool_router: ToolRouter<Self>,
    engine: Arc<CacheEngine>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OfflineServer {
    /// Create a new server handler around an engine.
    pub fn new(engine: Arc<CacheEngine>) -> Self {
        Self { tool_router: Self::tool_router(), engine }
    }

    /// Serve a request through the offline engine.
    #[tool(
        description = "Request a URL through the offline cache engine. Returns status, headers, body, and whether it came from the network or the cache."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    #[tool(
        description = "Send a control message, {\"type\": \"SKIP_WAITING\"} or {\"type\": \"CLEAR_RUNTIME_CACHE\"}. Unknown messages are ignored."
    )]
    async fn offline_control(&self, params: Parameters<OfflineControlParams>) -> Result<CallToolResult, McpError> {
        control_impl(&self.engine, params.0).await
    }

    #[tool(description = "Show the active and waiting generations and the stores they own.")]
    async fn offline_status(&self, params: Parameters<OfflineStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.engine, params.0).await
    }

    /// Look up a cached response without touching the network.
    #[tool(description = "Look up the cached GET response for a URL in the active static or runtime store.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.engine, params.0).await
    }
}

impl ServerHandler for OfflineServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-offline".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
