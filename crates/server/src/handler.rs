//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheMatchParams, match_impl, status_impl};
use crate::tools::site_fetch::{SiteFetchParams, fetch_impl};

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
use waystation_client::fetch::Url;
use waystation_client::{FetchClient, Registration};
use waystation_core::CacheDb;

/// State shared by every tool call.
pub struct AppState {
    pub registration: Registration<CacheDb, FetchClient>,
    pub storage: Arc<CacheDb>,
    pub origin: Url,
}

/// The main MCP server handler for waystation.
#[derive(Clone)]
pub struct WaystationServer {
    tool_router: ToolRouter<Self>,
    state: Arc<AppState>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WaystationServer {
    /// Create a new server handler.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { tool_router: Self::tool_router(), state }
    }

    /// Fetch a page of the site through the offline cache.
    ///
    /// GET requests try the network first and fall back to the active cache
    /// generation, then to the offline page. Other methods pass straight through.
    #[tool(
        description = "Fetch a site URL network-first, falling back to the offline cache. Returns status, source (network, passthrough, cache, offline_fallback), headers and body."
    )]
    async fn site_fetch(&self, params: Parameters<SiteFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state.registration, &self.state.origin, params.0).await
    }

    /// Report the active cache generation and its entries.
    #[tool(description = "Show the active cache version, lifecycle phase, stored generations and cached requests.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state.registration, self.state.storage.as_ref(), &self.state.origin).await
    }

    /// Look a URL up in the active cache generation without using the network.
    #[tool(description = "Look up a URL in the active cache generation (query string ignored). Fails with CACHE_MISS when absent.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(&self.state.registration, &self.state.origin, params.0).await
    }
}

impl ServerHandler for WaystationServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "waystation".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use waystation_client::FetchConfig;

    async fn server() -> WaystationServer {
        let storage = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let fetcher = Arc::new(FetchClient::new(FetchConfig::default()).unwrap());
        let state = AppState {
            registration: Registration::new(fetcher),
            storage,
            origin: Url::parse("https://club.example.org").unwrap(),
        };
        WaystationServer::new(Arc::new(state))
    }

    #[tokio::test]
    async fn test_lists_all_tools() {
        let server = server().await;
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["cache_match", "cache_status", "site_fetch"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let info = server().await.get_info();
        assert_eq!(info.server_info.name, "waystation");
        assert!(info.capabilities.tools.is_some());
    }
}
