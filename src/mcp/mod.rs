//! MCP bridge: exposes command-tree leaves as tools.
//!
//! Startup: walk the tree -> ToolRegistry (schema.rs) -> BridgeServer.
//! Per call: translate.rs -> executor.rs -> paginate.rs -> CallToolResult.
//! `serve_stdio` runs the server on stdin/stdout until the client disconnects.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, ServiceExt};
use serde_json::json;
use tokio_util::sync::CancellationToken;

pub mod config;
pub mod executor;
pub mod paginate;
pub mod registry;
pub mod schema;
pub mod translate;

pub use config::{ExecMode, ServeConfig};
pub use executor::{CommandExecutor, InProcessExecutor, SubprocessExecutor};
pub use registry::ToolRegistry;

use crate::tree::CommandNode;

const INSTRUCTIONS: &str = "Each tool runs one labctl command. Pass positional arguments in `args` \
(in order) and flags in `flags` keyed by flag name with underscores instead of dashes. \
Output is paginated by characters: `limit` (default 50000) caps the size and `offset` picks \
the start; a negative offset counts from the end (e.g. -2000 for the last 2000 characters). \
`structuredContent.pagination` reports the totals and navigation hints when output is truncated.";

/// Tool server over a read-only registry.
#[derive(Clone)]
pub struct BridgeServer {
    registry: Arc<ToolRegistry>,
    executor: Arc<CommandExecutor>,
}

impl BridgeServer {
    pub fn new(registry: ToolRegistry, executor: CommandExecutor) -> Self {
        Self {
            registry: Arc::new(registry),
            executor: Arc::new(executor),
        }
    }

    /// Build registry and executor for `root` according to `config`.
    pub fn from_config(root: CommandNode, config: &ServeConfig) -> Result<Self> {
        let registry = ToolRegistry::build(&root, &config.prefix, &config.exclude);
        let executor = match config.mode {
            ExecMode::Subprocess => CommandExecutor::Subprocess(
                SubprocessExecutor::current_exe()
                    .context("Failed to resolve the running executable")?
                    .with_timeout(config.timeout),
            ),
            ExecMode::InProcess => CommandExecutor::InProcess(InProcessExecutor::new(Arc::new(root))),
        };
        Ok(Self::new(registry, executor))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one `tools/call`. Only an unknown tool name is a protocol error;
    /// command failures come back as `is_error` results carrying the output.
    pub async fn call(
        &self,
        name: &str,
        arguments: JsonObject,
        cancel: &CancellationToken,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.registry.get(name).ok_or_else(|| {
            tracing::warn!(tool = %name, "unknown tool requested");
            McpError::invalid_params(format!("Unknown tool: {name}"), None)
        })?;

        let translated = translate::translate(&arguments, &tool.flags);
        tracing::info!(
            tool = %name,
            argv = %shell_words::join(&translated.argv),
            "calling tool"
        );
        let result = self
            .executor
            .execute(&tool.path, &translated.argv, cancel)
            .await;
        let (slice, pagination) = paginate::paginate(&result.output, translated.config);
        if result.failed {
            tracing::info!(tool = %name, total_size = pagination.total_size, "tool call failed");
        }

        let content = vec![Content::text(slice)];
        let mut response = if result.failed {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        };
        response.structured_content = Some(json!({ "pagination": pagination }));
        Ok(response)
    }
}

impl ServerHandler for BridgeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.registry.to_mcp_tools(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = request.arguments.unwrap_or_default();
        self.call(&request.name, arguments, &context.ct).await
    }
}

/// Serve `server` on stdin/stdout until the peer disconnects.
pub async fn serve_stdio(server: BridgeServer) -> Result<()> {
    tracing::info!(tools = server.registry().len(), "starting MCP server on stdio");
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start MCP server on stdio")?;
    let reason = service.waiting().await.context("MCP server task failed")?;
    tracing::info!(?reason, "MCP server stopped");
    Ok(())
}
