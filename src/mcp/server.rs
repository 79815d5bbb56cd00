//! MCP server implementation for pyfacade.
//!
//! This module contains the `Pyfacade` struct that exposes the analysis
//! actions as MCP tools. Each tool call opens one facade over the shared
//! [`LspEngine`] and returns the action output as JSON text.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::wrapper::Parameters,
    model::{
        CallToolResult, Content, ErrorCode, Implementation, ProtocolVersion, ServerCapabilities,
        ServerInfo,
    },
    tool, tool_handler, tool_router,
};
use tracing::debug;

use crate::error::{EngineError, LspError, ToolError};
use crate::facade::{Action, ActionOutput, AnalysisFacade, FacadeOptions, FuncargsMode};
use crate::lsp::LspEngine;

use super::tools::AnalysisParams;

/// MCP server for Python buffer analysis.
#[derive(Clone)]
pub struct Pyfacade {
    /// Root directory of the analysed project.
    workspace_root: PathBuf,
    /// Engine shared by all tool calls.
    engine: Arc<LspEngine>,
    /// Call-argument mode used when a request does not override it.
    funcargs: FuncargsMode,
    tool_router: ToolRouter<Pyfacade>,
}

impl Pyfacade {
    /// Creates a new `Pyfacade` instance.
    ///
    /// # Arguments
    ///
    /// * `workspace_root` - Root directory of the analysed project.
    /// * `engine` - Engine the tools run against.
    /// * `funcargs` - Default call-argument completion mode.
    pub fn new(workspace_root: PathBuf, engine: Arc<LspEngine>, funcargs: FuncargsMode) -> Self {
        Self {
            workspace_root,
            engine,
            funcargs,
            tool_router: Self::tool_router(),
        }
    }

    /// Returns the workspace root path.
    pub fn workspace_root(&self) -> &PathBuf {
        &self.workspace_root
    }

    async fn run(
        &self,
        action: Action,
        params: AnalysisParams,
    ) -> Result<CallToolResult, McpError> {
        let request = params.to_request();
        let options = FacadeOptions {
            funcargs: params.funcargs.unwrap_or(self.funcargs),
        };
        debug!(%action, line = request.line, column = request.column, "tool call");

        let facade = AnalysisFacade::open(self.engine.as_ref(), options, &request)
            .await
            .map_err(session_error)?;
        render_output(facade.dispatch(action).await.as_ref())
    }
}

/// Maps a session construction failure to an MCP error. Bad positions and
/// encodings are the caller's fault.
fn session_error(err: EngineError) -> McpError {
    let code = match &err {
        EngineError::UnsupportedEncoding(_)
        | EngineError::InvalidSource { .. }
        | EngineError::Lsp(LspError::InvalidPosition { .. }) => ErrorCode::INVALID_PARAMS,
        EngineError::Lsp(_) => ErrorCode::INTERNAL_ERROR,
    };
    McpError::new(code, ToolError::SessionFailed(err).to_string(), None)
}

/// Serializes an action output; no output becomes `null`.
fn render_output(output: Option<&ActionOutput>) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string(&output).map_err(|e| {
        McpError::new(
            ErrorCode::INTERNAL_ERROR,
            ToolError::Serialization(e).to_string(),
            None,
        )
    })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_router]
impl Pyfacade {
    /// Definition locations of the name at the cursor.
    #[tool(
        description = "Find where the name at the cursor is defined. Follows imports to the imported definition. Returns [[path, line, column], ...] or null."
    )]
    pub async fn goto(
        &self,
        Parameters(params): Parameters<AnalysisParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Action::Goto, params).await
    }

    /// Usage locations of the name at the cursor.
    #[tool(
        description = "Find every usage of the name at the cursor, including its definition. Returns [[path, line, column], ...] or null."
    )]
    pub async fn usages(
        &self,
        Parameters(params): Parameters<AnalysisParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Action::Usages, params).await
    }

    /// Docstring of the name at the cursor.
    #[tool(description = "Get the full docstring of the name at the cursor, or null.")]
    pub async fn docstring(
        &self,
        Parameters(params): Parameters<AnalysisParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Action::Docstring, params).await
    }

    /// One-line calltip of the name at the cursor.
    #[tool(
        description = "Get a one-line signature of the name at the cursor, e.g. \"open(file, mode='r')\", or null."
    )]
    pub async fn signature(
        &self,
        Parameters(params): Parameters<AnalysisParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Action::Signature, params).await
    }

    /// Completions at the cursor.
    #[tool(
        description = "Complete the code at the cursor. Returns [[display, insert], ...]; call-argument snippets come first, tagged \"\\tparam\"."
    )]
    pub async fn autocomplete(
        &self,
        Parameters(params): Parameters<AnalysisParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Action::Autocomplete, params).await
    }

    /// Call-argument snippet for the enclosing call.
    #[tool(
        description = "Build a snippet of the arguments of the call around the cursor, e.g. \"${1:a}, ${2:b}\". With funcargs set to all, defaulted parameters carry their default value."
    )]
    pub async fn funcargs(
        &self,
        Parameters(params): Parameters<AnalysisParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Action::Funcargs, params).await
    }
}

#[tool_handler]
impl ServerHandler for Pyfacade {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "pyfacade".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Python code intelligence for an editor buffer. Pass the full buffer text with a \
                 1-indexed line and 0-indexed column; tools return JSON results or null."
                    .into(),
            ),
        }
    }
}
