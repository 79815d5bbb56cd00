//! Error types for the pyfacade server.
//!
//! Errors are organized by subsystem: the LSP transport, the analysis
//! engine seam, the facade actions, and the MCP surface. Construction-time
//! errors surface to callers; action errors are swallowed at the facade's
//! dispatch boundary after being logged.

use thiserror::Error;

/// Errors related to LSP client operations.
#[derive(Debug, Error)]
pub enum LspError {
    /// The language server process failed to start.
    #[error("failed to start language server: {0}")]
    ServerStartFailed(String),

    /// Failed to initialize the language server.
    #[error("language server initialization failed: {0}")]
    InitializationFailed(String),

    /// A request to the language server timed out.
    #[error("language server request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Failed to send a request to the language server.
    #[error("failed to send request to language server: {0}")]
    RequestFailed(String),

    /// Invalid position in document.
    #[error("invalid position: line {line}, column {column}")]
    InvalidPosition {
        /// The line number (1-based).
        line: u32,
        /// The column number (0-based).
        column: u32,
    },

    /// Document path could not be turned into a URI.
    #[error("document not found: {0}")]
    DocumentNotFound(String),
}

/// Errors raised while opening or querying an analysis session.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The buffer could not be decoded with the requested encoding.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// The buffer bytes are not valid in the requested encoding.
    #[error("source is not valid {encoding}: {reason}")]
    InvalidSource {
        /// Encoding the caller asked for.
        encoding: String,
        /// Decoder message.
        reason: String,
    },

    /// The underlying language server failed.
    #[error(transparent)]
    Lsp(#[from] LspError),
}

/// Errors raised by individual facade actions.
///
/// These never reach the editor: `AnalysisFacade::dispatch` logs them and
/// returns no result.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// The action name does not match any handler.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// The analysis engine failed while serving the action.
    #[error("analysis engine failed: {0}")]
    Engine(#[from] EngineError),
}

impl From<LspError> for FacadeError {
    fn from(err: LspError) -> Self {
        Self::Engine(EngineError::Lsp(err))
    }
}

/// Errors related to tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The analysis session could not be opened.
    #[error("failed to open analysis session: {0}")]
    SessionFailed(#[from] EngineError),

    /// The action result could not be serialized.
    #[error("failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A unified error type for the entire application.
#[derive(Debug, Error)]
pub enum Error {
    /// LSP-related error.
    #[error("LSP error: {0}")]
    Lsp(#[from] LspError),

    /// Analysis engine error.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Facade action error.
    #[error("facade error: {0}")]
    Facade(#[from] FacadeError),

    /// Tool-related error.
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for pyfacade operations.
pub type Result<T> = std::result::Result<T, Error>;
