//! LSP client implementation.
//!
//! This module provides the client that spawns a Python language server
//! and talks to it over stdio using the Language Server Protocol.
//!
//! # Example
//!
//! ```ignore
//! use pyfacade::lsp::client::LspClient;
//!
//! let client = LspClient::builder()
//!     .server_command("jedi-language-server")
//!     .workspace_root("/path/to/project")
//!     .build()
//!     .await?;
//!
//! client.sync_document(&uri, "import os\nos.").await?;
//! let items = client.completion(&uri, position).await?;
//! client.shutdown().await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_lsp::concurrency::ConcurrencyLayer;
use async_lsp::panic::CatchUnwindLayer;
use async_lsp::router::Router;
use async_lsp::tracing::TracingLayer;
use async_lsp::{LanguageServer, ServerSocket};
use lsp_types::{
    ClientCapabilities, ClientInfo, CompletionClientCapabilities, CompletionItem,
    CompletionItemCapability, CompletionParams, CompletionResponse,
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidOpenTextDocumentParams,
    DynamicRegistrationClientCapabilities, GotoCapability, GotoDefinitionParams,
    GotoDefinitionResponse, Hover, HoverClientCapabilities, HoverParams, InitializeParams,
    InitializedParams, Location, MarkupKind, ParameterInformationSettings, PartialResultParams,
    Position, ReferenceContext, ReferenceParams, SignatureHelp, SignatureHelpClientCapabilities,
    SignatureHelpParams, SignatureInformationSettings, TextDocumentClientCapabilities,
    TextDocumentContentChangeEvent, TextDocumentIdentifier, TextDocumentItem,
    TextDocumentPositionParams, TextDocumentSyncClientCapabilities, TraceValue, Url,
    VersionedTextDocumentIdentifier, WindowClientCapabilities, WorkDoneProgressParams,
    WorkspaceClientCapabilities, WorkspaceFolder, notification, request,
};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tracing::{debug, trace};

use crate::error::LspError;

use super::LspResult;

/// Language id sent with every synchronized buffer.
const LANGUAGE_ID: &str = "python";

/// State for handling LSP client notifications.
#[derive(Debug, Clone)]
struct ClientState {}

impl ClientState {
    fn new() -> Self {
        Self {}
    }
}

/// Configuration for building an LSP client.
#[derive(Debug, Clone)]
pub struct LspClientConfig {
    /// Command to start the language server.
    pub server_command: String,
    /// Arguments to pass to the language server.
    pub server_args: Vec<String>,
    /// Root directory of the workspace.
    pub workspace_root: PathBuf,
    /// Server-specific `initializationOptions`.
    pub initialization_options: Option<serde_json::Value>,
    /// Timeout for initialization.
    pub init_timeout: Duration,
    /// Timeout for requests.
    pub request_timeout: Duration,
}

impl Default for LspClientConfig {
    fn default() -> Self {
        Self {
            server_command: "jedi-language-server".to_string(),
            server_args: Vec::new(),
            workspace_root: PathBuf::from("."),
            initialization_options: None,
            init_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Builder for constructing an LSP client.
#[derive(Debug, Default)]
pub struct LspClientBuilder {
    config: LspClientConfig,
}

impl LspClientBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server command.
    #[must_use]
    pub fn server_command(mut self, command: impl Into<String>) -> Self {
        self.config.server_command = command.into();
        self
    }

    /// Sets the server arguments.
    #[must_use]
    pub fn server_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.server_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the workspace root.
    #[must_use]
    pub fn workspace_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.workspace_root = path.into();
        self
    }

    /// Sets the `initializationOptions` sent with `initialize`.
    #[must_use]
    pub fn initialization_options(mut self, options: serde_json::Value) -> Self {
        self.config.initialization_options = Some(options);
        self
    }

    /// Sets the initialization timeout.
    #[must_use]
    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.config.init_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Builds the LSP client.
    ///
    /// This will spawn the language server process and perform initialization.
    /// ## Errors
    #[allow(clippy::too_many_lines)]
    pub async fn build(self) -> LspResult<LspClient> {
        let workspace_root = self.config.workspace_root.canonicalize().map_err(|e| {
            LspError::InitializationFailed(format!("failed to canonicalize workspace root: {e}"))
        })?;

        let mut cmd = async_process::Command::new(&self.config.server_command);
        cmd.args(&self.config.server_args)
            .current_dir(&workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            LspError::ServerStartFailed(format!(
                "failed to spawn '{}': {}",
                self.config.server_command, e
            ))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LspError::ServerStartFailed("failed to capture stdout".to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LspError::ServerStartFailed("failed to capture stdin".to_string()))?;

        let (mainloop, server) = async_lsp::MainLoop::new_client(|_client| {
            let mut router = Router::new(ClientState::new());

            router.notification::<notification::Progress>(|_this, _prog| ControlFlow::Continue(()));

            router.notification::<notification::PublishDiagnostics>(|_this, diag| {
                trace!(uri = %diag.uri, count = diag.diagnostics.len(), "diagnostics published");
                ControlFlow::Continue(())
            });

            router.notification::<notification::ShowMessage>(|_this, msg| {
                debug!(kind = ?msg.typ, "language server: {}", msg.message);
                ControlFlow::Continue(())
            });

            router.notification::<notification::LogMessage>(|_this, msg| {
                trace!(kind = ?msg.typ, "language server: {}", msg.message);
                ControlFlow::Continue(())
            });

            router.unhandled_notification(|_this, notif| {
                trace!(method = %notif.method, "ignoring notification");
                ControlFlow::Continue(())
            });

            ServiceBuilder::new()
                .layer(TracingLayer::default())
                .layer(CatchUnwindLayer::default())
                .layer(ConcurrencyLayer::default())
                .service(router)
        });

        let mainloop_handle = tokio::spawn(async move {
            mainloop.run_buffered(stdout, stdin).await.ok();
        });

        let workspace_uri = Url::from_file_path(&workspace_root).map_err(|()| {
            LspError::InitializationFailed(format!(
                "invalid workspace root path: {}",
                workspace_root.display()
            ))
        })?;

        let init_params = InitializeParams {
            process_id: Some(std::process::id()),
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: workspace_uri,
                name: workspace_root
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("workspace")
                    .to_string(),
            }]),
            initialization_options: self.config.initialization_options.clone(),
            capabilities: ClientCapabilities {
                workspace: Some(WorkspaceClientCapabilities {
                    did_change_configuration: Some(DynamicRegistrationClientCapabilities {
                        dynamic_registration: Some(false),
                    }),
                    ..Default::default()
                }),
                text_document: Some(TextDocumentClientCapabilities {
                    synchronization: Some(TextDocumentSyncClientCapabilities {
                        dynamic_registration: Some(false),
                        will_save: Some(false),
                        will_save_wait_until: Some(false),
                        did_save: Some(false),
                    }),
                    completion: Some(CompletionClientCapabilities {
                        dynamic_registration: Some(false),
                        completion_item: Some(CompletionItemCapability {
                            snippet_support: Some(false),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    hover: Some(HoverClientCapabilities {
                        dynamic_registration: Some(false),
                        content_format: Some(vec![MarkupKind::Markdown, MarkupKind::PlainText]),
                    }),
                    signature_help: Some(SignatureHelpClientCapabilities {
                        dynamic_registration: Some(false),
                        signature_information: Some(SignatureInformationSettings {
                            documentation_format: Some(vec![MarkupKind::PlainText]),
                            parameter_information: Some(ParameterInformationSettings {
                                label_offset_support: Some(true),
                            }),
                            active_parameter_support: Some(true),
                        }),
                        context_support: Some(false),
                    }),
                    definition: Some(GotoCapability {
                        dynamic_registration: Some(false),
                        link_support: Some(false),
                    }),
                    type_definition: Some(GotoCapability {
                        dynamic_registration: Some(false),
                        link_support: Some(false),
                    }),
                    references: Some(DynamicRegistrationClientCapabilities {
                        dynamic_registration: Some(false),
                    }),
                    ..Default::default()
                }),
                window: Some(WindowClientCapabilities {
                    work_done_progress: Some(false),
                    ..Default::default()
                }),
                ..Default::default()
            },
            trace: Some(TraceValue::Off),
            client_info: Some(ClientInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            locale: None,
            work_done_progress_params: WorkDoneProgressParams::default(),
            ..Default::default()
        };

        let server = Arc::new(Mutex::new(server));

        let init_result = tokio::time::timeout(
            self.config.init_timeout,
            server.lock().await.initialize(init_params),
        )
        .await
        .map_err(|_| LspError::Timeout(self.config.init_timeout))?
        .map_err(|e| LspError::InitializationFailed(format!("initialize request failed: {e:?}")))?;

        debug!(
            server = ?init_result.server_info.as_ref().map(|info| &info.name),
            "language server initialized"
        );

        server
            .lock()
            .await
            .initialized(InitializedParams {})
            .map_err(|e| {
                LspError::InitializationFailed(format!("initialized notification failed: {e:?}"))
            })?;

        Ok(LspClient {
            config: self.config,
            server,
            _mainloop_handle: mainloop_handle,
            open_documents: Arc::new(Mutex::new(HashMap::new())),
            _child_process: Arc::new(Mutex::new(child)),
        })
    }
}

/// LSP client for communicating with a Python language server.
///
/// The client owns the server process, keeps the buffers it has sent in
/// sync, and bounds every request by the configured timeout.
#[derive(Debug)]
pub struct LspClient {
    /// Configuration used to create this client.
    config: LspClientConfig,
    /// The language server handle for making requests.
    server: Arc<Mutex<ServerSocket>>,
    /// Handle to the mainloop task.
    _mainloop_handle: tokio::task::JoinHandle<()>,
    /// Open documents and their last sent version.
    open_documents: Arc<Mutex<HashMap<Url, i32>>>,
    /// The language server process handle (kept alive to prevent kill-on-drop).
    _child_process: Arc<Mutex<async_process::Child>>,
}

impl LspClient {
    /// Creates a new builder for constructing an LSP client.
    pub fn builder() -> LspClientBuilder {
        LspClientBuilder::new()
    }

    /// Returns the configuration the client was built with.
    pub fn config(&self) -> &LspClientConfig {
        &self.config
    }

    /// Shuts down the language server gracefully.
    /// ## Errors
    pub async fn shutdown(&self) -> LspResult<()> {
        let fut = self.server.lock().await.shutdown(());
        self.timed("shutdown", fut).await?;

        self.server
            .lock()
            .await
            .exit(())
            .map_err(|e| LspError::RequestFailed(format!("exit notification failed: {e:?}")))?;

        Ok(())
    }

    /// Sends the full text of a buffer to the server.
    ///
    /// The first call for a URI sends `textDocument/didOpen`; later calls
    /// send `textDocument/didChange` with a bumped version.
    /// ## Errors
    pub async fn sync_document(&self, uri: &Url, text: &str) -> LspResult<()> {
        let mut open_documents = self.open_documents.lock().await;

        if let Some(version) = open_documents.get_mut(uri) {
            *version += 1;
            let params = DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: uri.clone(),
                    version: *version,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: text.to_string(),
                }],
            };
            trace!(%uri, version = *version, "didChange");
            return self.server.lock().await.did_change(params).map_err(|e| {
                LspError::RequestFailed(format!("didChange notification failed: {e:?}"))
            });
        }

        let params = DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: LANGUAGE_ID.to_string(),
                version: 0,
                text: text.to_string(),
            },
        };
        trace!(%uri, "didOpen");
        self.server
            .lock()
            .await
            .did_open(params)
            .map_err(|e| LspError::RequestFailed(format!("didOpen notification failed: {e:?}")))?;

        open_documents.insert(uri.clone(), 0);
        Ok(())
    }

    /// Pushes new server settings with `workspace/didChangeConfiguration`.
    /// ## Errors
    pub async fn did_change_configuration(&self, settings: serde_json::Value) -> LspResult<()> {
        self.server
            .lock()
            .await
            .did_change_configuration(DidChangeConfigurationParams { settings })
            .map_err(|e| {
                LspError::RequestFailed(format!("didChangeConfiguration notification failed: {e:?}"))
            })
    }

    // Analysis requests

    /// Completion candidates at `position`.
    /// ## Errors
    pub async fn completion(&self, uri: &Url, position: Position) -> LspResult<Vec<CompletionItem>> {
        let params = CompletionParams {
            text_document_position: position_params(uri, position),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: None,
        };

        let fut = self.server.lock().await.completion(params);
        let result = self.timed("completion", fut).await?;

        Ok(match result {
            Some(CompletionResponse::Array(items)) => items,
            Some(CompletionResponse::List(list)) => list.items,
            None => Vec::new(),
        })
    }

    /// Assignment targets of the name at `position` (`textDocument/definition`).
    /// ## Errors
    pub async fn goto_definition(&self, uri: &Url, position: Position) -> LspResult<Vec<Location>> {
        let params = GotoDefinitionParams {
            text_document_position_params: position_params(uri, position),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        };

        let fut = self.server.lock().await.definition(params);
        let result = self.timed("goto_definition", fut).await?;
        Ok(result.map(goto_response_to_locations).unwrap_or_default())
    }

    /// Inferred definitions of the name at `position`
    /// (`textDocument/typeDefinition`).
    /// ## Errors
    pub async fn type_definition(&self, uri: &Url, position: Position) -> LspResult<Vec<Location>> {
        let params = request::GotoTypeDefinitionParams {
            text_document_position_params: position_params(uri, position),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        };

        let fut = self.server.lock().await.type_definition(params);
        let result = self.timed("goto_type_definition", fut).await?;
        Ok(result.map(goto_response_to_locations).unwrap_or_default())
    }

    /// Finds all references to the symbol at `position`.
    /// ## Errors
    pub async fn find_references(
        &self,
        uri: &Url,
        position: Position,
        include_declaration: bool,
    ) -> LspResult<Vec<Location>> {
        let params = ReferenceParams {
            text_document_position: position_params(uri, position),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: ReferenceContext {
                include_declaration,
            },
        };

        let fut = self.server.lock().await.references(params);
        Ok(self.timed("references", fut).await?.unwrap_or_default())
    }

    /// Hover information for the symbol at `position`.
    /// ## Errors
    pub async fn hover(&self, uri: &Url, position: Position) -> LspResult<Option<Hover>> {
        let params = HoverParams {
            text_document_position_params: position_params(uri, position),
            work_done_progress_params: WorkDoneProgressParams::default(),
        };

        let fut = self.server.lock().await.hover(params);
        self.timed("hover", fut).await
    }

    /// Signature help for the call enclosing `position`.
    /// ## Errors
    pub async fn signature_help(
        &self,
        uri: &Url,
        position: Position,
    ) -> LspResult<Option<SignatureHelp>> {
        let params = SignatureHelpParams {
            context: None,
            text_document_position_params: position_params(uri, position),
            work_done_progress_params: WorkDoneProgressParams::default(),
        };

        let fut = self.server.lock().await.signature_help(params);
        self.timed("signature_help", fut).await
    }

    /// Awaits a request future under the request timeout.
    async fn timed<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, async_lsp::Error>>,
    ) -> LspResult<T> {
        tokio::time::timeout(self.config.request_timeout, fut)
            .await
            .map_err(|_| LspError::Timeout(self.config.request_timeout))?
            .map_err(|e| LspError::RequestFailed(format!("{what} failed: {e:?}")))
    }
}

fn position_params(uri: &Url, position: Position) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: TextDocumentIdentifier { uri: uri.clone() },
        position,
    }
}

/// Converts `GotoDefinitionResponse` to a list of locations.
fn goto_response_to_locations(response: GotoDefinitionResponse) -> Vec<Location> {
    match response {
        GotoDefinitionResponse::Scalar(loc) => vec![loc],
        GotoDefinitionResponse::Array(locs) => locs,
        GotoDefinitionResponse::Link(links) => links
            .into_iter()
            .map(|link| Location {
                uri: link.target_uri,
                range: link.target_selection_range,
            })
            .collect(),
    }
}
