//! Analysis engine backed by a Python language server.
//!
//! | engine operation   | LSP request                         |
//! |--------------------|-------------------------------------|
//! | `completions`      | `textDocument/completion`           |
//! | `goto_assignments` | `textDocument/definition`           |
//! | `goto_definitions` | `textDocument/typeDefinition`, `textDocument/hover` |
//! | `usages`           | `textDocument/references`           |
//! | `call_signatures`  | `textDocument/signatureHelp`        |
//!
//! Sessions are handed out one at a time: a session holds the engine's
//! turn until it is dropped, so the buffer the server sees is always the
//! buffer the session was opened for.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lsp_types::{Location, Position, Url};
use serde_json::{Value, json};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, trace};

use crate::engine::{
    AnalysisEngine, AnalysisSession, CallSignature, Completion, Definition, DefinitionType,
    EngineResult, SessionRequest, validate_encoding,
};

use super::LspResult;
use super::client::LspClient;
use super::types::{
    completion_from_item, definition_type_for_line, from_lsp_position, hover_to_docstring,
    identifier_at, is_builtin_uri, line_text, path_to_url, signature_from_information,
    to_lsp_position,
};

/// File name used for buffers that have no path on disk.
const SCRATCH_FILE: &str = ".pyfacade-buffer.py";

/// Builds jedi-language-server `initializationOptions` for an interpreter
/// and extra search paths.
pub fn initialization_options(environment: Option<&Path>, extra_paths: &[PathBuf]) -> Value {
    let mut workspace = serde_json::Map::new();
    workspace.insert("extraPaths".to_string(), json!(extra_paths));
    if let Some(environment) = environment {
        workspace.insert("environmentPath".to_string(), json!(environment));
    }
    json!({ "workspace": workspace })
}

/// Search path a session runs with: its own when given, otherwise the one
/// the engine was started with.
pub fn session_sys_path<'a>(
    requested: Option<&'a [PathBuf]>,
    startup: &'a [PathBuf],
) -> &'a [PathBuf] {
    requested.unwrap_or(startup)
}

/// [`AnalysisEngine`] over an [`LspClient`].
#[derive(Debug)]
pub struct LspEngine {
    client: Arc<LspClient>,
    scratch_path: PathBuf,
    environment: Option<PathBuf>,
    startup_sys_path: Vec<PathBuf>,
    sys_path: Mutex<Vec<PathBuf>>,
    turn: Arc<Mutex<()>>,
}

impl LspEngine {
    /// Creates an engine. Unsaved buffers are addressed as a scratch file
    /// under `workspace_root`.
    pub fn new(client: Arc<LspClient>, workspace_root: impl AsRef<Path>) -> Self {
        Self {
            client,
            scratch_path: workspace_root.as_ref().join(SCRATCH_FILE),
            environment: None,
            startup_sys_path: Vec::new(),
            sys_path: Mutex::new(Vec::new()),
            turn: Arc::new(Mutex::new(())),
        }
    }

    /// Records the interpreter the server was started with.
    #[must_use]
    pub fn with_environment(mut self, environment: Option<PathBuf>) -> Self {
        self.environment = environment;
        self
    }

    /// Records the search path the server was started with.
    #[must_use]
    pub fn with_sys_path(mut self, sys_path: Vec<PathBuf>) -> Self {
        self.sys_path = Mutex::new(sys_path.clone());
        self.startup_sys_path = sys_path;
        self
    }

    /// The underlying client.
    pub fn client(&self) -> &Arc<LspClient> {
        &self.client
    }

    async fn apply_sys_path(&self, requested: &[PathBuf]) -> LspResult<()> {
        let mut current = self.sys_path.lock().await;
        if current.as_slice() == requested {
            return Ok(());
        }
        debug!(paths = ?requested, "updating language server search path");
        let settings = initialization_options(self.environment.as_deref(), requested);
        self.client.did_change_configuration(settings).await?;
        *current = requested.to_vec();
        Ok(())
    }
}

#[async_trait]
impl AnalysisEngine for LspEngine {
    type Session = LspSession;

    async fn open(&self, request: &SessionRequest) -> EngineResult<LspSession> {
        validate_encoding(&request.encoding)?;
        let position = to_lsp_position(&request.source, request.line, request.column)?;
        let path = request.path.as_deref().unwrap_or(self.scratch_path.as_path());
        let uri = path_to_url(path)?;

        let turn = Arc::clone(&self.turn).lock_owned().await;

        let sys_path = session_sys_path(request.sys_path.as_deref(), &self.startup_sys_path);
        self.apply_sys_path(sys_path).await?;
        self.client.sync_document(&uri, &request.source).await?;

        debug!(
            %uri,
            line = request.line,
            column = request.column,
            "analysis session opened"
        );

        Ok(LspSession {
            client: Arc::clone(&self.client),
            uri,
            position,
            source: request.source.clone(),
            _turn: turn,
        })
    }
}

/// One analysis request against the language server.
#[derive(Debug)]
pub struct LspSession {
    client: Arc<LspClient>,
    uri: Url,
    position: Position,
    source: String,
    _turn: OwnedMutexGuard<()>,
}

impl LspSession {
    async fn definitions(&self, locations: Vec<Location>, docstring: &str) -> Vec<Definition> {
        let lookups = locations
            .into_iter()
            .map(|location| self.definition_at(location, docstring));
        futures::future::join_all(lookups).await
    }

    async fn definition_at(&self, location: Location, docstring: &str) -> Definition {
        let in_builtin_module = is_builtin_uri(&location.uri);
        let module_path = location.uri.to_file_path().ok();
        let text = if in_builtin_module {
            None
        } else {
            self.line_of(&location.uri, module_path.as_deref(), location.range.start.line + 1)
                .await
        };

        let (line, column) = from_lsp_position(location.range.start, text.as_deref());
        let (name, kind) = match text.as_deref() {
            Some(text) => (identifier_at(text, column), definition_type_for_line(text)),
            None => (String::new(), DefinitionType::Other),
        };

        Definition {
            name,
            kind,
            module_path,
            line,
            column,
            docstring: docstring.to_string(),
            in_builtin_module,
        }
    }

    async fn line_of(&self, uri: &Url, path: Option<&Path>, line: u32) -> Option<String> {
        if *uri == self.uri {
            return line_text(&self.source, line).map(str::to_string);
        }
        let contents = match tokio::fs::read_to_string(path?).await {
            Ok(contents) => contents,
            Err(e) => {
                trace!(%uri, error = %e, "definition source unreadable");
                return None;
            }
        };
        line_text(&contents, line).map(str::to_string)
    }
}

#[async_trait]
impl AnalysisSession for LspSession {
    async fn completions(&self) -> EngineResult<Vec<Completion>> {
        let items = self.client.completion(&self.uri, self.position).await?;
        Ok(items.iter().map(completion_from_item).collect())
    }

    async fn goto_assignments(&self) -> EngineResult<Vec<Definition>> {
        let locations = self.client.goto_definition(&self.uri, self.position).await?;
        Ok(self.definitions(locations, "").await)
    }

    async fn goto_definitions(&self) -> EngineResult<Vec<Definition>> {
        let locations = self.client.type_definition(&self.uri, self.position).await?;
        if locations.is_empty() {
            return Ok(Vec::new());
        }
        let docstring = self
            .client
            .hover(&self.uri, self.position)
            .await?
            .map(|hover| hover_to_docstring(hover.contents))
            .unwrap_or_default();
        Ok(self.definitions(locations, &docstring).await)
    }

    async fn usages(&self) -> EngineResult<Vec<Definition>> {
        let locations = self
            .client
            .find_references(&self.uri, self.position, true)
            .await?;
        Ok(self.definitions(locations, "").await)
    }

    async fn call_signatures(&self) -> EngineResult<Vec<CallSignature>> {
        let Some(help) = self.client.signature_help(&self.uri, self.position).await? else {
            return Ok(Vec::new());
        };
        let mut signatures: Vec<CallSignature> = help
            .signatures
            .iter()
            .map(signature_from_information)
            .collect();
        let active = help.active_signature.unwrap_or(0) as usize;
        if active > 0 && active < signatures.len() {
            let current = signatures.remove(active);
            signatures.insert(0, current);
        }
        Ok(signatures)
    }
}
