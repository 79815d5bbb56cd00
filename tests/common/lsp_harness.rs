use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pyfacade::lsp::LspEngine;
use pyfacade::lsp::client::LspClient;
use pyfacade::lsp::initialization_options;

/// Helper to find the jedi-language-server executable
pub fn find_language_server() -> String {
    if let Ok(path) = std::env::var("JEDI_LANGUAGE_SERVER") {
        return path;
    }
    "jedi-language-server".to_string()
}

/// Returns whether the language server can be launched.
pub fn language_server_available() -> bool {
    std::process::Command::new(find_language_server())
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Spawns a new LSP client with the given workspace directory
/// ## Panics
pub async fn spawn_lsp(workspace: &Path) -> LspClient {
    let (init_timeout, request_timeout) = if std::env::var("CI").is_ok() {
        (Duration::from_secs(120), Duration::from_secs(60))
    } else {
        (Duration::from_secs(60), Duration::from_secs(30))
    };
    LspClient::builder()
        .server_command(find_language_server())
        .workspace_root(workspace.to_path_buf())
        .initialization_options(initialization_options(None, &[]))
        .init_timeout(init_timeout)
        .request_timeout(request_timeout)
        .build()
        .await
        .expect("Failed to start LSP client")
}

/// Spawns a client and wraps it in an engine rooted at `workspace`.
/// ## Panics
pub async fn spawn_engine(workspace: &Path) -> Arc<LspEngine> {
    let client = spawn_lsp(workspace).await;
    Arc::new(LspEngine::new(Arc::new(client), workspace))
}
