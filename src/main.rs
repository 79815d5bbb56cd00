//! pyfacade - Entry Point
//!
//! Sets up logging, parses arguments, starts the language server and then
//! either serves MCP over stdio or runs a single query.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use tokio::io::AsyncReadExt;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pyfacade::config::{CONFIG_FILE, configure};
use pyfacade::engine::{SessionRequest, decode_source};
use pyfacade::facade::{AnalysisFacade, FacadeOptions, FuncargsMode};
use pyfacade::lsp::client::LspClient;
use pyfacade::lsp::{LspEngine, initialization_options};
use pyfacade::mcp::Pyfacade;

/// Editor-facing Python analysis over a language server.
#[derive(Parser, Debug)]
#[command(name = "pyfacade")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    server: ServerArgs,

    /// Log level: trace, debug, info, warn, error.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the analysis tools over MCP stdio (default).
    Serve,
    /// Run one action and print its JSON result.
    Query(QueryArgs),
    /// Add pyfacade to .mcp.json in the current directory.
    Config,
}

/// Language server and engine settings.
#[derive(clap::Args, Debug)]
struct ServerArgs {
    /// Workspace root directory.
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Language server command to use.
    #[arg(short, long, default_value = "jedi-language-server")]
    language_server: String,

    /// Arguments to pass to the language server.
    #[arg(long)]
    language_server_args: Vec<String>,

    /// Python interpreter or virtualenv the analysis runs against.
    #[arg(long)]
    environment: Option<PathBuf>,

    /// Extra module search path (repeatable).
    #[arg(long = "sys-path")]
    sys_path: Vec<PathBuf>,

    /// Call-argument completion mode.
    #[arg(long, value_enum, default_value_t = FuncargsMode::Disabled)]
    funcargs: FuncargsMode,

    /// Timeout for individual language server requests, in seconds.
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    /// Action to run: goto, usages, docstring, signature, autocomplete, funcargs.
    action: String,

    /// Python file to analyse.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Read the buffer from stdin instead of --file.
    #[arg(long)]
    stdin: bool,

    /// Cursor line (1-indexed).
    #[arg(long)]
    line: u32,

    /// Cursor column (0-indexed).
    #[arg(long)]
    column: u32,

    /// Buffer encoding.
    #[arg(long, default_value = "utf-8")]
    encoding: String,
}

impl Args {
    /// Parses the log level string into a tracing Level.
    fn parse_log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => anyhow::bail!("invalid log level: {}", other),
        }
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(level: Level) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "pyfacade={},tower={},async_lsp={}",
            level, level, level
        ))
    });

    // Logs go to stderr: stdout carries MCP messages and query output
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    Ok(())
}

/// Starts the language server and wraps it in an engine.
async fn start_engine(args: &ServerArgs, workspace: &Path) -> Result<Arc<LspEngine>> {
    info!(
        workspace = %workspace.display(),
        language_server = %args.language_server,
        "starting language server"
    );

    let options = initialization_options(args.environment.as_deref(), &args.sys_path);
    let client = LspClient::builder()
        .server_command(&args.language_server)
        .server_args(args.language_server_args.clone())
        .workspace_root(workspace)
        .initialization_options(options)
        .request_timeout(Duration::from_secs(args.request_timeout_secs))
        .build()
        .await
        .context("failed to start LSP client")?;

    info!("LSP client initialized successfully");

    let engine = LspEngine::new(Arc::new(client), workspace)
        .with_environment(args.environment.clone())
        .with_sys_path(args.sys_path.clone());
    Ok(Arc::new(engine))
}

async fn serve(args: &ServerArgs, workspace: PathBuf) -> Result<()> {
    let engine = start_engine(args, &workspace).await?;
    let server = Pyfacade::new(workspace, Arc::clone(&engine), args.funcargs);

    info!("starting MCP server with stdio transport");
    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;

    info!("MCP server started, waiting for messages");
    service.waiting().await?;

    engine.client().shutdown().await?;
    info!("MCP server shut down gracefully");
    Ok(())
}

async fn read_buffer(query: &QueryArgs) -> Result<Vec<u8>> {
    if query.stdin {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .context("failed to read buffer from stdin")?;
        return Ok(bytes);
    }
    let Some(file) = &query.file else {
        anyhow::bail!("either --file or --stdin is required");
    };
    tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))
}

async fn query(args: &ServerArgs, workspace: PathBuf, query: QueryArgs) -> Result<()> {
    let bytes = read_buffer(&query).await?;
    let source = decode_source(bytes, &query.encoding)?;

    let mut request =
        SessionRequest::new(source, query.line, query.column).with_encoding(&query.encoding);
    if let Some(file) = &query.file {
        request = request.with_path(file);
    }

    let engine = start_engine(args, &workspace).await?;
    let options = FacadeOptions {
        funcargs: args.funcargs,
    };
    let facade = AnalysisFacade::open(engine.as_ref(), options, &request)
        .await
        .context("failed to open analysis session")?;
    let output = facade.dispatch_named(&query.action).await;

    println!("{}", serde_json::to_string(&output)?);

    engine.client().shutdown().await?;
    Ok(())
}

/// Main entry point.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.parse_log_level()?;
    init_tracing(log_level)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Config => configure(Path::new(CONFIG_FILE), args.server.funcargs)
            .context("failed to configure MCP client"),
        Command::Serve => serve(&args.server, canonical_workspace(&args.server)?).await,
        Command::Query(query_args) => {
            query(&args.server, canonical_workspace(&args.server)?, query_args).await
        }
    }
}

fn canonical_workspace(args: &ServerArgs) -> Result<PathBuf> {
    args.workspace.canonicalize().with_context(|| {
        format!(
            "failed to canonicalize workspace path: {}",
            args.workspace.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_log_level() {
        let args = Args::parse_from(["pyfacade", "--log-level", "debug"]);
        assert_eq!(args.parse_log_level().unwrap(), Level::DEBUG);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_args_invalid_log_level() {
        let args = Args::parse_from(["pyfacade", "--log-level", "loud"]);
        assert!(args.parse_log_level().is_err());
    }

    #[test]
    fn test_args_server_defaults() {
        let args = Args::parse_from(["pyfacade"]);
        assert_eq!(args.server.language_server, "jedi-language-server");
        assert_eq!(args.server.funcargs, FuncargsMode::Disabled);
        assert!(args.server.sys_path.is_empty());
    }

    #[test]
    fn test_args_query() {
        let args = Args::parse_from([
            "pyfacade",
            "--funcargs",
            "all",
            "--sys-path",
            "/vendor",
            "query",
            "goto",
            "--file",
            "app.py",
            "--line",
            "3",
            "--column",
            "4",
        ]);
        assert_eq!(args.server.funcargs, FuncargsMode::All);
        assert_eq!(args.server.sys_path, vec![PathBuf::from("/vendor")]);
        let Some(Command::Query(query)) = args.command else {
            panic!("expected query subcommand");
        };
        assert_eq!(query.action, "goto");
        assert_eq!(query.line, 3);
        assert_eq!(query.column, 4);
        assert_eq!(query.encoding, "utf-8");
    }
}
