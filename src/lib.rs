//! pyfacade
//!
//! A small facade between an editor and a Python analysis engine. The
//! editor hands over a buffer, a cursor and an action name; the facade
//! asks the engine and reshapes the answer into editor-ready values.
//!
//! # Overview
//!
//! This library provides:
//! - The analysis engine seam ([`engine::AnalysisEngine`])
//! - The action dispatcher ([`facade::AnalysisFacade`])
//! - Completion formatting and call-argument snippets ([`completion`])
//! - An engine backed by `jedi-language-server` ([`lsp::LspEngine`])
//! - An MCP server exposing the actions as tools ([`mcp::Pyfacade`])
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     stdio      ┌─────────────────┐
//! │     Editor /    │◄──────────────►│   MCP Server    │
//! │    MCP client   │    (MCP)       │   (pyfacade)    │
//! └─────────────────┘                └────────┬────────┘
//!                                             │
//!                                      ┌──────▼──────┐
//!                                      │   Facade    │
//!                                      └──────┬──────┘
//!                                             │ engine traits
//!                                      ┌──────▼──────┐
//!                                      │  LSP Client │
//!                                      └──────┬──────┘
//!                                             │ JSON-RPC
//!                                   ┌─────────▼─────────┐
//!                                   │     Language      │
//!                                   │      Server       │
//!                                   │(jedi-lang-server) │
//!                                   └───────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`error`] - Error types for the entire application
//! - [`engine`] - Engine and session traits plus the records they return
//! - [`completion`] - Completion pairs and call-argument extraction
//! - [`facade`] - Action dispatch and result shaping
//! - [`lsp`] - LSP client and the engine built on it
//! - [`mcp`] - MCP server implementation
//! - [`config`] - `.mcp.json` setup helper
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pyfacade::engine::SessionRequest;
//! use pyfacade::facade::{AnalysisFacade, FacadeOptions};
//! use pyfacade::lsp::{LspEngine, client::LspClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = LspClient::builder().workspace_root(".").build().await?;
//!     let engine = LspEngine::new(Arc::new(client), ".");
//!
//!     let request = SessionRequest::new("import os\nos.pa", 2, 5);
//!     let facade = AnalysisFacade::open(&engine, FacadeOptions::default(), &request).await?;
//!     println!("{:?}", facade.dispatch_named("autocomplete").await);
//!
//!     Ok(())
//! }
//! ```

// Enforce documentation and other quality attributes
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are too strict
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod facade;
pub mod lsp;
pub mod mcp;

// Re-export commonly used types at the crate root
pub use error::{Error, Result};
