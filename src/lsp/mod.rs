//! LSP (Language Server Protocol) backend.
//!
//! This module drives a Python language server (by default
//! `jedi-language-server`) and exposes it through the engine traits.
//!
//! # Architecture
//!
//! The LSP module is organized into:
//! - `client`: spawns the server and issues requests
//! - `types`: conversions between LSP types and engine records
//! - `engine`: [`LspEngine`] and [`LspSession`], the engine implementation
//!
//! # Usage
//!
//! ```ignore
//! use pyfacade::lsp::{LspEngine, client::LspClient};
//!
//! let client = LspClient::builder().workspace_root(".").build().await?;
//! let engine = LspEngine::new(Arc::new(client), ".");
//! let session = engine.open(&request).await?;
//! ```

pub mod client;
pub mod engine;
pub mod types;

use crate::error::LspError;

pub use engine::{LspEngine, LspSession, initialization_options};

/// Result type for LSP operations.
pub type LspResult<T> = std::result::Result<T, LspError>;
