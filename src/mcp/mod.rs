//! MCP (Model Context Protocol) server module.
//!
//! This module exposes the analysis actions as MCP tools over stdio.
//!
//! # Architecture
//!
//! The MCP module is organized into:
//! - `tools`: the shared tool parameters
//! - `server`: the [`Pyfacade`] tool router and server handler
//!
//! # Usage
//!
//! ```ignore
//! use pyfacade::mcp::Pyfacade;
//! use rmcp::{ServiceExt, transport::stdio};
//!
//! let server = Pyfacade::new(workspace, engine, FuncargsMode::Disabled);
//! server.serve(stdio()).await?.waiting().await?;
//! ```

pub mod server;
pub mod tools;

pub use server::Pyfacade;
pub use tools::AnalysisParams;
