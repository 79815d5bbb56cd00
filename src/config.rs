//! Configuration helper for MCP clients.
//!
//! Creates or updates `.mcp.json` in the project root with a pyfacade
//! server entry.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::facade::FuncargsMode;

/// Name of the MCP client configuration file.
pub const CONFIG_FILE: &str = ".mcp.json";

/// Key of the pyfacade entry under `mcpServers`.
const SERVER_KEY: &str = "pyfacade";

/// Builds the `mcpServers.pyfacade` entry.
pub fn server_entry(funcargs: FuncargsMode) -> Value {
    let mut args = vec!["--workspace".to_string(), ".".to_string()];
    if funcargs != FuncargsMode::Disabled {
        let mode = serde_json::to_value(funcargs)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        args.extend(["--funcargs".to_string(), mode]);
    }
    json!({
        "command": "pyfacade",
        "args": args,
    })
}

/// Adds pyfacade to the MCP configuration at `config_file`, creating the
/// file if needed.
///
/// ## Errors
/// Returns an error if:
/// - File I/O fails
/// - The existing file contains invalid JSON
/// - pyfacade is already configured
pub fn configure(config_file: &Path, funcargs: FuncargsMode) -> Result<()> {
    let existing: Value = if config_file.exists() {
        let content = fs::read_to_string(config_file)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "failed to parse {} - invalid JSON: {e}",
                config_file.display()
            ))
        })?
    } else {
        json!({})
    };

    let mut config = match existing {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let servers = config
        .entry("mcpServers")
        .or_insert_with(|| json!({}));
    if !servers.is_object() {
        *servers = json!({});
    }
    let Some(servers) = servers.as_object_mut() else {
        return Err(Error::Config("mcpServers is not an object".to_string()));
    };

    if servers.contains_key(SERVER_KEY) {
        return Err(Error::Config(format!(
            "pyfacade is already configured in {}\n\n\
            To reconfigure, first remove the existing entry, then run:\n  \
            pyfacade config",
            config_file.display()
        )));
    }
    servers.insert(SERVER_KEY.to_string(), server_entry(funcargs));

    // Write atomically (temp file + rename)
    let temp_file = config_file.with_extension("tmp");
    let json_str = serde_json::to_string_pretty(&Value::Object(config))
        .map_err(|e| Error::Config(format!("failed to serialize JSON: {e}")))?;
    fs::write(&temp_file, json_str)?;
    fs::rename(&temp_file, config_file)?;

    println!("\n{}", "=".repeat(60));
    println!("✓ Updated {}", config_file.display());
    println!("{}", "=".repeat(60));
    println!("\nNext steps:");
    println!("  1. Restart your MCP client if it's running");
    println!("  2. pyfacade will start automatically");
    println!("\nNote: pyfacade needs jedi-language-server on PATH");
    println!("      (pip install jedi-language-server).\n");

    Ok(())
}
