//! MCP tool parameters.
//!
//! Every tool takes the same [`AnalysisParams`]: the buffer, the cursor and
//! the per-request engine settings. Tool results are JSON text holding the
//! action output, or `null` when there is nothing to show.
//!
//! # Available Tools
//!
//! - `goto` - definition locations as `[path, line, column]`
//! - `usages` - usage locations as `[path, line, column]`
//! - `docstring` - full docstring of the name at the cursor
//! - `signature` - one-line calltip of the name at the cursor
//! - `autocomplete` - `[display, insert]` completion pairs
//! - `funcargs` - call-argument snippet for the enclosing call

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::engine::{DEFAULT_ENCODING, SessionRequest};
use crate::facade::FuncargsMode;

/// Input shared by all analysis tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisParams {
    /// Full buffer text.
    #[schemars(description = "Full text of the Python buffer")]
    pub source: String,
    /// Cursor line (1-indexed).
    #[schemars(description = "Cursor line (1-indexed)")]
    pub line: u32,
    /// Cursor column (0-indexed).
    #[schemars(description = "Cursor column (0-indexed, in characters)")]
    pub column: u32,
    /// Path of the buffer on disk.
    #[serde(default)]
    #[schemars(description = "Absolute path of the buffer, if it is saved")]
    pub file_path: Option<String>,
    /// Encoding the buffer was read with.
    #[serde(default = "default_encoding")]
    #[schemars(description = "Buffer encoding (default: utf-8)")]
    pub encoding: String,
    /// Module search path override.
    #[serde(default)]
    #[schemars(description = "Extra module search paths for this request")]
    pub sys_path: Option<Vec<String>>,
    /// Call-argument completion mode override.
    #[serde(default)]
    #[schemars(description = "Call-argument completion: disabled, basic or all")]
    pub funcargs: Option<FuncargsMode>,
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

impl AnalysisParams {
    /// Converts the tool input into a session request.
    pub fn to_request(&self) -> SessionRequest {
        let mut request = SessionRequest::new(self.source.clone(), self.line, self.column)
            .with_encoding(self.encoding.clone());
        if let Some(path) = &self.file_path {
            request = request.with_path(path);
        }
        if let Some(sys_path) = &self.sys_path {
            request = request.with_sys_path(sys_path.iter().map(PathBuf::from).collect());
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_params_defaults() {
        let json = r#"{"source": "import os\nos.", "line": 2, "column": 3}"#;
        let params: AnalysisParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.encoding, "utf-8");
        assert!(params.file_path.is_none());
        assert!(params.funcargs.is_none());

        let request = params.to_request();
        assert_eq!(request.line, 2);
        assert_eq!(request.column, 3);
        assert!(request.path.is_none());
        assert!(request.sys_path.is_none());
    }

    #[test]
    fn test_analysis_params_full() {
        let json = r#"{
            "source": "x",
            "line": 1,
            "column": 1,
            "filePath": "/project/app.py",
            "encoding": "latin-1",
            "sysPath": ["/project/vendor"],
            "funcargs": "all"
        }"#;
        let params: AnalysisParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.funcargs, Some(FuncargsMode::All));

        let request = params.to_request();
        assert_eq!(request.path, Some(PathBuf::from("/project/app.py")));
        assert_eq!(request.encoding, "latin-1");
        assert_eq!(
            request.sys_path,
            Some(vec![PathBuf::from("/project/vendor")])
        );
    }

    #[test]
    fn test_analysis_params_serialization() {
        let params = AnalysisParams {
            source: "x".to_string(),
            line: 1,
            column: 0,
            file_path: Some("/path/to/file.py".to_string()),
            encoding: default_encoding(),
            sys_path: None,
            funcargs: None,
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("filePath"));
        assert!(json.contains("/path/to/file.py"));
    }
}
