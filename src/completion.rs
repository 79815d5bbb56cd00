//! Shaping engine records into editor completion entries.
//!
//! Editors render a completion as a `display` label (name, a tab, then a
//! right-aligned type hint) and insert the `insert` text. Call-argument
//! entries use snippet syntax where `${k:text}` is the k-th tab stop
//! pre-filled with `text`.

use serde::{Deserialize, Serialize};

use crate::engine::{CallSignature, Completion, ParamKind, Parameter};

/// Type tag carried by call-argument completion labels.
pub const PARAM_TAG: &str = "\tparam";

/// A completion entry as the editor consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "(String, String)", from = "(String, String)")]
pub struct CompletionPair {
    /// Label shown in the completion popup.
    pub display: String,
    /// Text inserted when the entry is accepted.
    pub insert: String,
}

impl CompletionPair {
    /// Creates a completion entry.
    pub fn new(display: impl Into<String>, insert: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            insert: insert.into(),
        }
    }

    /// Returns `true` when the label carries the call-argument tag.
    pub fn is_param(&self) -> bool {
        self.display.ends_with(PARAM_TAG)
    }
}

impl From<CompletionPair> for (String, String) {
    fn from(pair: CompletionPair) -> Self {
        (pair.display, pair.insert)
    }
}

impl From<(String, String)> for CompletionPair {
    fn from((display, insert): (String, String)) -> Self {
        Self { display, insert }
    }
}

/// A call parameter reduced to its name and optional default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallParameter {
    /// Parameter name.
    pub name: String,
    /// Declared default value, if any and if requested.
    pub default: Option<String>,
}

impl CallParameter {
    /// Creates a call parameter.
    pub fn new(name: impl Into<String>, default: Option<impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            default: default.map(Into::into),
        }
    }
}

/// Formats a regular completion as `name\ttype` / `name`.
pub fn format_completion(item: &Completion) -> CompletionPair {
    CompletionPair {
        display: format!("{}\t{}", item.name, item.kind),
        insert: item.name.clone(),
    }
}

/// Lists the parameters of a call signature that the editor should offer.
///
/// The receiver `self`, the `...` placeholder, unnamed markers and variadic
/// parameters are skipped. Default values are reported only when
/// `include_keywords` is set; otherwise defaulted parameters come back bare.
pub fn extract_callable_parameters(
    signature: Option<&CallSignature>,
    include_keywords: bool,
) -> Vec<CallParameter> {
    let Some(signature) = signature else {
        return Vec::new();
    };

    signature
        .params
        .iter()
        .filter(|param| !is_skipped(param))
        .map(|param| {
            let default = default_value(param).filter(|_| include_keywords);
            tracing::trace!(
                name = %param.name,
                kind = ?param.kind,
                default = ?default,
                "call parameter"
            );
            CallParameter {
                name: param.name.clone(),
                default: default.map(str::to_string),
            }
        })
        .collect()
}

/// Builds snippet completions for call arguments.
///
/// Entry `i` inserts `${i+1:name}`, or `name=${i+1:value}` when the
/// parameter has a default and `include_values` is set.
pub fn call_argument_snippets(
    parameters: &[CallParameter],
    include_values: bool,
) -> Vec<CompletionPair> {
    parameters
        .iter()
        .enumerate()
        .map(|(index, param)| {
            let stop = index + 1;
            let insert = match &param.default {
                Some(value) if include_values => format!("{}=${{{stop}:{value}}}", param.name),
                _ => format!("${{{stop}:{}}}", param.name),
            };
            CompletionPair {
                display: format!("{}{PARAM_TAG}", param.name),
                insert,
            }
        })
        .collect()
}

fn is_skipped(param: &Parameter) -> bool {
    if param.name.is_empty() || param.name == "self" || param.name == "..." {
        return true;
    }
    match param.kind {
        ParamKind::Unknown => declaration(param).contains('*'),
        kind => kind.is_variadic(),
    }
}

fn declaration(param: &Parameter) -> &str {
    param
        .description
        .strip_prefix("param ")
        .unwrap_or(&param.description)
}

fn default_value(param: &Parameter) -> Option<&str> {
    declaration(param)
        .split_once('=')
        .map(|(_, value)| value.trim_start())
}
