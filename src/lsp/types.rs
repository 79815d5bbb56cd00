//! Conversions between LSP types and the engine records.
//!
//! Editors address the cursor with a 1-based line and a 0-based column
//! counted in characters; LSP uses 0-based lines and UTF-16 code units.
//! Everything that crosses that boundary goes through this module.

use std::path::Path;

use lsp_types::{
    CompletionItem, CompletionItemKind, HoverContents, MarkedString, ParameterLabel, Position,
    SignatureInformation, Url,
};

use crate::engine::{CallSignature, Completion, DefinitionType, ParamKind, Parameter};
use crate::error::LspError;

use super::LspResult;

/// Converts a path to an LSP file:// URI.
///
/// The path does not have to exist: unsaved buffers still get a stable URI.
/// Existing paths are canonicalized so symlinks resolve the way the server
/// resolves them.
/// ## Errors
pub fn path_to_url(path: &Path) -> LspResult<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| {
                LspError::DocumentNotFound(format!("failed to get current directory: {e}"))
            })?
            .join(path)
    };

    let resolved = absolute.canonicalize().unwrap_or(absolute);

    Url::from_file_path(&resolved)
        .map_err(|()| LspError::DocumentNotFound(format!("invalid path: {}", resolved.display())))
}

/// Returns line `line` (1-based) of `source`, without its terminator.
pub fn line_text(source: &str, line: u32) -> Option<&str> {
    let index = usize::try_from(line.checked_sub(1)?).ok()?;
    source
        .split('\n')
        .nth(index)
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
}

/// Converts an editor cursor to an LSP position.
///
/// # Arguments
///
/// * `source` - buffer text
/// * `line` - 1-indexed line number
/// * `column` - 0-indexed column, in characters
///
/// # Errors
///
/// Returns error if the line does not exist or the column is past its end.
pub fn to_lsp_position(source: &str, line: u32, column: u32) -> LspResult<Position> {
    let invalid = || LspError::InvalidPosition { line, column };
    let text = line_text(source, line).ok_or_else(invalid)?;
    let column_chars = usize::try_from(column).map_err(|_| invalid())?;
    if column_chars > text.chars().count() {
        return Err(invalid());
    }
    let character: usize = text.chars().take(column_chars).map(char::len_utf16).sum();
    Ok(Position {
        line: line - 1,
        character: u32::try_from(character).map_err(|_| invalid())?,
    })
}

/// Converts an LSP position to a 1-based line and 0-based character column.
///
/// When the line text is known the UTF-16 offset is mapped back to
/// characters; otherwise the offset is used as-is.
pub fn from_lsp_position(position: Position, text: Option<&str>) -> (u32, u32) {
    let column = text.map_or(position.character, |text| {
        let mut units = 0u32;
        let mut chars = 0u32;
        for ch in text.chars() {
            if units >= position.character {
                break;
            }
            units += u32::try_from(ch.len_utf16()).unwrap_or(1);
            chars += 1;
        }
        chars
    });
    (position.line + 1, column)
}

/// Returns the identifier starting at character `column` of `text`.
pub fn identifier_at(text: &str, column: u32) -> String {
    text.chars()
        .skip(column as usize)
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Returns `true` when `text` is an `import` or `from ... import` line.
pub fn is_import_line(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with("import ") || trimmed.starts_with("from ")
}

/// Classifies a definition by the source line it sits on.
pub fn definition_type_for_line(text: &str) -> DefinitionType {
    let trimmed = text.trim_start();
    if is_import_line(trimmed) {
        DefinitionType::Import
    } else if trimmed.starts_with("def ") || trimmed.starts_with("async def ") {
        DefinitionType::Function
    } else if trimmed.starts_with("class ") {
        DefinitionType::Class
    } else if trimmed.contains('=') {
        DefinitionType::Statement
    } else {
        DefinitionType::Other
    }
}

/// Returns `true` for locations an editor cannot open as project sources:
/// non-file URIs and bundled typeshed stubs.
pub fn is_builtin_uri(uri: &Url) -> bool {
    if uri.scheme() != "file" {
        return true;
    }
    uri.path_segments()
        .is_some_and(|mut segments| segments.any(|s| s == "typeshed"))
}

/// Converts an LSP completion item into a completion record.
///
/// Keyword-argument completions arrive as `name=` and are classified as
/// `param`.
pub fn completion_from_item(item: &CompletionItem) -> Completion {
    if let Some(name) = item.label.strip_suffix('=') {
        return Completion::new(name, "param");
    }
    Completion::new(item.label.clone(), completion_kind_to_string(item.kind))
}

/// Converts an LSP completion kind to the engine's type name.
pub fn completion_kind_to_string(kind: Option<CompletionItemKind>) -> &'static str {
    let Some(kind) = kind else {
        return "statement";
    };
    match kind {
        CompletionItemKind::FUNCTION
        | CompletionItemKind::METHOD
        | CompletionItemKind::CONSTRUCTOR => "function",
        CompletionItemKind::CLASS
        | CompletionItemKind::INTERFACE
        | CompletionItemKind::STRUCT
        | CompletionItemKind::ENUM => "class",
        CompletionItemKind::MODULE | CompletionItemKind::FILE | CompletionItemKind::FOLDER => {
            "module"
        }
        CompletionItemKind::KEYWORD => "keyword",
        CompletionItemKind::FIELD
        | CompletionItemKind::PROPERTY
        | CompletionItemKind::VALUE
        | CompletionItemKind::ENUM_MEMBER => "instance",
        CompletionItemKind::TYPE_PARAMETER => "param",
        _ => "statement",
    }
}

/// Reduces hover contents to plain "signature, blank line, docstring" text.
///
/// Code fences are dropped, horizontal rules become paragraph breaks and a
/// leading `def `/`class ` is removed from the signature line.
pub fn hover_to_docstring(contents: HoverContents) -> String {
    let raw = match contents {
        HoverContents::Scalar(marked) => marked_string_text(marked),
        HoverContents::Array(marked) => marked
            .into_iter()
            .map(marked_string_text)
            .collect::<Vec<_>>()
            .join("\n\n"),
        HoverContents::Markup(markup) => markup.value,
    };

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            continue;
        }
        if trimmed.is_empty() || trimmed == "---" {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        current.push(line.trim_end());
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    if let Some(first) = paragraphs.first_mut() {
        for prefix in ["async def ", "def ", "class "] {
            if let Some(rest) = first.strip_prefix(prefix) {
                *first = rest.to_string();
                break;
            }
        }
    }
    paragraphs.join("\n\n")
}

fn marked_string_text(marked: MarkedString) -> String {
    match marked {
        MarkedString::String(s) => s,
        MarkedString::LanguageString(ls) => ls.value,
    }
}

/// Converts LSP signature information into a call signature.
pub fn signature_from_information(info: &SignatureInformation) -> CallSignature {
    let name = info
        .label
        .split_once('(')
        .map_or(info.label.as_str(), |(name, _)| name)
        .trim()
        .trim_start_matches("def ")
        .to_string();

    let declarations: Vec<String> = info
        .parameters
        .iter()
        .flatten()
        .map(|param| match &param.label {
            ParameterLabel::Simple(label) => label.clone(),
            ParameterLabel::LabelOffsets([start, end]) => utf16_slice(&info.label, *start, *end),
        })
        .collect();

    CallSignature {
        name,
        params: parameters_from_declarations(&declarations),
    }
}

/// Parses rendered parameter declarations such as `b=5` or `*args`.
///
/// Bare `*` and `/` markers become unnamed parameters; they only shape the
/// kinds of their neighbours.
pub fn parameters_from_declarations<S: AsRef<str>>(declarations: &[S]) -> Vec<Parameter> {
    let positional_only_end = declarations
        .iter()
        .position(|d| strip_param_prefix(d.as_ref()).trim() == "/");
    let mut keyword_only = false;

    declarations
        .iter()
        .enumerate()
        .map(|(index, declaration)| {
            let description = strip_param_prefix(declaration.as_ref()).trim();
            if description == "/" {
                return Parameter::new("", description, ParamKind::Unknown);
            }
            if description == "*" {
                keyword_only = true;
                return Parameter::new("", description, ParamKind::Unknown);
            }

            let (kind, rest) = if let Some(rest) = description.strip_prefix("**") {
                (ParamKind::VarKeyword, rest)
            } else if let Some(rest) = description.strip_prefix('*') {
                keyword_only = true;
                (ParamKind::VarPositional, rest)
            } else if positional_only_end.is_some_and(|end| index < end) {
                (ParamKind::PositionalOnly, description)
            } else if keyword_only {
                (ParamKind::KeywordOnly, description)
            } else {
                (ParamKind::PositionalOrKeyword, description)
            };

            let name = rest
                .split([':', '='])
                .next()
                .unwrap_or_default()
                .trim();
            Parameter::new(name, description, kind)
        })
        .collect()
}

fn strip_param_prefix(declaration: &str) -> &str {
    declaration.strip_prefix("param ").unwrap_or(declaration)
}

fn utf16_slice(text: &str, start: u32, end: u32) -> String {
    let units: Vec<u16> = text.encode_utf16().collect();
    let start = (start as usize).min(units.len());
    let end = (end as usize).clamp(start, units.len());
    String::from_utf16_lossy(&units[start..end])
}
