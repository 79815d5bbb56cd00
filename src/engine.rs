//! Engine-neutral view of the external analysis engine.
//!
//! The facade never talks to a concrete analyzer. It opens an
//! [`AnalysisSession`] through an [`AnalysisEngine`] and consumes the plain
//! records defined here. The LSP-backed implementation lives in
//! [`crate::lsp::engine`]; tests plug in in-memory sessions.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Everything needed to open one analysis session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Full text of the buffer being edited.
    pub source: String,
    /// Cursor line, 1-based.
    pub line: u32,
    /// Cursor column, 0-based, counted in characters.
    pub column: u32,
    /// Path of the buffer on disk, if it has one.
    pub path: Option<PathBuf>,
    /// Name of the encoding the buffer was read with.
    pub encoding: String,
    /// Explicit module search path overriding the engine default.
    pub sys_path: Option<Vec<PathBuf>>,
}

impl SessionRequest {
    /// Creates a request for an in-memory UTF-8 buffer.
    pub fn new(source: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            source: source.into(),
            line,
            column,
            path: None,
            encoding: DEFAULT_ENCODING.to_string(),
            sys_path: None,
        }
    }

    /// Sets the buffer path. An empty path counts as "no path".
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.path = (!path.as_os_str().is_empty()).then_some(path);
        self
    }

    /// Sets the encoding name.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Sets the explicit module search path.
    #[must_use]
    pub fn with_sys_path(mut self, sys_path: Vec<PathBuf>) -> Self {
        self.sys_path = Some(sys_path);
        self
    }
}

/// Encoding assumed when the editor does not name one.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Decodes raw buffer bytes with one of the supported encodings.
///
/// Supports UTF-8 and Latin-1 under their common aliases.
/// ## Errors
/// `EngineError::UnsupportedEncoding` for any other name, and
/// `EngineError::InvalidSource` when the bytes are not valid UTF-8.
pub fn decode_source(bytes: Vec<u8>, encoding: &str) -> EngineResult<String> {
    match normalize_encoding(encoding)? {
        Encoding::Utf8 => String::from_utf8(bytes).map_err(|e| EngineError::InvalidSource {
            encoding: encoding.to_string(),
            reason: e.to_string(),
        }),
        Encoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
    }
}

/// Checks that an encoding name is one the engine understands.
/// ## Errors
/// `EngineError::UnsupportedEncoding` for unknown names.
pub fn validate_encoding(encoding: &str) -> EngineResult<()> {
    normalize_encoding(encoding).map(|_| ())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf8,
    Latin1,
}

fn normalize_encoding(encoding: &str) -> EngineResult<Encoding> {
    match encoding.trim().to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" | "utf_8" => Ok(Encoding::Utf8),
        "latin-1" | "latin1" | "latin_1" | "iso-8859-1" | "iso8859-1" => Ok(Encoding::Latin1),
        _ => Err(EngineError::UnsupportedEncoding(encoding.to_string())),
    }
}

/// One regular completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Text that would be inserted.
    pub name: String,
    /// Engine classification such as `function`, `module` or `param`.
    pub kind: String,
}

impl Completion {
    /// Creates a completion record.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Classification of a resolved name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionType {
    /// The name resolves to an `import`/`from ... import` statement.
    Import,
    /// A module.
    Module,
    /// A class.
    Class,
    /// A function or method.
    Function,
    /// An instance of some type.
    Instance,
    /// An assignment statement.
    Statement,
    /// A function parameter.
    Param,
    /// A language keyword.
    Keyword,
    /// Anything the engine did not classify.
    Other,
}

/// A definition, assignment or usage site reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    /// Name at the site.
    pub name: String,
    /// What the name resolves to.
    pub kind: DefinitionType,
    /// File containing the site; `None` for compiled or virtual modules.
    pub module_path: Option<PathBuf>,
    /// Line of the site, 1-based.
    pub line: u32,
    /// Column of the site, 0-based.
    pub column: u32,
    /// Full docstring, empty when there is none.
    pub docstring: String,
    /// Whether the site lives in a built-in or standard-library stub.
    pub in_builtin_module: bool,
}

/// How a parameter binds its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Declared before a `/` marker.
    PositionalOnly,
    /// Ordinary parameter.
    PositionalOrKeyword,
    /// `*args`.
    VarPositional,
    /// Declared after `*` or `*args`.
    KeywordOnly,
    /// `**kwargs`.
    VarKeyword,
    /// The engine gave no structured kind.
    Unknown,
}

impl ParamKind {
    /// Returns `true` for `*args` and `**kwargs` style parameters.
    pub fn is_variadic(self) -> bool {
        matches!(self, Self::VarPositional | Self::VarKeyword)
    }
}

/// One declared parameter of a call signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Bare parameter name.
    pub name: String,
    /// Rendered declaration, e.g. `b=5` or `*args`.
    pub description: String,
    /// Structured binding kind.
    pub kind: ParamKind,
}

impl Parameter {
    /// Creates a parameter record.
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
        }
    }
}

/// The call signature active at the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSignature {
    /// Name of the callable.
    pub name: String,
    /// Parameters in declaration order.
    pub params: Vec<Parameter>,
}

/// A per-request analysis context scoped to one buffer and cursor.
#[async_trait]
pub trait AnalysisSession: Send + Sync {
    /// Regular completions at the cursor.
    async fn completions(&self) -> EngineResult<Vec<Completion>>;

    /// Assignment targets of the name at the cursor, without following imports.
    async fn goto_assignments(&self) -> EngineResult<Vec<Definition>>;

    /// Inferred definitions of the name at the cursor.
    async fn goto_definitions(&self) -> EngineResult<Vec<Definition>>;

    /// Every reference to the name at the cursor, declaration included.
    async fn usages(&self) -> EngineResult<Vec<Definition>>;

    /// Call signatures enclosing the cursor, innermost first.
    async fn call_signatures(&self) -> EngineResult<Vec<CallSignature>>;
}

/// Opens analysis sessions.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Session type produced by this engine.
    type Session: AnalysisSession;

    /// Opens a session for one request.
    /// ## Errors
    /// Invalid encodings, positions outside the buffer, or a failing
    /// engine backend.
    async fn open(&self, request: &SessionRequest) -> EngineResult<Self::Session>;
}
