//! Action dispatcher between the editor and the analysis engine.
//!
//! ```text
//!  action        | engine operations
//! ---------------+-------------------------------------------
//!  goto          | goto_assignments, then goto_definitions
//!                | when every assignment is an import
//!  usages        | usages
//!  docstring     | goto_definitions
//!  signature     | goto_definitions
//!  autocomplete  | call_signatures + completions
//!  funcargs      | call_signatures
//! ```
//!
//! Every handler returns a [`FacadeResult`]. [`AnalysisFacade::dispatch`] is
//! the only place failures are handled: they are logged and turned into
//! "no result", so an editor never sees an analysis crash.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::completion::{
    CompletionPair, call_argument_snippets, extract_callable_parameters, format_completion,
};
use crate::engine::{
    AnalysisEngine, AnalysisSession, Definition, DefinitionType, EngineResult, SessionRequest,
};
use crate::error::FacadeError;

/// Result type for facade actions.
pub type FacadeResult<T> = std::result::Result<T, FacadeError>;

/// The closed set of editor actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Go to definition.
    Goto,
    /// Find usages.
    Usages,
    /// Full docstring of the name at the cursor.
    Docstring,
    /// One-line calltip of the name at the cursor.
    Signature,
    /// Call-argument and regular completions.
    Autocomplete,
    /// Call-argument snippet for the enclosing call.
    Funcargs,
}

impl Action {
    /// All actions, in table order.
    pub const ALL: [Action; 6] = [
        Action::Goto,
        Action::Usages,
        Action::Docstring,
        Action::Signature,
        Action::Autocomplete,
        Action::Funcargs,
    ];

    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Goto => "goto",
            Action::Usages => "usages",
            Action::Docstring => "docstring",
            Action::Signature => "signature",
            Action::Autocomplete => "autocomplete",
            Action::Funcargs => "funcargs",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = FacadeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| FacadeError::UnknownAction(s.to_string()))
    }
}

/// How aggressively call arguments are completed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FuncargsMode {
    /// Editor-side call completion off; `funcargs` still builds a
    /// names-only snippet when asked.
    #[default]
    Disabled,
    /// Parameter names only.
    Basic,
    /// Parameter names and default values.
    All,
}

/// A filtered location as the editor consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "(PathBuf, u32, u32)", from = "(PathBuf, u32, u32)")]
pub struct Location {
    /// File path.
    pub path: PathBuf,
    /// Line, 1-based.
    pub line: u32,
    /// Column, 1-based.
    pub column: u32,
}

impl From<Location> for (PathBuf, u32, u32) {
    fn from(loc: Location) -> Self {
        (loc.path, loc.line, loc.column)
    }
}

impl From<(PathBuf, u32, u32)> for Location {
    fn from((path, line, column): (PathBuf, u32, u32)) -> Self {
        Self { path, line, column }
    }
}

/// Output of one action. Serialize-only: `Text` and `Snippet` share a wire
/// shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionOutput {
    /// `goto` and `usages`.
    Locations(Vec<Location>),
    /// `docstring` and `signature`.
    Text(String),
    /// `autocomplete`.
    Completions(Vec<CompletionPair>),
    /// `funcargs`: comma-joined snippet fragments.
    Snippet(String),
}

/// Options the editor fixes per facade rather than per buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FacadeOptions {
    /// Call-argument completion mode.
    pub funcargs: FuncargsMode,
}

/// Facade over one analysis session.
///
/// A facade serves exactly one action: [`dispatch`](Self::dispatch)
/// consumes it.
#[derive(Debug)]
pub struct AnalysisFacade<S> {
    session: S,
    funcargs: FuncargsMode,
}

impl<S: AnalysisSession> AnalysisFacade<S> {
    /// Wraps an already-open session.
    pub fn new(session: S, funcargs: FuncargsMode) -> Self {
        Self { session, funcargs }
    }

    /// Opens a session for `request` and wraps it.
    ///
    /// ## Errors
    /// Session construction errors are returned as-is; they signal
    /// misconfiguration rather than a failed action.
    pub async fn open<E>(
        engine: &E,
        options: FacadeOptions,
        request: &SessionRequest,
    ) -> EngineResult<Self>
    where
        E: AnalysisEngine<Session = S>,
    {
        let session = engine.open(request).await?;
        Ok(Self::new(session, options.funcargs))
    }

    /// Runs `action` and returns its output, or `None` when nothing was
    /// found or the action failed.
    #[instrument(level = "debug", skip_all, fields(action = %action))]
    pub async fn dispatch(self, action: Action) -> Option<ActionOutput> {
        let result = match action {
            Action::Goto => self.goto().await,
            Action::Usages => self.usages().await,
            Action::Docstring => self.docstring().await,
            Action::Signature => self.signature().await,
            Action::Autocomplete => self.autocomplete().await,
            Action::Funcargs => self.funcargs().await,
        };
        match result {
            Ok(output) => output,
            Err(e) => {
                error!(action = %action, error = ?e, "analysis action failed: {e}");
                None
            }
        }
    }

    /// Parses `name` and dispatches it. Unknown names are logged and
    /// produce no result.
    pub async fn dispatch_named(self, name: &str) -> Option<ActionOutput> {
        match name.parse::<Action>() {
            Ok(action) => self.dispatch(action).await,
            Err(e) => {
                error!(action = name, "analysis action failed: {e}");
                None
            }
        }
    }

    async fn goto(&self) -> FacadeResult<Option<ActionOutput>> {
        let mut definitions = self.session.goto_assignments().await?;
        if definitions.iter().all(|d| d.kind == DefinitionType::Import) {
            debug!(
                count = definitions.len(),
                "assignments are imports, resolving definitions"
            );
            definitions = self.session.goto_definitions().await?;
        }
        Ok(Some(ActionOutput::Locations(to_locations(definitions))))
    }

    async fn usages(&self) -> FacadeResult<Option<ActionOutput>> {
        let usages = self.session.usages().await?;
        Ok(Some(ActionOutput::Locations(to_locations(usages))))
    }

    async fn docstring(&self) -> FacadeResult<Option<ActionOutput>> {
        Ok(self.first_docstring().await?.map(ActionOutput::Text))
    }

    async fn signature(&self) -> FacadeResult<Option<ActionOutput>> {
        Ok(self
            .first_docstring()
            .await?
            .map(|doc| ActionOutput::Text(calltip(&doc))))
    }

    async fn autocomplete(&self) -> FacadeResult<Option<ActionOutput>> {
        let mut entries = self.call_arguments(true, false).await?;
        let completions = self.session.completions().await?;
        entries.extend(
            completions
                .iter()
                .map(format_completion)
                .filter(|pair| !pair.is_param()),
        );
        Ok(Some(ActionOutput::Completions(entries)))
    }

    async fn funcargs(&self) -> FacadeResult<Option<ActionOutput>> {
        let complete_all = self.funcargs == FuncargsMode::All;
        let snippet = self
            .call_arguments(complete_all, complete_all)
            .await?
            .into_iter()
            .map(|pair| pair.insert)
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Some(ActionOutput::Snippet(snippet)))
    }

    async fn first_docstring(&self) -> FacadeResult<Option<String>> {
        let definitions = self.session.goto_definitions().await?;
        Ok(definitions.into_iter().next().map(|d| d.docstring))
    }

    async fn call_arguments(
        &self,
        include_keywords: bool,
        include_values: bool,
    ) -> FacadeResult<Vec<CompletionPair>> {
        let signatures = self.session.call_signatures().await?;
        let parameters = extract_callable_parameters(signatures.first(), include_keywords);
        Ok(call_argument_snippets(&parameters, include_values))
    }
}

/// Reduces a docstring to its first paragraph on one line.
pub fn calltip(docstring: &str) -> String {
    let first = docstring.split("\n\n").next().unwrap_or_default();
    first.replace('\n', " ").replace(" = ", "=")
}

fn to_locations(definitions: Vec<Definition>) -> Vec<Location> {
    definitions
        .into_iter()
        .filter(|d| !d.in_builtin_module)
        .filter_map(|d| {
            let Some(path) = d.module_path else {
                debug!(name = %d.name, "skipping definition without a module path");
                return None;
            };
            Some(Location {
                path,
                line: d.line,
                column: d.column + 1,
            })
        })
        .collect()
}
