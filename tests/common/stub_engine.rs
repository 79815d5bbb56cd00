use std::path::PathBuf;

use async_trait::async_trait;
use pyfacade::engine::{
    AnalysisEngine, AnalysisSession, CallSignature, Completion, Definition, DefinitionType,
    EngineResult, SessionRequest, validate_encoding,
};
use pyfacade::error::{EngineError, LspError};

/// Canned engine answers for facade tests.
#[derive(Debug, Clone, Default)]
pub struct StubSession {
    /// Regular completions.
    pub completions: Vec<Completion>,
    /// `goto_assignments` answer.
    pub assignments: Vec<Definition>,
    /// `goto_definitions` answer.
    pub definitions: Vec<Definition>,
    /// `usages` answer.
    pub usages: Vec<Definition>,
    /// `call_signatures` answer.
    pub signatures: Vec<CallSignature>,
    /// Every operation fails when set.
    pub fail: bool,
}

impl StubSession {
    fn answer<T: Clone>(&self, value: &T) -> EngineResult<T> {
        if self.fail {
            return Err(EngineError::Lsp(LspError::RequestFailed(
                "stub engine failure".to_string(),
            )));
        }
        Ok(value.clone())
    }
}

#[async_trait]
impl AnalysisSession for StubSession {
    async fn completions(&self) -> EngineResult<Vec<Completion>> {
        self.answer(&self.completions)
    }

    async fn goto_assignments(&self) -> EngineResult<Vec<Definition>> {
        self.answer(&self.assignments)
    }

    async fn goto_definitions(&self) -> EngineResult<Vec<Definition>> {
        self.answer(&self.definitions)
    }

    async fn usages(&self) -> EngineResult<Vec<Definition>> {
        self.answer(&self.usages)
    }

    async fn call_signatures(&self) -> EngineResult<Vec<CallSignature>> {
        self.answer(&self.signatures)
    }
}

/// Engine handing out clones of one [`StubSession`].
#[derive(Debug, Clone, Default)]
pub struct StubEngine {
    /// Session every `open` returns.
    pub session: StubSession,
}

#[async_trait]
impl AnalysisEngine for StubEngine {
    type Session = StubSession;

    async fn open(&self, request: &SessionRequest) -> EngineResult<StubSession> {
        validate_encoding(&request.encoding)?;
        Ok(self.session.clone())
    }
}

/// A definition in `path` at `line` (1-based) and `column` (0-based).
pub fn definition(
    name: &str,
    kind: DefinitionType,
    path: &str,
    line: u32,
    column: u32,
) -> Definition {
    Definition {
        name: name.to_string(),
        kind,
        module_path: Some(PathBuf::from(path)),
        line,
        column,
        docstring: String::new(),
        in_builtin_module: false,
    }
}

/// A definition living in a built-in stub.
pub fn builtin(name: &str, docstring: &str) -> Definition {
    Definition {
        docstring: docstring.to_string(),
        in_builtin_module: true,
        ..definition(name, DefinitionType::Function, "/typeshed/builtins.pyi", 1, 0)
    }
}
