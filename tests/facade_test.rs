//! Action dispatch tests against an in-memory engine.
//!
//! These run without a language server:
//! ```bash
//! cargo test --test facade_test
//! ```
mod common;

use std::path::PathBuf;

use common::stub_engine::{builtin, definition};
use common::{StubEngine, StubSession};
use pyfacade::completion::CompletionPair;
use pyfacade::engine::{
    CallSignature, Completion, DefinitionType, ParamKind, Parameter, SessionRequest,
};
use pyfacade::error::EngineError;
use pyfacade::facade::{
    Action, ActionOutput, AnalysisFacade, FacadeOptions, FuncargsMode, Location,
};

fn request() -> SessionRequest {
    SessionRequest::new("from geometry import scale\nscale(", 2, 6)
}

fn scale_signature() -> CallSignature {
    CallSignature {
        name: "scale".to_string(),
        params: vec![
            Parameter::new("value", "value", ParamKind::PositionalOrKeyword),
            Parameter::new("factor", "factor=2", ParamKind::PositionalOrKeyword),
            Parameter::new("rest", "*rest", ParamKind::VarPositional),
            Parameter::new("options", "**options", ParamKind::VarKeyword),
        ],
    }
}

async fn run(session: StubSession, funcargs: FuncargsMode, action: Action) -> Option<ActionOutput> {
    let engine = StubEngine { session };
    let facade = AnalysisFacade::open(&engine, FacadeOptions { funcargs }, &request())
        .await
        .expect("stub engine should open");
    facade.dispatch(action).await
}

fn location(path: &str, line: u32, column: u32) -> Location {
    Location {
        path: PathBuf::from(path),
        line,
        column,
    }
}

#[tokio::test]
async fn test_goto_follows_imports() {
    let session = StubSession {
        assignments: vec![definition(
            "scale",
            DefinitionType::Import,
            "/proj/main.py",
            1,
            21,
        )],
        definitions: vec![definition(
            "scale",
            DefinitionType::Function,
            "/proj/geometry.py",
            4,
            4,
        )],
        ..StubSession::default()
    };

    let output = run(session, FuncargsMode::Disabled, Action::Goto).await;
    assert_eq!(
        output,
        Some(ActionOutput::Locations(vec![location("/proj/geometry.py", 4, 5)]))
    );
}

#[tokio::test]
async fn test_goto_keeps_local_assignments() {
    let session = StubSession {
        assignments: vec![
            definition("origin", DefinitionType::Statement, "/proj/main.py", 3, 0),
            definition("scale", DefinitionType::Import, "/proj/main.py", 1, 21),
        ],
        definitions: vec![definition(
            "Point",
            DefinitionType::Class,
            "/proj/geometry.py",
            12,
            6,
        )],
        ..StubSession::default()
    };

    let output = run(session, FuncargsMode::Disabled, Action::Goto).await;
    assert_eq!(
        output,
        Some(ActionOutput::Locations(vec![
            location("/proj/main.py", 3, 1),
            location("/proj/main.py", 1, 22),
        ]))
    );
}

#[tokio::test]
async fn test_goto_without_assignments_uses_definitions() {
    let session = StubSession {
        definitions: vec![definition(
            "Point",
            DefinitionType::Class,
            "/proj/geometry.py",
            12,
            6,
        )],
        ..StubSession::default()
    };

    let output = run(session, FuncargsMode::Disabled, Action::Goto).await;
    assert_eq!(
        output,
        Some(ActionOutput::Locations(vec![location("/proj/geometry.py", 12, 7)]))
    );
}

#[tokio::test]
async fn test_goto_drops_builtin_definitions() {
    let session = StubSession {
        assignments: vec![definition("len", DefinitionType::Import, "/proj/main.py", 1, 0)],
        definitions: vec![builtin("len", "Return the number of items.")],
        ..StubSession::default()
    };

    let output = run(session, FuncargsMode::Disabled, Action::Goto).await;
    assert_eq!(output, Some(ActionOutput::Locations(Vec::new())));
}

#[tokio::test]
async fn test_usages_filters_unlocatable_sites() {
    let mut virtual_module = definition("scale", DefinitionType::Function, "/x.py", 1, 0);
    virtual_module.module_path = None;

    let session = StubSession {
        usages: vec![
            definition("scale", DefinitionType::Function, "/proj/geometry.py", 4, 4),
            builtin("scale", ""),
            virtual_module,
            definition("scale", DefinitionType::Statement, "/proj/main.py", 4, 9),
        ],
        ..StubSession::default()
    };

    let output = run(session, FuncargsMode::Disabled, Action::Usages).await;
    assert_eq!(
        output,
        Some(ActionOutput::Locations(vec![
            location("/proj/geometry.py", 4, 5),
            location("/proj/main.py", 4, 10),
        ]))
    );
}

#[tokio::test]
async fn test_docstring_and_signature() {
    let mut scale = definition("scale", DefinitionType::Function, "/proj/geometry.py", 4, 4);
    scale.docstring = "scale(value, factor = 2)\n\nMultiply value by factor.".to_string();
    let session = StubSession {
        definitions: vec![scale.clone(), builtin("other", "ignored")],
        ..StubSession::default()
    };

    let docstring = run(session.clone(), FuncargsMode::Disabled, Action::Docstring).await;
    assert_eq!(docstring, Some(ActionOutput::Text(scale.docstring.clone())));

    let signature = run(session, FuncargsMode::Disabled, Action::Signature).await;
    assert_eq!(
        signature,
        Some(ActionOutput::Text("scale(value, factor=2)".to_string()))
    );
}

#[tokio::test]
async fn test_docstring_without_definitions() {
    let output = run(StubSession::default(), FuncargsMode::Disabled, Action::Docstring).await;
    assert_eq!(output, None);

    let output = run(StubSession::default(), FuncargsMode::Disabled, Action::Signature).await;
    assert_eq!(output, None);
}

#[tokio::test]
async fn test_autocomplete_puts_call_arguments_first() {
    let session = StubSession {
        completions: vec![
            Completion::new("value=", "param"),
            Completion::new("valid", "statement"),
            Completion::new("vars", "function"),
        ],
        signatures: vec![scale_signature()],
        ..StubSession::default()
    };

    let output = run(session, FuncargsMode::Disabled, Action::Autocomplete).await;
    assert_eq!(
        output,
        Some(ActionOutput::Completions(vec![
            CompletionPair::new("value\tparam", "${1:value}"),
            CompletionPair::new("factor\tparam", "${2:factor}"),
            CompletionPair::new("valid\tstatement", "valid"),
            CompletionPair::new("vars\tfunction", "vars"),
        ]))
    );
}

#[tokio::test]
async fn test_autocomplete_wire_format() {
    let session = StubSession {
        completions: vec![Completion::new("path", "module")],
        ..StubSession::default()
    };

    let output = run(session, FuncargsMode::Disabled, Action::Autocomplete).await;
    let json = serde_json::to_string(&output).unwrap();
    assert_eq!(json, r#"[["path\tmodule","path"]]"#);
}

#[tokio::test]
async fn test_funcargs_modes() {
    let session = StubSession {
        signatures: vec![scale_signature()],
        ..StubSession::default()
    };

    let disabled = run(session.clone(), FuncargsMode::Disabled, Action::Funcargs).await;
    assert_eq!(
        disabled,
        Some(ActionOutput::Snippet("${1:value}, ${2:factor}".to_string()))
    );

    let basic = run(session.clone(), FuncargsMode::Basic, Action::Funcargs).await;
    assert_eq!(
        basic,
        Some(ActionOutput::Snippet("${1:value}, ${2:factor}".to_string()))
    );

    let all = run(session, FuncargsMode::All, Action::Funcargs).await;
    assert_eq!(
        all,
        Some(ActionOutput::Snippet("${1:value}, factor=${2:2}".to_string()))
    );
}

#[tokio::test]
async fn test_funcargs_default_mode_single_parameter() {
    let session = StubSession {
        signatures: vec![CallSignature {
            name: "f".to_string(),
            params: vec![Parameter::new("a", "a", ParamKind::PositionalOrKeyword)],
        }],
        ..StubSession::default()
    };

    let output = run(session, FuncargsMode::default(), Action::Funcargs).await;
    assert_eq!(output, Some(ActionOutput::Snippet("${1:a}".to_string())));
}

#[tokio::test]
async fn test_funcargs_without_call() {
    let output = run(StubSession::default(), FuncargsMode::Basic, Action::Funcargs).await;
    assert_eq!(output, Some(ActionOutput::Snippet(String::new())));
}

#[tokio::test]
async fn test_engine_failures_produce_no_result() {
    let session = StubSession {
        fail: true,
        ..StubSession::default()
    };

    for action in Action::ALL {
        let output = run(session.clone(), FuncargsMode::All, action).await;
        assert_eq!(output, None, "{action} should swallow engine errors");
    }
}

#[tokio::test]
async fn test_unknown_action_produces_no_result() {
    let engine = StubEngine::default();
    let facade = AnalysisFacade::open(&engine, FacadeOptions::default(), &request())
        .await
        .unwrap();
    assert_eq!(facade.dispatch_named("rename").await, None);
}

#[tokio::test]
async fn test_dispatch_named() {
    let session = StubSession {
        completions: vec![Completion::new("path", "module")],
        ..StubSession::default()
    };
    let engine = StubEngine { session };
    let facade = AnalysisFacade::open(&engine, FacadeOptions::default(), &request())
        .await
        .unwrap();
    assert_eq!(
        facade.dispatch_named("autocomplete").await,
        Some(ActionOutput::Completions(vec![CompletionPair::new(
            "path\tmodule",
            "path"
        )]))
    );
}

#[tokio::test]
async fn test_open_rejects_unknown_encoding() {
    let engine = StubEngine::default();
    let request = request().with_encoding("ebcdic");
    let result = AnalysisFacade::open(&engine, FacadeOptions::default(), &request).await;
    assert!(matches!(
        result,
        Err(EngineError::UnsupportedEncoding(name)) if name == "ebcdic"
    ));
}
