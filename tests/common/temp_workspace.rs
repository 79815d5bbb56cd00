use std::path::PathBuf;
use std::sync::Arc;

use pyfacade::engine::SessionRequest;
use pyfacade::lsp::LspEngine;
use tempfile::TempDir;

/// Represents a test fixture with files and a cursor position.
#[derive(Debug)]
pub struct Fixture {
    /// files in fixture
    pub files: Vec<(PathBuf, String)>,
    /// Position of cursor in fixture: file, line (1-based), column (0-based)
    pub cursor: (PathBuf, u32, u32),
}

/// Parses a fixture into file contents and paths.
///
/// Files start with a `#- /path.py` line; `$0` marks the cursor.
/// ## Panics
/// if input is malformed or cursor is not found
pub fn parse_fixture(input: &str) -> Fixture {
    let mut files = Vec::new();
    let mut current_path: Option<PathBuf> = None;
    let mut current_content = String::new();

    let mut cursor = None;

    for line in input.lines() {
        if let Some(path) = line.strip_prefix("#- ") {
            if let Some(p) = current_path.take() {
                files.push((p, current_content.clone()));
            }
            current_content.clear();
            // Store relative path (trim leading slash)
            current_path = Some(PathBuf::from(path.trim_start_matches('/')));
        } else if let Some(path) = &current_path {
            let mut l = line.to_string();
            if let Some(idx) = l.find("$0") {
                let line_no = u32::try_from(current_content.lines().count() + 1)
                    .expect("line count out of range");
                let col = u32::try_from(l[..idx].chars().count()).expect("column out of range");
                cursor = Some((path.clone(), line_no, col));
                l = l.replace("$0", "");
            }
            current_content.push_str(&l);
            current_content.push('\n');
        }
    }

    if let Some(p) = current_path {
        files.push((p, current_content));
    }

    Fixture {
        files,
        cursor: cursor.expect("missing $0 cursor"),
    }
}

/// Test workspace with optional engine
pub struct TestWorkspace {
    /// Temporary folder for the workspace
    pub root: TempDir,
    /// fixture for the workspace
    pub fixture: Fixture,
    /// Engine over a live language server (if created)
    pub engine: Option<Arc<LspEngine>>,
    /// Canonicalized root path (resolves symlinks like /var -> /private/var on macOS)
    canonical_root: PathBuf,
}

impl TestWorkspace {
    /// creates new workspace
    /// ## Panics
    pub fn new(root: TempDir, fixture: &str) -> Self {
        let fixture = parse_fixture(fixture);

        for (path, content) in &fixture.files {
            let abs = root.path().join(path);
            std::fs::create_dir_all(abs.parent().unwrap()).unwrap();
            std::fs::write(&abs, content).unwrap();
        }

        let canonical_root = root
            .path()
            .canonicalize()
            .expect("Failed to canonicalize root");

        Self {
            root,
            fixture,
            engine: None,
            canonical_root,
        }
    }

    /// Creates a new builder for constructing a test workspace
    pub fn builder() -> TestWorkspaceBuilder {
        TestWorkspaceBuilder::new()
    }

    /// Returns the canonicalized root path
    pub fn canonical_root(&self) -> &PathBuf {
        &self.canonical_root
    }

    /// Converts a relative path to an absolute path
    pub fn apath(&self, path: &str) -> PathBuf {
        self.canonical_root.join(path)
    }

    /// Request for the fixture's cursor, carrying the cursor file's text.
    /// ## Panics
    pub fn cursor_request(&self) -> SessionRequest {
        let (path, line, column) = &self.fixture.cursor;
        let source = self
            .fixture
            .files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, content)| content.clone())
            .expect("cursor file missing from fixture");
        SessionRequest::new(source, *line, *column).with_path(self.canonical_root.join(path))
    }

    /// Returns the engine
    /// ## Panics
    /// Panics if the engine was not created
    pub fn engine(&self) -> &Arc<LspEngine> {
        self.engine
            .as_ref()
            .expect("engine not initialized. Use builder().build() to start the language server")
    }
}

/// Builder for creating test workspaces backed by a language server
pub struct TestWorkspaceBuilder {
    fixture: Option<String>,
}

impl TestWorkspaceBuilder {
    /// Creates a new builder
    pub fn new() -> Self {
        Self { fixture: None }
    }

    /// Sets the fixture content
    #[must_use]
    pub fn fixture(mut self, fixture: &str) -> Self {
        self.fixture = Some(fixture.to_string());
        self
    }

    /// Builds the test workspace and starts the language server
    /// ## Panics
    /// Panics if fixture is not set
    pub async fn build(self) -> TestWorkspace {
        let fixture_str = self.fixture.expect("Fixture must be set using .fixture()");

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut workspace = TestWorkspace::new(temp_dir, &fixture_str);

        let engine = super::lsp_harness::spawn_engine(workspace.canonical_root()).await;
        workspace.engine = Some(engine);

        workspace
    }
}

impl Default for TestWorkspaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixture_cursor() {
        let fixture = parse_fixture("#- /a.py\nimport os\nos.pa$0th\n#- /b.py\nx = 1\n");
        assert_eq!(fixture.files.len(), 2);
        assert_eq!(fixture.files[0].1, "import os\nos.path\n");
        assert_eq!(fixture.cursor, (PathBuf::from("a.py"), 2, 5));
    }
}
