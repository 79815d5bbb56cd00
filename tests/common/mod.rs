//! Common test helpers and utilities.

#![allow(dead_code)]

pub mod lsp_harness;
pub mod stub_engine;
pub mod temp_workspace;

// Re-export for convenience
pub use stub_engine::{StubEngine, StubSession};
pub use temp_workspace::TestWorkspace;

/// A small Python project exercising imports, defaults and docstrings.
///
/// `$0` marks the cursor; the line holding it is where each test
/// places its query.
pub fn python_fixture(cursor_line: &str) -> String {
    format!(
        r#"
#- /geometry.py
"""Shapes and helpers."""


def scale(value, factor=2, *rest, **options):
    """scale(value, factor=2)

    Multiply value by factor."""
    return value * factor


class Point:
    """A point in the plane."""

    def __init__(self, x, y=0):
        self.x = x
        self.y = y
#- /main.py
from geometry import scale, Point

origin = Point(1)
result = scale(3)
{cursor_line}
"#
    )
}
