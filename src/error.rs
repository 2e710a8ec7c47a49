//! Compile error aggregation and diagnostic rendering.
//!
//! Every pipeline stage defines its own error enum; [`CompileError`] folds
//! them into the single type the driver reports. A rendered diagnostic has
//! the shape:
//!
//! ```text
//! [file.em: line 3, position 8] SYNTAX ERROR: Missing delimiter ';' ...
//!         int x = 3
//!                 ^
//! ```
//!
//! with the caret pointing one past the recorded 0-based column.

use crate::emitter::IrError;
use crate::parser::ast::SourceLoc;
use crate::parser::lexer::LexError;
use crate::parser::parse::ParseError;
use crate::parser::source::SourceBuffer;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("ERROR: Could not find the file: {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Ir(#[from] IrError),

    #[error("INTERNAL ERROR: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn loc(&self) -> Option<&SourceLoc> {
        match self {
            CompileError::Io { .. } | CompileError::Internal(_) => None,
            CompileError::Lex(e) => Some(e.loc()),
            CompileError::Parse(e) => Some(e.loc()),
            CompileError::Ir(e) => e.loc(),
        }
    }

    /// Render the error with its source context: the message tagged with
    /// `(file, line, position)`, the offending line, and a caret marking
    /// the column.
    pub fn render(&self) -> String {
        let Some(loc) = self.loc() else {
            return self.to_string();
        };

        let mut out = format!(
            "[{}: line {}, position {}] {}\n",
            loc.file, loc.line, loc.column, self
        );

        // Re-read the file for the snippet. In-memory sources (tests) have
        // no backing file, so the snippet is simply omitted.
        if let Ok(buffer) = SourceBuffer::read(Path::new(loc.file.as_ref())) {
            if let Some(line) = buffer.line(loc.line) {
                out.push('\t');
                out.push_str(line);
                out.push('\n');
                out.push('\t');
                for _ in 0..loc.column {
                    out.push(' ');
                }
                out.push_str("^\n");
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Lexer;

    #[test]
    fn test_render_without_backing_file() {
        let err = Lexer::from_text("inmemory.em", "int 3x;").unwrap_err();
        let rendered = err.render();
        assert!(rendered.starts_with("[inmemory.em: line 1, position"));
        assert!(rendered.contains("Identifiers cannot start with numeric characters"));
    }
}
