//! Unified compiler diagnostics.
//!
//! Every pass has its own error enum; this module folds them into one
//! [`CompileError`] sum and renders them against a [`SourceMap`] with the
//! `--> file:line:col` snippet-and-caret layout.
//!
//! Errors abort the pass that raised them; no pass catches another pass's
//! errors.

use crate::elaborate::TypeError;
use crate::foundation::{SourceMap, Span};
use crate::normalise::NormError;
use crate::parser::ParseError;
use crate::scope::ScopeError;
use crate::vnnlib::SmtLibError;
use thiserror::Error;

/// Any error of the compilation pipeline.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid token")]
    InvalidToken { span: Span },
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),
    #[error("scope error: {0}")]
    Scope(#[from] ScopeError),
    #[error("type error: {0}")]
    Type(#[from] TypeError),
    #[error("normalisation error: {0}")]
    Norm(#[from] NormError),
    #[error("backend error: {0}")]
    SmtLib(#[from] SmtLibError),
}

impl CompileError {
    /// Primary source location of this error.
    pub fn span(&self) -> Span {
        match self {
            CompileError::InvalidToken { span } => *span,
            CompileError::Syntax(e) => e.span,
            CompileError::Scope(e) => e.span(),
            CompileError::Type(e) => e.span(),
            CompileError::Norm(e) => e.span(),
            CompileError::SmtLib(e) => e.span(),
        }
    }

    /// Secondary notes (one line each), e.g. the stuck constraints of an
    /// `UnsolvedConstraints` report.
    fn notes(&self) -> Vec<String> {
        match self {
            CompileError::Type(TypeError::UnsolvedConstraints { constraints }) => constraints
                .iter()
                .map(|c| format!("stuck constraint: {}", c.description))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Formats diagnostics with source code context.
///
/// Produces the error header, the `--> file:line:col` location, the source
/// line with a caret underline, and any notes.
pub struct DiagnosticFormatter<'a> {
    sources: &'a SourceMap,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    /// Format one diagnostic as a string with source context.
    pub fn format(&self, error: &CompileError) -> String {
        let mut output = String::new();
        output.push_str(&format!("error: {}\n", error));

        let span = error.span();
        let file_path = self.sources.file_path(&span);
        let (line, col) = self.sources.line_col(&span);
        output.push_str(&format!("  --> {}:{}:{}\n", file_path.display(), line, col));

        let file = self.sources.file(&span);
        if let Some(source_line) = file.line_text(line) {
            let source_line = source_line.trim_end_matches('\n');
            output.push_str("   |\n");
            output.push_str(&format!("{:3} | {}\n", line, source_line));

            let start_col = col as usize;
            let span_len = (span.end.saturating_sub(span.start)) as usize;
            let end_col = (start_col + span_len).min(source_line.len() + 1);
            let underline = " ".repeat(start_col.saturating_sub(1))
                + &"^".repeat(end_col.saturating_sub(start_col).max(1));
            output.push_str(&format!("   | {}\n", underline));
        }

        for note in error.notes() {
            output.push_str(&format!("   = note: {}\n", note));
        }

        output
    }
}
