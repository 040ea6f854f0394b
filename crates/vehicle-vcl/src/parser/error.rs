//! Parse error types.

use crate::foundation::Span;
use crate::lexer::Token;
use thiserror::Error;

/// Parse error with source location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    /// Kind of parse error
    pub kind: ParseErrorKind,
    /// Source location where the error occurred
    pub span: Span,
    /// Human-readable error message
    pub message: String,
}

/// Category of parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A specific token was expected but a different one was found.
    UnexpectedToken,
    /// End of input while a construct was incomplete.
    UnexpectedEof,
    /// Tokens are present but violate the grammar structurally.
    InvalidSyntax,
}

impl ParseError {
    /// An "expected token X" error.
    pub fn expected_token(expected: &Token, found: Option<&Token>, span: Span) -> Self {
        let (kind, message) = match found {
            Some(token) => (
                ParseErrorKind::UnexpectedToken,
                format!("expected '{}', found '{}'", expected, token),
            ),
            None => (
                ParseErrorKind::UnexpectedEof,
                format!("expected '{}', found end of input", expected),
            ),
        };
        Self {
            kind,
            span,
            message,
        }
    }

    /// An "unexpected token in context" error.
    pub fn unexpected(found: Option<&Token>, context: &str, span: Span) -> Self {
        let (kind, message) = match found {
            Some(token) => (
                ParseErrorKind::UnexpectedToken,
                format!("unexpected '{}' {}", token, context),
            ),
            None => (
                ParseErrorKind::UnexpectedEof,
                format!("unexpected end of input {}", context),
            ),
        };
        Self {
            kind,
            span,
            message,
        }
    }

    /// A structural grammar violation.
    pub fn invalid(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::InvalidSyntax,
            span,
            message: message.into(),
        }
    }
}
