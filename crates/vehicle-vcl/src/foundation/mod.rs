//! Foundation types shared by every compiler pass.

pub mod span;

pub use span::{SourceFile, SourceMap, Span};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a top-level declaration.
///
/// Scope checking replaces references to declared names with `Ident`s; bound
/// variables become de Bruijn indices instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ident(pub String);

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
