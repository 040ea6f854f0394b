//! Hand-written recursive descent parser for the Vehicle surface syntax.
//!
//! The parser consumes a lexed token slice (with byte spans) and produces
//! the named surface AST. Expressions are parsed by precedence climbing;
//! binding forms extend maximally to the right.

pub mod decl;
mod error;
pub mod expr;
mod stream;

pub use decl::parse_prog;
pub use error::{ParseError, ParseErrorKind};
pub use stream::TokenStream;
