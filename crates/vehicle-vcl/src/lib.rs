//! # Vehicle compiler core
//!
//! Compiler for the Vehicle specification language: a small
//! dependently-typed language for expressing properties about neural
//! networks and emitting them to external verifiers (VNNLib / SMT-Lib).
//!
//! ## Architecture
//!
//! The pipeline is a linear sequence of passes over a single AST family:
//!
//! ```text
//! lexer      - tokenization (logos)
//!     |
//! parser     - hand-written recursive descent -> named surface AST
//!     |
//! scope      - names -> de Bruijn indices / declaration identifiers
//!     |
//! elaborate  - bidirectional type checking, meta-variables,
//!              type-class constraint solving
//!     |
//! normalise  - beta/delta/iota evaluation to normal form
//!     |
//! vnnlib     - meta-network discovery, magic-variable rewriting,
//!              SMT-Lib emission
//! ```
//!
//! The named AST exists only between the parser and the scope checker;
//! every later pass operates on the locally-nameless core AST.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vehicle_vcl::compile::compile_source;
//!
//! let (sources, result) = compile_source("spec.vcl", source_text);
//! match result {
//!     Ok(queries) => { /* one SMT-Lib script per property */ }
//!     Err(error) => eprintln!("{}", vehicle_vcl::compile::format_error(&error, &sources)),
//! }
//! ```

pub mod ast;
pub mod compile;
pub mod elaborate;
pub mod error;
pub mod foundation;
pub mod lexer;
pub mod normalise;
pub mod parser;
pub mod scope;
pub mod vnnlib;

pub use compile::{compile_source, format_error};
pub use error::CompileError;
pub use vnnlib::PropertyQuery;

/// Compiler version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
