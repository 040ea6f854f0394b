//! Abstract syntax trees.
//!
//! Two layers share one shape: the named [`surface`] AST (parser output)
//! and the locally-nameless [`core`] AST (everything after scope checking).

pub mod builtin;
pub mod core;
pub mod debruijn;
pub mod decl;
pub mod surface;

pub use builtin::Builtin;
pub use core::{Arg, Binder, Expr, ExprKind, Literal, MetaId, Origin, Var, Visibility};
pub use decl::{Decl, Prog};
