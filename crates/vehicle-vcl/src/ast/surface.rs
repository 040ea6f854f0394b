//! Named surface AST.
//!
//! The parser produces this representation; the scope checker consumes it
//! and produces the locally-nameless [`core`](crate::ast::core) AST. Nothing
//! downstream of scope checking ever sees a named variable.
//!
//! The shapes deliberately mirror the core AST minus the elaboration-only
//! forms (`Meta`, `PrimDict`, `Ann`): the parser has no business producing
//! those.

use crate::ast::builtin::Builtin;
use crate::ast::core::{Literal, Visibility};
use crate::foundation::Span;
use serde::{Deserialize, Serialize};

/// Surface expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// `Type n`
    Type(u32),
    /// A name: local binder or top-level declaration, resolved later.
    Var(String),
    /// `?name`
    Hole(String),
    /// Application with visibility-tagged arguments.
    App(Box<Expr>, Vec<Arg>),
    /// `forall (x : T) . R` and the arrow sugar `T -> R`.
    Pi(Binder, Box<Expr>),
    /// `\x -> e`
    Lam(Binder, Box<Expr>),
    /// `let x = v in e`
    Let(Box<Expr>, Binder, Box<Expr>),
    Builtin(Builtin),
    Literal(Literal),
    /// `[e1, ..., en]`
    Seq(Vec<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn var(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Var(name.into()), span)
    }

    pub fn builtin(builtin: Builtin, span: Span) -> Self {
        Self::new(ExprKind::Builtin(builtin), span)
    }

    pub fn literal(literal: Literal, span: Span) -> Self {
        Self::new(ExprKind::Literal(literal), span)
    }

    /// Apply `fun` to `args`, keeping the spine flat.
    pub fn app(fun: Expr, args: Vec<Arg>, span: Span) -> Self {
        if args.is_empty() {
            return fun;
        }
        match fun.kind {
            ExprKind::App(head, mut existing) => {
                existing.extend(args);
                Self::new(ExprKind::App(head, existing), span)
            }
            _ => Self::new(ExprKind::App(Box::new(fun), args), span),
        }
    }

    /// Apply a builtin to explicit arguments.
    pub fn app_builtin(builtin: Builtin, args: Vec<Expr>, span: Span) -> Self {
        Self::app(
            Self::builtin(builtin, span),
            args.into_iter().map(Arg::explicit).collect(),
            span,
        )
    }
}

/// Surface binder: `x`, `(x : T)`, `{x}`, `{x : T}`, or `_`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binder {
    pub span: Span,
    pub visibility: Visibility,
    /// `None` for `_`.
    pub name: Option<String>,
    /// `None` when the binder is unannotated; scope checking inserts a hole.
    pub ty: Option<Box<Expr>>,
}

impl Binder {
    pub fn new(span: Span, visibility: Visibility, name: Option<String>, ty: Option<Expr>) -> Self {
        Self {
            span,
            visibility,
            name,
            ty: ty.map(Box::new),
        }
    }
}

/// Surface argument: `e`, `{e}`, or `{{e}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    pub span: Span,
    pub visibility: Visibility,
    pub expr: Expr,
}

impl Arg {
    pub fn new(visibility: Visibility, expr: Expr) -> Self {
        Self {
            span: expr.span,
            visibility,
            expr,
        }
    }

    pub fn explicit(expr: Expr) -> Self {
        Self::new(Visibility::Explicit, expr)
    }
}

/// Surface declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    /// `network f : T ;`
    Network { span: Span, name: String, ty: Expr },
    /// `dataset d : T ;`
    Dataset { span: Span, name: String, ty: Expr },
    /// A signature/definition pair, or a `type` synonym.
    ///
    /// A definition without a signature carries a hole as its type, which
    /// makes the elaborator infer it from the body.
    Function {
        span: Span,
        name: String,
        ty: Expr,
        body: Expr,
    },
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Network { name, .. } | Decl::Dataset { name, .. } | Decl::Function { name, .. } => {
                name
            }
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Decl::Network { span, .. } | Decl::Dataset { span, .. } | Decl::Function { span, .. } => {
                *span
            }
        }
    }
}

/// A surface program: declarations in source order.
pub type Prog = Vec<Decl>;
