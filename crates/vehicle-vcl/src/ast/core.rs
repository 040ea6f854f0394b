//! Locally-nameless core AST.
//!
//! Every pass after scope checking operates on this representation: bound
//! variables are de Bruijn indices, free variables are references to
//! top-level declarations. Binder names survive only as printing hints.
//!
//! # Invariants
//!
//! - Every [`App`](ExprKind::App) is in spine form: the head is never itself
//!   an `App` and the argument vector is non-empty. Construction goes through
//!   [`Expr::app`] which refolds nested applications.
//! - After elaboration no [`Hole`](ExprKind::Hole) remains and every
//!   [`Meta`](ExprKind::Meta) is solved.
//! - After normalisation no `Let` (other than network bindings), no `Ann`,
//!   and no redex remains.

use crate::ast::builtin::Builtin;
use crate::foundation::{Ident, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unification variable identifier, allocated by the elaborator.
pub type MetaId = usize;

/// Universe level of a `Type` expression.
pub type UniverseLevel = u32;

/// Whether the elaborator fills an argument in automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Written by the user at every call site.
    Explicit,
    /// Inserted by the elaborator as a fresh meta-variable.
    Implicit,
    /// Inserted by the elaborator and solved by type-class resolution.
    Instance,
}

/// Whether a binder or argument was written by the user or synthesised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    User,
    Machine,
}

/// Variable reference in the locally-nameless representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Var {
    /// Bound variable: distance in binders to its binding site.
    Bound(usize),
    /// Free variable: a top-level declaration.
    Free(Ident),
}

/// Typed literal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Nat(u64),
    Int(i64),
    Rat(f64),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Nat(n) => write!(f, "{}", n),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Rat(r) => write!(f, "{}", r),
            Literal::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Binder of a `Pi`, `Lam` or `Let`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binder {
    pub span: Span,
    pub origin: Origin,
    pub visibility: Visibility,
    /// `None` for anonymous machine binders; never matched by name lookup.
    pub name: Option<String>,
    /// Expected type of the bound variable.
    pub ty: Box<Expr>,
}

impl Binder {
    pub fn new(
        span: Span,
        origin: Origin,
        visibility: Visibility,
        name: Option<String>,
        ty: Expr,
    ) -> Self {
        Self {
            span,
            origin,
            visibility,
            name,
            ty: Box::new(ty),
        }
    }

    /// Machine-inserted explicit binder (used by the backend's quantifiers).
    pub fn machine(name: impl Into<String>, ty: Expr, span: Span) -> Self {
        Self::new(
            span,
            Origin::Machine,
            Visibility::Explicit,
            Some(name.into()),
            ty,
        )
    }
}

/// Argument of an `App`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    pub span: Span,
    pub origin: Origin,
    pub visibility: Visibility,
    pub expr: Expr,
}

impl Arg {
    pub fn new(span: Span, origin: Origin, visibility: Visibility, expr: Expr) -> Self {
        Self {
            span,
            origin,
            visibility,
            expr,
        }
    }

    /// User-written explicit argument.
    pub fn explicit(expr: Expr) -> Self {
        Self::new(expr.span, Origin::User, Visibility::Explicit, expr)
    }

    /// Machine-inserted argument of the given visibility.
    pub fn machine(visibility: Visibility, expr: Expr) -> Self {
        Self::new(expr.span, Origin::Machine, visibility, expr)
    }
}

/// Core expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// The thirteen expression forms of the core language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// The `l`-th type universe.
    Type(UniverseLevel),
    /// Bound or free variable.
    Var(Var),
    /// Unification variable, to be solved by the constraint solver.
    Meta(MetaId),
    /// User-written `?name`; rejected after elaboration.
    Hole(String),
    /// Application in spine form (head is not an `App`, args non-empty).
    App(Box<Expr>, Vec<Arg>),
    /// Dependent function type.
    Pi(Box<Binder>, Box<Expr>),
    /// Abstraction.
    Lam(Box<Binder>, Box<Expr>),
    /// Non-recursive local definition: value, binder, body.
    Let(Box<Expr>, Box<Binder>, Box<Expr>),
    /// Explicit type annotation.
    Ann(Box<Expr>, Box<Expr>),
    /// Primitive symbol.
    Builtin(Builtin),
    /// Typed literal.
    Literal(Literal),
    /// List/tensor literal.
    Seq(Vec<Expr>),
    /// Elaborated type-class dictionary.
    PrimDict(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn universe(level: UniverseLevel, span: Span) -> Self {
        Self::new(ExprKind::Type(level), span)
    }

    pub fn bound(index: usize, span: Span) -> Self {
        Self::new(ExprKind::Var(Var::Bound(index)), span)
    }

    pub fn free(ident: Ident, span: Span) -> Self {
        Self::new(ExprKind::Var(Var::Free(ident)), span)
    }

    pub fn meta(id: MetaId, span: Span) -> Self {
        Self::new(ExprKind::Meta(id), span)
    }

    pub fn builtin(builtin: Builtin, span: Span) -> Self {
        Self::new(ExprKind::Builtin(builtin), span)
    }

    pub fn literal(literal: Literal, span: Span) -> Self {
        Self::new(ExprKind::Literal(literal), span)
    }

    pub fn pi(binder: Binder, body: Expr, span: Span) -> Self {
        Self::new(ExprKind::Pi(Box::new(binder), Box::new(body)), span)
    }

    pub fn lam(binder: Binder, body: Expr, span: Span) -> Self {
        Self::new(ExprKind::Lam(Box::new(binder), Box::new(body)), span)
    }

    pub fn let_in(value: Expr, binder: Binder, body: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Let(Box::new(value), Box::new(binder), Box::new(body)),
            span,
        )
    }

    /// Apply `fun` to `args`, refolding so the result stays in spine form.
    ///
    /// Applying to an empty argument list returns `fun` unchanged; applying
    /// an existing application appends to its spine.
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

    /// Apply a builtin to machine-built explicit arguments.
    pub fn app_builtin(builtin: Builtin, args: Vec<Expr>, span: Span) -> Self {
        Self::app(
            Self::builtin(builtin, span),
            args.into_iter().map(Arg::explicit).collect(),
            span,
        )
    }

    /// View the head and spine of an application; a non-application is a
    /// head with an empty spine.
    pub fn decompose(&self) -> (&Expr, &[Arg]) {
        match &self.kind {
            ExprKind::App(head, args) => (head, args),
            _ => (self, &[]),
        }
    }

    /// Owned variant of [`decompose`](Self::decompose).
    pub fn into_spine(self) -> (Expr, Vec<Arg>) {
        match self.kind {
            ExprKind::App(head, args) => (*head, args),
            _ => (self, Vec::new()),
        }
    }

    /// The builtin at the head of this expression, if any.
    pub fn builtin_head(&self) -> Option<Builtin> {
        match &self.decompose().0.kind {
            ExprKind::Builtin(b) => Some(*b),
            _ => None,
        }
    }

    /// The free identifier at the head of this expression, if any.
    pub fn free_head(&self) -> Option<&Ident> {
        match &self.decompose().0.kind {
            ExprKind::Var(Var::Free(ident)) => Some(ident),
            _ => None,
        }
    }
}

/// Explicit arguments of a spine, in order.
pub fn explicit_args(args: &[Arg]) -> impl Iterator<Item = &Expr> {
    args.iter()
        .filter(|a| a.visibility == Visibility::Explicit)
        .map(|a| &a.expr)
}

// Compact rendering for diagnostics. Not a pretty-printer: binder names are
// printing hints only and bound variables render as `#i` when anonymous.

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprKind::Type(l) => write!(f, "Type {}", l),
            ExprKind::Var(Var::Bound(i)) => write!(f, "#{}", i),
            ExprKind::Var(Var::Free(ident)) => write!(f, "{}", ident),
            ExprKind::Meta(m) => write!(f, "?{}", m),
            ExprKind::Hole(name) => write!(f, "?{}", name),
            ExprKind::App(head, args) => {
                write!(f, "({}", head)?;
                for arg in args {
                    match arg.visibility {
                        Visibility::Explicit => write!(f, " {}", arg.expr)?,
                        Visibility::Implicit => write!(f, " {{{}}}", arg.expr)?,
                        Visibility::Instance => write!(f, " {{{{{}}}}}", arg.expr)?,
                    }
                }
                write!(f, ")")
            }
            ExprKind::Pi(binder, body) => match (&binder.name, binder.visibility) {
                (None, Visibility::Explicit) => write!(f, "({} -> {})", binder.ty, body),
                (None, _) => write!(f, "({{{}}} -> {})", binder.ty, body),
                (Some(name), Visibility::Explicit) => {
                    write!(f, "(forall ({} : {}) . {})", name, binder.ty, body)
                }
                (Some(name), _) => write!(f, "(forall {{{} : {}}} . {})", name, binder.ty, body),
            },
            ExprKind::Lam(binder, body) => {
                write!(
                    f,
                    "(\\{} -> {})",
                    binder.name.as_deref().unwrap_or("_"),
                    body
                )
            }
            ExprKind::Let(value, binder, body) => {
                write!(
                    f,
                    "(let {} = {} in {})",
                    binder.name.as_deref().unwrap_or("_"),
                    value,
                    body
                )
            }
            ExprKind::Ann(e, ty) => write!(f, "({} : {})", e, ty),
            ExprKind::Builtin(b) => write!(f, "{}", b),
            ExprKind::Literal(l) => write!(f, "{}", l),
            ExprKind::Seq(xs) => {
                write!(f, "[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", x)?;
                }
                write!(f, "]")
            }
            ExprKind::PrimDict(e) => write!(f, "(dict {})", e),
        }
    }
}
