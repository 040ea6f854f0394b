//! Bidirectional elaboration with meta-variables and type-class constraints.
//!
//! # What this pass does
//!
//! 1. **Checks and infers** every declaration with the two mutually
//!    recursive judgements of [`infer`]: `check(T, e)` and `infer(e)`.
//! 2. **Inserts implicit and instance arguments** wherever a function type
//!    has a leading non-explicit binder that the call site does not supply;
//!    inserted arguments are fresh meta-variables tagged `Origin::Machine`.
//! 3. **Accumulates constraints** (unification and type-class) instead of
//!    deciding anything eagerly, then runs the fixed-point solver in
//!    [`solve`] over the whole program.
//! 4. **Zonks** the result: every solved meta is replaced by its solution,
//!    and surviving holes or metas are reported.
//!
//! # Pipeline position
//!
//! ```text
//! Parse -> Scope -> Elaborate -> Normalise -> VNNLib
//!                   ^^^^^^^^^
//! ```

pub mod classes;
pub mod context;
pub mod infer;
pub mod solve;
mod unify;

use crate::ast::core::{Expr, ExprKind};
use crate::ast::debruijn;
use crate::ast::{Decl, Prog};
use crate::foundation::Span;
use context::{BoundEntry, Constraint, DeclContext, DeclEntry, MetaContext};
use thiserror::Error;
use tracing::debug;

/// Typing error.
#[derive(Debug, Clone, Error)]
pub enum TypeError {
    #[error("type mismatch: expected '{expected}', found '{actual}'")]
    Mismatch {
        span: Span,
        expected: Expr,
        actual: Expr,
    },
    #[error("expected an explicit argument of type '{expected}'")]
    MissingExplicitArg { span: Span, expected: Expr },
    #[error("expression of type '{actual}' is applied to an argument but is not a function")]
    NotAFunction { span: Span, actual: Expr },
    #[error("unresolved hole '?{name}'")]
    UnresolvedHole { span: Span, name: String },
    #[error("{} unsolved constraint(s) remain after type checking", constraints.len())]
    UnsolvedConstraints { constraints: Vec<UnsolvedConstraint> },
}

/// Rendering of one stuck constraint for an `UnsolvedConstraints` report.
#[derive(Debug, Clone)]
pub struct UnsolvedConstraint {
    pub span: Span,
    pub description: String,
}

impl TypeError {
    pub fn span(&self) -> Span {
        match self {
            TypeError::Mismatch { span, .. }
            | TypeError::MissingExplicitArg { span, .. }
            | TypeError::NotAFunction { span, .. }
            | TypeError::UnresolvedHole { span, .. } => *span,
            TypeError::UnsolvedConstraints { constraints } => constraints
                .first()
                .map(|c| c.span)
                .unwrap_or_else(|| Span::zero(0)),
        }
    }
}

/// Elaborator state: the read-only declaration context, the bound-variable
/// stack, and the mutable meta-context.
pub struct Elaborator {
    pub(crate) decls: DeclContext,
    pub(crate) bound: Vec<BoundEntry>,
    pub(crate) metas: MetaContext,
}

impl Elaborator {
    pub fn new() -> Self {
        Self {
            decls: DeclContext::new(),
            bound: Vec::new(),
            metas: MetaContext::new(),
        }
    }
}

impl Default for Elaborator {
    fn default() -> Self {
        Self::new()
    }
}

/// Elaborate a whole program.
///
/// Inference runs declaration by declaration; the constraint solver runs
/// once over the accumulated constraints of the whole program, then the
/// solution is applied everywhere.
pub fn elab_prog(prog: &Prog) -> Result<Prog, TypeError> {
    let mut elab = Elaborator::new();
    let mut out: Prog = Vec::with_capacity(prog.len());

    for decl in prog {
        debug!(decl = %decl.ident(), "elaborating declaration");
        match decl {
            Decl::Network { span, ident, ty } => {
                let ty = elab.check_is_type(ty)?;
                elab.decls.insert(
                    ident.clone(),
                    DeclEntry {
                        ty: ty.clone(),
                        body: None,
                    },
                );
                out.push(Decl::Network {
                    span: *span,
                    ident: ident.clone(),
                    ty,
                });
            }
            Decl::Dataset { span, ident, ty } => {
                let ty = elab.check_is_type(ty)?;
                elab.decls.insert(
                    ident.clone(),
                    DeclEntry {
                        ty: ty.clone(),
                        body: None,
                    },
                );
                out.push(Decl::Dataset {
                    span: *span,
                    ident: ident.clone(),
                    ty,
                });
            }
            Decl::Function {
                span,
                ident,
                ty,
                body,
            } => {
                // A hole in type position means "infer the type from the
                // body" (definitions without signatures, type synonyms).
                let (ty, body) = if matches!(ty.kind, ExprKind::Hole(_)) {
                    let (body, inferred) = elab.infer(body)?;
                    (inferred, body)
                } else {
                    let ty = elab.check_is_type(ty)?;
                    let body = elab.check(&ty, body)?;
                    (ty, body)
                };
                elab.decls.insert(
                    ident.clone(),
                    DeclEntry {
                        ty: ty.clone(),
                        body: Some(body.clone()),
                    },
                );
                out.push(Decl::Function {
                    span: *span,
                    ident: ident.clone(),
                    ty,
                    body,
                });
            }
        }
        debug_assert!(elab.bound.is_empty(), "bound context leaked across decls");
    }

    solve::solve(&mut elab.metas)?;

    // Apply the solution everywhere and reject surviving placeholders.
    let out: Prog = out
        .into_iter()
        .map(|decl| zonk_decl(&elab.metas, decl))
        .collect();
    check_no_placeholders(&elab.metas, &out)?;
    Ok(out)
}

fn zonk_decl(metas: &MetaContext, decl: Decl) -> Decl {
    match decl {
        Decl::Network { span, ident, ty } => Decl::Network {
            span,
            ident,
            ty: metas.zonk(&ty),
        },
        Decl::Dataset { span, ident, ty } => Decl::Dataset {
            span,
            ident,
            ty: metas.zonk(&ty),
        },
        Decl::Function {
            span,
            ident,
            ty,
            body,
        } => Decl::Function {
            span,
            ident,
            ty: metas.zonk(&ty),
            body: metas.zonk(&body),
        },
    }
}

/// After solving, the tree must be free of holes and metas: a surviving
/// meta that stands for a user hole is an `UnresolvedHole`, any other
/// survivor is reported as an unsolved constraint.
fn check_no_placeholders(metas: &MetaContext, prog: &Prog) -> Result<(), TypeError> {
    let mut unsolved = Vec::new();
    for decl in prog {
        let mut exprs: Vec<&Expr> = vec![decl.ty()];
        if let Some(body) = decl.body() {
            exprs.push(body);
        }
        for expr in exprs {
            for meta in debruijn::free_metas(expr) {
                let info = metas.info(meta);
                if let Some(name) = &info.hole_name {
                    return Err(TypeError::UnresolvedHole {
                        span: info.span,
                        name: name.clone(),
                    });
                }
                unsolved.push(UnsolvedConstraint {
                    span: info.span,
                    description: format!("ambiguous placeholder ?{}", meta),
                });
            }
        }
    }
    if unsolved.is_empty() {
        Ok(())
    } else {
        Err(TypeError::UnsolvedConstraints {
            constraints: unsolved,
        })
    }
}

impl Elaborator {
    /// Elaborate an expression that must denote a type: infer it and insist
    /// its sort is a universe.
    fn check_is_type(&mut self, expr: &Expr) -> Result<Expr, TypeError> {
        let (elaborated, sort) = self.infer(expr)?;
        let sort = self.metas.whnf(&sort);
        match sort.kind {
            ExprKind::Type(_) | ExprKind::Meta(_) => Ok(elaborated),
            _ => Err(TypeError::Mismatch {
                span: expr.span,
                expected: Expr::universe(0, expr.span),
                actual: sort,
            }),
        }
    }

    pub(crate) fn push_unify(&mut self, span: Span, expected: Expr, actual: Expr) {
        self.metas.push_constraint(Constraint {
            span,
            kind: context::ConstraintKind::Unify { expected, actual },
        });
    }

    pub(crate) fn push_class(&mut self, span: Span, meta: crate::ast::MetaId, class: Expr) {
        self.metas.push_constraint(Constraint {
            span,
            kind: context::ConstraintKind::Class { meta, class },
        });
    }
}
