//! Scope checking: named surface AST to locally-nameless core AST.
//!
//! # What this pass does
//!
//! 1. Resolves every variable reference: local binders become de Bruijn
//!    indices (distance to the binder), top-level declarations become free
//!    identifier references.
//! 2. Destroys the named representation; no later pass sees a name except
//!    as a printing hint on binders.
//!
//! # Scoping rules
//!
//! - Locals are looked up innermost-first, so binders shadow outer binders
//!   and declarations.
//! - A declaration's identifier is committed only AFTER its own type and
//!   body are checked: definitions are not recursive.
//! - Anonymous binders (`_`) push a sentinel that never matches a lookup.

use crate::ast::core::{self, Origin};
use crate::ast::surface;
use crate::ast::{Decl, Prog};
use crate::foundation::{Ident, Span};
use indexmap::IndexSet;
use thiserror::Error;

/// Scope checking error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScopeError {
    #[error("unbound name '{name}'")]
    UnboundName { name: String, span: Span },
}

impl ScopeError {
    pub fn span(&self) -> Span {
        match self {
            ScopeError::UnboundName { span, .. } => *span,
        }
    }
}

/// Stack of locally bound names, innermost last.
#[derive(Debug, Default)]
struct Locals {
    stack: Vec<Option<String>>,
}

impl Locals {
    fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, name: Option<String>) {
        self.stack.push(name);
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    /// De Bruijn index of `name`: distance from the top of the stack.
    fn lookup(&self, name: &str) -> Option<usize> {
        self.stack
            .iter()
            .rev()
            .position(|entry| entry.as_deref() == Some(name))
    }
}

/// Scope-check a whole program.
pub fn scope_prog(prog: &surface::Prog) -> Result<Prog, ScopeError> {
    let mut decls: IndexSet<Ident> = IndexSet::new();
    let mut out = Vec::new();

    for decl in prog {
        let mut locals = Locals::new();
        match decl {
            surface::Decl::Network { span, name, ty } => {
                let ty = scope_expr(ty, &mut locals, &decls)?;
                let ident = Ident::new(name.clone());
                out.push(Decl::Network {
                    span: *span,
                    ident: ident.clone(),
                    ty,
                });
                decls.insert(ident);
            }
            surface::Decl::Dataset { span, name, ty } => {
                let ty = scope_expr(ty, &mut locals, &decls)?;
                let ident = Ident::new(name.clone());
                out.push(Decl::Dataset {
                    span: *span,
                    ident: ident.clone(),
                    ty,
                });
                decls.insert(ident);
            }
            surface::Decl::Function {
                span,
                name,
                ty,
                body,
            } => {
                // Type and body are both checked before the identifier is
                // committed, so a definition cannot see itself.
                let ty = scope_expr(ty, &mut locals, &decls)?;
                let body = scope_expr(body, &mut locals, &decls)?;
                let ident = Ident::new(name.clone());
                out.push(Decl::Function {
                    span: *span,
                    ident: ident.clone(),
                    ty,
                    body,
                });
                decls.insert(ident);
            }
        }
    }

    Ok(out)
}

fn scope_expr(
    expr: &surface::Expr,
    locals: &mut Locals,
    decls: &IndexSet<Ident>,
) -> Result<core::Expr, ScopeError> {
    let span = expr.span;
    let kind = match &expr.kind {
        surface::ExprKind::Type(level) => core::ExprKind::Type(*level),
        surface::ExprKind::Var(name) => {
            if let Some(index) = locals.lookup(name) {
                core::ExprKind::Var(core::Var::Bound(index))
            } else if decls.contains(&Ident::new(name.clone())) {
                core::ExprKind::Var(core::Var::Free(Ident::new(name.clone())))
            } else {
                return Err(ScopeError::UnboundName {
                    name: name.clone(),
                    span,
                });
            }
        }
        surface::ExprKind::Hole(name) => core::ExprKind::Hole(name.clone()),
        surface::ExprKind::App(head, args) => {
            let head = scope_expr(head, locals, decls)?;
            let mut scoped_args = Vec::with_capacity(args.len());
            for arg in args {
                scoped_args.push(core::Arg::new(
                    arg.span,
                    Origin::User,
                    arg.visibility,
                    scope_expr(&arg.expr, locals, decls)?,
                ));
            }
            return Ok(core::Expr::app(head, scoped_args, span));
        }
        surface::ExprKind::Pi(binder, body) => {
            let binder = scope_binder(binder, locals, decls)?;
            locals.push(binder.name.clone());
            let body = scope_expr(body, locals, decls);
            locals.pop();
            core::ExprKind::Pi(Box::new(binder), Box::new(body?))
        }
        surface::ExprKind::Lam(binder, body) => {
            let binder = scope_binder(binder, locals, decls)?;
            locals.push(binder.name.clone());
            let body = scope_expr(body, locals, decls);
            locals.pop();
            core::ExprKind::Lam(Box::new(binder), Box::new(body?))
        }
        surface::ExprKind::Let(value, binder, body) => {
            let value = scope_expr(value, locals, decls)?;
            let binder = scope_binder(binder, locals, decls)?;
            locals.push(binder.name.clone());
            let body = scope_expr(body, locals, decls);
            locals.pop();
            core::ExprKind::Let(Box::new(value), Box::new(binder), Box::new(body?))
        }
        surface::ExprKind::Builtin(builtin) => core::ExprKind::Builtin(*builtin),
        surface::ExprKind::Literal(literal) => core::ExprKind::Literal(*literal),
        surface::ExprKind::Seq(elements) => {
            let mut scoped = Vec::with_capacity(elements.len());
            for element in elements {
                scoped.push(scope_expr(element, locals, decls)?);
            }
            core::ExprKind::Seq(scoped)
        }
    };
    Ok(core::Expr::new(kind, span))
}

/// Scope a binder's annotation. An unannotated binder gets a hole so the
/// elaborator infers the type.
fn scope_binder(
    binder: &surface::Binder,
    locals: &mut Locals,
    decls: &IndexSet<Ident>,
) -> Result<core::Binder, ScopeError> {
    let ty = match &binder.ty {
        Some(ty) => scope_expr(ty, locals, decls)?,
        None => core::Expr::new(
            core::ExprKind::Hole(binder.name.clone().unwrap_or_else(|| "_".to_string())),
            binder.span,
        ),
    };
    Ok(core::Binder::new(
        binder.span,
        Origin::User,
        binder.visibility,
        binder.name.clone(),
        ty,
    ))
}
