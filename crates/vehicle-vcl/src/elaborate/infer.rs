//! The bidirectional judgements: `check(T, e)` and `infer(e)`.
//!
//! `check` is directed by the head shape of the expected type and the term;
//! everything it cannot handle falls through to `infer` followed by a
//! unification constraint (`via_infer`). `infer_app` is the single source of
//! machine-inserted arguments: it walks a function type against the supplied
//! spine, inserting a fresh meta for every leading implicit or instance
//! binder the user did not supply.

use crate::ast::builtin;
use crate::ast::core::{Arg, Binder, Expr, ExprKind, Origin, Var, Visibility};
use crate::ast::debruijn;
use crate::elaborate::context::BoundEntry;
use crate::elaborate::{Elaborator, TypeError};
use crate::foundation::Span;

impl Elaborator {
    /// Check `expr` against the expected type, producing the elaborated
    /// term.
    pub fn check(&mut self, expected: &Expr, expr: &Expr) -> Result<Expr, TypeError> {
        let expected = self.metas.whnf(expected);
        match (&expected.kind, &expr.kind) {
            // A lambda against a matching Pi: check the binder annotation,
            // then the body under the extended context.
            (ExprKind::Pi(pi_binder, codomain), ExprKind::Lam(lam_binder, body))
                if pi_binder.visibility == lam_binder.visibility =>
            {
                let binder_ty = match &lam_binder.ty.kind {
                    // Unannotated binder: adopt the Pi's domain.
                    ExprKind::Hole(_) => (*pi_binder.ty).clone(),
                    _ => {
                        let annotated = self.check_is_type_expr(&lam_binder.ty)?;
                        self.push_unify(
                            lam_binder.span,
                            (*pi_binder.ty).clone(),
                            annotated.clone(),
                        );
                        annotated
                    }
                };
                self.bound.push(BoundEntry {
                    name: lam_binder.name.clone(),
                    ty: binder_ty.clone(),
                });
                let body = self.check(codomain, body);
                self.bound.pop();
                let binder = Binder::new(
                    lam_binder.span,
                    lam_binder.origin,
                    lam_binder.visibility,
                    lam_binder.name.clone(),
                    binder_ty,
                );
                Ok(Expr::lam(binder, body?, expr.span))
            }

            // An implicit or instance Pi against anything else: insert a
            // machine lambda and check the lifted term underneath it.
            (ExprKind::Pi(pi_binder, codomain), _)
                if pi_binder.visibility != Visibility::Explicit =>
            {
                let lifted = debruijn::lift(expr, 1);
                self.bound.push(BoundEntry {
                    name: pi_binder.name.clone(),
                    ty: (*pi_binder.ty).clone(),
                });
                let body = self.check(codomain, &lifted);
                self.bound.pop();
                let binder = Binder::new(
                    expr.span,
                    Origin::Machine,
                    pi_binder.visibility,
                    pi_binder.name.clone(),
                    (*pi_binder.ty).clone(),
                );
                Ok(Expr::lam(binder, body?, expr.span))
            }

            // A hole: allocate a meta at the expected type. It survives to
            // the end only as an `UnresolvedHole` error.
            (_, ExprKind::Hole(name)) => {
                let (_, meta) = self.metas.fresh(expr.span, Some(name.clone()));
                Ok(meta)
            }

            _ => self.via_infer(&expected, expr),
        }
    }

    /// `infer` then constrain the result against the expected type, firing
    /// trailing implicit insertion first.
    fn via_infer(&mut self, expected: &Expr, expr: &Expr) -> Result<Expr, TypeError> {
        let (elaborated, ty) = self.infer(expr)?;
        let (elaborated, ty) = self.infer_app(elaborated, ty, &[], expr.span)?;
        self.push_unify(expr.span, expected.clone(), ty);
        Ok(elaborated)
    }

    /// Synthesise a type for `expr`.
    pub fn infer(&mut self, expr: &Expr) -> Result<(Expr, Expr), TypeError> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Type(level) => {
                Ok((expr.clone(), Expr::universe(level + 1, span)))
            }

            ExprKind::Var(Var::Bound(index)) => {
                let entry = self
                    .bound
                    .iter()
                    .rev()
                    .nth(*index)
                    .unwrap_or_else(|| panic!("BUG: unbound de Bruijn index {}", index));
                // The stored type lives in the context it was pushed in;
                // lift it past the binders in between (and itself).
                let ty = debruijn::lift(&entry.ty, index + 1);
                Ok((expr.clone(), ty))
            }

            ExprKind::Var(Var::Free(ident)) => {
                let entry = self
                    .decls
                    .get(ident)
                    .unwrap_or_else(|| panic!("BUG: unscoped identifier '{}'", ident));
                Ok((expr.clone(), entry.ty.clone()))
            }

            ExprKind::Meta(_) => {
                panic!("BUG: meta-variable in elaborator input")
            }

            // A hole in synthesis position: one meta for the term, one for
            // its (unknown) type.
            ExprKind::Hole(name) => {
                let (_, term) = self.metas.fresh(span, Some(name.clone()));
                let (_, ty) = self.metas.fresh(span, None);
                Ok((term, ty))
            }

            ExprKind::App(fun, args) => {
                let (fun, fun_ty) = self.infer(fun)?;
                self.infer_app(fun, fun_ty, args, span)
            }

            ExprKind::Pi(binder, codomain) => {
                let (binder_ty, domain_level) = self.infer_binder_ty(binder)?;
                self.bound.push(BoundEntry {
                    name: binder.name.clone(),
                    ty: binder_ty.clone(),
                });
                let codomain_result = self.infer(codomain);
                self.bound.pop();
                let (codomain, codomain_sort) = codomain_result?;
                let codomain_level = self.universe_level(&codomain_sort);
                let out_binder = Binder::new(
                    binder.span,
                    binder.origin,
                    binder.visibility,
                    binder.name.clone(),
                    binder_ty,
                );
                Ok((
                    Expr::pi(out_binder, codomain, span),
                    Expr::universe(domain_level.max(codomain_level), span),
                ))
            }

            ExprKind::Lam(binder, body) => {
                let (binder_ty, _) = self.infer_binder_ty(binder)?;
                self.bound.push(BoundEntry {
                    name: binder.name.clone(),
                    ty: binder_ty.clone(),
                });
                let body_result = self.infer(body);
                self.bound.pop();
                let (body, body_ty) = body_result?;
                let out_binder = Binder::new(
                    binder.span,
                    binder.origin,
                    binder.visibility,
                    binder.name.clone(),
                    binder_ty,
                );
                let pi = Expr::pi(out_binder.clone(), body_ty, span);
                Ok((Expr::lam(out_binder, body, span), pi))
            }

            ExprKind::Let(value, binder, body) => {
                let (value, binder_ty) = match &binder.ty.kind {
                    // No annotation: the bound value's type is the binder's.
                    ExprKind::Hole(_) => self.infer(value)?,
                    _ => {
                        let annotated = self.check_is_type_expr(&binder.ty)?;
                        let value = self.check(&annotated, value)?;
                        (value, annotated)
                    }
                };
                self.bound.push(BoundEntry {
                    name: binder.name.clone(),
                    ty: binder_ty.clone(),
                });
                let body_result = self.infer(body);
                self.bound.pop();
                let (body, body_ty) = body_result?;
                let out_binder = Binder::new(
                    binder.span,
                    binder.origin,
                    binder.visibility,
                    binder.name.clone(),
                    binder_ty,
                );
                // The body's type may mention the bound variable.
                let result_ty = debruijn::subst(&value, &body_ty);
                Ok((
                    Expr::let_in(value, out_binder, body, span),
                    result_ty,
                ))
            }

            ExprKind::Ann(inner, ty) => {
                let ty = self.check_is_type_expr(ty)?;
                let inner = self.check(&ty, inner)?;
                Ok((inner, ty))
            }

            ExprKind::Builtin(op) => Ok((expr.clone(), builtin::type_of(*op))),

            ExprKind::Literal(literal) => {
                Ok((expr.clone(), builtin::type_of_literal(literal)))
            }

            ExprKind::Seq(elements) => {
                let (_, elem_ty) = self.metas.fresh(span, None);
                let (_, container_ty) = self.metas.fresh(span, None);
                let mut out = Vec::with_capacity(elements.len());
                for element in elements {
                    let (element, ty) = self.infer(element)?;
                    let (element, ty) = self.infer_app(element, ty, &[], span)?;
                    self.push_unify(element.span, elem_ty.clone(), ty);
                    out.push(element);
                }
                let (dict, _) = self.metas.fresh(span, None);
                let class = Expr::app_builtin(
                    builtin::Builtin::IsContainer,
                    vec![elem_ty, container_ty.clone()],
                    span,
                );
                self.push_class(span, dict, class);
                Ok((Expr::new(ExprKind::Seq(out), span), container_ty))
            }

            // A dictionary is typed by the class application it witnesses;
            // this only occurs when re-checking already-elaborated terms.
            ExprKind::PrimDict(class) => Ok((expr.clone(), (**class).clone())),
        }
    }

    /// Walk a function type against an argument spine, checking matching
    /// arguments and inserting metas for leading implicit/instance binders.
    ///
    /// Called with an empty spine this performs trailing implicit insertion
    /// (`via_infer`). Returns the applied expression and its type.
    pub fn infer_app(
        &mut self,
        fun: Expr,
        fun_ty: Expr,
        args: &[Arg],
        span: Span,
    ) -> Result<(Expr, Expr), TypeError> {
        let mut out_args: Vec<Arg> = Vec::with_capacity(args.len());
        let mut ty = self.metas.whnf(&fun_ty);
        let mut remaining = args.iter();
        let mut next = remaining.next();

        loop {
            match ty.kind.clone() {
                ExprKind::Pi(binder, codomain) => {
                    if let Some(arg) = next {
                        if arg.visibility == binder.visibility {
                            let checked = self.check(&binder.ty, &arg.expr)?;
                            ty = self.metas.whnf(&debruijn::subst(&checked, &codomain));
                            out_args.push(Arg::new(
                                arg.span,
                                arg.origin,
                                arg.visibility,
                                checked,
                            ));
                            next = remaining.next();
                            continue;
                        }
                        if binder.visibility == Visibility::Explicit {
                            // The user supplied an implicit/instance argument
                            // where an explicit one is expected.
                            return Err(TypeError::MissingExplicitArg {
                                span: arg.span,
                                expected: (*binder.ty).clone(),
                            });
                        }
                        // fall through: insert for the non-explicit binder
                    } else if binder.visibility == Visibility::Explicit {
                        // Partial application: stop at the first unapplied
                        // explicit binder.
                        break;
                    }

                    let (meta_id, meta) = self.metas.fresh(span, None);
                    if binder.visibility == Visibility::Instance {
                        self.push_class(span, meta_id, (*binder.ty).clone());
                    }
                    ty = self.metas.whnf(&debruijn::subst(&meta, &codomain));
                    out_args.push(Arg::machine(binder.visibility, meta));
                }
                _ => {
                    if next.is_some() {
                        return Err(TypeError::NotAFunction { span, actual: ty });
                    }
                    break;
                }
            }
        }

        Ok((Expr::app(fun, out_args, span), ty))
    }

    /// Elaborate a binder annotation: a hole becomes a fresh meta, anything
    /// else must be a type.
    fn infer_binder_ty(&mut self, binder: &Binder) -> Result<(Expr, u32), TypeError> {
        match &binder.ty.kind {
            ExprKind::Hole(_) => {
                let (_, meta) = self.metas.fresh(binder.span, None);
                Ok((meta, 0))
            }
            _ => {
                let (ty, sort) = self.infer(&binder.ty)?;
                let level = self.universe_level(&sort);
                Ok((ty, level))
            }
        }
    }

    /// Like [`Elaborator::check_is_type`] but private to the judgements.
    fn check_is_type_expr(&mut self, expr: &Expr) -> Result<Expr, TypeError> {
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

    /// Universe level of a sort, defaulting to zero when it is not (yet) a
    /// literal universe.
    fn universe_level(&self, sort: &Expr) -> u32 {
        match self.metas.whnf(sort).kind {
            ExprKind::Type(level) => level,
            _ => 0,
        }
    }
}
