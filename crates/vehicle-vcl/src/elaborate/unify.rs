//! Structural unification.
//!
//! Operates on weak-head-normalised terms under the current substitution.
//! Rigid/rigid pairs decompose into sub-constraints, meta/rigid pairs extend
//! the substitution (occurs check, closed solutions only), flex/flex and
//! open-solution pairs defer.

use crate::ast::core::{Expr, ExprKind, MetaId};
use crate::ast::debruijn;
use crate::elaborate::context::{Constraint, ConstraintKind, MetaContext};
use crate::elaborate::solve::Progress;
use crate::elaborate::TypeError;
use crate::foundation::Span;

/// Attempt one unification step between `expected` and `actual`.
pub(crate) fn unify(
    metas: &mut MetaContext,
    expected: &Expr,
    actual: &Expr,
    span: Span,
) -> Result<Progress, TypeError> {
    let a = metas.whnf(expected);
    let b = metas.whnf(actual);

    match (&a.kind, &b.kind) {
        (ExprKind::Meta(m), ExprKind::Meta(n)) if m == n => Ok(Progress::discharged()),
        (ExprKind::Meta(m), _) => try_solve_meta(metas, *m, &b),
        (_, ExprKind::Meta(n)) => try_solve_meta(metas, *n, &a),
        _ if is_flex(&a) || is_flex(&b) => Ok(Progress::Stuck),

        (ExprKind::Type(l1), ExprKind::Type(l2)) => {
            rigid(l1 == l2, &a, &b, span)
        }
        (ExprKind::Var(v1), ExprKind::Var(v2)) => rigid(v1 == v2, &a, &b, span),
        (ExprKind::Builtin(b1), ExprKind::Builtin(b2)) => rigid(b1 == b2, &a, &b, span),
        (ExprKind::Literal(l1), ExprKind::Literal(l2)) => rigid(l1 == l2, &a, &b, span),

        (ExprKind::App(h1, args1), ExprKind::App(h2, args2)) => {
            if args1.len() != args2.len() {
                return Err(mismatch(&a, &b, span));
            }
            let mut subs = vec![sub_unify(h1, h2, span)];
            for (x, y) in args1.iter().zip(args2) {
                if x.visibility != y.visibility {
                    return Err(mismatch(&a, &b, span));
                }
                subs.push(sub_unify(&x.expr, &y.expr, span));
            }
            Ok(Progress::advanced(subs, Vec::new()))
        }

        (ExprKind::Pi(b1, r1), ExprKind::Pi(b2, r2)) => {
            if b1.visibility != b2.visibility {
                return Err(mismatch(&a, &b, span));
            }
            Ok(Progress::advanced(
                vec![sub_unify(&b1.ty, &b2.ty, span), sub_unify(r1, r2, span)],
                Vec::new(),
            ))
        }

        (ExprKind::Lam(b1, r1), ExprKind::Lam(b2, r2)) => {
            if b1.visibility != b2.visibility {
                return Err(mismatch(&a, &b, span));
            }
            Ok(Progress::advanced(
                vec![sub_unify(&b1.ty, &b2.ty, span), sub_unify(r1, r2, span)],
                Vec::new(),
            ))
        }

        (ExprKind::Seq(xs), ExprKind::Seq(ys)) => {
            if xs.len() != ys.len() {
                return Err(mismatch(&a, &b, span));
            }
            let subs = xs
                .iter()
                .zip(ys)
                .map(|(x, y)| sub_unify(x, y, span))
                .collect();
            Ok(Progress::advanced(subs, Vec::new()))
        }

        (ExprKind::PrimDict(x), ExprKind::PrimDict(y)) => {
            Ok(Progress::advanced(vec![sub_unify(x, y, span)], Vec::new()))
        }

        _ => Err(mismatch(&a, &b, span)),
    }
}

/// Solve `meta := solution` when the solution passes the occurs check and
/// is closed; otherwise defer the constraint.
fn try_solve_meta(
    metas: &mut MetaContext,
    meta: MetaId,
    solution: &Expr,
) -> Result<Progress, TypeError> {
    let solution = metas.zonk(solution);
    if debruijn::free_metas(&solution).contains(&meta) {
        return Ok(Progress::Stuck);
    }
    if !debruijn::is_closed(&solution) {
        return Ok(Progress::Stuck);
    }
    metas.solve(meta, solution);
    Ok(Progress::advanced(Vec::new(), vec![meta]))
}

/// A spine headed by an unsolved meta cannot be decomposed.
fn is_flex(expr: &Expr) -> bool {
    matches!(expr.decompose().0.kind, ExprKind::Meta(_))
}

fn rigid(matches: bool, a: &Expr, b: &Expr, span: Span) -> Result<Progress, TypeError> {
    if matches {
        Ok(Progress::discharged())
    } else {
        Err(mismatch(a, b, span))
    }
}

fn mismatch(expected: &Expr, actual: &Expr, span: Span) -> TypeError {
    TypeError::Mismatch {
        span,
        expected: expected.clone(),
        actual: actual.clone(),
    }
}

fn sub_unify(expected: &Expr, actual: &Expr, span: Span) -> Constraint {
    Constraint {
        span,
        kind: ConstraintKind::Unify {
            expected: expected.clone(),
            actual: actual.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builtin::Builtin;
    use crate::foundation::Span;

    fn sp() -> Span {
        Span::zero(0)
    }

    #[test]
    fn test_identical_builtins_discharge() {
        let mut metas = MetaContext::new();
        let nat = Expr::builtin(Builtin::Nat, sp());
        let progress = unify(&mut metas, &nat, &nat, sp()).unwrap();
        assert!(matches!(progress, Progress::Advanced { .. }));
    }

    #[test]
    fn test_rigid_mismatch_fails() {
        let mut metas = MetaContext::new();
        let nat = Expr::builtin(Builtin::Nat, sp());
        let real = Expr::builtin(Builtin::Real, sp());
        let err = unify(&mut metas, &nat, &real, sp()).unwrap_err();
        assert!(matches!(err, TypeError::Mismatch { .. }));
    }

    #[test]
    fn test_meta_solves_against_rigid() {
        let mut metas = MetaContext::new();
        let (id, meta) = metas.fresh(sp(), None);
        let nat = Expr::builtin(Builtin::Nat, sp());
        let progress = unify(&mut metas, &meta, &nat, sp()).unwrap();
        assert!(matches!(progress, Progress::Advanced { .. }));
        assert!(metas.is_solved(id));
    }

    #[test]
    fn test_occurs_check_defers() {
        let mut metas = MetaContext::new();
        let (_, meta) = metas.fresh(sp(), None);
        // ?0 ~ List ?0
        let looping = Expr::app(
            Expr::builtin(Builtin::List, sp()),
            vec![crate::ast::core::Arg::explicit(meta.clone())],
            sp(),
        );
        let progress = unify(&mut metas, &meta, &looping, sp()).unwrap();
        assert!(matches!(progress, Progress::Stuck));
    }

    #[test]
    fn test_open_solution_defers() {
        let mut metas = MetaContext::new();
        let (_, meta) = metas.fresh(sp(), None);
        let open = Expr::bound(0, sp());
        let progress = unify(&mut metas, &meta, &open, sp()).unwrap();
        assert!(matches!(progress, Progress::Stuck));
    }

    #[test]
    fn test_application_decomposes_pointwise() {
        let mut metas = MetaContext::new();
        let (_, meta) = metas.fresh(sp(), None);
        let list_meta = Expr::app(
            Expr::builtin(Builtin::List, sp()),
            vec![crate::ast::core::Arg::explicit(meta)],
            sp(),
        );
        let list_nat = Expr::app(
            Expr::builtin(Builtin::List, sp()),
            vec![crate::ast::core::Arg::explicit(Expr::builtin(
                Builtin::Nat,
                sp(),
            ))],
            sp(),
        );
        match unify(&mut metas, &list_meta, &list_nat, sp()).unwrap() {
            Progress::Advanced {
                new_constraints, ..
            } => assert_eq!(new_constraints.len(), 2),
            Progress::Stuck => panic!("expected decomposition"),
        }
    }

    #[test]
    fn test_flex_application_defers() {
        let mut metas = MetaContext::new();
        let (_, meta) = metas.fresh(sp(), None);
        let flex = Expr::app(
            meta,
            vec![crate::ast::core::Arg::explicit(Expr::builtin(
                Builtin::Nat,
                sp(),
            ))],
            sp(),
        );
        let nat = Expr::builtin(Builtin::Nat, sp());
        let progress = unify(&mut metas, &flex, &nat, sp()).unwrap();
        assert!(matches!(progress, Progress::Stuck));
    }
}
