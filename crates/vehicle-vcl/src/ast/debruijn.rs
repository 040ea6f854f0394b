//! De Bruijn operations over the core AST.
//!
//! Capture-avoiding substitution and lifting, free-identifier and free-meta
//! collection, and alpha-equivalence. These are the only traversals allowed
//! to touch bound-variable indices; every other pass goes through them.

use crate::ast::core::{Arg, Binder, Expr, ExprKind, MetaId, Var};
use crate::foundation::Ident;
use indexmap::IndexSet;

/// Add `amount` to every bound index of `expr` that points outside of it.
pub fn lift(expr: &Expr, amount: usize) -> Expr {
    if amount == 0 {
        return expr.clone();
    }
    lift_from(expr, amount, 0)
}

/// Add `amount` to every bound index `>= cutoff`.
pub fn lift_from(expr: &Expr, amount: usize, cutoff: usize) -> Expr {
    let kind = match &expr.kind {
        ExprKind::Var(Var::Bound(i)) if *i >= cutoff => ExprKind::Var(Var::Bound(i + amount)),
        ExprKind::Var(_)
        | ExprKind::Type(_)
        | ExprKind::Meta(_)
        | ExprKind::Hole(_)
        | ExprKind::Builtin(_)
        | ExprKind::Literal(_) => return expr.clone(),
        ExprKind::App(head, args) => ExprKind::App(
            Box::new(lift_from(head, amount, cutoff)),
            args.iter()
                .map(|a| map_arg(a, |e| lift_from(e, amount, cutoff)))
                .collect(),
        ),
        ExprKind::Pi(binder, body) => ExprKind::Pi(
            Box::new(map_binder(binder, |t| lift_from(t, amount, cutoff))),
            Box::new(lift_from(body, amount, cutoff + 1)),
        ),
        ExprKind::Lam(binder, body) => ExprKind::Lam(
            Box::new(map_binder(binder, |t| lift_from(t, amount, cutoff))),
            Box::new(lift_from(body, amount, cutoff + 1)),
        ),
        ExprKind::Let(value, binder, body) => ExprKind::Let(
            Box::new(lift_from(value, amount, cutoff)),
            Box::new(map_binder(binder, |t| lift_from(t, amount, cutoff))),
            Box::new(lift_from(body, amount, cutoff + 1)),
        ),
        ExprKind::Ann(e, ty) => ExprKind::Ann(
            Box::new(lift_from(e, amount, cutoff)),
            Box::new(lift_from(ty, amount, cutoff)),
        ),
        ExprKind::Seq(xs) => {
            ExprKind::Seq(xs.iter().map(|e| lift_from(e, amount, cutoff)).collect())
        }
        ExprKind::PrimDict(e) => ExprKind::PrimDict(Box::new(lift_from(e, amount, cutoff))),
    };
    Expr::new(kind, expr.span)
}

/// Replace the outermost bound variable of `body` with `value`.
///
/// Crossing a binder lifts `value` by one and raises the cutoff; indices
/// strictly above the cutoff are decremented to close the hole left by the
/// removed binder. Meta-variables, holes, builtins and literals are left
/// intact.
pub fn subst(value: &Expr, body: &Expr) -> Expr {
    subst_at(value, body, 0)
}

fn subst_at(value: &Expr, body: &Expr, depth: usize) -> Expr {
    let kind = match &body.kind {
        ExprKind::Var(Var::Bound(i)) => {
            if *i == depth {
                return lift(value, depth);
            } else if *i > depth {
                ExprKind::Var(Var::Bound(i - 1))
            } else {
                return body.clone();
            }
        }
        ExprKind::Var(_)
        | ExprKind::Type(_)
        | ExprKind::Meta(_)
        | ExprKind::Hole(_)
        | ExprKind::Builtin(_)
        | ExprKind::Literal(_) => return body.clone(),
        ExprKind::App(head, args) => ExprKind::App(
            Box::new(subst_at(value, head, depth)),
            args.iter()
                .map(|a| map_arg(a, |e| subst_at(value, e, depth)))
                .collect(),
        ),
        ExprKind::Pi(binder, b) => ExprKind::Pi(
            Box::new(map_binder(binder, |t| subst_at(value, t, depth))),
            Box::new(subst_at(value, b, depth + 1)),
        ),
        ExprKind::Lam(binder, b) => ExprKind::Lam(
            Box::new(map_binder(binder, |t| subst_at(value, t, depth))),
            Box::new(subst_at(value, b, depth + 1)),
        ),
        ExprKind::Let(v, binder, b) => ExprKind::Let(
            Box::new(subst_at(value, v, depth)),
            Box::new(map_binder(binder, |t| subst_at(value, t, depth))),
            Box::new(subst_at(value, b, depth + 1)),
        ),
        ExprKind::Ann(e, ty) => ExprKind::Ann(
            Box::new(subst_at(value, e, depth)),
            Box::new(subst_at(value, ty, depth)),
        ),
        ExprKind::Seq(xs) => ExprKind::Seq(xs.iter().map(|e| subst_at(value, e, depth)).collect()),
        ExprKind::PrimDict(e) => ExprKind::PrimDict(Box::new(subst_at(value, e, depth))),
    };
    Expr::new(kind, body.span)
}

fn map_binder(binder: &Binder, f: impl FnOnce(&Expr) -> Expr) -> Binder {
    Binder {
        span: binder.span,
        origin: binder.origin,
        visibility: binder.visibility,
        name: binder.name.clone(),
        ty: Box::new(f(&binder.ty)),
    }
}

fn map_arg(arg: &Arg, f: impl FnOnce(&Expr) -> Expr) -> Arg {
    Arg {
        span: arg.span,
        origin: arg.origin,
        visibility: arg.visibility,
        expr: f(&arg.expr),
    }
}

/// Free identifiers referenced by `expr`, in first-occurrence order.
///
/// The ordering is semantic: the VNNLib backend derives the meta-network
/// from it.
pub fn free_idents(expr: &Expr) -> IndexSet<Ident> {
    let mut out = IndexSet::new();
    collect_free_idents(expr, &mut out);
    out
}

fn collect_free_idents(expr: &Expr, out: &mut IndexSet<Ident>) {
    match &expr.kind {
        ExprKind::Var(Var::Free(ident)) => {
            out.insert(ident.clone());
        }
        ExprKind::Var(_)
        | ExprKind::Type(_)
        | ExprKind::Meta(_)
        | ExprKind::Hole(_)
        | ExprKind::Builtin(_)
        | ExprKind::Literal(_) => {}
        ExprKind::App(head, args) => {
            collect_free_idents(head, out);
            for a in args {
                collect_free_idents(&a.expr, out);
            }
        }
        ExprKind::Pi(binder, body) | ExprKind::Lam(binder, body) => {
            collect_free_idents(&binder.ty, out);
            collect_free_idents(body, out);
        }
        ExprKind::Let(value, binder, body) => {
            collect_free_idents(value, out);
            collect_free_idents(&binder.ty, out);
            collect_free_idents(body, out);
        }
        ExprKind::Ann(e, ty) => {
            collect_free_idents(e, out);
            collect_free_idents(ty, out);
        }
        ExprKind::Seq(xs) => {
            for e in xs {
                collect_free_idents(e, out);
            }
        }
        ExprKind::PrimDict(e) => collect_free_idents(e, out),
    }
}

/// Meta-variables occurring in `expr`.
pub fn free_metas(expr: &Expr) -> IndexSet<MetaId> {
    let mut out = IndexSet::new();
    collect_free_metas(expr, &mut out);
    out
}

fn collect_free_metas(expr: &Expr, out: &mut IndexSet<MetaId>) {
    match &expr.kind {
        ExprKind::Meta(m) => {
            out.insert(*m);
        }
        ExprKind::Var(_)
        | ExprKind::Type(_)
        | ExprKind::Hole(_)
        | ExprKind::Builtin(_)
        | ExprKind::Literal(_) => {}
        ExprKind::App(head, args) => {
            collect_free_metas(head, out);
            for a in args {
                collect_free_metas(&a.expr, out);
            }
        }
        ExprKind::Pi(binder, body) | ExprKind::Lam(binder, body) => {
            collect_free_metas(&binder.ty, out);
            collect_free_metas(body, out);
        }
        ExprKind::Let(value, binder, body) => {
            collect_free_metas(value, out);
            collect_free_metas(&binder.ty, out);
            collect_free_metas(body, out);
        }
        ExprKind::Ann(e, ty) => {
            collect_free_metas(e, out);
            collect_free_metas(ty, out);
        }
        ExprKind::Seq(xs) => {
            for e in xs {
                collect_free_metas(e, out);
            }
        }
        ExprKind::PrimDict(e) => collect_free_metas(e, out),
    }
}

/// True when no bound index of `expr` points outside of it.
pub fn is_closed(expr: &Expr) -> bool {
    !has_escaping_bound(expr, 0)
}

fn has_escaping_bound(expr: &Expr, depth: usize) -> bool {
    match &expr.kind {
        ExprKind::Var(Var::Bound(i)) => *i >= depth,
        ExprKind::Var(_)
        | ExprKind::Type(_)
        | ExprKind::Meta(_)
        | ExprKind::Hole(_)
        | ExprKind::Builtin(_)
        | ExprKind::Literal(_) => false,
        ExprKind::App(head, args) => {
            has_escaping_bound(head, depth)
                || args.iter().any(|a| has_escaping_bound(&a.expr, depth))
        }
        ExprKind::Pi(binder, body) | ExprKind::Lam(binder, body) => {
            has_escaping_bound(&binder.ty, depth) || has_escaping_bound(body, depth + 1)
        }
        ExprKind::Let(value, binder, body) => {
            has_escaping_bound(value, depth)
                || has_escaping_bound(&binder.ty, depth)
                || has_escaping_bound(body, depth + 1)
        }
        ExprKind::Ann(e, ty) => has_escaping_bound(e, depth) || has_escaping_bound(ty, depth),
        ExprKind::Seq(xs) => xs.iter().any(|e| has_escaping_bound(e, depth)),
        ExprKind::PrimDict(e) => has_escaping_bound(e, depth),
    }
}

/// Alpha-equivalence: structural equality on a name-erased view.
///
/// Ignores spans, binder names and origins; visibility is significant.
pub fn alpha_eq(a: &Expr, b: &Expr) -> bool {
    match (&a.kind, &b.kind) {
        (ExprKind::Type(l1), ExprKind::Type(l2)) => l1 == l2,
        (ExprKind::Var(v1), ExprKind::Var(v2)) => v1 == v2,
        (ExprKind::Meta(m1), ExprKind::Meta(m2)) => m1 == m2,
        (ExprKind::Hole(n1), ExprKind::Hole(n2)) => n1 == n2,
        (ExprKind::App(h1, args1), ExprKind::App(h2, args2)) => {
            alpha_eq(h1, h2)
                && args1.len() == args2.len()
                && args1
                    .iter()
                    .zip(args2)
                    .all(|(x, y)| x.visibility == y.visibility && alpha_eq(&x.expr, &y.expr))
        }
        (ExprKind::Pi(b1, r1), ExprKind::Pi(b2, r2))
        | (ExprKind::Lam(b1, r1), ExprKind::Lam(b2, r2)) => {
            binder_alpha_eq(b1, b2) && alpha_eq(r1, r2)
        }
        (ExprKind::Let(v1, b1, r1), ExprKind::Let(v2, b2, r2)) => {
            alpha_eq(v1, v2) && binder_alpha_eq(b1, b2) && alpha_eq(r1, r2)
        }
        (ExprKind::Ann(e1, t1), ExprKind::Ann(e2, t2)) => alpha_eq(e1, e2) && alpha_eq(t1, t2),
        (ExprKind::Builtin(x), ExprKind::Builtin(y)) => x == y,
        (ExprKind::Literal(x), ExprKind::Literal(y)) => x == y,
        (ExprKind::Seq(xs), ExprKind::Seq(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| alpha_eq(x, y))
        }
        (ExprKind::PrimDict(x), ExprKind::PrimDict(y)) => alpha_eq(x, y),
        _ => false,
    }
}

fn binder_alpha_eq(a: &Binder, b: &Binder) -> bool {
    a.visibility == b.visibility && alpha_eq(&a.ty, &b.ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builtin::Builtin;
    use crate::ast::core::{Literal, Origin, Visibility};
    use crate::foundation::Span;

    fn sp() -> Span {
        Span::zero(0)
    }

    fn lam(name: &str, body: Expr) -> Expr {
        let binder = Binder::new(
            sp(),
            Origin::User,
            Visibility::Explicit,
            Some(name.to_string()),
            Expr::builtin(Builtin::Nat, sp()),
        );
        Expr::lam(binder, body, sp())
    }

    #[test]
    fn test_lift_respects_cutoff() {
        // \x -> x b0_outer : only the outer reference moves.
        let body = Expr::app(
            Expr::bound(0, sp()),
            vec![Arg::explicit(Expr::bound(1, sp()))],
            sp(),
        );
        let term = lam("x", body);
        let lifted = lift(&term, 3);
        match &lifted.kind {
            ExprKind::Lam(_, body) => {
                let (head, args) = body.decompose();
                assert!(matches!(head.kind, ExprKind::Var(Var::Bound(0))));
                assert!(matches!(args[0].expr.kind, ExprKind::Var(Var::Bound(4))));
            }
            _ => panic!("expected lambda"),
        }
    }

    #[test]
    fn test_subst_closes_the_hole() {
        // (\y -> b1) [b0 := 42] : b1 inside the lambda pointed at the
        // substituted binder.
        let value = Expr::literal(Literal::Nat(42), sp());
        let body = lam("y", Expr::bound(1, sp()));
        let result = subst(&value, &body);
        match &result.kind {
            ExprKind::Lam(_, inner) => {
                assert!(matches!(inner.kind, ExprKind::Literal(Literal::Nat(42))));
            }
            _ => panic!("expected lambda"),
        }
    }

    #[test]
    fn test_subst_decrements_outer_indices() {
        let value = Expr::literal(Literal::Nat(0), sp());
        let body = Expr::bound(3, sp());
        let result = subst(&value, &body);
        assert!(matches!(result.kind, ExprKind::Var(Var::Bound(2))));
    }

    #[test]
    fn test_subst_inverts_lift() {
        // subst e (lift 1 body) == body, for any closed e.
        let e = Expr::literal(Literal::Bool(true), sp());
        let body = lam(
            "x",
            Expr::app(
                Expr::builtin(Builtin::Add, sp()),
                vec![
                    Arg::explicit(Expr::bound(0, sp())),
                    Arg::explicit(Expr::bound(1, sp())),
                ],
                sp(),
            ),
        );
        let roundtrip = subst(&e, &lift(&body, 1));
        assert_eq!(roundtrip, body);
    }

    #[test]
    fn test_subst_leaves_metas_intact() {
        let value = Expr::literal(Literal::Nat(1), sp());
        let body = Expr::meta(7, sp());
        assert_eq!(subst(&value, &body), body);
    }

    #[test]
    fn test_free_idents_first_occurrence_order() {
        let f = Ident::new("f");
        let g = Ident::new("g");
        let e = Expr::app(
            Expr::free(f.clone(), sp()),
            vec![
                Arg::explicit(Expr::free(g.clone(), sp())),
                Arg::explicit(Expr::free(f.clone(), sp())),
            ],
            sp(),
        );
        let idents: Vec<_> = free_idents(&e).into_iter().collect();
        assert_eq!(idents, vec![f, g]);
    }

    #[test]
    fn test_is_closed() {
        assert!(is_closed(&lam("x", Expr::bound(0, sp()))));
        assert!(!is_closed(&lam("x", Expr::bound(1, sp()))));
        assert!(is_closed(&Expr::builtin(Builtin::Nat, sp())));
    }

    #[test]
    fn test_alpha_eq_ignores_names_and_spans() {
        let a = lam("x", Expr::bound(0, sp()));
        let mut b = lam("y", Expr::bound(0, Span::new(0, 5, 6, 1)));
        b.span = Span::new(0, 1, 9, 1);
        assert!(alpha_eq(&a, &b));
    }

    #[test]
    fn test_alpha_eq_respects_visibility() {
        let mk = |vis| {
            let binder = Binder::new(sp(), Origin::User, vis, None, Expr::universe(0, sp()));
            Expr::pi(binder, Expr::bound(0, sp()), sp())
        };
        assert!(!alpha_eq(&mk(Visibility::Explicit), &mk(Visibility::Implicit)));
    }
}
