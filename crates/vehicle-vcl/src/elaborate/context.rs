//! Elaboration contexts: bound variables, declarations, and the mutable
//! meta-variable state.

use crate::ast::core::{Expr, ExprKind, MetaId};
use crate::ast::debruijn;
use crate::foundation::{Ident, Span};
use indexmap::IndexMap;

/// A bound variable in scope: printing hint plus its type, expressed in the
/// context it was pushed in.
#[derive(Debug, Clone)]
pub struct BoundEntry {
    pub name: Option<String>,
    pub ty: Expr,
}

/// A top-level declaration in scope: its checked type, and its body for
/// definitions.
#[derive(Debug, Clone)]
pub struct DeclEntry {
    pub ty: Expr,
    pub body: Option<Expr>,
}

/// Pending constraint, recorded with the provenance of its birth site.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub span: Span,
    pub kind: ConstraintKind,
}

#[derive(Debug, Clone)]
pub enum ConstraintKind {
    /// The two expressions must be made equal.
    Unify { expected: Expr, actual: Expr },
    /// `meta` must be solved with a dictionary witnessing `class`.
    Class { meta: MetaId, class: Expr },
}

impl Constraint {
    /// One-line rendering for `UnsolvedConstraints` reports.
    pub fn describe(&self) -> String {
        match &self.kind {
            ConstraintKind::Unify { expected, actual } => {
                format!("{} ~ {}", expected, actual)
            }
            ConstraintKind::Class { class, .. } => format!("{}", class),
        }
    }
}

/// Per-meta bookkeeping.
#[derive(Debug, Clone)]
pub struct MetaInfo {
    pub span: Span,
    /// `Some` when the meta stands for a user-written `?name`.
    pub hole_name: Option<String>,
}

/// Mutable meta-variable state threaded through elaboration and solving.
///
/// The solution map is kept idempotent at the end of solving: applying it to
/// its own range is a fixpoint.
#[derive(Debug, Default)]
pub struct MetaContext {
    infos: Vec<MetaInfo>,
    pub solution: IndexMap<MetaId, Expr>,
    pub constraints: Vec<Constraint>,
}

impl MetaContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh meta-variable.
    pub fn fresh(&mut self, span: Span, hole_name: Option<String>) -> (MetaId, Expr) {
        let id = self.infos.len();
        self.infos.push(MetaInfo { span, hole_name });
        (id, Expr::meta(id, span))
    }

    pub fn info(&self, id: MetaId) -> &MetaInfo {
        &self.infos[id]
    }

    pub fn meta_count(&self) -> usize {
        self.infos.len()
    }

    /// Record a solution for `id`.
    ///
    /// # Panics
    /// Panics if the meta is already solved; the solver must not overwrite.
    pub fn solve(&mut self, id: MetaId, solution: Expr) {
        let previous = self.solution.insert(id, solution);
        assert!(previous.is_none(), "meta ?{} solved twice", id);
    }

    pub fn is_solved(&self, id: MetaId) -> bool {
        self.solution.contains_key(&id)
    }

    pub fn push_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Replace every solved meta in `expr`, recursively.
    ///
    /// Terminates because the occurs check keeps the solution acyclic.
    pub fn zonk(&self, expr: &Expr) -> Expr {
        match &expr.kind {
            ExprKind::Meta(id) => match self.solution.get(id) {
                Some(solution) => self.zonk(solution),
                None => expr.clone(),
            },
            ExprKind::Var(_)
            | ExprKind::Type(_)
            | ExprKind::Hole(_)
            | ExprKind::Builtin(_)
            | ExprKind::Literal(_) => expr.clone(),
            ExprKind::App(head, args) => {
                let head = self.zonk(head);
                let args = args
                    .iter()
                    .map(|a| crate::ast::core::Arg {
                        span: a.span,
                        origin: a.origin,
                        visibility: a.visibility,
                        expr: self.zonk(&a.expr),
                    })
                    .collect();
                // Zonking a meta at the head may expose a nested spine.
                Expr::app(head, args, expr.span)
            }
            ExprKind::Pi(binder, body) => Expr::pi(
                self.zonk_binder(binder),
                self.zonk(body),
                expr.span,
            ),
            ExprKind::Lam(binder, body) => Expr::lam(
                self.zonk_binder(binder),
                self.zonk(body),
                expr.span,
            ),
            ExprKind::Let(value, binder, body) => Expr::let_in(
                self.zonk(value),
                self.zonk_binder(binder),
                self.zonk(body),
                expr.span,
            ),
            ExprKind::Ann(e, ty) => Expr::new(
                ExprKind::Ann(Box::new(self.zonk(e)), Box::new(self.zonk(ty))),
                expr.span,
            ),
            ExprKind::Seq(xs) => Expr::new(
                ExprKind::Seq(xs.iter().map(|x| self.zonk(x)).collect()),
                expr.span,
            ),
            ExprKind::PrimDict(e) => {
                Expr::new(ExprKind::PrimDict(Box::new(self.zonk(e))), expr.span)
            }
        }
    }

    fn zonk_binder(&self, binder: &crate::ast::core::Binder) -> crate::ast::core::Binder {
        crate::ast::core::Binder {
            span: binder.span,
            origin: binder.origin,
            visibility: binder.visibility,
            name: binder.name.clone(),
            ty: Box::new(self.zonk(&binder.ty)),
        }
    }

    /// Weak head normal form for unification and implicit insertion:
    /// strips annotations, resolves solved metas at the head, and
    /// beta-reduces exposed lambda redexes.
    pub fn whnf(&self, expr: &Expr) -> Expr {
        let mut current = expr.clone();
        loop {
            match &current.kind {
                ExprKind::Ann(e, _) => current = (**e).clone(),
                ExprKind::Meta(id) => match self.solution.get(id) {
                    Some(solution) => current = solution.clone(),
                    None => return current,
                },
                ExprKind::App(head, args) => match &head.kind {
                    ExprKind::Lam(_, body) => {
                        let first = &args[0];
                        let reduced = debruijn::subst(&first.expr, body);
                        let rest = args[1..].to_vec();
                        current = Expr::app(reduced, rest, current.span);
                    }
                    ExprKind::Meta(id) if self.solution.contains_key(id) => {
                        let solved = self.solution[id].clone();
                        let args = args.clone();
                        current = Expr::app(solved, args, current.span);
                    }
                    ExprKind::Ann(e, _) => {
                        let e = (**e).clone();
                        let args = args.clone();
                        current = Expr::app(e, args, current.span);
                    }
                    _ => return current,
                },
                _ => return current,
            }
        }
    }

    /// Make the solution idempotent: zonk every entry in its own range.
    pub fn normalise_solution(&mut self) {
        let keys: Vec<MetaId> = self.solution.keys().copied().collect();
        for key in keys {
            let zonked = self.zonk(&self.solution[&key].clone());
            self.solution[&key] = zonked;
        }
    }
}

/// Declaration lookup table threaded by the elaborator.
pub type DeclContext = IndexMap<Ident, DeclEntry>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builtin::Builtin;
    use crate::foundation::Span;

    fn sp() -> Span {
        Span::zero(0)
    }

    #[test]
    fn test_fresh_metas_are_sequential() {
        let mut metas = MetaContext::new();
        let (a, _) = metas.fresh(sp(), None);
        let (b, _) = metas.fresh(sp(), None);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
    }

    #[test]
    fn test_zonk_follows_chains() {
        let mut metas = MetaContext::new();
        let (a, a_expr) = metas.fresh(sp(), None);
        let (b, b_expr) = metas.fresh(sp(), None);
        metas.solve(a, b_expr);
        metas.solve(b, Expr::builtin(Builtin::Nat, sp()));
        assert!(matches!(
            metas.zonk(&a_expr).kind,
            ExprKind::Builtin(Builtin::Nat)
        ));
    }

    #[test]
    fn test_normalise_solution_is_fixpoint() {
        let mut metas = MetaContext::new();
        let (a, _) = metas.fresh(sp(), None);
        let (b, b_expr) = metas.fresh(sp(), None);
        metas.solve(a, b_expr);
        metas.solve(b, Expr::builtin(Builtin::Real, sp()));
        metas.normalise_solution();
        for value in metas.solution.values() {
            assert_eq!(metas.zonk(value), value.clone());
        }
    }

    #[test]
    #[should_panic(expected = "solved twice")]
    fn test_double_solve_panics() {
        let mut metas = MetaContext::new();
        let (a, _) = metas.fresh(sp(), None);
        metas.solve(a, Expr::builtin(Builtin::Nat, sp()));
        metas.solve(a, Expr::builtin(Builtin::Int, sp()));
    }

    #[test]
    fn test_whnf_beta_reduces() {
        let metas = MetaContext::new();
        let binder = crate::ast::core::Binder::machine("x", Expr::builtin(Builtin::Nat, sp()), sp());
        let lam = Expr::lam(binder, Expr::bound(0, sp()), sp());
        let app = Expr::app(
            lam,
            vec![crate::ast::core::Arg::explicit(Expr::builtin(
                Builtin::Real,
                sp(),
            ))],
            sp(),
        );
        assert!(matches!(
            metas.whnf(&app).kind,
            ExprKind::Builtin(Builtin::Real)
        ));
    }
}
