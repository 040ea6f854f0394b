//! Type-class resolution.
//!
//! Each supported class has a closed rule set mapping concrete head types to
//! a witness dictionary, with optional sub-constraints. A constraint whose
//! class argument is still a meta is stuck; numeric and truth classes can be
//! defaulted at the end of a stuck solver pass (`IsNatural` to `Nat`,
//! `IsIntegral` to `Int`, `IsRational`/`IsReal` to `Real`, `IsTruth` to
//! `Bool`).

use crate::ast::builtin::Builtin;
use crate::ast::core::{explicit_args, Expr, ExprKind, MetaId};
use crate::ast::debruijn;
use crate::elaborate::context::{Constraint, ConstraintKind, MetaContext};
use crate::elaborate::solve::Progress;
use crate::elaborate::TypeError;
use crate::foundation::Span;
use tracing::trace;

/// Attempt to resolve one class constraint: solve `dict` with a witness for
/// `class`, emit sub-constraints, or report Stuck.
pub(crate) fn solve_class(
    metas: &mut MetaContext,
    dict: MetaId,
    class: &Expr,
    span: Span,
) -> Result<Progress, TypeError> {
    let class = metas.zonk(class);
    let (head, args) = class.decompose();
    let ExprKind::Builtin(cls) = head.kind else {
        return Ok(Progress::Stuck);
    };
    let args: Vec<Expr> = explicit_args(args).cloned().collect();

    if cls == Builtin::IsContainer {
        return solve_container(metas, dict, &class, &args, span);
    }

    let [target] = args.as_slice() else {
        return Ok(Progress::Stuck);
    };
    let target = metas.whnf(target);
    let Some(target_head) = target.builtin_head() else {
        // Still a meta (or not a builtin type at all): wait.
        return Ok(Progress::Stuck);
    };

    let instance = match cls {
        Builtin::HasEq => match target_head {
            Builtin::Nat | Builtin::Int | Builtin::Real | Builtin::Bool | Builtin::Prop => {
                Some(Vec::new())
            }
            Builtin::List | Builtin::Tensor => {
                element_sub_constraint(metas, Builtin::HasEq, &target, span)
            }
            _ => None,
        },
        Builtin::HasOrd => match target_head {
            Builtin::Nat | Builtin::Int | Builtin::Real => Some(Vec::new()),
            _ => None,
        },
        Builtin::IsTruth => match target_head {
            Builtin::Bool | Builtin::Prop => Some(Vec::new()),
            _ => None,
        },
        Builtin::IsNatural => match target_head {
            Builtin::Nat | Builtin::Int | Builtin::Real => Some(Vec::new()),
            _ => None,
        },
        Builtin::IsIntegral => match target_head {
            Builtin::Int | Builtin::Real => Some(Vec::new()),
            _ => None,
        },
        Builtin::IsRational | Builtin::IsReal => match target_head {
            Builtin::Real => Some(Vec::new()),
            _ => None,
        },
        Builtin::IsQuantifiable => match target_head {
            Builtin::Nat
            | Builtin::Int
            | Builtin::Real
            | Builtin::Bool
            | Builtin::List
            | Builtin::Tensor => Some(Vec::new()),
            _ => None,
        },
        _ => None,
    };

    match instance {
        Some(subs) => witness(metas, dict, &class, subs),
        // A concrete head with no matching rule stays stuck and surfaces in
        // the final UnsolvedConstraints report.
        None => Ok(Progress::Stuck),
    }
}

/// `IsContainer elem cont`: resolves once the container type is concrete,
/// unifying the element type as a sub-constraint.
fn solve_container(
    metas: &mut MetaContext,
    dict: MetaId,
    class: &Expr,
    args: &[Expr],
    span: Span,
) -> Result<Progress, TypeError> {
    let [elem, container] = args else {
        return Ok(Progress::Stuck);
    };
    let container = metas.whnf(container);
    match container.builtin_head() {
        Some(Builtin::List) | Some(Builtin::Tensor) => {
            let (_, container_args) = container.decompose();
            let Some(container_elem) = explicit_args(container_args).next() else {
                return Ok(Progress::Stuck);
            };
            let sub = Constraint {
                span,
                kind: ConstraintKind::Unify {
                    expected: elem.clone(),
                    actual: container_elem.clone(),
                },
            };
            witness(metas, dict, class, vec![sub])
        }
        _ => Ok(Progress::Stuck),
    }
}

/// Solve the dictionary meta with `PrimDict` over the resolved class
/// application.
fn witness(
    metas: &mut MetaContext,
    dict: MetaId,
    class: &Expr,
    subs: Vec<Constraint>,
) -> Result<Progress, TypeError> {
    // Dictionaries must be closed like any other meta solution.
    if !debruijn::is_closed(class) {
        return Ok(Progress::Stuck);
    }
    let witness = Expr::new(ExprKind::PrimDict(Box::new(class.clone())), class.span);
    metas.solve(dict, witness);
    trace!(class = %class, "resolved type class");
    Ok(Progress::advanced(subs, vec![dict]))
}

/// Sub-constraint requiring the container's element type to be in `cls`.
fn element_sub_constraint(
    metas: &mut MetaContext,
    cls: Builtin,
    container: &Expr,
    span: Span,
) -> Option<Vec<Constraint>> {
    let (_, args) = container.decompose();
    let elem = explicit_args(args).next()?;
    let (sub_dict, _) = metas.fresh(span, None);
    Some(vec![Constraint {
        span,
        kind: ConstraintKind::Class {
            meta: sub_dict,
            class: Expr::app_builtin(cls, vec![elem.clone()], span),
        },
    }])
}

/// The canonical type for a defaultable class.
fn default_for(cls: Builtin) -> Option<Builtin> {
    match cls {
        Builtin::IsNatural => Some(Builtin::Nat),
        Builtin::IsIntegral => Some(Builtin::Int),
        Builtin::IsRational | Builtin::IsReal => Some(Builtin::Real),
        Builtin::IsTruth => Some(Builtin::Bool),
        _ => None,
    }
}

/// Defaulting pass, run only when a whole solver iteration made no
/// progress: pick the canonical type for every numeric/truth class
/// constraint whose argument is still an unsolved meta, and `List` for an
/// `IsContainer` constraint whose container is unknown but whose element
/// type is concrete (empty sequence literals).
///
/// Returns true when any meta was solved (the solver re-enters its loop).
pub(crate) fn apply_defaults(metas: &mut MetaContext) -> bool {
    let pending = metas.constraints.clone();
    let mut any = false;
    for constraint in &pending {
        let ConstraintKind::Class { class, .. } = &constraint.kind else {
            continue;
        };
        let class = metas.zonk(class);
        let (head, args) = class.decompose();
        let ExprKind::Builtin(cls) = head.kind else {
            continue;
        };
        let args: Vec<&Expr> = explicit_args(args).collect();

        if cls == Builtin::IsContainer {
            let [elem, container] = args.as_slice() else {
                continue;
            };
            let elem = metas.whnf(elem);
            if matches!(elem.kind, ExprKind::Meta(_)) || !debruijn::is_closed(&elem) {
                continue;
            }
            if let ExprKind::Meta(container_meta) = metas.whnf(container).kind {
                trace!(elem = %elem, "defaulting container to List");
                let list = Expr::app_builtin(Builtin::List, vec![elem], constraint.span);
                metas.solve(container_meta, list);
                any = true;
            }
            continue;
        }

        let Some(default) = default_for(cls) else {
            continue;
        };
        let Some(target) = args.first() else {
            continue;
        };
        if let ExprKind::Meta(target_meta) = metas.whnf(target).kind {
            trace!(class = %cls, default = %default, "defaulting class argument");
            metas.solve(target_meta, Expr::builtin(default, constraint.span));
            any = true;
        }
    }
    any
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Span;

    fn sp() -> Span {
        Span::zero(0)
    }

    fn class1(cls: Builtin, arg: Expr) -> Expr {
        Expr::app_builtin(cls, vec![arg], sp())
    }

    #[test]
    fn test_has_eq_nat_resolves() {
        let mut metas = MetaContext::new();
        let (dict, _) = metas.fresh(sp(), None);
        let class = class1(Builtin::HasEq, Expr::builtin(Builtin::Nat, sp()));
        let progress = solve_class(&mut metas, dict, &class, sp()).unwrap();
        assert!(matches!(progress, Progress::Advanced { .. }));
        assert!(matches!(
            metas.zonk(&Expr::meta(dict, sp())).kind,
            ExprKind::PrimDict(_)
        ));
    }

    #[test]
    fn test_meta_argument_is_stuck() {
        let mut metas = MetaContext::new();
        let (dict, _) = metas.fresh(sp(), None);
        let (_, target) = metas.fresh(sp(), None);
        let class = class1(Builtin::HasEq, target);
        let progress = solve_class(&mut metas, dict, &class, sp()).unwrap();
        assert!(matches!(progress, Progress::Stuck));
    }

    #[test]
    fn test_has_ord_bool_has_no_rule() {
        let mut metas = MetaContext::new();
        let (dict, _) = metas.fresh(sp(), None);
        let class = class1(Builtin::HasOrd, Expr::builtin(Builtin::Bool, sp()));
        let progress = solve_class(&mut metas, dict, &class, sp()).unwrap();
        assert!(matches!(progress, Progress::Stuck));
    }

    #[test]
    fn test_container_resolution_unifies_element() {
        let mut metas = MetaContext::new();
        let (dict, _) = metas.fresh(sp(), None);
        let (elem_id, elem) = metas.fresh(sp(), None);
        let list_nat = Expr::app_builtin(
            Builtin::List,
            vec![Expr::builtin(Builtin::Nat, sp())],
            sp(),
        );
        let class = Expr::app_builtin(Builtin::IsContainer, vec![elem, list_nat], sp());
        match solve_class(&mut metas, dict, &class, sp()).unwrap() {
            Progress::Advanced {
                new_constraints, ..
            } => {
                assert_eq!(new_constraints.len(), 1);
                assert!(matches!(
                    new_constraints[0].kind,
                    ConstraintKind::Unify { .. }
                ));
            }
            Progress::Stuck => panic!("expected resolution"),
        }
        assert!(!metas.is_solved(elem_id)); // solved later by the sub-constraint
    }

    #[test]
    fn test_defaulting_solves_numeric_metas() {
        let mut metas = MetaContext::new();
        let (dict, _) = metas.fresh(sp(), None);
        let (target_id, target) = metas.fresh(sp(), None);
        metas.push_constraint(Constraint {
            span: sp(),
            kind: ConstraintKind::Class {
                meta: dict,
                class: class1(Builtin::IsNatural, target),
            },
        });
        assert!(apply_defaults(&mut metas));
        assert!(matches!(
            metas.zonk(&Expr::meta(target_id, sp())).kind,
            ExprKind::Builtin(Builtin::Nat)
        ));
    }

    #[test]
    fn test_has_eq_never_defaults() {
        let mut metas = MetaContext::new();
        let (dict, _) = metas.fresh(sp(), None);
        let (_, target) = metas.fresh(sp(), None);
        metas.push_constraint(Constraint {
            span: sp(),
            kind: ConstraintKind::Class {
                meta: dict,
                class: class1(Builtin::HasEq, target),
            },
        });
        assert!(!apply_defaults(&mut metas));
    }
}
