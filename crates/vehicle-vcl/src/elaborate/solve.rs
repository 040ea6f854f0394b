//! Fixed-point constraint solver.
//!
//! The loop repeatedly applies the current substitution to every pending
//! constraint and tries each once. Per-iteration progress is a monoid with
//! [`Progress::Stuck`] as identity; an iteration that neither solves a meta
//! nor discharges or spawns a constraint is a stuck fixpoint and fails with
//! `UnsolvedConstraints`, unless the defaulting pass can still commit a
//! numeric/truth class argument.
//!
//! Termination: every successful iteration strictly shrinks the pending set
//! or strictly grows the substitution, and both are bounded.

use crate::elaborate::classes;
use crate::elaborate::context::{Constraint, ConstraintKind, MetaContext};
use crate::elaborate::unify;
use crate::elaborate::{TypeError, UnsolvedConstraint};
use crate::ast::core::MetaId;
use tracing::debug;

/// Outcome of attempting one constraint, and the per-iteration accumulator.
#[derive(Debug)]
pub(crate) enum Progress {
    /// Nothing learned; the constraint stays pending.
    Stuck,
    /// The constraint was discharged, possibly solving metas and spawning
    /// sub-constraints.
    Advanced {
        new_constraints: Vec<Constraint>,
        solved_metas: Vec<MetaId>,
    },
}

impl Progress {
    /// Discharged with nothing new.
    pub fn discharged() -> Self {
        Progress::Advanced {
            new_constraints: Vec::new(),
            solved_metas: Vec::new(),
        }
    }

    pub fn advanced(new_constraints: Vec<Constraint>, solved_metas: Vec<MetaId>) -> Self {
        Progress::Advanced {
            new_constraints,
            solved_metas,
        }
    }

    /// Monoid combine: `Stuck` is the identity, `Advanced` values append.
    pub fn combine(self, other: Progress) -> Progress {
        match (self, other) {
            (Progress::Stuck, x) | (x, Progress::Stuck) => x,
            (
                Progress::Advanced {
                    mut new_constraints,
                    mut solved_metas,
                },
                Progress::Advanced {
                    new_constraints: more_constraints,
                    solved_metas: more_metas,
                },
            ) => {
                new_constraints.extend(more_constraints);
                solved_metas.extend(more_metas);
                Progress::Advanced {
                    new_constraints,
                    solved_metas,
                }
            }
        }
    }
}

/// Run the solver to completion.
pub(crate) fn solve(metas: &mut MetaContext) -> Result<(), TypeError> {
    let mut iteration = 0usize;
    loop {
        if metas.constraints.is_empty() {
            metas.normalise_solution();
            return Ok(());
        }
        iteration += 1;
        debug!(
            iteration,
            pending = metas.constraints.len(),
            solved = metas.solution.len(),
            "solver iteration"
        );

        // Apply the current substitution to everything pending, then clear
        // the queue and try each constraint once.
        let pending: Vec<Constraint> = metas.constraints.drain(..).collect();
        let pending: Vec<Constraint> = pending
            .into_iter()
            .map(|c| apply_solution(metas, c))
            .collect();

        let mut progress = Progress::Stuck;
        let mut stuck = Vec::new();

        for constraint in pending {
            let result = match &constraint.kind {
                ConstraintKind::Unify { expected, actual } => {
                    unify::unify(metas, expected, actual, constraint.span)?
                }
                ConstraintKind::Class { meta, class } => {
                    if metas.is_solved(*meta) {
                        Progress::discharged()
                    } else {
                        classes::solve_class(metas, *meta, class, constraint.span)?
                    }
                }
            };
            match result {
                Progress::Stuck => stuck.push(constraint),
                advanced => progress = progress.combine(advanced),
            }
        }

        // Stuck constraints re-enter in stable order, spawned ones after.
        metas.constraints = stuck;
        if let Progress::Advanced {
            new_constraints, ..
        } = &mut progress
        {
            metas.constraints.append(new_constraints);
        }

        if matches!(progress, Progress::Stuck) {
            // No meta solved, nothing discharged, nothing spawned: the only
            // move left is class defaulting.
            if classes::apply_defaults(metas) {
                continue;
            }
            let constraints = metas
                .constraints
                .iter()
                .map(|c| UnsolvedConstraint {
                    span: c.span,
                    description: c.describe(),
                })
                .collect();
            return Err(TypeError::UnsolvedConstraints { constraints });
        }
    }
}

fn apply_solution(metas: &MetaContext, constraint: Constraint) -> Constraint {
    let kind = match constraint.kind {
        ConstraintKind::Unify { expected, actual } => ConstraintKind::Unify {
            expected: metas.zonk(&expected),
            actual: metas.zonk(&actual),
        },
        ConstraintKind::Class { meta, class } => ConstraintKind::Class {
            meta,
            class: metas.zonk(&class),
        },
    };
    Constraint {
        span: constraint.span,
        kind,
    }
}
