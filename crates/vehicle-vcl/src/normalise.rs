//! Normalisation: beta, delta and iota reduction over the closed builtin
//! set.
//!
//! A single recursive evaluator over expressions plus a declaration
//! environment of already-normalised definition bodies. Works on open terms:
//! bound variables and network/dataset references are inert.
//!
//! # Reduction rules
//!
//! - beta: a lambda applied to an argument substitutes and re-normalises
//! - delta: a free reference to a definition unfolds to its normalised body
//! - let: the bound value is substituted for the first bound index -
//!   except that a let binding a network application is preserved, because
//!   it is delta-irreducible and the VNNLib pass consumes exactly that shape
//! - `Ann` is stripped
//! - arithmetic, comparison and logic fold over literal operands;
//!   `and`/`or`/`if` short-circuit on a one-sided literal
//! - `::`/`!`/`map`/`fold` reduce over sequence literals
//! - `everyIn`/`someIn` expand over sequence domains; an empty domain is
//!   `EmptyQuantifierDomain`
//! - implicit/instance arguments pass through unreduced

use crate::ast::builtin::Builtin;
use crate::ast::core::{Arg, Binder, Expr, ExprKind, Literal, Var, Visibility};
use crate::ast::debruijn;
use crate::ast::{Decl, Prog};
use crate::foundation::{Ident, Span};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

/// Normalisation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormError {
    #[error("quantifier over an empty domain")]
    EmptyQuantifierDomain { span: Span },
}

impl NormError {
    pub fn span(&self) -> Span {
        match self {
            NormError::EmptyQuantifierDomain { span } => *span,
        }
    }
}

/// What the environment knows about a declaration.
#[derive(Debug, Clone)]
enum EnvEntry {
    Network,
    Dataset,
    /// Normalised definition body.
    Function(Expr),
}

/// Declaration environment threaded through normalisation.
#[derive(Debug, Default)]
pub struct Normaliser {
    env: IndexMap<Ident, EnvEntry>,
}

/// Normalise a whole program, declaration by declaration; each definition
/// enters the environment already normalised so later delta steps are
/// single lookups.
pub fn norm_prog(prog: &Prog) -> Result<(Prog, Normaliser), NormError> {
    let mut normaliser = Normaliser::default();
    let mut out = Vec::with_capacity(prog.len());

    for decl in prog {
        match decl {
            Decl::Network { span, ident, ty } => {
                let ty = normaliser.norm(ty)?;
                normaliser.env.insert(ident.clone(), EnvEntry::Network);
                out.push(Decl::Network {
                    span: *span,
                    ident: ident.clone(),
                    ty,
                });
            }
            Decl::Dataset { span, ident, ty } => {
                let ty = normaliser.norm(ty)?;
                normaliser.env.insert(ident.clone(), EnvEntry::Dataset);
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
                let ty = normaliser.norm(ty)?;
                let body = normaliser.norm(body)?;
                normaliser
                    .env
                    .insert(ident.clone(), EnvEntry::Function(body.clone()));
                out.push(Decl::Function {
                    span: *span,
                    ident: ident.clone(),
                    ty,
                    body,
                });
            }
        }
    }

    Ok((out, normaliser))
}

impl Normaliser {
    /// True when `ident` is a declared network.
    pub fn is_network(&self, ident: &Ident) -> bool {
        matches!(self.env.get(ident), Some(EnvEntry::Network))
    }

    /// Normalise one expression to normal form.
    pub fn norm(&self, expr: &Expr) -> Result<Expr, NormError> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Type(_)
            | ExprKind::Var(Var::Bound(_))
            | ExprKind::Meta(_)
            | ExprKind::Hole(_)
            | ExprKind::Builtin(_)
            | ExprKind::Literal(_) => Ok(expr.clone()),

            // Delta: definitions unfold, networks and datasets are inert.
            ExprKind::Var(Var::Free(ident)) => match self.env.get(ident) {
                Some(EnvEntry::Function(body)) => {
                    trace!(ident = %ident, "delta reduction");
                    Ok(body.clone())
                }
                _ => Ok(expr.clone()),
            },

            ExprKind::Ann(inner, _) => self.norm(inner),

            ExprKind::Pi(binder, body) => Ok(Expr::pi(
                self.norm_binder(binder)?,
                self.norm(body)?,
                span,
            )),

            ExprKind::Lam(binder, body) => Ok(Expr::lam(
                self.norm_binder(binder)?,
                self.norm(body)?,
                span,
            )),

            ExprKind::Let(value, binder, body) => {
                let value = self.norm(value)?;
                // A let-bound network application is the one let shape that
                // survives normalisation (the VNNLib pass rewrites it).
                if value
                    .free_head()
                    .is_some_and(|ident| self.is_network(ident))
                {
                    return Ok(Expr::let_in(
                        value,
                        self.norm_binder(binder)?,
                        self.norm(body)?,
                        span,
                    ));
                }
                self.norm(&debruijn::subst(&value, body))
            }

            ExprKind::Seq(elements) => {
                let elements = elements
                    .iter()
                    .map(|e| self.norm(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::new(ExprKind::Seq(elements), span))
            }

            ExprKind::PrimDict(inner) => Ok(Expr::new(
                ExprKind::PrimDict(Box::new(self.norm(inner)?)),
                span,
            )),

            ExprKind::App(fun, args) => self.norm_app(fun, args, span),
        }
    }

    fn norm_binder(&self, binder: &Binder) -> Result<Binder, NormError> {
        Ok(Binder {
            span: binder.span,
            origin: binder.origin,
            visibility: binder.visibility,
            name: binder.name.clone(),
            ty: Box::new(self.norm(&binder.ty)?),
        })
    }

    fn norm_app(&self, fun: &Expr, args: &[Arg], span: Span) -> Result<Expr, NormError> {
        let fun = self.norm(fun)?;
        // Explicit arguments normalise; implicit/instance pass through.
        let mut norm_args = Vec::with_capacity(args.len());
        for arg in args {
            let expr = if arg.visibility == Visibility::Explicit {
                self.norm(&arg.expr)?
            } else {
                arg.expr.clone()
            };
            norm_args.push(Arg::new(arg.span, arg.origin, arg.visibility, expr));
        }

        // Beta: consume one argument, re-normalise the rest of the spine.
        if let ExprKind::Lam(_, body) = &fun.kind {
            let first = norm_args.remove(0);
            let reduced = debruijn::subst(&first.expr, body);
            return self.norm(&Expr::app(reduced, norm_args, span));
        }

        // An applied literal sheds its machine-inserted arguments.
        if matches!(fun.kind, ExprKind::Literal(_))
            && norm_args.iter().all(|a| a.visibility != Visibility::Explicit)
        {
            return Ok(fun);
        }

        let expr = Expr::app(fun, norm_args, span);
        match expr.builtin_head() {
            Some(builtin) => self.reduce_builtin(builtin, expr, span),
            None => Ok(expr),
        }
    }

    /// Iota rules: try to reduce a builtin over its (normalised) explicit
    /// arguments; anything that does not fire returns the spine unchanged.
    fn reduce_builtin(&self, builtin: Builtin, expr: Expr, span: Span) -> Result<Expr, NormError> {
        let (_, spine) = expr.decompose();
        let explicit: Vec<&Expr> = crate::ast::core::explicit_args(spine).collect();

        let reduced = match (builtin, explicit.as_slice()) {
            (Builtin::Not, [x]) => as_bool(x).map(|b| bool_lit(!b, span)),

            (Builtin::And, [x, y]) => match (as_bool(x), as_bool(y)) {
                (Some(a), Some(b)) => Some(bool_lit(a && b, span)),
                (Some(true), None) => Some((*y).clone()),
                (Some(false), None) => Some(bool_lit(false, span)),
                (None, Some(true)) => Some((*x).clone()),
                (None, Some(false)) => Some(bool_lit(false, span)),
                (None, None) => None,
            },

            (Builtin::Or, [x, y]) => match (as_bool(x), as_bool(y)) {
                (Some(a), Some(b)) => Some(bool_lit(a || b, span)),
                (Some(true), None) => Some(bool_lit(true, span)),
                (Some(false), None) => Some((*y).clone()),
                (None, Some(true)) => Some(bool_lit(true, span)),
                (None, Some(false)) => Some((*x).clone()),
                (None, None) => None,
            },

            (Builtin::Implies, [x, y]) => match (as_bool(x), as_bool(y)) {
                (Some(false), _) => Some(bool_lit(true, span)),
                (Some(true), _) => Some((*y).clone()),
                _ => None,
            },

            (Builtin::If, [c, t, e]) => {
                as_bool(c).map(|b| if b { (*t).clone() } else { (*e).clone() })
            }

            (Builtin::Eq, [x, y]) => fold_equality(x, y, false, span),
            (Builtin::Neq, [x, y]) => fold_equality(x, y, true, span),

            (Builtin::Le, [x, y]) => fold_compare(x, y, span, |a, b| a <= b),
            (Builtin::Lt, [x, y]) => fold_compare(x, y, span, |a, b| a < b),
            (Builtin::Ge, [x, y]) => fold_compare(x, y, span, |a, b| a >= b),
            (Builtin::Gt, [x, y]) => fold_compare(x, y, span, |a, b| a > b),

            (Builtin::Add, [x, y]) => fold_arith(x, y, span, ArithOp::Add),
            (Builtin::Sub, [x, y]) => fold_arith(x, y, span, ArithOp::Sub),
            (Builtin::Mul, [x, y]) => fold_arith(x, y, span, ArithOp::Mul),
            (Builtin::Div, [x, y]) => fold_arith(x, y, span, ArithOp::Div),

            (Builtin::Neg, [x]) => as_literal(x).and_then(|lit| match lit {
                Literal::Nat(n) => Some(Expr::literal(Literal::Int(-(n as i64)), span)),
                Literal::Int(i) => Some(Expr::literal(Literal::Int(-i), span)),
                Literal::Rat(r) => Some(Expr::literal(Literal::Rat(-r), span)),
                Literal::Bool(_) => None,
            }),

            (Builtin::Cons, [x, xs]) => match &xs.kind {
                ExprKind::Seq(rest) => {
                    let mut elements = Vec::with_capacity(rest.len() + 1);
                    elements.push((*x).clone());
                    elements.extend(rest.iter().cloned());
                    Some(Expr::new(ExprKind::Seq(elements), span))
                }
                _ => None,
            },

            (Builtin::At, [xs, index]) => match (&xs.kind, as_literal(index)) {
                (ExprKind::Seq(elements), Some(Literal::Nat(i))) => {
                    elements.get(i as usize).cloned()
                }
                _ => None,
            },

            (Builtin::Map, [f, xs]) => match &xs.kind {
                ExprKind::Seq(elements) => {
                    let mapped = elements
                        .iter()
                        .map(|element| {
                            self.norm(&Expr::app(
                                (*f).clone(),
                                vec![Arg::explicit(element.clone())],
                                span,
                            ))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Some(Expr::new(ExprKind::Seq(mapped), span))
                }
                _ => None,
            },

            (Builtin::Fold, [f, init, xs]) => match &xs.kind {
                ExprKind::Seq(elements) => {
                    // fold f e [x0, x1] = f x0 (f x1 e)
                    let mut acc = (*init).clone();
                    for element in elements.iter().rev() {
                        acc = self.norm(&Expr::app(
                            (*f).clone(),
                            vec![Arg::explicit(element.clone()), Arg::explicit(acc)],
                            span,
                        ))?;
                    }
                    Some(acc)
                }
                _ => None,
            },

            (Builtin::AllIn, [f, domain]) => {
                self.expand_bounded_quantifier(f, domain, Builtin::And, span)?
            }
            (Builtin::AnyIn, [f, domain]) => {
                self.expand_bounded_quantifier(f, domain, Builtin::Or, span)?
            }

            _ => None,
        };

        Ok(reduced.unwrap_or(expr))
    }

    /// `everyIn`/`someIn` over a sequence literal unfolds to a chain of
    /// conjunctions/disjunctions of the instantiated body.
    fn expand_bounded_quantifier(
        &self,
        f: &Expr,
        domain: &Expr,
        connective: Builtin,
        span: Span,
    ) -> Result<Option<Expr>, NormError> {
        let ExprKind::Seq(elements) = &domain.kind else {
            return Ok(None);
        };
        if elements.is_empty() {
            return Err(NormError::EmptyQuantifierDomain { span });
        }
        let mut instances = Vec::with_capacity(elements.len());
        for element in elements {
            instances.push(self.norm(&Expr::app(
                f.clone(),
                vec![Arg::explicit(element.clone())],
                span,
            ))?);
        }
        let combined = instances
            .into_iter()
            .rev()
            .reduce(|acc, instance| Expr::app_builtin(connective, vec![instance, acc], span))
            .expect("non-empty domain");
        // The connective chain may itself fold (literal instances).
        Ok(Some(self.norm(&combined)?))
    }
}

/// The literal at an expression, looking through machine argument wrappers.
fn as_literal(expr: &Expr) -> Option<Literal> {
    match &expr.kind {
        ExprKind::Literal(lit) => Some(*lit),
        _ => None,
    }
}

fn as_bool(expr: &Expr) -> Option<bool> {
    match as_literal(expr) {
        Some(Literal::Bool(b)) => Some(b),
        _ => None,
    }
}

fn bool_lit(value: bool, span: Span) -> Expr {
    Expr::literal(Literal::Bool(value), span)
}

#[derive(Debug, Clone, Copy)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Numeric literals promote towards the widest operand family:
/// rat > int > nat. Subtraction and division always leave the naturals.
fn fold_arith(x: &Expr, y: &Expr, span: Span, op: ArithOp) -> Option<Expr> {
    let a = as_literal(x)?;
    let b = as_literal(y)?;
    let result = match op {
        ArithOp::Div => Literal::Rat(as_rat(a)? / as_rat(b)?),
        ArithOp::Add | ArithOp::Mul | ArithOp::Sub => {
            if matches!(a, Literal::Rat(_)) || matches!(b, Literal::Rat(_)) {
                let (a, b) = (as_rat(a)?, as_rat(b)?);
                Literal::Rat(match op {
                    ArithOp::Add => a + b,
                    ArithOp::Sub => a - b,
                    ArithOp::Mul => a * b,
                    ArithOp::Div => unreachable!(),
                })
            } else {
                let (a, b) = (as_int(a)?, as_int(b)?);
                let value = match op {
                    ArithOp::Add => a + b,
                    ArithOp::Sub => a - b,
                    ArithOp::Mul => a * b,
                    ArithOp::Div => unreachable!(),
                };
                if value >= 0
                    && matches!(as_literal(x), Some(Literal::Nat(_)))
                    && matches!(as_literal(y), Some(Literal::Nat(_)))
                    && !matches!(op, ArithOp::Sub)
                {
                    Literal::Nat(value as u64)
                } else {
                    Literal::Int(value)
                }
            }
        }
    };
    Some(Expr::literal(result, span))
}

fn fold_compare(x: &Expr, y: &Expr, span: Span, cmp: impl Fn(f64, f64) -> bool) -> Option<Expr> {
    let a = as_rat(as_literal(x)?)?;
    let b = as_rat(as_literal(y)?)?;
    Some(bool_lit(cmp(a, b), span))
}

fn fold_equality(x: &Expr, y: &Expr, negated: bool, span: Span) -> Option<Expr> {
    let a = as_literal(x)?;
    let b = as_literal(y)?;
    let equal = match (a, b) {
        (Literal::Bool(a), Literal::Bool(b)) => a == b,
        _ => as_rat(a)? == as_rat(b)?,
    };
    Some(bool_lit(equal != negated, span))
}

fn as_rat(lit: Literal) -> Option<f64> {
    match lit {
        Literal::Nat(n) => Some(n as f64),
        Literal::Int(i) => Some(i as f64),
        Literal::Rat(r) => Some(r),
        Literal::Bool(_) => None,
    }
}

fn as_int(lit: Literal) -> Option<i64> {
    match lit {
        Literal::Nat(n) => Some(n as i64),
        Literal::Int(i) => Some(i),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::core::Origin;

    fn sp() -> Span {
        Span::zero(0)
    }

    fn norm(expr: &Expr) -> Expr {
        Normaliser::default().norm(expr).unwrap()
    }

    fn nat(n: u64) -> Expr {
        Expr::literal(Literal::Nat(n), sp())
    }

    fn boolean(b: bool) -> Expr {
        Expr::literal(Literal::Bool(b), sp())
    }

    #[test]
    fn test_arithmetic_folds() {
        let sum = Expr::app_builtin(Builtin::Add, vec![nat(1), nat(2)], sp());
        assert_eq!(norm(&sum), nat(3));
    }

    #[test]
    fn test_subtraction_leaves_the_naturals() {
        let diff = Expr::app_builtin(Builtin::Sub, vec![nat(1), nat(2)], sp());
        assert_eq!(norm(&diff), Expr::literal(Literal::Int(-1), sp()));
    }

    #[test]
    fn test_comparison_folds_to_bool() {
        let cmp = Expr::app_builtin(
            Builtin::Eq,
            vec![
                Expr::app_builtin(Builtin::Add, vec![nat(1), nat(2)], sp()),
                nat(3),
            ],
            sp(),
        );
        assert_eq!(norm(&cmp), boolean(true));
    }

    #[test]
    fn test_and_short_circuits_on_one_side() {
        let open = Expr::bound(0, sp());
        let conj = Expr::app_builtin(Builtin::And, vec![boolean(false), open.clone()], sp());
        assert_eq!(norm(&conj), boolean(false));
        let conj = Expr::app_builtin(Builtin::And, vec![open.clone(), boolean(true)], sp());
        assert_eq!(norm(&conj), open);
    }

    #[test]
    fn test_if_selects_branch() {
        let ite = Expr::app_builtin(Builtin::If, vec![boolean(true), nat(1), nat(2)], sp());
        assert_eq!(norm(&ite), nat(1));
    }

    #[test]
    fn test_beta_reduction() {
        let binder = Binder::machine("x", Expr::builtin(Builtin::Nat, sp()), sp());
        let lam = Expr::lam(binder, Expr::bound(0, sp()), sp());
        let app = Expr::app(lam, vec![Arg::explicit(nat(7))], sp());
        assert_eq!(norm(&app), nat(7));
    }

    #[test]
    fn test_let_substitutes_value_for_first_index() {
        let binder = Binder::machine("x", Expr::builtin(Builtin::Nat, sp()), sp());
        let body = Expr::app_builtin(Builtin::Add, vec![Expr::bound(0, sp()), nat(1)], sp());
        let let_expr = Expr::let_in(nat(2), binder, body, sp());
        assert_eq!(norm(&let_expr), nat(3));
    }

    #[test]
    fn test_applied_literal_sheds_machine_arguments() {
        let app = Expr::app(
            nat(1),
            vec![
                Arg::machine(Visibility::Implicit, Expr::builtin(Builtin::Nat, sp())),
                Arg::machine(
                    Visibility::Instance,
                    Expr::new(
                        ExprKind::PrimDict(Box::new(Expr::builtin(Builtin::Nat, sp()))),
                        sp(),
                    ),
                ),
            ],
            sp(),
        );
        assert_eq!(norm(&app), nat(1));
    }

    #[test]
    fn test_at_projects_sequence() {
        let seq = Expr::new(ExprKind::Seq(vec![nat(10), nat(20)]), sp());
        let at = Expr::app_builtin(Builtin::At, vec![seq, nat(1)], sp());
        assert_eq!(norm(&at), nat(20));
    }

    #[test]
    fn test_cons_prepends() {
        let seq = Expr::new(ExprKind::Seq(vec![nat(2)]), sp());
        let cons = Expr::app_builtin(Builtin::Cons, vec![nat(1), seq], sp());
        assert_eq!(
            norm(&cons),
            Expr::new(ExprKind::Seq(vec![nat(1), nat(2)]), sp())
        );
    }

    #[test]
    fn test_map_applies_elementwise() {
        let binder = Binder::machine("x", Expr::builtin(Builtin::Nat, sp()), sp());
        let succ = Expr::lam(
            binder,
            Expr::app_builtin(Builtin::Add, vec![Expr::bound(0, sp()), nat(1)], sp()),
            sp(),
        );
        let seq = Expr::new(ExprKind::Seq(vec![nat(1), nat(2)]), sp());
        let mapped = Expr::app_builtin(Builtin::Map, vec![succ, seq], sp());
        assert_eq!(
            norm(&mapped),
            Expr::new(ExprKind::Seq(vec![nat(2), nat(3)]), sp())
        );
    }

    #[test]
    fn test_fold_unfolds_to_nested_applications() {
        // fold (+) 0 [1, 2, 3] = 6
        let f = Expr::builtin(Builtin::Add, sp());
        let seq = Expr::new(ExprKind::Seq(vec![nat(1), nat(2), nat(3)]), sp());
        let folded = Expr::app_builtin(Builtin::Fold, vec![f, nat(0), seq], sp());
        assert_eq!(norm(&folded), nat(6));
    }

    #[test]
    fn test_empty_quantifier_domain_fails() {
        let binder = Binder::machine("x", Expr::builtin(Builtin::Nat, sp()), sp());
        let pred = Expr::lam(binder, boolean(true), sp());
        let empty = Expr::new(ExprKind::Seq(Vec::new()), sp());
        let quantified = Expr::app_builtin(Builtin::AllIn, vec![pred, empty], sp());
        let err = Normaliser::default().norm(&quantified).unwrap_err();
        assert!(matches!(err, NormError::EmptyQuantifierDomain { .. }));
    }

    #[test]
    fn test_bounded_quantifier_expands_over_domain() {
        // someIn (\x -> x == 2) [1, 2] = True
        let binder = Binder::machine("x", Expr::builtin(Builtin::Nat, sp()), sp());
        let pred = Expr::lam(
            binder,
            Expr::app_builtin(Builtin::Eq, vec![Expr::bound(0, sp()), nat(2)], sp()),
            sp(),
        );
        let domain = Expr::new(ExprKind::Seq(vec![nat(1), nat(2)]), sp());
        let quantified = Expr::app_builtin(Builtin::AnyIn, vec![pred, domain], sp());
        assert_eq!(norm(&quantified), boolean(true));
    }

    #[test]
    fn test_delta_unfolds_definitions() {
        let ident = Ident::new("two");
        let prog = vec![Decl::Function {
            span: sp(),
            ident: ident.clone(),
            ty: Expr::builtin(Builtin::Nat, sp()),
            body: Expr::app_builtin(Builtin::Add, vec![nat(1), nat(1)], sp()),
        }];
        let (normed, normaliser) = norm_prog(&prog).unwrap();
        assert_eq!(normed[0].body(), Some(&nat(2)));
        assert_eq!(normaliser.norm(&Expr::free(ident, sp())).unwrap(), nat(2));
    }

    #[test]
    fn test_network_let_is_preserved() {
        // network refs are delta-irreducible; their let bindings survive.
        let net = Ident::new("f");
        let mut normaliser = Normaliser::default();
        normaliser.env.insert(net.clone(), EnvEntry::Network);

        let application = Expr::app(
            Expr::free(net, sp()),
            vec![Arg::explicit(Expr::bound(0, sp()))],
            sp(),
        );
        let binder = Binder::machine("y", Expr::builtin(Builtin::Real, sp()), sp());
        let body = Expr::app_builtin(Builtin::Ge, vec![Expr::bound(0, sp()), nat(0)], sp());
        let let_expr = Expr::let_in(application, binder, body, sp());

        let normed = normaliser.norm(&let_expr).unwrap();
        assert!(matches!(normed.kind, ExprKind::Let(_, _, _)));
    }

    #[test]
    fn test_let_shadows_top_level_definition() {
        // An inner let binding takes precedence over delta-reduction: the
        // substituted value wins because substitution happens before any
        // free-identifier lookup.
        let ident = Ident::new("c");
        let prog = vec![
            Decl::Function {
                span: sp(),
                ident: ident.clone(),
                ty: Expr::builtin(Builtin::Nat, sp()),
                body: nat(100),
            },
            Decl::Function {
                span: sp(),
                ident: Ident::new("p"),
                ty: Expr::builtin(Builtin::Nat, sp()),
                body: Expr::let_in(
                    nat(1),
                    Binder::machine("c", Expr::builtin(Builtin::Nat, sp()), sp()),
                    Expr::bound(0, sp()),
                    sp(),
                ),
            },
        ];
        let (normed, _) = norm_prog(&prog).unwrap();
        assert_eq!(normed[1].body(), Some(&nat(1)));
    }

    #[test]
    fn test_normalisation_is_idempotent() {
        let expr = Expr::app_builtin(
            Builtin::And,
            vec![
                Expr::app_builtin(Builtin::Le, vec![nat(1), nat(2)], sp()),
                Expr::app_builtin(
                    Builtin::Or,
                    vec![Expr::bound(0, sp()), boolean(false)],
                    sp(),
                ),
            ],
            sp(),
        );
        let once = norm(&expr);
        let twice = norm(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_implicit_arguments_pass_through() {
        // An `At` application with machine implicit args still projects.
        let seq = Expr::new(ExprKind::Seq(vec![nat(5)]), sp());
        let at = Expr::app(
            Expr::builtin(Builtin::At, sp()),
            vec![
                Arg::machine(Visibility::Implicit, Expr::builtin(Builtin::Nat, sp())),
                Arg::machine(
                    Visibility::Implicit,
                    Expr::app_builtin(Builtin::List, vec![Expr::builtin(Builtin::Nat, sp())], sp()),
                ),
                Arg::new(sp(), Origin::User, Visibility::Explicit, seq),
                Arg::new(sp(), Origin::User, Visibility::Explicit, nat(0)),
            ],
            sp(),
        );
        assert_eq!(norm(&at), nat(5));
    }
}
