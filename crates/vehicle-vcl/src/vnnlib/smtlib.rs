//! SMT-Lib 2 query emission.
//!
//! The emitter receives the rewritten, re-normalised property body: a
//! quantifier prefix (magic variables, then user quantifiers) over a
//! predicate built from builtins, literals and quantified variables.
//!
//! Quantified variables over `Tensor Real [k]` are scalarised into `k` real
//! variables named `<name>!<i>`; the stuck input-equality premise
//! `[X0, ..] == x` lowers element-wise onto those scalars. Anything the
//! normaliser should have eliminated (`Let`, metas, holes, free non-network
//! identifiers) is an internal `NormalisationFailure`.

use crate::ast::builtin::Builtin;
use crate::ast::core::{explicit_args, Expr, ExprKind, Literal, Var};
use crate::foundation::Ident;
use crate::vnnlib::SmtLibError;
use std::collections::HashSet;
use std::fmt::Write;

/// Emit one property as an SMT-Lib 2 script.
pub fn emit(property: &Ident, body: &Expr, meta_network: &[Ident]) -> Result<String, SmtLibError> {
    let mut emitter = Emitter {
        vars: Vec::new(),
        used_names: HashSet::new(),
    };
    let assertion = emitter.lower(body)?;

    let mut script = String::new();
    writeln!(script, "; property: {}", property).expect("string write");
    let names: Vec<&str> = meta_network.iter().map(|id| id.as_str()).collect();
    writeln!(script, "; meta-network: {}", names.join(" ")).expect("string write");
    writeln!(script, "(assert {})", assertion).expect("string write");
    writeln!(script, "(check-sat)").expect("string write");
    Ok(script)
}

/// A quantified variable in scope during lowering.
#[derive(Debug, Clone)]
enum QuantVar {
    /// Scalar variable with its SMT sort.
    Scalar { name: String },
    /// Tensor variable scalarised into `width` elements `name!i`.
    Tensor { name: String, width: usize },
}

struct Emitter {
    /// Innermost variable last; de Bruijn indices resolve from the back.
    vars: Vec<QuantVar>,
    used_names: HashSet<String>,
}

impl Emitter {
    fn lower(&mut self, expr: &Expr) -> Result<String, SmtLibError> {
        match &expr.kind {
            ExprKind::Literal(Literal::Bool(b)) => Ok(b.to_string()),
            ExprKind::Literal(Literal::Nat(n)) => Ok(n.to_string()),
            ExprKind::Literal(Literal::Int(i)) => {
                if *i < 0 {
                    Ok(format!("(- {})", -i))
                } else {
                    Ok(i.to_string())
                }
            }
            ExprKind::Literal(Literal::Rat(r)) => Ok(format_rat(*r)),

            ExprKind::Var(Var::Bound(index)) => match self.resolve(*index, expr)? {
                QuantVar::Scalar { name } => Ok(name.clone()),
                QuantVar::Tensor { name, .. } => Err(self.failure(
                    expr,
                    format!("tensor variable '{}' used outside indexing", name),
                )),
            },

            ExprKind::App(_, _) => self.lower_app(expr),

            ExprKind::Var(Var::Free(ident)) => Err(self.failure(
                expr,
                format!("free identifier '{}' survived normalisation", ident),
            )),
            ExprKind::Let(_, _, _) => {
                Err(self.failure(expr, "let binding survived normalisation".to_string()))
            }
            other => Err(self.failure(
                expr,
                format!("unsupported construct in query body: {}", variant_name(other)),
            )),
        }
    }

    fn lower_app(&mut self, expr: &Expr) -> Result<String, SmtLibError> {
        let (head, args) = expr.decompose();
        let ExprKind::Builtin(builtin) = head.kind else {
            return Err(self.failure(
                expr,
                "application head survived normalisation".to_string(),
            ));
        };
        let explicit: Vec<&Expr> = explicit_args(args).collect();

        match (builtin, explicit.as_slice()) {
            // Quantifiers: peel the lambda, bind the variable(s).
            (Builtin::All, [lam]) => self.lower_quantifier("forall", lam, expr),
            (Builtin::Any, [lam]) => self.lower_quantifier("exists", lam, expr),

            // Indexing a tensor variable selects its scalarised element.
            (Builtin::At, [container, index]) => {
                if let (ExprKind::Var(Var::Bound(i)), ExprKind::Literal(Literal::Nat(k))) =
                    (&container.kind, &index.kind)
                {
                    if let QuantVar::Tensor { name, width } = self.resolve(*i, expr)? {
                        if (*k as usize) < *width {
                            return Ok(format!("{}!{}", name, k));
                        }
                    }
                }
                Err(self.failure(expr, "irreducible indexing in query body".to_string()))
            }

            (Builtin::Eq, [lhs, rhs]) => self.lower_equality(lhs, rhs, expr),
            (Builtin::Neq, [lhs, rhs]) => {
                let inner = self.lower_equality(lhs, rhs, expr)?;
                Ok(format!("(not {})", inner))
            }

            (Builtin::Not, [x]) => Ok(format!("(not {})", self.lower(x)?)),
            (Builtin::And, [x, y]) => self.binary("and", x, y),
            (Builtin::Or, [x, y]) => self.binary("or", x, y),
            (Builtin::Implies, [x, y]) => self.binary("=>", x, y),
            (Builtin::If, [c, t, e]) => Ok(format!(
                "(ite {} {} {})",
                self.lower(c)?,
                self.lower(t)?,
                self.lower(e)?
            )),

            (Builtin::Le, [x, y]) => self.binary("<=", x, y),
            (Builtin::Lt, [x, y]) => self.binary("<", x, y),
            (Builtin::Ge, [x, y]) => self.binary(">=", x, y),
            (Builtin::Gt, [x, y]) => self.binary(">", x, y),

            (Builtin::Add, [x, y]) => self.binary("+", x, y),
            (Builtin::Sub, [x, y]) => self.binary("-", x, y),
            (Builtin::Mul, [x, y]) => self.binary("*", x, y),
            (Builtin::Div, [x, y]) => self.binary("/", x, y),
            (Builtin::Neg, [x]) => Ok(format!("(- {})", self.lower(x)?)),

            _ => Err(self.failure(
                expr,
                format!("builtin '{}' survived normalisation", builtin),
            )),
        }
    }

    fn binary(&mut self, op: &str, x: &Expr, y: &Expr) -> Result<String, SmtLibError> {
        Ok(format!("({} {} {})", op, self.lower(x)?, self.lower(y)?))
    }

    /// `every`/`some` applied to a lambda becomes a forall/exists block.
    fn lower_quantifier(
        &mut self,
        keyword: &str,
        lam: &Expr,
        expr: &Expr,
    ) -> Result<String, SmtLibError> {
        let ExprKind::Lam(binder, body) = &lam.kind else {
            return Err(self.failure(expr, "quantifier without a lambda body".to_string()));
        };
        let base = binder.name.clone().unwrap_or_else(|| "v".to_string());
        let name = self.unique_name(base);

        let (var, decls) = match quantified_sort(&binder.ty) {
            Some(QuantSort::Scalar(sort)) => (
                QuantVar::Scalar { name: name.clone() },
                format!("({} {})", name, sort),
            ),
            Some(QuantSort::Tensor(width)) => {
                let decls = (0..width)
                    .map(|i| format!("({}!{} Real)", name, i))
                    .collect::<Vec<_>>()
                    .join(" ");
                (QuantVar::Tensor { name: name.clone(), width }, decls)
            }
            None => {
                return Err(self.failure(
                    expr,
                    format!("unsupported quantifier domain '{}'", binder.ty),
                ));
            }
        };

        self.vars.push(var);
        let inner = self.lower(body);
        self.vars.pop();
        Ok(format!("({} ({}) {})", keyword, decls, inner?))
    }

    /// Equality, including the element-wise lowering of a sequence of
    /// magic variables against a scalarised tensor variable.
    fn lower_equality(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
        expr: &Expr,
    ) -> Result<String, SmtLibError> {
        match (&lhs.kind, &rhs.kind) {
            (ExprKind::Seq(elements), _) => self.lower_seq_equality(elements, rhs, expr),
            (_, ExprKind::Seq(elements)) => self.lower_seq_equality(elements, lhs, expr),
            _ => self.binary("=", lhs, rhs),
        }
    }

    fn lower_seq_equality(
        &mut self,
        elements: &[Expr],
        other: &Expr,
        expr: &Expr,
    ) -> Result<String, SmtLibError> {
        // The other side must be a scalarised tensor variable of the same
        // width (or another sequence).
        let pairs: Vec<String> = match &other.kind {
            ExprKind::Seq(others) if others.len() == elements.len() => elements
                .iter()
                .zip(others)
                .map(|(a, b)| self.binary("=", a, b))
                .collect::<Result<_, _>>()?,
            ExprKind::Var(Var::Bound(i)) => {
                let QuantVar::Tensor { name, width } = self.resolve(*i, expr)? else {
                    return Err(self.failure(
                        expr,
                        "sequence compared against a scalar variable".to_string(),
                    ));
                };
                if *width != elements.len() {
                    return Err(self.failure(
                        expr,
                        format!(
                            "sequence of width {} compared against tensor of width {}",
                            elements.len(),
                            width
                        ),
                    ));
                }
                let name = name.clone();
                elements
                    .iter()
                    .enumerate()
                    .map(|(k, element)| {
                        Ok(format!("(= {} {}!{})", self.lower(element)?, name, k))
                    })
                    .collect::<Result<_, SmtLibError>>()?
            }
            _ => {
                return Err(self.failure(
                    expr,
                    "irreducible sequence equality in query body".to_string(),
                ));
            }
        };

        Ok(if pairs.len() == 1 {
            pairs.into_iter().next().expect("one pair")
        } else {
            format!("(and {})", pairs.join(" "))
        })
    }

    fn resolve(&self, index: usize, expr: &Expr) -> Result<&QuantVar, SmtLibError> {
        if index >= self.vars.len() {
            return Err(SmtLibError::NormalisationFailure {
                span: expr.span,
                what: format!("bound index {} escapes the quantifier block", index),
            });
        }
        Ok(&self.vars[self.vars.len() - 1 - index])
    }

    fn unique_name(&mut self, base: String) -> String {
        let mut candidate = base.clone();
        let mut counter = 0usize;
        while !self.used_names.insert(candidate.clone()) {
            counter += 1;
            candidate = format!("{}_{}", base, counter);
        }
        candidate
    }

    fn failure(&self, expr: &Expr, what: String) -> SmtLibError {
        SmtLibError::NormalisationFailure {
            span: expr.span,
            what,
        }
    }
}

/// SMT sort of a quantifier domain.
enum QuantSort {
    Scalar(&'static str),
    Tensor(usize),
}

fn quantified_sort(ty: &Expr) -> Option<QuantSort> {
    match ty.builtin_head() {
        Some(Builtin::Real) => Some(QuantSort::Scalar("Real")),
        Some(Builtin::Nat) | Some(Builtin::Int) => Some(QuantSort::Scalar("Int")),
        Some(Builtin::Bool) | Some(Builtin::Prop) => Some(QuantSort::Scalar("Bool")),
        Some(Builtin::Tensor) => crate::vnnlib::tensor_width(ty).ok().map(QuantSort::Tensor),
        _ => None,
    }
}

/// Decimal rendering with a mandatory fractional part.
fn format_rat(value: f64) -> String {
    if value < 0.0 {
        return format!("(- {})", format_rat(-value));
    }
    let text = format!("{}", value);
    if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{}.0", text)
    }
}

fn variant_name(kind: &ExprKind) -> &'static str {
    match kind {
        ExprKind::Type(_) => "Type",
        ExprKind::Var(_) => "Var",
        ExprKind::Meta(_) => "Meta",
        ExprKind::Hole(_) => "Hole",
        ExprKind::App(_, _) => "App",
        ExprKind::Pi(_, _) => "Pi",
        ExprKind::Lam(_, _) => "Lam",
        ExprKind::Let(_, _, _) => "Let",
        ExprKind::Ann(_, _) => "Ann",
        ExprKind::Builtin(_) => "Builtin",
        ExprKind::Literal(_) => "Literal",
        ExprKind::Seq(_) => "Seq",
        ExprKind::PrimDict(_) => "PrimDict",
    }
}
