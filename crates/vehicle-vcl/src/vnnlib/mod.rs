//! VNNLib lowering: from normalised programs to SMT-Lib queries.
//!
//! # What this pass does
//!
//! 1. **Finds properties**: top-level definitions whose declared type is
//!    `Prop`.
//! 2. **Discovers the meta-network**: the networks a property references,
//!    in first-occurrence order. The driver composes their binary files in
//!    exactly this order.
//! 3. **Validates network signatures**: every network must be
//!    `Tensor Real [n] -> Tensor Real [m]`, with a defect taxonomy for
//!    everything else.
//! 4. **Rewrites network applications**: each `let y = f x in body` becomes
//!    `(inputSeq == x) => body[y := outputSeq]` over a global index space of
//!    magic input/output variables. Network references in any other
//!    position are rejected: network applications must be let-bound.
//! 5. **Prepends quantifiers**: one `every` per magic variable, inputs
//!    `X0..` before outputs `Y0..`, then re-normalises and emits.

pub mod smtlib;

use crate::ast::builtin::Builtin;
use crate::ast::core::{explicit_args, Arg, Binder, Expr, ExprKind, Literal, Var};
use crate::ast::debruijn;
use crate::ast::{Decl, Prog};
use crate::foundation::{Ident, Span};
use crate::normalise::Normaliser;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors of the VNNLib backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SmtLibError {
    #[error("no properties found in program")]
    NoPropertiesFound,
    #[error("property '{property}' does not reference any network")]
    NoNetworkUsedInProperty { span: Span, property: Ident },
    #[error("unsupported network type for '{network}': {defect}")]
    UnsupportedNetworkType {
        span: Span,
        network: Ident,
        defect: NetworkTypeDefect,
    },
    #[error("network '{network}' must be applied to one argument directly under a let binding")]
    NetworkNotLetBound { span: Span, network: Ident },
    /// Internal assertion: the normaliser should have eliminated the
    /// offending construct.
    #[error("normalisation failure: {what}")]
    NormalisationFailure { span: Span, what: String },
}

impl SmtLibError {
    pub fn span(&self) -> Span {
        match self {
            SmtLibError::NoPropertiesFound => Span::zero(0),
            SmtLibError::NoNetworkUsedInProperty { span, .. }
            | SmtLibError::UnsupportedNetworkType { span, .. }
            | SmtLibError::NetworkNotLetBound { span, .. }
            | SmtLibError::NormalisationFailure { span, .. } => *span,
        }
    }
}

/// Why a network's declared type is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkTypeDefect {
    NotAFunction,
    NotATensor,
    WrongTensorType,
    MultidimensionalTensor,
    VariableSizeTensor,
}

impl std::fmt::Display for NetworkTypeDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            NetworkTypeDefect::NotAFunction => "not a function type",
            NetworkTypeDefect::NotATensor => "domain or codomain is not a tensor",
            NetworkTypeDefect::WrongTensorType => "tensor element type is not Real",
            NetworkTypeDefect::MultidimensionalTensor => "tensor is not one-dimensional",
            NetworkTypeDefect::VariableSizeTensor => "tensor size is not a literal",
        };
        write!(f, "{}", text)
    }
}

/// Input/output width of a validated network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkShape {
    pub inputs: usize,
    pub outputs: usize,
}

/// One compiled property: the SMT-Lib script plus the ordered meta-network
/// the driver needs to stitch network binaries together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyQuery {
    pub property: Ident,
    pub smtlib: String,
    pub meta_network: Vec<Ident>,
}

/// Compile every property of a normalised program.
pub fn compile_prog(
    prog: &Prog,
    normaliser: &Normaliser,
) -> Result<Vec<PropertyQuery>, SmtLibError> {
    // Validate all declared networks up front.
    let mut networks: IndexMap<Ident, NetworkShape> = IndexMap::new();
    for decl in prog {
        if let Decl::Network { span, ident, ty } = decl {
            let shape = validate_network_type(ty).map_err(|defect| {
                SmtLibError::UnsupportedNetworkType {
                    span: *span,
                    network: ident.clone(),
                    defect,
                }
            })?;
            networks.insert(ident.clone(), shape);
        }
    }

    let mut queries = Vec::new();
    for decl in prog {
        if let Decl::Function {
            span,
            ident,
            ty,
            body,
        } = decl
        {
            if !matches!(ty.kind, ExprKind::Builtin(Builtin::Prop)) {
                // Non-property definitions were inlined by normalisation.
                continue;
            }
            queries.push(compile_property(
                *span, ident, body, &networks, normaliser,
            )?);
        }
    }

    if queries.is_empty() {
        return Err(SmtLibError::NoPropertiesFound);
    }
    Ok(queries)
}

/// Validate `Tensor Real [n] -> Tensor Real [m]` and extract the widths.
pub fn validate_network_type(ty: &Expr) -> Result<NetworkShape, NetworkTypeDefect> {
    let ExprKind::Pi(binder, codomain) = &ty.kind else {
        return Err(NetworkTypeDefect::NotAFunction);
    };
    let inputs = tensor_width(&binder.ty)?;
    let outputs = tensor_width(codomain)?;
    Ok(NetworkShape { inputs, outputs })
}

pub(crate) fn tensor_width(ty: &Expr) -> Result<usize, NetworkTypeDefect> {
    let (head, args) = ty.decompose();
    if !matches!(head.kind, ExprKind::Builtin(Builtin::Tensor)) {
        return Err(NetworkTypeDefect::NotATensor);
    }
    let mut explicit = explicit_args(args);
    let element = explicit.next().ok_or(NetworkTypeDefect::VariableSizeTensor)?;
    let dims = explicit.next().ok_or(NetworkTypeDefect::VariableSizeTensor)?;

    if !matches!(element.kind, ExprKind::Builtin(Builtin::Real)) {
        return Err(NetworkTypeDefect::WrongTensorType);
    }
    let ExprKind::Seq(dims) = &dims.kind else {
        return Err(NetworkTypeDefect::VariableSizeTensor);
    };
    let [dim] = dims.as_slice() else {
        return Err(NetworkTypeDefect::MultidimensionalTensor);
    };
    match dim.kind {
        ExprKind::Literal(Literal::Nat(n)) => Ok(n as usize),
        _ => Err(NetworkTypeDefect::VariableSizeTensor),
    }
}

fn compile_property(
    span: Span,
    ident: &Ident,
    body: &Expr,
    networks: &IndexMap<Ident, NetworkShape>,
    normaliser: &Normaliser,
) -> Result<PropertyQuery, SmtLibError> {
    // The meta-network: referenced networks in first-occurrence order.
    let meta_network: Vec<Ident> = debruijn::free_idents(body)
        .into_iter()
        .filter(|id| networks.contains_key(id))
        .collect();
    if meta_network.is_empty() {
        return Err(SmtLibError::NoNetworkUsedInProperty {
            span,
            property: ident.clone(),
        });
    }
    debug!(property = %ident, meta_network = ?meta_network, "compiling property");

    let total_inputs: usize = meta_network.iter().map(|id| networks[id].inputs).sum();
    let total_outputs: usize = meta_network.iter().map(|id| networks[id].outputs).sum();

    let mut rewriter = Rewriter {
        networks,
        total_inputs,
        total_outputs,
        next_input: 0,
        next_output: 0,
    };
    let rewritten = rewriter.rewrite(body, 0)?;
    if rewriter.next_input != total_inputs || rewriter.next_output != total_outputs {
        return Err(SmtLibError::NormalisationFailure {
            span,
            what: format!(
                "magic index space mismatch: consumed {}/{} inputs, {}/{} outputs",
                rewriter.next_input, total_inputs, rewriter.next_output, total_outputs
            ),
        });
    }

    // Prepend one quantifier per magic variable, inputs before outputs
    // (tensor-major order), innermost last.
    let mut quantified = rewritten;
    for index in (0..total_outputs).rev() {
        quantified = magic_forall(format!("Y{}", index), quantified, span);
    }
    for index in (0..total_inputs).rev() {
        quantified = magic_forall(format!("X{}", index), quantified, span);
    }

    // Re-normalise: output projections fold away here.
    let renormed = normaliser
        .norm(&quantified)
        .map_err(|err| SmtLibError::NormalisationFailure {
            span: err.span(),
            what: err.to_string(),
        })?;

    let smtlib = smtlib::emit(ident, &renormed, &meta_network)?;
    Ok(PropertyQuery {
        property: ident.clone(),
        smtlib,
        meta_network,
    })
}

fn magic_forall(name: String, body: Expr, span: Span) -> Expr {
    let binder = Binder::machine(name, Expr::builtin(Builtin::Real, span), span);
    let lam = Expr::lam(binder, body, span);
    Expr::app(
        Expr::builtin(Builtin::All, span),
        vec![Arg::explicit(lam)],
        span,
    )
}

/// The stateful body walk: rewrites each let-bound network application and
/// rejects networks anywhere else. The `(next_input, next_output)` counter
/// allocates disjoint index ranges to successive applications.
struct Rewriter<'a> {
    networks: &'a IndexMap<Ident, NetworkShape>,
    total_inputs: usize,
    total_outputs: usize,
    next_input: usize,
    next_output: usize,
}

impl Rewriter<'_> {
    fn rewrite(&mut self, expr: &Expr, depth: usize) -> Result<Expr, SmtLibError> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Let(value, _, body)
                if value
                    .free_head()
                    .is_some_and(|id| self.networks.contains_key(id)) =>
            {
                let network = value.free_head().expect("checked above").clone();
                let shape = self.networks[&network];
                let (_, spine) = value.decompose();
                let mut inputs = explicit_args(spine);
                let (Some(input_arg), None) = (inputs.next(), inputs.next()) else {
                    return Err(SmtLibError::NetworkNotLetBound { span, network });
                };

                if self.next_input + shape.inputs > self.total_inputs
                    || self.next_output + shape.outputs > self.total_outputs
                {
                    return Err(SmtLibError::NormalisationFailure {
                        span,
                        what: format!("network '{}' applied more than once", network),
                    });
                }
                let input_base = self.next_input;
                let output_base = self.next_output;
                self.next_input += shape.inputs;
                self.next_output += shape.outputs;

                let input_seq = self.magic_seq(
                    input_base,
                    shape.inputs,
                    self.total_outputs + self.total_inputs,
                    depth,
                    span,
                );
                let output_seq =
                    self.magic_seq(output_base, shape.outputs, self.total_outputs, depth, span);

                let input_arg = self.rewrite(input_arg, depth)?;
                let body = self.rewrite(body, depth + 1)?;
                // Close the let binder with the magic outputs.
                let body = debruijn::subst(&output_seq, &body);

                let premise = Expr::app_builtin(Builtin::Eq, vec![input_seq, input_arg], span);
                Ok(Expr::app_builtin(
                    Builtin::Implies,
                    vec![premise, body],
                    span,
                ))
            }

            // A network anywhere else is a non-ANF input.
            ExprKind::Var(Var::Free(ident)) if self.networks.contains_key(ident) => {
                Err(SmtLibError::NetworkNotLetBound {
                    span,
                    network: ident.clone(),
                })
            }

            ExprKind::Type(_)
            | ExprKind::Var(_)
            | ExprKind::Meta(_)
            | ExprKind::Hole(_)
            | ExprKind::Builtin(_)
            | ExprKind::Literal(_) => Ok(expr.clone()),

            ExprKind::App(head, args) => {
                let head = self.rewrite(head, depth)?;
                let args = args
                    .iter()
                    .map(|a| {
                        Ok(Arg::new(
                            a.span,
                            a.origin,
                            a.visibility,
                            self.rewrite(&a.expr, depth)?,
                        ))
                    })
                    .collect::<Result<Vec<_>, SmtLibError>>()?;
                Ok(Expr::app(head, args, span))
            }

            ExprKind::Pi(binder, body) => Ok(Expr::pi(
                self.rewrite_binder(binder, depth)?,
                self.rewrite(body, depth + 1)?,
                span,
            )),
            ExprKind::Lam(binder, body) => Ok(Expr::lam(
                self.rewrite_binder(binder, depth)?,
                self.rewrite(body, depth + 1)?,
                span,
            )),
            ExprKind::Let(value, binder, body) => Ok(Expr::let_in(
                self.rewrite(value, depth)?,
                self.rewrite_binder(binder, depth)?,
                self.rewrite(body, depth + 1)?,
                span,
            )),
            ExprKind::Ann(inner, ty) => Ok(Expr::new(
                ExprKind::Ann(
                    Box::new(self.rewrite(inner, depth)?),
                    Box::new(self.rewrite(ty, depth)?),
                ),
                span,
            )),
            ExprKind::Seq(elements) => Ok(Expr::new(
                ExprKind::Seq(
                    elements
                        .iter()
                        .map(|e| self.rewrite(e, depth))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                span,
            )),
            ExprKind::PrimDict(inner) => Ok(Expr::new(
                ExprKind::PrimDict(Box::new(self.rewrite(inner, depth)?)),
                span,
            )),
        }
    }

    fn rewrite_binder(&mut self, binder: &Binder, depth: usize) -> Result<Binder, SmtLibError> {
        Ok(Binder {
            span: binder.span,
            origin: binder.origin,
            visibility: binder.visibility,
            name: binder.name.clone(),
            ty: Box::new(self.rewrite(&binder.ty, depth)?),
        })
    }

    /// Sequence of magic-variable references. A variable with global index
    /// `base + i` in a block of `block_total` innermost magic binders sits
    /// at de Bruijn index `depth + (block_total - 1 - (base + i))` counted
    /// past `depth` ordinary binders.
    fn magic_seq(
        &self,
        base: usize,
        count: usize,
        block_total: usize,
        depth: usize,
        span: Span,
    ) -> Expr {
        let elements = (0..count)
            .map(|i| Expr::bound(depth + (block_total - 1 - (base + i)), span))
            .collect();
        Expr::new(ExprKind::Seq(elements), span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> Span {
        Span::zero(0)
    }

    fn tensor_real(n: u64) -> Expr {
        Expr::app_builtin(
            Builtin::Tensor,
            vec![
                Expr::builtin(Builtin::Real, sp()),
                Expr::new(
                    ExprKind::Seq(vec![Expr::literal(Literal::Nat(n), sp())]),
                    sp(),
                ),
            ],
            sp(),
        )
    }

    fn arrow(domain: Expr, codomain: Expr) -> Expr {
        let binder = Binder::new(
            sp(),
            crate::ast::core::Origin::User,
            crate::ast::core::Visibility::Explicit,
            None,
            domain,
        );
        Expr::pi(binder, codomain, sp())
    }

    #[test]
    fn test_validate_network_type_accepts_rank_one_real_tensors() {
        let ty = arrow(tensor_real(2), tensor_real(1));
        let shape = validate_network_type(&ty).unwrap();
        assert_eq!(shape, NetworkShape { inputs: 2, outputs: 1 });
    }

    #[test]
    fn test_validate_network_type_rejects_non_function() {
        let err = validate_network_type(&tensor_real(1)).unwrap_err();
        assert_eq!(err, NetworkTypeDefect::NotAFunction);
    }

    #[test]
    fn test_validate_network_type_rejects_non_tensor() {
        let ty = arrow(Expr::builtin(Builtin::Real, sp()), tensor_real(1));
        let err = validate_network_type(&ty).unwrap_err();
        assert_eq!(err, NetworkTypeDefect::NotATensor);
    }

    #[test]
    fn test_validate_network_type_rejects_wrong_element_type() {
        let bad = Expr::app_builtin(
            Builtin::Tensor,
            vec![
                Expr::builtin(Builtin::Nat, sp()),
                Expr::new(
                    ExprKind::Seq(vec![Expr::literal(Literal::Nat(1), sp())]),
                    sp(),
                ),
            ],
            sp(),
        );
        let err = validate_network_type(&arrow(bad, tensor_real(1))).unwrap_err();
        assert_eq!(err, NetworkTypeDefect::WrongTensorType);
    }

    #[test]
    fn test_validate_network_type_rejects_multidimensional() {
        let bad = Expr::app_builtin(
            Builtin::Tensor,
            vec![
                Expr::builtin(Builtin::Real, sp()),
                Expr::new(
                    ExprKind::Seq(vec![
                        Expr::literal(Literal::Nat(2), sp()),
                        Expr::literal(Literal::Nat(2), sp()),
                    ]),
                    sp(),
                ),
            ],
            sp(),
        );
        let err = validate_network_type(&arrow(bad, tensor_real(1))).unwrap_err();
        assert_eq!(err, NetworkTypeDefect::MultidimensionalTensor);
    }

    #[test]
    fn test_validate_network_type_rejects_variable_size() {
        let bad = Expr::app_builtin(
            Builtin::Tensor,
            vec![
                Expr::builtin(Builtin::Real, sp()),
                Expr::new(ExprKind::Seq(vec![Expr::bound(0, sp())]), sp()),
            ],
            sp(),
        );
        let err = validate_network_type(&arrow(bad, tensor_real(1))).unwrap_err();
        assert_eq!(err, NetworkTypeDefect::VariableSizeTensor);
    }

    #[test]
    fn test_rewriter_consumes_disjoint_ranges() {
        // let y1 = f #0 in let y2 = g #1 in True   with f, g : 1 -> 1
        let f = Ident::new("f");
        let g = Ident::new("g");
        let mut networks = IndexMap::new();
        networks.insert(f.clone(), NetworkShape { inputs: 1, outputs: 1 });
        networks.insert(g.clone(), NetworkShape { inputs: 1, outputs: 1 });

        let apply = |net: &Ident, arg: Expr| {
            Expr::app(
                Expr::free(net.clone(), sp()),
                vec![Arg::explicit(arg)],
                sp(),
            )
        };
        let binder = || Binder::machine("y", Expr::builtin(Builtin::Real, sp()), sp());
        let inner = Expr::let_in(
            apply(&g, Expr::bound(1, sp())),
            binder(),
            Expr::literal(Literal::Bool(true), sp()),
            sp(),
        );
        let body = Expr::let_in(apply(&f, Expr::bound(0, sp())), binder(), inner, sp());

        let mut rewriter = Rewriter {
            networks: &networks,
            total_inputs: 2,
            total_outputs: 2,
            next_input: 0,
            next_output: 0,
        };
        let rewritten = rewriter.rewrite(&body, 0).unwrap();
        assert_eq!(rewriter.next_input, 2);
        assert_eq!(rewriter.next_output, 2);
        // Both lets are gone, replaced by implications.
        assert_eq!(rewritten.builtin_head(), Some(Builtin::Implies));
    }

    #[test]
    fn test_bare_network_reference_is_rejected() {
        let f = Ident::new("f");
        let mut networks = IndexMap::new();
        networks.insert(f.clone(), NetworkShape { inputs: 1, outputs: 1 });
        let mut rewriter = Rewriter {
            networks: &networks,
            total_inputs: 1,
            total_outputs: 1,
            next_input: 0,
            next_output: 0,
        };
        let err = rewriter.rewrite(&Expr::free(f, sp()), 0).unwrap_err();
        assert!(matches!(err, SmtLibError::NetworkNotLetBound { .. }));
    }
}
