//! The closed set of builtin symbols and their type schemes.
//!
//! Builtins cover the primitive types, logical connectives, comparisons,
//! arithmetic, container primitives, quantifiers, and the type classes used
//! by the overloading machinery. The symbol strings are defined once in
//! `SYMBOL_STRINGS` (single source of truth for `Display` and lookup) and
//! the type of every builtin comes from [`type_of`], a fixed table of closed
//! de Bruijn schemes.

use crate::ast::core::{Binder, Expr, Literal, Origin, Visibility};
use crate::foundation::Span;
use serde::{Deserialize, Serialize};

/// Builtin symbol.
///
/// # Layout
///
/// Uses `#[repr(u16)]` so discriminants can index `SYMBOL_STRINGS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Builtin {
    // Types
    Bool,
    Prop,
    Nat,
    Int,
    Real,
    List,
    Tensor,

    // Logic
    If,
    Not,
    And,
    Or,
    Implies,

    // Comparison
    Eq,
    Neq,
    Le,
    Lt,
    Ge,
    Gt,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Neg,

    // Containers
    Cons,
    At,
    Map,
    Fold,

    // Quantifiers
    All,
    Any,
    AllIn,
    AnyIn,

    // Type classes
    HasEq,
    HasOrd,
    IsTruth,
    IsNatural,
    IsIntegral,
    IsRational,
    IsReal,
    IsContainer,
    IsQuantifiable,
}

/// Symbol string lookup table, indexed by discriminant.
///
/// NOTE: order must match the `Builtin` variant order exactly.
const SYMBOL_STRINGS: &[&str] = &[
    "Bool",
    "Prop",
    "Nat",
    "Int",
    "Real",
    "List",
    "Tensor", // types
    "if",
    "not",
    "and",
    "or",
    "implies", // logic
    "==",
    "!=",
    "<=",
    "<",
    ">=",
    ">", // comparison
    "+",
    "-",
    "*",
    "/",
    "~", // arithmetic
    "::",
    "!",
    "map",
    "fold", // containers
    "every",
    "some",
    "everyIn",
    "someIn", // quantifiers
    "HasEq",
    "HasOrd",
    "IsTruth",
    "IsNatural",
    "IsIntegral",
    "IsRational",
    "IsReal",
    "IsContainer",
    "IsQuantify", // classes
];

impl Builtin {
    /// The surface/core symbol for this builtin.
    pub fn symbol(self) -> &'static str {
        SYMBOL_STRINGS[self as usize]
    }

    /// True for the type-class builtins.
    pub fn is_class(self) -> bool {
        matches!(
            self,
            Builtin::HasEq
                | Builtin::HasOrd
                | Builtin::IsTruth
                | Builtin::IsNatural
                | Builtin::IsIntegral
                | Builtin::IsRational
                | Builtin::IsReal
                | Builtin::IsContainer
                | Builtin::IsQuantifiable
        )
    }
}

impl std::fmt::Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// Scheme construction helpers. All schemes are closed machine terms, so they
// carry the zero span.

fn sp() -> Span {
    Span::zero(0)
}

fn type0() -> Expr {
    Expr::universe(0, sp())
}

fn bt(b: Builtin) -> Expr {
    Expr::builtin(b, sp())
}

fn bound(i: usize) -> Expr {
    Expr::bound(i, sp())
}

/// `∀ {name : Type 0} . body`
fn forall(name: &str, body: Expr) -> Expr {
    let binder = Binder::new(
        sp(),
        Origin::Machine,
        Visibility::Implicit,
        Some(name.to_string()),
        type0(),
    );
    Expr::pi(binder, body, sp())
}

/// `class ⇒ body` (anonymous instance binder)
fn constrained(class: Expr, body: Expr) -> Expr {
    let binder = Binder::new(sp(), Origin::Machine, Visibility::Instance, None, class);
    Expr::pi(binder, body, sp())
}

/// `domain → body` (anonymous explicit binder)
fn arrow(domain: Expr, body: Expr) -> Expr {
    let binder = Binder::new(sp(), Origin::Machine, Visibility::Explicit, None, domain);
    Expr::pi(binder, body, sp())
}

fn class1(class: Builtin, arg: Expr) -> Expr {
    Expr::app_builtin(class, vec![arg], sp())
}

fn class2(class: Builtin, arg1: Expr, arg2: Expr) -> Expr {
    Expr::app_builtin(class, vec![arg1, arg2], sp())
}

/// `∀ {t} . cls t ⇒ t → t → t`: the shape shared by the overloaded
/// binary operators.
fn binary_op(cls: Builtin) -> Expr {
    forall(
        "t",
        constrained(
            class1(cls, bound(0)),
            arrow(bound(1), arrow(bound(2), bound(3))),
        ),
    )
}

/// `∀ {t} . cls t ⇒ t → t → Prop`: comparisons.
fn comparison_op(cls: Builtin) -> Expr {
    forall(
        "t",
        constrained(
            class1(cls, bound(0)),
            arrow(bound(1), arrow(bound(2), bt(Builtin::Prop))),
        ),
    )
}

/// `∀ {t} . cls t ⇒ (t → Prop) → Prop`: unbounded quantifiers.
fn quantifier_op() -> Expr {
    forall(
        "t",
        constrained(
            class1(Builtin::IsQuantifiable, bound(0)),
            arrow(arrow(bound(1), bt(Builtin::Prop)), bt(Builtin::Prop)),
        ),
    )
}

/// `∀ {t} {c} . IsContainer t c ⇒ (t → Prop) → c → Prop`: bounded
/// quantifiers.
fn bounded_quantifier_op() -> Expr {
    forall(
        "t",
        forall(
            "c",
            constrained(
                class2(Builtin::IsContainer, bound(1), bound(0)),
                arrow(
                    arrow(bound(2), bt(Builtin::Prop)),
                    arrow(bound(2), bt(Builtin::Prop)),
                ),
            ),
        ),
    )
}

/// Closed type scheme of a builtin.
pub fn type_of(builtin: Builtin) -> Expr {
    match builtin {
        // Primitive types
        Builtin::Bool | Builtin::Prop | Builtin::Nat | Builtin::Int | Builtin::Real => type0(),
        Builtin::List => arrow(type0(), type0()),
        Builtin::Tensor => arrow(
            type0(),
            arrow(
                Expr::app_builtin(Builtin::List, vec![bt(Builtin::Nat)], sp()),
                type0(),
            ),
        ),

        // Logic
        Builtin::If => forall(
            "t",
            arrow(
                bt(Builtin::Prop),
                arrow(bound(1), arrow(bound(2), bound(3))),
            ),
        ),
        Builtin::Not => forall(
            "t",
            constrained(
                class1(Builtin::IsTruth, bound(0)),
                arrow(bound(1), bound(2)),
            ),
        ),
        Builtin::And | Builtin::Or | Builtin::Implies => binary_op(Builtin::IsTruth),

        // Comparison
        Builtin::Eq | Builtin::Neq => comparison_op(Builtin::HasEq),
        Builtin::Le | Builtin::Lt | Builtin::Ge | Builtin::Gt => comparison_op(Builtin::HasOrd),

        // Arithmetic
        Builtin::Add | Builtin::Mul => binary_op(Builtin::IsNatural),
        Builtin::Sub => binary_op(Builtin::IsIntegral),
        Builtin::Div => binary_op(Builtin::IsRational),
        Builtin::Neg => forall(
            "t",
            constrained(
                class1(Builtin::IsIntegral, bound(0)),
                arrow(bound(1), bound(2)),
            ),
        ),

        // Containers
        Builtin::Cons => forall(
            "t",
            arrow(
                bound(0),
                arrow(
                    Expr::app_builtin(Builtin::List, vec![bound(1)], sp()),
                    Expr::app_builtin(Builtin::List, vec![bound(2)], sp()),
                ),
            ),
        ),
        Builtin::At => forall(
            "e",
            forall(
                "c",
                constrained(
                    class2(Builtin::IsContainer, bound(1), bound(0)),
                    arrow(bound(1), arrow(bt(Builtin::Nat), bound(4))),
                ),
            ),
        ),
        Builtin::Map => forall(
            "a",
            forall(
                "b",
                arrow(
                    arrow(bound(1), bound(1)),
                    arrow(
                        Expr::app_builtin(Builtin::List, vec![bound(2)], sp()),
                        Expr::app_builtin(Builtin::List, vec![bound(2)], sp()),
                    ),
                ),
            ),
        ),
        Builtin::Fold => forall(
            "a",
            forall(
                "b",
                arrow(
                    arrow(bound(1), arrow(bound(1), bound(2))),
                    arrow(
                        bound(1),
                        arrow(
                            Expr::app_builtin(Builtin::List, vec![bound(3)], sp()),
                            bound(3),
                        ),
                    ),
                ),
            ),
        ),

        // Quantifiers
        Builtin::All | Builtin::Any => quantifier_op(),
        Builtin::AllIn | Builtin::AnyIn => bounded_quantifier_op(),

        // Type classes: `Type 0 → Type 0` (binary for IsContainer)
        Builtin::HasEq
        | Builtin::HasOrd
        | Builtin::IsTruth
        | Builtin::IsNatural
        | Builtin::IsIntegral
        | Builtin::IsRational
        | Builtin::IsReal
        | Builtin::IsQuantifiable => arrow(type0(), type0()),
        Builtin::IsContainer => arrow(type0(), arrow(type0(), type0())),
    }
}

/// Polymorphic type skeleton of a literal: `∀ {t} . cls t ⇒ t` where `cls`
/// is the class of the literal's family.
pub fn type_of_literal(literal: &Literal) -> Expr {
    let cls = match literal {
        Literal::Nat(_) => Builtin::IsNatural,
        Literal::Int(_) => Builtin::IsIntegral,
        Literal::Rat(_) => Builtin::IsRational,
        Literal::Bool(_) => Builtin::IsTruth,
    };
    forall("t", constrained(class1(cls, bound(0)), bound(1)))
}
