//! Core declarations and programs.
//!
//! Declarations are ordered: each sees every earlier one in scope, and the
//! pipeline processes them strictly in source order.

use crate::ast::core::Expr;
use crate::foundation::{Ident, Span};
use serde::{Deserialize, Serialize};

/// Core declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    /// Network signature. No body: networks are external black boxes.
    Network { span: Span, ident: Ident, ty: Expr },
    /// Dataset signature. No body: datasets are provided by the driver.
    Dataset { span: Span, ident: Ident, ty: Expr },
    /// Function definition.
    Function {
        span: Span,
        ident: Ident,
        ty: Expr,
        body: Expr,
    },
}

impl Decl {
    pub fn ident(&self) -> &Ident {
        match self {
            Decl::Network { ident, .. }
            | Decl::Dataset { ident, .. }
            | Decl::Function { ident, .. } => ident,
        }
    }

    pub fn ty(&self) -> &Expr {
        match self {
            Decl::Network { ty, .. } | Decl::Dataset { ty, .. } | Decl::Function { ty, .. } => ty,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Decl::Network { span, .. } | Decl::Dataset { span, .. } | Decl::Function { span, .. } => {
                *span
            }
        }
    }

    /// The definition body, when there is one.
    pub fn body(&self) -> Option<&Expr> {
        match self {
            Decl::Function { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// A core program: declarations in source order.
pub type Prog = Vec<Decl>;
