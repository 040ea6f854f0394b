//! Expression parser: precedence climbing over the surface grammar.
//!
//! The binding forms (`\`, `forall`, `let`, `if`, `every`, `some`) extend
//! maximally to the right; the operator tower below them is handled by a
//! precedence-climbing loop with a single operator table as the source of
//! truth.

use crate::ast::builtin::Builtin;
use crate::ast::core::{Literal, Visibility};
use crate::ast::surface::{Arg, Binder, Expr, ExprKind};
use crate::lexer::Token;
use crate::parser::{ParseError, TokenStream};

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
    /// Non-associative: chaining is a parse error (comparisons).
    None,
}

/// What a binary operator builds.
#[derive(Debug, Clone, Copy)]
enum BinOp {
    /// `->`: anonymous explicit `Pi`.
    Arrow,
    /// Builtin application.
    Builtin(Builtin),
}

/// Binary operator metadata: (precedence, associativity, operator).
///
/// Higher precedence binds tighter. Single source of truth for the binary
/// layer of the grammar.
fn binary_op_info(token: &Token) -> Option<(u8, Assoc, BinOp)> {
    match token {
        Token::Arrow => Some((10, Assoc::Right, BinOp::Arrow)),
        Token::FatArrow => Some((20, Assoc::Right, BinOp::Builtin(Builtin::Implies))),
        Token::Or => Some((30, Assoc::Left, BinOp::Builtin(Builtin::Or))),
        Token::And => Some((40, Assoc::Left, BinOp::Builtin(Builtin::And))),
        Token::EqEq => Some((50, Assoc::None, BinOp::Builtin(Builtin::Eq))),
        Token::BangEq => Some((50, Assoc::None, BinOp::Builtin(Builtin::Neq))),
        Token::LtEq => Some((50, Assoc::None, BinOp::Builtin(Builtin::Le))),
        Token::Lt => Some((50, Assoc::None, BinOp::Builtin(Builtin::Lt))),
        Token::GtEq => Some((50, Assoc::None, BinOp::Builtin(Builtin::Ge))),
        Token::Gt => Some((50, Assoc::None, BinOp::Builtin(Builtin::Gt))),
        Token::ColonColon => Some((60, Assoc::Right, BinOp::Builtin(Builtin::Cons))),
        Token::Plus => Some((70, Assoc::Left, BinOp::Builtin(Builtin::Add))),
        Token::Minus => Some((70, Assoc::Left, BinOp::Builtin(Builtin::Sub))),
        Token::Star => Some((80, Assoc::Left, BinOp::Builtin(Builtin::Mul))),
        Token::Slash => Some((80, Assoc::Left, BinOp::Builtin(Builtin::Div))),
        Token::Bang => Some((90, Assoc::Left, BinOp::Builtin(Builtin::At))),
        _ => None,
    }
}

/// Parse a full expression.
pub(crate) fn parse_expr(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    parse_operand(stream, 0)
}

/// Parse an expression: a binding form, or the operator tower at
/// `min_prec`. Binding forms swallow everything to their right, so they are
/// safe in any operand position.
fn parse_operand(stream: &mut TokenStream, min_prec: u8) -> Result<Expr, ParseError> {
    match stream.peek() {
        Some(Token::Backslash) => parse_lambda(stream),
        Some(Token::Forall) => parse_forall(stream),
        Some(Token::Let) => parse_let(stream),
        Some(Token::If) => parse_if(stream),
        Some(Token::Every) | Some(Token::Some_) => parse_quantifier(stream),
        // `{x : T} -> R`: an implicit binder can only open a Pi type here;
        // implicit arguments never start an expression.
        Some(Token::LBrace) => parse_implicit_pi(stream),
        _ => parse_binop(stream, min_prec),
    }
}

/// `{x : T} {y} -> R`: leading implicit Pi binders.
fn parse_implicit_pi(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_pos();
    let mut binders = vec![parse_binder(stream)?];
    while stream.check(&Token::LBrace) {
        binders.push(parse_binder(stream)?);
    }
    stream.expect(Token::Arrow)?;
    let body = parse_expr(stream)?;
    let span = stream.span_from(start);
    Ok(binders.into_iter().rev().fold(body, |acc, binder| {
        Expr::new(ExprKind::Pi(binder, Box::new(acc)), span)
    }))
}

/// Precedence-climbing loop over binary operators.
fn parse_binop(stream: &mut TokenStream, min_prec: u8) -> Result<Expr, ParseError> {
    let start = stream.current_pos();
    let mut left = parse_prefix(stream)?;

    while let Some(token) = stream.peek() {
        let Some((prec, assoc, op)) = binary_op_info(token) else {
            break;
        };
        if prec < min_prec {
            break;
        }
        stream.advance();

        let next_prec = match assoc {
            Assoc::Left | Assoc::None => prec + 1,
            Assoc::Right => prec,
        };
        let right = parse_operand(stream, next_prec)?;
        let span = stream.span_from(start);

        left = match op {
            BinOp::Arrow => {
                let binder = Binder::new(left.span, Visibility::Explicit, None, Some(left));
                Expr::new(ExprKind::Pi(binder, Box::new(right)), span)
            }
            BinOp::Builtin(builtin) => Expr::app_builtin(builtin, vec![left, right], span),
        };

        // Comparisons do not chain: `a == b == c` is rejected here.
        if assoc == Assoc::None {
            if let Some(next) = stream.peek() {
                if let Some((next_op_prec, Assoc::None, _)) = binary_op_info(next) {
                    if next_op_prec == prec {
                        return Err(ParseError::invalid(
                            "comparison operators are non-associative",
                            stream.current_span(),
                        ));
                    }
                }
            }
        }
    }

    Ok(left)
}

/// Prefix operators: unary minus and `not`.
fn parse_prefix(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_pos();
    match stream.peek() {
        Some(Token::Minus) => {
            stream.advance();
            // Unary minus binds tighter than any binary operator.
            let operand = parse_binop(stream, 90)?;
            let span = stream.span_from(start);
            Ok(Expr::app_builtin(Builtin::Neg, vec![operand], span))
        }
        Some(Token::Not) => {
            stream.advance();
            // `not` scopes over one comparison but not over `and`/`or`.
            let operand = parse_binop(stream, 50)?;
            let span = stream.span_from(start);
            Ok(Expr::app_builtin(Builtin::Not, vec![operand], span))
        }
        _ => parse_app(stream),
    }
}

/// True when `token` can begin an atom (and hence an explicit argument).
fn starts_atom(token: &Token) -> bool {
    matches!(
        token,
        Token::Ident(_)
            | Token::NatLiteral(_)
            | Token::RatLiteral(_)
            | Token::True
            | Token::False
            | Token::Hole(_)
            | Token::LParen
            | Token::LBracket
            | Token::TypeUniverse
            | Token::Bool
            | Token::Prop
            | Token::Nat
            | Token::Int
            | Token::Real
            | Token::List
            | Token::Tensor
            | Token::Map
            | Token::Fold
    )
}

/// Application by juxtaposition, with `{e}` implicit and `{{e}}` instance
/// arguments.
fn parse_app(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_pos();
    let mut expr = parse_atom(stream)?;

    loop {
        let arg = match stream.peek() {
            Some(Token::LBrace) => {
                stream.advance();
                let inner = parse_expr(stream)?;
                stream.expect(Token::RBrace)?;
                Arg::new(Visibility::Implicit, inner)
            }
            Some(Token::DoubleLBrace) => {
                stream.advance();
                let inner = parse_expr(stream)?;
                stream.expect(Token::DoubleRBrace)?;
                Arg::new(Visibility::Instance, inner)
            }
            Some(token) if starts_atom(token) => Arg::explicit(parse_atom(stream)?),
            _ => break,
        };
        let span = stream.span_from(start);
        expr = Expr::app(expr, vec![arg], span);
    }

    Ok(expr)
}

/// Atoms: literals, names, holes, sequences, universes, parens.
fn parse_atom(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_pos();
    let span = stream.current_span();

    let token = stream.advance().cloned();
    let expr = match token {
        Some(Token::Ident(name)) => Expr::var(name, span),
        Some(Token::NatLiteral(n)) => Expr::literal(Literal::Nat(n), span),
        Some(Token::RatLiteral(r)) => Expr::literal(Literal::Rat(r), span),
        Some(Token::True) => Expr::literal(Literal::Bool(true), span),
        Some(Token::False) => Expr::literal(Literal::Bool(false), span),
        Some(Token::Hole(name)) => Expr::new(ExprKind::Hole(name), span),
        Some(Token::Bool) => Expr::builtin(Builtin::Bool, span),
        Some(Token::Prop) => Expr::builtin(Builtin::Prop, span),
        Some(Token::Nat) => Expr::builtin(Builtin::Nat, span),
        Some(Token::Int) => Expr::builtin(Builtin::Int, span),
        Some(Token::Real) => Expr::builtin(Builtin::Real, span),
        Some(Token::List) => Expr::builtin(Builtin::List, span),
        Some(Token::Tensor) => Expr::builtin(Builtin::Tensor, span),
        Some(Token::Map) => Expr::builtin(Builtin::Map, span),
        Some(Token::Fold) => Expr::builtin(Builtin::Fold, span),
        Some(Token::TypeUniverse) => {
            let level_span = stream.current_span();
            let level = match stream.advance().cloned() {
                Some(Token::NatLiteral(level)) => level,
                other => {
                    return Err(ParseError::unexpected(
                        other.as_ref(),
                        "after 'Type' (expected a universe level)",
                        level_span,
                    ));
                }
            };
            Expr::new(ExprKind::Type(level as u32), stream.span_from(start))
        }
        Some(Token::LParen) => {
            let inner = parse_expr(stream)?;
            stream.expect(Token::RParen)?;
            inner
        }
        Some(Token::LBracket) => {
            let mut elements = Vec::new();
            if !stream.check(&Token::RBracket) {
                loop {
                    elements.push(parse_expr(stream)?);
                    if !stream.eat(&Token::Comma) {
                        break;
                    }
                }
            }
            stream.expect(Token::RBracket)?;
            Expr::new(ExprKind::Seq(elements), stream.span_from(start))
        }
        other => {
            return Err(ParseError::unexpected(
                other.as_ref(),
                "in expression",
                span,
            ));
        }
    };

    Ok(expr)
}

/// One binder: `x`, `_`, `(x : T)`, `{x}`, or `{x : T}`.
pub(crate) fn parse_binder(stream: &mut TokenStream) -> Result<Binder, ParseError> {
    let start = stream.current_pos();
    let span = stream.current_span();
    match stream.peek().cloned() {
        Some(Token::Ident(name)) => {
            stream.advance();
            Ok(Binder::new(span, Visibility::Explicit, binder_name(name), None))
        }
        Some(Token::LParen) => {
            stream.advance();
            let name = expect_ident(stream)?;
            stream.expect(Token::Colon)?;
            let ty = parse_expr(stream)?;
            stream.expect(Token::RParen)?;
            Ok(Binder::new(
                stream.span_from(start),
                Visibility::Explicit,
                binder_name(name),
                Some(ty),
            ))
        }
        Some(Token::LBrace) => {
            stream.advance();
            let name = expect_ident(stream)?;
            let ty = if stream.eat(&Token::Colon) {
                Some(parse_expr(stream)?)
            } else {
                None
            };
            stream.expect(Token::RBrace)?;
            Ok(Binder::new(
                stream.span_from(start),
                Visibility::Implicit,
                binder_name(name),
                ty,
            ))
        }
        other => Err(ParseError::unexpected(other.as_ref(), "in binder", span)),
    }
}

/// True when `token` can begin a binder.
pub(crate) fn starts_binder(token: &Token) -> bool {
    matches!(token, Token::Ident(_) | Token::LParen | Token::LBrace)
}

/// One or more binders.
fn parse_binders(stream: &mut TokenStream) -> Result<Vec<Binder>, ParseError> {
    let mut binders = vec![parse_binder(stream)?];
    while let Some(token) = stream.peek() {
        if starts_binder(token) {
            binders.push(parse_binder(stream)?);
        } else {
            break;
        }
    }
    Ok(binders)
}

fn binder_name(name: String) -> Option<String> {
    if name == "_" {
        None
    } else {
        Some(name)
    }
}

fn expect_ident(stream: &mut TokenStream) -> Result<String, ParseError> {
    let span = stream.current_span();
    match stream.advance() {
        Some(Token::Ident(name)) => Ok(name.clone()),
        other => {
            let other = other.cloned();
            Err(ParseError::unexpected(
                other.as_ref(),
                "(expected an identifier)",
                span,
            ))
        }
    }
}

/// `\ binder+ -> e`
fn parse_lambda(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Backslash)?;
    let binders = parse_binders(stream)?;
    stream.expect(Token::Arrow)?;
    let body = parse_expr(stream)?;
    let span = stream.span_from(start);
    Ok(binders.into_iter().rev().fold(body, |acc, binder| {
        Expr::new(ExprKind::Lam(binder, Box::new(acc)), span)
    }))
}

/// `forall binder+ . e`
fn parse_forall(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Forall)?;
    let binders = parse_binders(stream)?;
    stream.expect(Token::Dot)?;
    let body = parse_expr(stream)?;
    let span = stream.span_from(start);
    Ok(binders.into_iter().rev().fold(body, |acc, binder| {
        Expr::new(ExprKind::Pi(binder, Box::new(acc)), span)
    }))
}

/// `let x = v in e` (with optional `: T` annotation)
fn parse_let(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Let)?;
    let name_span = stream.current_span();
    let name = expect_ident(stream)?;
    let ty = if stream.eat(&Token::Colon) {
        Some(parse_expr(stream)?)
    } else {
        None
    };
    stream.expect(Token::Eq)?;
    let value = parse_expr(stream)?;
    stream.expect(Token::In)?;
    let body = parse_expr(stream)?;
    let span = stream.span_from(start);
    let binder = Binder::new(name_span, Visibility::Explicit, binder_name(name), ty);
    Ok(Expr::new(
        ExprKind::Let(Box::new(value), binder, Box::new(body)),
        span,
    ))
}

/// `if c then t else e`
fn parse_if(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::If)?;
    let cond = parse_expr(stream)?;
    stream.expect(Token::Then)?;
    let then_branch = parse_expr(stream)?;
    stream.expect(Token::Else)?;
    let else_branch = parse_expr(stream)?;
    let span = stream.span_from(start);
    Ok(Expr::app_builtin(
        Builtin::If,
        vec![cond, then_branch, else_branch],
        span,
    ))
}

/// `every binder+ . e`, `some binder+ . e`, or the bounded forms
/// `every x inn xs . e` / `some x inn xs . e`.
fn parse_quantifier(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_pos();
    let is_every = match stream.advance() {
        Some(Token::Every) => true,
        Some(Token::Some_) => false,
        other => {
            let other = other.cloned();
            return Err(ParseError::unexpected(
                other.as_ref(),
                "(expected a quantifier)",
                stream.current_span(),
            ));
        }
    };
    let binders = parse_binders(stream)?;

    if stream.eat(&Token::Inn) {
        // Bounded quantification over a container; single binder only.
        if binders.len() != 1 {
            return Err(ParseError::invalid(
                "bounded quantifiers take exactly one binder",
                stream.span_from(start),
            ));
        }
        let domain = parse_expr(stream)?;
        stream.expect(Token::Dot)?;
        let body = parse_expr(stream)?;
        let span = stream.span_from(start);
        let binder = binders.into_iter().next().expect("one binder");
        let lam = Expr::new(ExprKind::Lam(binder, Box::new(body)), span);
        let builtin = if is_every { Builtin::AllIn } else { Builtin::AnyIn };
        return Ok(Expr::app_builtin(builtin, vec![lam, domain], span));
    }

    stream.expect(Token::Dot)?;
    let body = parse_expr(stream)?;
    let span = stream.span_from(start);
    let builtin = if is_every { Builtin::All } else { Builtin::Any };
    Ok(binders.into_iter().rev().fold(body, |acc, binder| {
        let lam = Expr::new(ExprKind::Lam(binder, Box::new(acc)), span);
        Expr::app_builtin(builtin, vec![lam], span)
    }))
}
