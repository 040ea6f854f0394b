//! Declaration parser.
//!
//! A program is a sequence of declarations:
//!
//! ```text
//! network NAME : EXPR ;
//! dataset NAME : EXPR ;
//! type NAME BINDER* = EXPR ;
//! NAME : EXPR ;  NAME BINDER* = EXPR ;    (signature + definition pair)
//! NAME BINDER* = EXPR ;                   (definition, type inferred)
//! ```
//!
//! A signature must be immediately followed by the definition of the same
//! name; the pair merges into one function declaration. Definition binders
//! are sugar for lambdas.

use crate::ast::surface::{Decl, Expr, ExprKind, Prog};
use crate::lexer::Token;
use crate::parser::expr::{parse_binder, parse_expr, starts_binder};
use crate::parser::{ParseError, TokenStream};

/// Parse a whole program.
pub fn parse_prog(
    tokens: &[(Token, std::ops::Range<usize>)],
    file_id: u16,
) -> Result<Prog, ParseError> {
    let mut stream = TokenStream::new(tokens, file_id);
    let mut prog = Vec::new();

    while !stream.at_end() {
        match stream.peek() {
            Some(Token::Network) => prog.push(parse_external(&mut stream, true)?),
            Some(Token::Dataset) => prog.push(parse_external(&mut stream, false)?),
            Some(Token::TypeDecl) => prog.push(parse_type_synonym(&mut stream)?),
            Some(Token::Ident(_)) => prog.push(parse_function(&mut stream)?),
            other => {
                let other = other.cloned();
                return Err(ParseError::unexpected(
                    other.as_ref(),
                    "at start of declaration",
                    stream.current_span(),
                ));
            }
        }
    }

    Ok(prog)
}

/// `network NAME : EXPR ;` or `dataset NAME : EXPR ;`
fn parse_external(stream: &mut TokenStream, is_network: bool) -> Result<Decl, ParseError> {
    let start = stream.current_pos();
    stream.advance();
    let name = expect_decl_name(stream)?;
    stream.expect(Token::Colon)?;
    let ty = parse_expr(stream)?;
    stream.expect(Token::Semicolon)?;
    let span = stream.span_from(start);
    Ok(if is_network {
        Decl::Network { span, name, ty }
    } else {
        Decl::Dataset { span, name, ty }
    })
}

/// `type NAME BINDER* = EXPR ;`: sugar for a definition whose type is
/// inferred.
fn parse_type_synonym(stream: &mut TokenStream) -> Result<Decl, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::TypeDecl)?;
    let name = expect_decl_name(stream)?;
    let binders = parse_decl_binders(stream)?;
    stream.expect(Token::Eq)?;
    let body = parse_expr(stream)?;
    stream.expect(Token::Semicolon)?;
    let span = stream.span_from(start);
    let body = wrap_in_lambdas(binders, body, span);
    let ty = Expr::new(ExprKind::Hole(name.clone()), span);
    Ok(Decl::Function {
        span,
        name,
        ty,
        body,
    })
}

/// `NAME : EXPR ; NAME BINDER* = EXPR ;` or `NAME BINDER* = EXPR ;`
fn parse_function(stream: &mut TokenStream) -> Result<Decl, ParseError> {
    let start = stream.current_pos();
    let name = expect_decl_name(stream)?;

    let ty = if stream.eat(&Token::Colon) {
        let ty = parse_expr(stream)?;
        stream.expect(Token::Semicolon)?;

        // The definition for this signature must come next.
        let def_span = stream.current_span();
        let def_name = expect_decl_name(stream)?;
        if def_name != name {
            return Err(ParseError::invalid(
                format!(
                    "signature for '{}' must be followed by its definition, found '{}'",
                    name, def_name
                ),
                def_span,
            ));
        }
        ty
    } else {
        Expr::new(ExprKind::Hole(name.clone()), stream.current_span())
    };

    let binders = parse_decl_binders(stream)?;
    stream.expect(Token::Eq)?;
    let body = parse_expr(stream)?;
    stream.expect(Token::Semicolon)?;
    let span = stream.span_from(start);
    let body = wrap_in_lambdas(binders, body, span);
    Ok(Decl::Function {
        span,
        name,
        ty,
        body,
    })
}

/// Zero or more binders before `=`.
fn parse_decl_binders(
    stream: &mut TokenStream,
) -> Result<Vec<crate::ast::surface::Binder>, ParseError> {
    let mut binders = Vec::new();
    while let Some(token) = stream.peek() {
        if starts_binder(token) {
            binders.push(parse_binder(stream)?);
        } else {
            break;
        }
    }
    Ok(binders)
}

fn wrap_in_lambdas(
    binders: Vec<crate::ast::surface::Binder>,
    body: Expr,
    span: crate::foundation::Span,
) -> Expr {
    binders.into_iter().rev().fold(body, |acc, binder| {
        Expr::new(ExprKind::Lam(binder, Box::new(acc)), span)
    })
}

fn expect_decl_name(stream: &mut TokenStream) -> Result<String, ParseError> {
    let span = stream.current_span();
    match stream.advance().cloned() {
        Some(Token::Ident(name)) => Ok(name),
        other => Err(ParseError::unexpected(
            other.as_ref(),
            "(expected a declaration name)",
            span,
        )),
    }
}
