//! Lexical analysis for the Vehicle surface syntax.
//!
//! Tokenization uses logos. Comments (`--` line, `{- -}` block) and
//! whitespace are stripped during lexing. Token strings for keywords,
//! operators and delimiters live once in `TOKEN_STRINGS` (single source of
//! truth for `Display`).

use logos::Logos;

/// Vehicle token.
///
/// # Layout
///
/// Uses `#[repr(u16)]` so discriminant values are stable and can index
/// `TOKEN_STRINGS`.
#[derive(Logos, Debug, Clone, PartialEq)]
#[repr(u16)]
#[logos(skip r"[ \t\r\n]+")] // whitespace
#[logos(skip r"--[^\n]*")] // line comments
#[logos(skip r"\{-([^-]|-[^}])*-\}")] // block comments
pub enum Token {
    // === Declaration keywords ===
    /// Keyword `network`
    #[token("network")]
    Network,
    /// Keyword `dataset`
    #[token("dataset")]
    Dataset,
    /// Keyword `type`
    #[token("type")]
    TypeDecl,

    // === Expression keywords ===
    /// Keyword `forall`
    #[token("forall")]
    Forall,
    /// Keyword `let`
    #[token("let")]
    Let,
    /// Keyword `in`
    #[token("in")]
    In,
    /// Keyword `inn` (quantifier domain; kept distinct from `let ... in`)
    #[token("inn")]
    Inn,
    /// Keyword `if`
    #[token("if")]
    If,
    /// Keyword `then`
    #[token("then")]
    Then,
    /// Keyword `else`
    #[token("else")]
    Else,
    /// Keyword `every`
    #[token("every")]
    Every,
    /// Keyword `some`
    #[token("some")]
    Some_,
    /// Keyword `map`
    #[token("map")]
    Map,
    /// Keyword `fold`
    #[token("fold")]
    Fold,
    /// Keyword `not`
    #[token("not")]
    Not,
    /// Keyword `and`
    #[token("and")]
    And,
    /// Keyword `or`
    #[token("or")]
    Or,

    // === Primitive type names ===
    /// Keyword `Type` (universe)
    #[token("Type")]
    TypeUniverse,
    /// Keyword `Bool`
    #[token("Bool")]
    Bool,
    /// Keyword `Prop`
    #[token("Prop")]
    Prop,
    /// Keyword `Nat`
    #[token("Nat")]
    Nat,
    /// Keyword `Int`
    #[token("Int")]
    Int,
    /// Keyword `Real`
    #[token("Real")]
    Real,
    /// Keyword `List`
    #[token("List")]
    List,
    /// Keyword `Tensor`
    #[token("Tensor")]
    Tensor,

    // === Boolean literals ===
    /// Literal `True`
    #[token("True")]
    True,
    /// Literal `False`
    #[token("False")]
    False,

    // === Operators ===
    /// Operator `->`
    #[token("->")]
    Arrow,
    /// Operator `=>`
    #[token("=>")]
    FatArrow,
    /// Operator `==`
    #[token("==")]
    EqEq,
    /// Operator `!=`
    #[token("!=")]
    BangEq,
    /// Operator `<=`
    #[token("<=")]
    LtEq,
    /// Operator `<`
    #[token("<")]
    Lt,
    /// Operator `>=`
    #[token(">=")]
    GtEq,
    /// Operator `>`
    #[token(">")]
    Gt,
    /// Operator `+`
    #[token("+")]
    Plus,
    /// Operator `-`
    #[token("-")]
    Minus,
    /// Operator `*`
    #[token("*")]
    Star,
    /// Operator `/`
    #[token("/")]
    Slash,
    /// Operator `::`
    #[token("::")]
    ColonColon,
    /// Operator `!` (indexing)
    #[token("!")]
    Bang,
    /// Operator `=`
    #[token("=")]
    Eq,
    /// Operator `:`
    #[token(":")]
    Colon,
    /// Operator `;`
    #[token(";")]
    Semicolon,
    /// Operator `.`
    #[token(".")]
    Dot,
    /// Operator `,`
    #[token(",")]
    Comma,
    /// Operator `\` (lambda)
    #[token("\\")]
    Backslash,

    // === Delimiters ===
    /// Delimiter `(`
    #[token("(")]
    LParen,
    /// Delimiter `)`
    #[token(")")]
    RParen,
    /// Delimiter `[`
    #[token("[")]
    LBracket,
    /// Delimiter `]`
    #[token("]")]
    RBracket,
    /// Delimiter `{{` (instance argument)
    #[token("{{")]
    DoubleLBrace,
    /// Delimiter `}}`
    #[token("}}")]
    DoubleRBrace,
    /// Delimiter `{`
    #[token("{")]
    LBrace,
    /// Delimiter `}`
    #[token("}")]
    RBrace,

    // === Data-carrying tokens ===
    /// Natural number literal (e.g. `42`)
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    NatLiteral(u64),

    /// Rational literal (e.g. `3.14`, `5.67e-8`)
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    RatLiteral(f64),

    /// Hole `?name`
    #[regex(r"\?[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_string())]
    Hole(String),

    /// Identifier (e.g. `prop`, `f`, `x_1`)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_']*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Token string lookup table, indexed by discriminant.
///
/// NOTE: the `#[token("...")]` attributes above must match these strings;
/// logos needs literal strings so the duplication is unavoidable, but all
/// Display logic funnels through this table.
const TOKEN_STRINGS: &[&str] = &[
    "network", "dataset", "type", // declarations
    "forall", "let", "in", "inn", "if", "then", "else", "every", "some", "map", "fold", "not",
    "and", "or", // expression keywords
    "Type", "Bool", "Prop", "Nat", "Int", "Real", "List", "Tensor", // primitive types
    "True", "False", // booleans
    "->", "=>", "==", "!=", "<=", "<", ">=", ">", "+", "-", "*", "/", "::", "!", "=", ":", ";",
    ".", ",", "\\", // operators
    "(", ")", "[", "]", "{{", "}}", "{", "}", // delimiters
];

impl Token {
    /// Index into `TOKEN_STRINGS` for simple tokens.
    ///
    /// Safe due to `#[repr(u16)]` ensuring stable discriminants.
    fn token_string_index(&self) -> usize {
        let discriminant = unsafe { *(self as *const Token as *const u16) };
        discriminant as usize
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::NatLiteral(n) => write!(f, "{}", n),
            Token::RatLiteral(x) => write!(f, "{}", x),
            Token::Hole(name) => write!(f, "?{}", name),
            Token::Ident(id) => write!(f, "{}", id),
            _ => {
                let idx = self.token_string_index();
                let s = TOKEN_STRINGS
                    .get(idx)
                    .expect("BUG: token discriminant out of bounds for TOKEN_STRINGS");
                write!(f, "{}", s)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lex source, panicking on invalid tokens.
    fn lex(source: &str) -> Vec<Token> {
        Token::lexer(source)
            .collect::<Result<Vec<_>, _>>()
            .expect("lexing failed")
    }

    #[test]
    fn test_declaration_keywords() {
        assert_eq!(
            lex("network dataset type"),
            vec![Token::Network, Token::Dataset, Token::TypeDecl]
        );
    }

    #[test]
    fn test_identifiers_and_keywords() {
        assert_eq!(
            lex("prop f x_1 lettuce"),
            vec![
                Token::Ident("prop".to_string()),
                Token::Ident("f".to_string()),
                Token::Ident("x_1".to_string()),
                Token::Ident("lettuce".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex("42 3.14 5.67e-8"),
            vec![
                Token::NatLiteral(42),
                Token::RatLiteral(3.14),
                Token::RatLiteral(5.67e-8),
            ]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            lex("-> => == != <= < >= > :: : ! ="),
            vec![
                Token::Arrow,
                Token::FatArrow,
                Token::EqEq,
                Token::BangEq,
                Token::LtEq,
                Token::Lt,
                Token::GtEq,
                Token::Gt,
                Token::ColonColon,
                Token::Colon,
                Token::Bang,
                Token::Eq,
            ]
        );
    }

    #[test]
    fn test_instance_braces() {
        assert_eq!(
            lex("{{ }} { }"),
            vec![
                Token::DoubleLBrace,
                Token::DoubleRBrace,
                Token::LBrace,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn test_hole() {
        assert_eq!(lex("?t"), vec![Token::Hole("t".to_string())]);
    }

    #[test]
    fn test_line_comments() {
        assert_eq!(
            lex("network -- a network\nf"),
            vec![Token::Network, Token::Ident("f".to_string())]
        );
    }

    #[test]
    fn test_block_comments() {
        assert_eq!(
            lex("network {- multi\nline -} f"),
            vec![Token::Network, Token::Ident("f".to_string())]
        );
    }

    #[test]
    fn test_property_declaration() {
        let tokens = lex("p : Prop ; p = 1 + 2 == 3");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("p".to_string()),
                Token::Colon,
                Token::Prop,
                Token::Semicolon,
                Token::Ident("p".to_string()),
                Token::Eq,
                Token::NatLiteral(1),
                Token::Plus,
                Token::NatLiteral(2),
                Token::EqEq,
                Token::NatLiteral(3),
            ]
        );
    }

    #[test]
    fn test_network_declaration() {
        let tokens = lex("network f : Tensor Real [1] -> Tensor Real [1] ;");
        assert_eq!(
            tokens,
            vec![
                Token::Network,
                Token::Ident("f".to_string()),
                Token::Colon,
                Token::Tensor,
                Token::Real,
                Token::LBracket,
                Token::NatLiteral(1),
                Token::RBracket,
                Token::Arrow,
                Token::Tensor,
                Token::Real,
                Token::LBracket,
                Token::NatLiteral(1),
                Token::RBracket,
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_quantifier_with_domain() {
        assert_eq!(
            lex("every x inn [] . x > 0"),
            vec![
                Token::Every,
                Token::Ident("x".to_string()),
                Token::Inn,
                Token::LBracket,
                Token::RBracket,
                Token::Dot,
                Token::Ident("x".to_string()),
                Token::Gt,
                Token::NatLiteral(0),
            ]
        );
    }

    #[test]
    fn test_token_display_consistency() {
        assert_eq!(Token::Network.to_string(), "network");
        assert_eq!(Token::Arrow.to_string(), "->");
        assert_eq!(Token::EqEq.to_string(), "==");
        assert_eq!(Token::DoubleLBrace.to_string(), "{{");
        assert_eq!(Token::Backslash.to_string(), "\\");
        assert_eq!(Token::Hole("t".to_string()).to_string(), "?t");
    }

    #[test]
    fn test_invalid_token_is_error() {
        let results: Vec<_> = Token::lexer("p @ q").collect();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
