//! Token definitions for SecLang
//!
//! Tokens represent the atomic units of meaning in source code.

use std::fmt;

use crate::ast::VarType;
use crate::security::SecurityLabel;

/// Location in source code for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token types in SecLang
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Boolean(bool),
    StringValue(String),

    // Identifiers
    Ident(String),

    // Type keywords
    Type(VarType),  // int, string, bool
    Const,          // const

    // Security classes: TS, S, C, U and their long names
    SecurityClass(SecurityLabel),

    // Channel classes: topsecret, secret, confidential, unclassified
    ChannelClass(SecurityLabel),

    // Control keywords
    If,
    Then,
    Else,
    EndIf,
    While,
    Do,
    EndWhile,

    // User interaction
    Debug,
    Input,

    // Relabeling procedures
    Declassify,
    Downgrade,

    // Channel operations
    Open,
    Close,
    Write,
    Read,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %

    // Comparison
    Equal,      // =
    EqualEqual, // ==
    BangEqual,  // !=
    Less,       // <
    LessEqual,  // <=
    Greater,    // >
    GreaterEqual, // >=

    // Delimiters
    LeftParen,  // (
    RightParen, // )
    Comma,      // ,
    Colon,      // :
    Quote,      // '

    // End of input
    Eof,
}

impl TokenKind {
    /// True for tokens after which a `-` is a binary minus rather than
    /// the sign of a numeric literal
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::Boolean(_)
                | TokenKind::Ident(_)
                | TokenKind::RightParen
                | TokenKind::Quote
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::Boolean(b) => write!(f, "{}", b),
            TokenKind::StringValue(s) => write!(f, "{}", s),
            TokenKind::Ident(s) => write!(f, "{}", s),
            TokenKind::Type(t) => write!(f, "{}", t),
            TokenKind::Const => write!(f, "const"),
            TokenKind::SecurityClass(label) => write!(f, "{}", label.short_name()),
            TokenKind::ChannelClass(label) => write!(f, "{}", label.name().to_lowercase()),
            TokenKind::If => write!(f, "if"),
            TokenKind::Then => write!(f, "then"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::EndIf => write!(f, "endif"),
            TokenKind::While => write!(f, "while"),
            TokenKind::Do => write!(f, "do"),
            TokenKind::EndWhile => write!(f, "endwhile"),
            TokenKind::Debug => write!(f, "debug"),
            TokenKind::Input => write!(f, "input"),
            TokenKind::Declassify => write!(f, "declassify"),
            TokenKind::Downgrade => write!(f, "downgrade"),
            TokenKind::Open => write!(f, "open"),
            TokenKind::Close => write!(f, "close"),
            TokenKind::Write => write!(f, "write"),
            TokenKind::Read => write!(f, "read"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Equal => write!(f, "="),
            TokenKind::EqualEqual => write!(f, "=="),
            TokenKind::BangEqual => write!(f, "!="),
            TokenKind::Less => write!(f, "<"),
            TokenKind::LessEqual => write!(f, "<="),
            TokenKind::Greater => write!(f, ">"),
            TokenKind::GreaterEqual => write!(f, ">="),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Quote => write!(f, "'"),
            TokenKind::Eof => write!(f, "EndOfFile"),
        }
    }
}

/// A token with its kind and location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub lexeme: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, lexeme: String) -> Self {
        Self { kind, span, lexeme }
    }
}

/// Check if a word is a keyword and return the corresponding token kind
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    match ident {
        "int" => Some(TokenKind::Type(VarType::Int)),
        "string" => Some(TokenKind::Type(VarType::String)),
        "bool" => Some(TokenKind::Type(VarType::Bool)),
        "const" => Some(TokenKind::Const),
        "true" => Some(TokenKind::Boolean(true)),
        "false" => Some(TokenKind::Boolean(false)),
        "debug" => Some(TokenKind::Debug),
        "input" => Some(TokenKind::Input),
        "if" => Some(TokenKind::If),
        "then" => Some(TokenKind::Then),
        "else" => Some(TokenKind::Else),
        "endif" => Some(TokenKind::EndIf),
        "while" => Some(TokenKind::While),
        "do" => Some(TokenKind::Do),
        "endwhile" => Some(TokenKind::EndWhile),
        "declassify" => Some(TokenKind::Declassify),
        "downgrade" => Some(TokenKind::Downgrade),
        "open" => Some(TokenKind::Open),
        "close" => Some(TokenKind::Close),
        "write" => Some(TokenKind::Write),
        "read" => Some(TokenKind::Read),
        "unclassified" => Some(TokenKind::ChannelClass(SecurityLabel::Unclassified)),
        "confidential" => Some(TokenKind::ChannelClass(SecurityLabel::Confidential)),
        "secret" => Some(TokenKind::ChannelClass(SecurityLabel::Secret)),
        "topsecret" => Some(TokenKind::ChannelClass(SecurityLabel::TopSecret)),
        _ => SecurityLabel::from_name(ident).map(TokenKind::SecurityClass),
    }
}
