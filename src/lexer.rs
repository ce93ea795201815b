//! Lexer for SecLang
//!
//! Converts source code into a stream of tokens. Input is processed line by
//! line and columns restart at 1 on every line.

use crate::error::{ErrorKind, Result, SecLangError};
use crate::token::{lookup_keyword, Span, Token, TokenKind};

/// The lexer state
pub struct Lexer<'a> {
    source: &'a str,
    line_text: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from source code
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            line_text: "",
            chars: "".char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire source
    #[tracing::instrument(skip_all, fields(source_len = self.source.len()))]
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let source = self.source;

        for (index, line_text) in source.split('\n').enumerate() {
            self.start_line(index + 1, line_text);
            self.scan_line(&mut tokens)?;
        }

        // The end-of-input token sits just past the last line
        tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.line, self.line_text.chars().count() + 1),
            String::new(),
        ));

        tracing::debug!(token_count = tokens.len(), "tokenized source");
        Ok(tokens)
    }

    fn start_line(&mut self, line: usize, text: &'a str) {
        self.line_text = text;
        self.chars = text.char_indices().peekable();
        self.current_pos = 0;
        self.line = line;
        self.column = 1;
    }

    /// Scan every token on the current line
    fn scan_line(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        loop {
            self.skip_whitespace();

            let Some(&(start_pos, ch)) = self.chars.peek() else {
                return Ok(());
            };
            let span = Span::new(self.line, self.column);

            let kind = match ch {
                // Single character tokens
                '(' => { self.advance(); TokenKind::LeftParen }
                ')' => { self.advance(); TokenKind::RightParen }
                ',' => { self.advance(); TokenKind::Comma }
                ':' => { self.advance(); TokenKind::Colon }
                '+' => { self.advance(); TokenKind::Plus }
                '*' => { self.advance(); TokenKind::Star }
                '/' => { self.advance(); TokenKind::Slash }
                '%' => { self.advance(); TokenKind::Percent }

                // Sign of a numeric literal, or binary minus
                '-' => {
                    let operand_before = tokens.last().is_some_and(|t| t.kind.ends_operand());
                    if !operand_before && self.second_char().is_some_and(|c| c.is_ascii_digit()) {
                        self.scan_number(span)?
                    } else {
                        self.advance();
                        TokenKind::Minus
                    }
                }

                // Potentially two-character tokens
                '=' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::EqualEqual
                    } else {
                        TokenKind::Equal
                    }
                }
                '<' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::LessEqual
                    } else {
                        TokenKind::Less
                    }
                }
                '>' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::GreaterEqual
                    } else {
                        TokenKind::Greater
                    }
                }
                '!' if self.second_char() == Some('=') => {
                    self.advance();
                    self.advance();
                    TokenKind::BangEqual
                }

                // String literals produce three tokens
                '\'' => {
                    self.scan_string(tokens);
                    continue;
                }

                // Number literals
                c if c.is_ascii_digit() => self.scan_number(span)?,

                // Identifiers and keywords
                c if c.is_ascii_alphabetic() => self.scan_identifier(),

                // Unknown character
                _ => {
                    return Err(SecLangError::new(
                        ErrorKind::UnexpectedCharacter(ch),
                        Some(span),
                    ));
                }
            };

            let lexeme = self.line_text[start_pos..self.current_pos].to_string();
            tokens.push(Token::new(kind, span, lexeme));
        }
    }

    /// Advance and return the current character
    fn advance(&mut self) -> Option<char> {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos + ch.len_utf8();
            self.column += 1;
            Some(ch)
        } else {
            None
        }
    }

    /// Peek at the next character without advancing
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    /// Peek one character past the next one
    fn second_char(&self) -> Option<char> {
        self.line_text[self.current_pos..].chars().nth(1)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if matches!(ch, ' ' | '\t' | '\r' | '\n') {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Scan a single-quoted string: opening quote, raw content, closing
    /// quote. An unterminated literal stops at the end of the line and
    /// emits no closing quote; the parser reports it.
    fn scan_string(&mut self, tokens: &mut Vec<Token>) {
        let quote_span = Span::new(self.line, self.column);
        self.advance();
        tokens.push(Token::new(TokenKind::Quote, quote_span, "'".to_string()));

        let content_span = Span::new(self.line, self.column);
        let mut value = String::new();
        while let Some(c) = self.peek_char() {
            if c == '\'' {
                break;
            }
            value.push(c);
            self.advance();
        }
        tokens.push(Token::new(
            TokenKind::StringValue(value.clone()),
            content_span,
            value,
        ));

        if self.peek_char() == Some('\'') {
            let closing_span = Span::new(self.line, self.column);
            self.advance();
            tokens.push(Token::new(TokenKind::Quote, closing_span, "'".to_string()));
        }
    }

    /// Scan a number literal, integer or decimal, with an optional sign
    fn scan_number(&mut self, span: Span) -> Result<TokenKind> {
        let start = self.current_pos;

        if self.peek_char() == Some('-') {
            self.advance();
        }

        self.consume_digits();

        // Only take the dot if a digit follows it
        if self.peek_char() == Some('.') && self.second_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.consume_digits();
        }

        let text = &self.line_text[start..self.current_pos];
        match text.parse::<f64>() {
            Ok(value) => Ok(TokenKind::Number(value)),
            Err(_) => Err(SecLangError::new(
                ErrorKind::InvalidNumber(text.to_string()),
                Some(span),
            )),
        }
    }

    fn consume_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.current_pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphabetic() {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.line_text[start..self.current_pos];
        lookup_keyword(text).unwrap_or_else(|| TokenKind::Ident(text.to_string()))
    }
}

/// Tokenize a whole source text
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::VarType;
    use crate::security::SecurityLabel;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !matches!(k, TokenKind::Eof))
            .collect()
    }

    #[test]
    fn test_declaration() {
        assert_eq!(kinds("string x:TS='Hello '"), vec![
            TokenKind::Type(VarType::String),
            TokenKind::Ident("x".to_string()),
            TokenKind::Colon,
            TokenKind::SecurityClass(SecurityLabel::TopSecret),
            TokenKind::Equal,
            TokenKind::Quote,
            TokenKind::StringValue("Hello ".to_string()),
            TokenKind::Quote,
        ]);
    }

    #[test]
    fn test_operators() {
        assert_eq!(kinds("+ - * / % = == != < <= > >="), vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::Equal,
            TokenKind::EqualEqual,
            TokenKind::BangEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
        ]);
    }

    #[test]
    fn test_two_char_operators_need_adjacency() {
        assert_eq!(kinds("< ="), vec![TokenKind::Less, TokenKind::Equal]);
        assert_eq!(kinds("= ="), vec![TokenKind::Equal, TokenKind::Equal]);
    }

    #[test]
    fn test_numbers_and_signs() {
        assert_eq!(kinds("42 3.14"), vec![
            TokenKind::Number(42.0),
            TokenKind::Number(3.14),
        ]);
        assert_eq!(kinds("(-7)"), vec![
            TokenKind::LeftParen,
            TokenKind::Number(-7.0),
            TokenKind::RightParen,
        ]);
        // After an operand the dash is a binary minus
        assert_eq!(kinds("x-1"), vec![
            TokenKind::Ident("x".to_string()),
            TokenKind::Minus,
            TokenKind::Number(1.0),
        ]);
        assert_eq!(kinds("x=-1"), vec![
            TokenKind::Ident("x".to_string()),
            TokenKind::Equal,
            TokenKind::Number(-1.0),
        ]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(kinds("if then else endif while do endwhile"), vec![
            TokenKind::If,
            TokenKind::Then,
            TokenKind::Else,
            TokenKind::EndIf,
            TokenKind::While,
            TokenKind::Do,
            TokenKind::EndWhile,
        ]);
        assert_eq!(kinds("open close read write secret"), vec![
            TokenKind::Open,
            TokenKind::Close,
            TokenKind::Read,
            TokenKind::Write,
            TokenKind::ChannelClass(SecurityLabel::Secret),
        ]);
        assert_eq!(kinds("U Confidential"), vec![
            TokenKind::SecurityClass(SecurityLabel::Unclassified),
            TokenKind::SecurityClass(SecurityLabel::Confidential),
        ]);
    }

    #[test]
    fn test_empty_and_unterminated_strings() {
        assert_eq!(kinds("''"), vec![
            TokenKind::Quote,
            TokenKind::StringValue(String::new()),
            TokenKind::Quote,
        ]);
        assert_eq!(kinds("'abc"), vec![
            TokenKind::Quote,
            TokenKind::StringValue("abc".to_string()),
        ]);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("int x\n  debug x").unwrap();
        assert_eq!(tokens[0].span, Span::new(1, 1));
        assert_eq!(tokens[1].span, Span::new(1, 5));
        assert_eq!(tokens[2].span, Span::new(2, 3));
        assert_eq!(tokens[3].span, Span::new(2, 9));
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.span.line, 2);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("int x\nint y = 3 $").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnexpectedCharacter('$')));
        assert_eq!(err.span, Some(Span::new(2, 11)));
    }

    #[test]
    fn test_lone_bang_is_rejected() {
        assert!(tokenize("x ! y").is_err());
    }
}
