//! Parser for SecLang
//!
//! Converts tokens into an Abstract Syntax Tree. Recursive descent with one
//! token of lookahead. The parser also keeps the stack of channels opened so
//! far and rejects any `close` that breaks LIFO order.

use crate::ast::{AccessMode, BinaryOp, Expr, Program, ReadTarget, Stmt, VarType};
use crate::error::{ErrorKind, Result, SecLangError};
use crate::lexer::Lexer;
use crate::security::SecurityLabel;
use crate::token::{Token, TokenKind};

/// The parser state
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    open_channels: Vec<String>,
}

impl Parser {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            open_channels: Vec::new(),
        }
    }

    /// Continue from channels left open by earlier input
    pub fn with_open_channels(mut self, open_channels: Vec<String>) -> Self {
        self.open_channels = open_channels;
        self
    }

    /// Parse the tokens into a program
    #[tracing::instrument(skip_all, fields(token_count = self.tokens.len()))]
    pub fn parse(&mut self) -> Result<Program> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.statement()?);
        }

        Ok(Program::new(body))
    }

    /// Channels opened and not yet closed, innermost last
    pub fn open_channels(&self) -> &[String] {
        &self.open_channels
    }

    // ==================== Statements ====================

    fn statement(&mut self) -> Result<Stmt> {
        match &self.peek().kind {
            TokenKind::Type(_) | TokenKind::Const => self.var_declaration(),
            TokenKind::Debug => self.debug_statement(),
            TokenKind::Input => self.input_statement(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Declassify => {
                let span = self.advance().span;
                let identifier = self.expect_ident("expected identifier after 'declassify'")?;
                Ok(Stmt::Declassify { identifier, span })
            }
            TokenKind::Downgrade => {
                let span = self.advance().span;
                let identifier = self.expect_ident("expected identifier after 'downgrade'")?;
                Ok(Stmt::Downgrade { identifier, span })
            }
            TokenKind::Open => self.open_statement(),
            TokenKind::Close => self.close_statement(),
            TokenKind::Write => self.write_statement(),
            _ => {
                let expr = self.expression()?;
                Ok(Stmt::Expr { expr })
            }
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let span = self.peek().span;
        let constant = self.match_token(&TokenKind::Const);

        let declared_type = match self.peek().kind {
            TokenKind::Type(var_type) => {
                self.advance();
                var_type
            }
            _ => return Err(self.error_expected("expected type specifier in variable declaration")),
        };

        let identifier = self.expect_ident("expected identifier name following variable type")?;

        let mut declared_label = SecurityLabel::Unclassified;
        if self.match_token(&TokenKind::Colon) {
            declared_label = match self.peek().kind {
                TokenKind::SecurityClass(label) => {
                    self.advance();
                    label
                }
                _ => return Err(self.error_expected("expected security class definition")),
            };
        }

        let value = if self.match_token(&TokenKind::Equal) {
            let value = self.expression()?;
            Some(bind_read_target(value, ReadTarget::Declaration {
                identifier: identifier.clone(),
                label: declared_label,
            }))
        } else {
            if constant {
                return Err(SecLangError::new(
                    ErrorKind::ConstWithoutValue(identifier),
                    Some(span),
                ));
            }
            None
        };

        Ok(Stmt::VarDeclaration {
            constant,
            identifier,
            declared_type,
            declared_label,
            value,
            span,
        })
    }

    fn debug_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'debug'
        let expr = self.expression()?;
        Ok(Stmt::Debug { expr, span })
    }

    fn input_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'input'
        let target = self.expect_ident("expected target of 'input' operation")?;
        let message = self.string_literal("input message expected")?;
        Ok(Stmt::Input { message, target, span })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'if'

        let condition = self.expression()?;
        self.expect(&TokenKind::Then, "expected 'then' keyword")?;

        let body = self.block(&[TokenKind::Else, TokenKind::EndIf])?;

        let else_body = if self.match_token(&TokenKind::Else) {
            Some(self.block(&[TokenKind::EndIf])?)
        } else {
            None
        };

        self.expect(&TokenKind::EndIf, "expected 'endif' keyword")?;

        Ok(Stmt::Conditional { condition, body, else_body, span })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'while'

        let condition = self.expression()?;
        self.expect(&TokenKind::Do, "expected 'do' keyword")?;

        let body = self.block(&[TokenKind::EndWhile])?;
        self.expect(&TokenKind::EndWhile, "expected 'endwhile' keyword")?;

        Ok(Stmt::While { condition, body, span })
    }

    /// Statements up to (not including) one of the terminators
    fn block(&mut self, terminators: &[TokenKind]) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();

        while !terminators.iter().any(|t| self.check(t)) && !self.is_at_end() {
            stmts.push(self.statement()?);
        }

        Ok(stmts)
    }

    // ==================== Channels ====================

    fn open_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'open'
        self.expect(&TokenKind::LeftParen, "expected opening parenthesis after 'open'")?;
        let name = self.channel_name("expected channel name after 'open'")?;
        self.expect(&TokenKind::Comma, "expected ',' after channel name")?;

        let mode_span = self.peek().span;
        let literal = self.string_literal("expected access mode ('r' or 'w') after channel name")?;
        let mode = AccessMode::from_literal(&literal).ok_or_else(|| {
            SecLangError::new(ErrorKind::InvalidAccessMode(literal.clone()), Some(mode_span))
        })?;

        self.expect(&TokenKind::RightParen, "expected closing parenthesis")?;

        self.open_channels.push(name.clone());

        Ok(Stmt::OpenChannel { name, mode, span })
    }

    fn close_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'close'
        self.expect(&TokenKind::LeftParen, "expected opening parenthesis after 'close'")?;
        let name = self.channel_name("expected channel name after 'close'")?;
        self.expect(&TokenKind::RightParen, "expected closing parenthesis")?;

        let Some(top) = self.open_channels.last() else {
            return Err(SecLangError::new(ErrorKind::CloseWithoutOpen, Some(span)));
        };
        if !self.open_channels.contains(&name) {
            return Err(SecLangError::new(ErrorKind::CloseUnopened(name), Some(span)));
        }
        if *top != name {
            return Err(SecLangError::new(
                ErrorKind::CloseOutOfOrder { expected: top.clone(), found: name },
                Some(span),
            ));
        }
        self.open_channels.pop();

        Ok(Stmt::CloseChannel { name, span })
    }

    fn write_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'write'
        self.expect(&TokenKind::LeftParen, "expected opening parenthesis after 'write'")?;
        let channel = self.channel_name("expected channel name after 'write'")?;
        self.expect(&TokenKind::Comma, "expected ',' after channel name")?;
        let value = self.expression()?;
        self.expect(&TokenKind::RightParen, "expected closing parenthesis")?;

        Ok(Stmt::Write { channel, value, span })
    }

    fn read_expression(&mut self) -> Result<Expr> {
        let span = self.advance().span; // consume 'read'
        self.expect(&TokenKind::LeftParen, "expected opening parenthesis after 'read'")?;
        let channel = self.channel_name("expected channel name after 'read'")?;
        self.expect(&TokenKind::RightParen, "expected closing parenthesis")?;

        Ok(Expr::Read { channel, target: None, span })
    }

    /// A quoted channel name, or a channel-class keyword such as `secret`
    fn channel_name(&mut self, message: &str) -> Result<String> {
        if let TokenKind::ChannelClass(label) = self.peek().kind {
            self.advance();
            return Ok(label.name().to_string());
        }
        self.string_literal(message)
    }

    // ==================== Expressions ====================

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let target = self.additive()?;

        if self.match_token(&TokenKind::Equal) {
            let value = self.assignment()?;
            let value = match &target {
                Expr::Identifier { symbol, .. } => bind_read_target(value, ReadTarget::Assignment {
                    identifier: symbol.clone(),
                }),
                _ => value,
            };
            let span = target.span();

            return Ok(Expr::Assignment {
                target: Box::new(target),
                value: Box::new(value),
                span,
            });
        }

        Ok(target)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut left = self.multiplicative()?;

        loop {
            let op = if self.match_token(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.match_token(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };

            let right = self.multiplicative()?;
            let span = left.span();
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    /// Multiplicative and comparison operators share this tier
    fn multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.primary()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::LessEqual => BinaryOp::Le,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::GreaterEqual => BinaryOp::Ge,
                TokenKind::EqualEqual => BinaryOp::Eq,
                TokenKind::BangEqual => BinaryOp::Ne,
                _ => break,
            };
            self.advance();

            let right = self.primary()?;
            let span = left.span();
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();

        match &token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Identifier { symbol: name.clone(), span: token.span })
            }
            TokenKind::Number(_) => {
                self.advance();
                let value = token.lexeme.parse::<i64>().map_err(|_| {
                    SecLangError::new(ErrorKind::NonIntegerLiteral(token.lexeme.clone()), Some(token.span))
                })?;
                Ok(Expr::NumericLiteral { value, span: token.span })
            }
            TokenKind::Boolean(value) => {
                self.advance();
                Ok(Expr::BooleanLiteral { value: *value, span: token.span })
            }
            TokenKind::Quote => {
                let value = self.string_literal("expected string value")?;
                Ok(Expr::StringLiteral { value, span: token.span })
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(&TokenKind::RightParen, "unexpected token inside parenthesized expression")?;
                Ok(expr)
            }
            TokenKind::Read => self.read_expression(),
            _ => Err(SecLangError::new(
                ErrorKind::UnexpectedToken(token.kind.to_string()),
                Some(token.span),
            )),
        }
    }

    /// Opening quote, content, closing quote
    fn string_literal(&mut self, message: &str) -> Result<String> {
        self.expect(&TokenKind::Quote, message)?;
        let value = match &self.peek().kind {
            TokenKind::StringValue(value) => value.clone(),
            _ => return Err(self.error_expected(message)),
        };
        self.advance();
        self.expect(&TokenKind::Quote, "expected closing single quote")?;
        Ok(value)
    }

    // ==================== Helpers ====================

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<String> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error_expected(message))
        }
    }

    fn error_expected(&self, message: &str) -> SecLangError {
        SecLangError::new(
            ErrorKind::ExpectedToken(message.to_string(), self.peek().kind.to_string()),
            Some(self.peek().span),
        )
    }
}

/// Give a `read(...)` that forms a whole right-hand side its destination.
/// Reads nested deeper keep no target and fall back to `Unclassified`.
fn bind_read_target(expr: Expr, target: ReadTarget) -> Expr {
    match expr {
        Expr::Read { channel, target: None, span } => Expr::Read {
            channel,
            target: Some(target),
            span,
        },
        other => other,
    }
}

/// Tokenize and parse a whole source text
pub fn produce_ast(source: &str) -> Result<Program> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}
