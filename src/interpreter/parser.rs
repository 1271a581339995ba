use crate::ast::{BinaryOp, Expr, ExprKind, Stmt, UnaryOp};
use crate::diagnostic::{Diagnostic, Label, Span};
use crate::lexer::Token;
use crate::value::Value;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub expected: Vec<String>,
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            expected: Vec::new(),
            found: None,
        }
    }

    pub fn with_expected(mut self, expected: Vec<String>) -> Self {
        self.expected = expected;
        self
    }

    pub fn with_found(mut self, found: impl Into<String>) -> Self {
        self.found = Some(found.into());
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut msg = self.message.clone();
        if !self.expected.is_empty() {
            msg = format!("expected {}", self.expected.join(" or "));
            if let Some(found) = &self.found {
                msg.push_str(&format!(", found {}", found));
            }
        }

        let mut diag = Diagnostic::error(msg)
            .with_code("E0101")
            .with_label(Label::primary(self.span, ""));

        if self.expected.len() == 1 {
            diag = diag.with_help(format!("expected {} here", self.expected[0]));
        }

        diag
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Syntax error: {}", self.message)?;
        if !self.expected.is_empty() {
            write!(f, " (expected {}", self.expected.join(" or "))?;
            if let Some(found) = &self.found {
                write!(f, ", found {}", found)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Recursive-descent parser over the lexer's token stream. The first token
/// mismatch aborts the parse; no partial tree is produced.
pub struct TokenParser {
    tokens: Vec<SpannedToken>,
    current: usize,
    source_len: usize,
}

impl TokenParser {
    pub fn new(tokens: Vec<SpannedToken>, source_len: usize) -> Self {
        Self {
            tokens,
            current: 0,
            source_len,
        }
    }

    pub fn from_lexer_output(
        tokens: Vec<(Token, chumsky::span::SimpleSpan)>,
        source_len: usize,
    ) -> Self {
        let spanned_tokens: Vec<SpannedToken> = tokens
            .into_iter()
            .map(|(token, span)| SpannedToken {
                token,
                span: Span::new(span.start, span.end),
            })
            .collect();
        Self::new(spanned_tokens, source_len)
    }

    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.current).map(|st| &st.token)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.tokens.get(self.current + 1).map(|st| &st.token)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.current)
            .map(|st| st.span)
            .unwrap_or_else(|| Span::new(self.source_len, self.source_len))
    }

    fn at_end(&self) -> bool {
        matches!(self.current_token(), Some(Token::Eof) | None)
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        if self.current < self.tokens.len() {
            let st = self.tokens[self.current].clone();
            self.current += 1;
            Some(st)
        } else {
            None
        }
    }

    fn expect(&mut self, expected: Token) -> Result<Span, ParseError> {
        match self.current_token() {
            Some(token) if std::mem::discriminant(token) == std::mem::discriminant(&expected) => {
                let span = self.current_span();
                self.advance();
                Ok(span)
            }
            Some(token) => Err(ParseError::new("unexpected token", self.current_span())
                .with_expected(vec![format!("{:?}", expected)])
                .with_found(format!("{:?}", token))),
            None => Err(ParseError::new("unexpected end of input", self.current_span())
                .with_expected(vec![format!("{:?}", expected)])),
        }
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !self.at_end() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current_token() {
            Some(Token::Defun) => self.parse_function_def(),
            // `x = ...` is an assignment statement; anything else starting
            // with an identifier (including `x == ...`) is an expression.
            Some(Token::Ident(_)) if matches!(self.peek_token(), Some(Token::Assign)) => {
                self.parse_assignment()
            }
            _ => Ok(Stmt::Expr(self.parse_expression()?)),
        }
    }

    /// `Defun {'name': <name>, 'arguments': (<params>)} <body-expression>`
    fn parse_function_def(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::Defun)?;
        self.expect(Token::LBrace)?;

        self.expect_header_key("name")?;
        self.expect(Token::Colon)?;
        let (name, name_span) = self.parse_function_name()?;

        self.expect(Token::Comma)?;
        self.expect_header_key("arguments")?;
        self.expect(Token::Colon)?;
        let params = self.parse_parameters()?;

        self.expect(Token::RBrace)?;
        let body = self.parse_expression()?;

        Ok(Stmt::Function {
            name,
            params,
            body,
            span: name_span,
        })
    }

    /// Header keys are written as strings in the original notation, but a
    /// bare identifier is accepted as an equivalent spelling.
    fn expect_header_key(&mut self, key: &str) -> Result<Span, ParseError> {
        match self.current_token() {
            Some(Token::Str(text)) | Some(Token::Ident(text)) if text == key => {
                let span = self.current_span();
                self.advance();
                Ok(span)
            }
            other => {
                let mut err = ParseError::new(
                    format!("expected `{}` key in Defun header", key),
                    self.current_span(),
                )
                .with_expected(vec![format!("'{}'", key)]);
                if let Some(token) = other {
                    err = err.with_found(format!("{:?}", token));
                }
                Err(err)
            }
        }
    }

    fn parse_function_name(&mut self) -> Result<(Rc<str>, Span), ParseError> {
        match self.advance() {
            Some(SpannedToken { token: Token::Str(name), span })
            | Some(SpannedToken { token: Token::Ident(name), span }) => {
                if !is_identifier(&name) {
                    return Err(ParseError::new(
                        format!("`{}` is not a valid function name", name),
                        span,
                    ));
                }
                Ok((Rc::from(name.as_str()), span))
            }
            other => {
                let span = other.map(|st| st.span).unwrap_or_else(|| self.current_span());
                Err(ParseError::new("expected function name", span)
                    .with_expected(vec!["function name".to_string()]))
            }
        }
    }

    /// `( ident, ident, ... )` with an optional trailing comma; may be empty.
    fn parse_parameters(&mut self) -> Result<Vec<Rc<str>>, ParseError> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if !matches!(self.current_token(), Some(Token::RParen)) {
            loop {
                match self.advance() {
                    Some(SpannedToken { token: Token::Ident(param_name), .. }) => {
                        params.push(Rc::from(param_name.as_str()));
                    }
                    other => {
                        let span = other.map(|st| st.span).unwrap_or_else(|| self.current_span());
                        return Err(ParseError::new("expected parameter name", span)
                            .with_expected(vec!["identifier".to_string()]));
                    }
                }
                if matches!(self.current_token(), Some(Token::Comma)) {
                    self.advance();
                    if matches!(self.current_token(), Some(Token::RParen)) {
                        break;
                    }
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        Ok(params)
    }

    fn parse_assignment(&mut self) -> Result<Stmt, ParseError> {
        let (name, name_span) = match self.advance() {
            Some(SpannedToken { token: Token::Ident(identifier_name), span }) => {
                (Rc::from(identifier_name.as_str()), span)
            }
            other => {
                let span = other.map(|st| st.span).unwrap_or_else(|| self.current_span());
                return Err(ParseError::new("expected identifier in assignment", span)
                    .with_expected(vec!["identifier".to_string()]));
            }
        };
        self.expect(Token::Assign)?;
        let value = self.parse_expression()?;
        Ok(Stmt::Assign {
            name,
            value,
            span: name_span,
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_expr(1)
    }

    fn token_to_binary_operator(token: &Token) -> Option<(u8, BinaryOp)> {
        match token {
            Token::Or => Some((1, BinaryOp::Or)),
            Token::And => Some((2, BinaryOp::And)),
            Token::Eq => Some((3, BinaryOp::Eq)),
            Token::NotEq => Some((3, BinaryOp::NotEq)),
            Token::Greater => Some((4, BinaryOp::Greater)),
            Token::Less => Some((4, BinaryOp::Less)),
            Token::GreaterEq => Some((4, BinaryOp::GreaterEq)),
            Token::LessEq => Some((4, BinaryOp::LessEq)),
            Token::Plus => Some((5, BinaryOp::Add)),
            Token::Minus => Some((5, BinaryOp::Sub)),
            Token::Star => Some((6, BinaryOp::Mul)),
            Token::Slash => Some((6, BinaryOp::Div)),
            Token::Percent => Some((6, BinaryOp::Mod)),
            _ => None,
        }
    }

    fn parse_binary_expr(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        while let Some(token) = self.current_token().cloned() {
            let (precedence, operator) = match Self::token_to_binary_operator(&token) {
                Some((prec, op)) if prec >= min_precedence => (prec, op),
                _ => break,
            };
            self.advance();
            let right = self.parse_binary_expr(precedence + 1)?;
            let span = left.span.merge(right.span);
            left = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(left),
                    op: operator,
                    right: Box::new(right),
                },
                span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.current_token(), Some(Token::Bang)) {
            let start_span = self.current_span();
            self.advance();
            let operand = self.parse_unary()?;
            let span = start_span.merge(operand.span);
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(operand),
                },
                span,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let (token, span) = match self.advance() {
            Some(SpannedToken { token, span }) => (token, span),
            None => {
                return Err(ParseError::new(
                    "unexpected end of input",
                    Span::new(self.source_len, self.source_len),
                )
                .with_expected(vec!["expression".to_string()]));
            }
        };

        match token {
            Token::Int(int_value) => Ok(Expr {
                kind: ExprKind::Literal(Value::Int(int_value)),
                span,
            }),
            Token::Str(string_value) => Ok(Expr {
                kind: ExprKind::Literal(Value::Str(Rc::from(string_value.as_str()))),
                span,
            }),
            Token::True => Ok(Expr {
                kind: ExprKind::Literal(Value::Bool(true)),
                span,
            }),
            Token::False => Ok(Expr {
                kind: ExprKind::Literal(Value::Bool(false)),
                span,
            }),
            Token::Ident(name) => {
                if matches!(self.current_token(), Some(Token::LParen)) {
                    self.parse_call(Rc::from(name.as_str()), span)
                } else {
                    Ok(Expr {
                        kind: ExprKind::Identifier(Rc::from(name.as_str())),
                        span,
                    })
                }
            }
            Token::LParen => {
                // Parentheses re-enter the top precedence level and leave no
                // node of their own; only the span widens.
                let expr = self.parse_expression()?;
                let end_span = self.expect(Token::RParen)?;
                Ok(Expr {
                    kind: expr.kind,
                    span: span.merge(end_span),
                })
            }
            Token::Lambd => self.parse_lambda(span),
            Token::Eof => Err(ParseError::new("unexpected end of input", span)
                .with_expected(vec!["expression".to_string()])),
            other => Err(ParseError::new(
                format!("unexpected token: {:?}", other),
                span,
            )
            .with_expected(vec!["expression".to_string()])
            .with_found(format!("{:?}", other))),
        }
    }

    fn parse_call(&mut self, name: Rc<str>, start_span: Span) -> Result<Expr, ParseError> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.current_token(), Some(Token::RParen)) {
            loop {
                args.push(self.parse_expression()?);
                if matches!(self.current_token(), Some(Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let end_span = self.expect(Token::RParen)?;
        Ok(Expr {
            kind: ExprKind::Call { name, args },
            span: start_span.merge(end_span),
        })
    }

    /// `Lambd ident, ident, ... . <body-expression>`
    fn parse_lambda(&mut self, start_span: Span) -> Result<Expr, ParseError> {
        let mut params = vec![self.parse_lambda_param()?];
        while matches!(self.current_token(), Some(Token::Comma)) {
            self.advance();
            params.push(self.parse_lambda_param()?);
        }
        self.expect(Token::Dot)?;
        let body = self.parse_expression()?;
        let span = start_span.merge(body.span);
        Ok(Expr {
            kind: ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
            span,
        })
    }

    fn parse_lambda_param(&mut self) -> Result<Rc<str>, ParseError> {
        match self.advance() {
            Some(SpannedToken { token: Token::Ident(param_name), .. }) => {
                Ok(Rc::from(param_name.as_str()))
            }
            other => {
                let span = other.map(|st| st.span).unwrap_or_else(|| self.current_span());
                Err(ParseError::new("expected lambda parameter", span)
                    .with_expected(vec!["identifier".to_string()]))
            }
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
