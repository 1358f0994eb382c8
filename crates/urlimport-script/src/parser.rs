//! Recursive-descent parser producing the module syntax tree.

use crate::ast::{BinOp, BoolOp, CmpOp, Expr, ExprKind, FunctionDef, Param, Stmt, StmtKind, UnaryOp};
use crate::lexer::{tokenize, Span, SpannedToken, Token};
use std::collections::HashSet;
use std::sync::Arc;

/// Parse error type with span information
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Tokenize and parse a whole module.
pub fn parse_module(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let tokens = tokenize(source).map_err(|e| ParseError::new(e.message, e.span))?;
    Parser::new(tokens).parse()
}

fn describe(token: &Token) -> String {
    match token {
        Token::Newline => "end of line".to_string(),
        Token::Indent => "indent".to_string(),
        Token::Dedent => "dedent".to_string(),
        Token::Eof => "end of file".to_string(),
        Token::Ident(name) => format!("'{}'", name),
        Token::Int(value) => format!("'{}'", value),
        Token::Float(value) => format!("'{}'", value),
        Token::Str(_) => "string literal".to_string(),
        other => format!("{:?}", other),
    }
}

/// Maximum nesting of blocks and expressions.
const MAX_NESTING: usize = 100;

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    last_end: usize,
    nesting: usize,
    loop_depth: usize,
    /// Names bound in the function currently being parsed; `None` at module
    /// level.
    locals: Option<HashSet<String>>,
}

impl Parser {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Parser {
            tokens,
            pos: 0,
            last_end: 0,
            nesting: 0,
            loop_depth: 0,
            locals: None,
        }
    }

    /// Parse statements until `Eof`.
    pub fn parse(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut body = Vec::new();
        while !self.check(&Token::Eof) {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &Token {
        self.tokens
            .get(self.pos + n)
            .map(|(token, _)| token)
            .unwrap_or(&Token::Eof)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.last_end..self.last_end)
    }

    fn advance(&mut self) -> SpannedToken {
        let spanned = self
            .tokens
            .get(self.pos)
            .cloned()
            .unwrap_or((Token::Eof, self.last_end..self.last_end));
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        self.last_end = spanned.1.end;
        spanned
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == expected
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.peek_span())
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<Span, ParseError> {
        if self.check(expected) {
            Ok(self.advance().1)
        } else {
            Err(self.error_here(format!(
                "expected {}, found {}",
                what,
                describe(self.peek())
            )))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error_here(format!("expected {}, found {}", what, describe(&other)))),
        }
    }

    fn expect_newline(&mut self) -> Result<(), ParseError> {
        self.expect(&Token::Newline, "end of line").map(|_| ())
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error_here("too many nested blocks or expressions"));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn record_binding(&mut self, name: &str) {
        if let Some(locals) = &mut self.locals {
            locals.insert(name.to_string());
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            Token::Def => self.parse_def(),
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::For => self.parse_for(),
            _ => {
                let stmt = self.parse_simple()?;
                self.expect_newline()?;
                Ok(stmt)
            }
        }
    }

    fn parse_simple(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek_span();

        let kind = match self.peek().clone() {
            Token::Pass => {
                self.advance();
                StmtKind::Pass
            }
            Token::Break => {
                if self.loop_depth == 0 {
                    return Err(self.error_here("'break' outside loop"));
                }
                self.advance();
                StmtKind::Break
            }
            Token::Continue => {
                if self.loop_depth == 0 {
                    return Err(self.error_here("'continue' not properly in loop"));
                }
                self.advance();
                StmtKind::Continue
            }
            Token::Return => {
                if self.locals.is_none() {
                    return Err(self.error_here("'return' outside function"));
                }
                self.advance();
                if self.check(&Token::Newline) {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expr()?))
                }
            }
            Token::Import | Token::From => {
                return Err(self.error_here("import statements are not permitted in remote modules"));
            }
            Token::Class => return Err(self.error_here("class definitions are not supported")),
            Token::Global => return Err(self.error_here("global statements are not supported")),
            Token::Indent => return Err(self.error_here("unexpected indent")),
            _ => return self.parse_expr_statement(),
        };

        Ok(Stmt {
            kind,
            span: start.start..self.last_end,
        })
    }

    fn parse_expr_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expr()?;

        let aug_op = match self.peek() {
            Token::PlusEq => Some(BinOp::Add),
            Token::MinusEq => Some(BinOp::Sub),
            Token::StarEq => Some(BinOp::Mul),
            _ => None,
        };

        if !self.check(&Token::Equals) && aug_op.is_none() {
            let span = expr.span.clone();
            return Ok(Stmt {
                kind: StmtKind::Expr(expr),
                span,
            });
        }

        let target = match expr.kind {
            ExprKind::Name(name) => name,
            _ => {
                return Err(ParseError::new(
                    "cannot assign to expression; only names are assignable",
                    expr.span,
                ));
            }
        };
        self.advance();
        self.record_binding(&target);

        let value = self.parse_expr()?;
        let span = expr.span.start..value.span.end;

        let kind = match aug_op {
            Some(op) => StmtKind::AugAssign { target, op, value },
            None => StmtKind::Assign { target, value },
        };
        Ok(Stmt { kind, span })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.nested(Self::parse_suite)
    }

    fn parse_suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&Token::Colon, "':'")?;

        if !self.eat(&Token::Newline) {
            let stmt = self.parse_simple()?;
            self.expect_newline()?;
            return Ok(vec![stmt]);
        }

        if !self.eat(&Token::Indent) {
            return Err(self.error_here("expected an indented block"));
        }

        let mut body = Vec::new();
        while !self.check(&Token::Dedent) && !self.check(&Token::Eof) {
            body.push(self.parse_statement()?);
        }
        self.expect(&Token::Dedent, "dedent")?;
        Ok(body)
    }

    fn parse_loop_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        body
    }

    fn parse_def(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek_span();
        if self.locals.is_some() {
            return Err(self.error_here("nested functions are not supported"));
        }
        self.advance();

        let name = self.expect_ident("function name")?;
        self.expect(&Token::LParen, "'('")?;

        let mut params: Vec<Param> = Vec::new();
        while !self.check(&Token::RParen) {
            let param_span = self.peek_span();
            let param_name = self.expect_ident("parameter name")?;
            if params.iter().any(|p| p.name == param_name) {
                return Err(ParseError::new(
                    format!("duplicate argument '{}' in function definition", param_name),
                    param_span,
                ));
            }

            let default = if self.eat(&Token::Equals) {
                Some(self.parse_expr()?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    return Err(ParseError::new(
                        "non-default argument follows default argument",
                        param_span,
                    ));
                }
                None
            };
            params.push(Param {
                name: param_name,
                default,
            });

            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "')'")?;

        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        self.locals = Some(params.iter().map(|p| p.name.clone()).collect());

        let body = self.parse_block();

        self.loop_depth = saved_loop_depth;
        let locals = self.locals.take().unwrap_or_default();
        let body = body?;

        let def = FunctionDef {
            name,
            params,
            body,
            locals,
            span: start.start..self.last_end,
        };
        Ok(Stmt {
            span: def.span.clone(),
            kind: StmtKind::FunctionDef(Arc::new(def)),
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().1;

        let test = self.parse_expr()?;
        let body = self.parse_block()?;
        let mut branches = vec![(test, body)];

        while self.eat(&Token::Elif) {
            let test = self.parse_expr()?;
            let body = self.parse_block()?;
            branches.push((test, body));
        }

        let orelse = if self.eat(&Token::Else) {
            self.parse_block()?
        } else {
            Vec::new()
        };

        Ok(Stmt {
            kind: StmtKind::If { branches, orelse },
            span: start.start..self.last_end,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().1;
        let test = self.parse_expr()?;
        let body = self.parse_loop_body()?;

        Ok(Stmt {
            kind: StmtKind::While { test, body },
            span: start.start..self.last_end,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().1;
        let target = self.expect_ident("loop variable")?;
        self.record_binding(&target);
        self.expect(&Token::In, "'in'")?;
        let iter = self.parse_expr()?;
        let body = self.parse_loop_body()?;

        Ok(Stmt {
            kind: StmtKind::For { target, iter, body },
            span: start.start..self.last_end,
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_or)
    }

    fn bool_op(op: BoolOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.start..right.span.end;
        Expr {
            kind: ExprKind::BoolOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        }
    }

    fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.start..right.span.end;
        Expr {
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Self::bool_op(BoolOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Self::bool_op(BoolOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if !self.check(&Token::Not) {
            return self.parse_comparison();
        }

        let start = self.advance().1;
        let operand = self.nested(Self::parse_not)?;
        let span = start.start..operand.span.end;
        Ok(Expr {
            kind: ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            },
            span,
        })
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_arith()?;
        let mut ops = Vec::new();

        loop {
            let op = match self.peek() {
                Token::EqEq => CmpOp::Eq,
                Token::NotEq => CmpOp::NotEq,
                Token::Lt => CmpOp::Lt,
                Token::LtEq => CmpOp::LtEq,
                Token::Gt => CmpOp::Gt,
                Token::GtEq => CmpOp::GtEq,
                Token::In => CmpOp::In,
                Token::Not if self.peek_at(1) == &Token::In => {
                    self.advance();
                    CmpOp::NotIn
                }
                _ => break,
            };
            self.advance();
            ops.push((op, self.parse_arith()?));
        }

        if ops.is_empty() {
            return Ok(left);
        }

        let end = ops.last().map(|(_, e)| e.span.end).unwrap_or(left.span.end);
        let span = left.span.start..end;
        Ok(Expr {
            kind: ExprKind::Compare {
                left: Box::new(left),
                ops,
            },
            span,
        })
    }

    fn parse_arith(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::SlashSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            _ => return self.parse_postfix(),
        };

        let start = self.advance().1;
        let operand = self.nested(Self::parse_factor)?;
        let span = start.start..operand.span.end;
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            match self.peek() {
                Token::LParen => {
                    self.advance();
                    let args = self.parse_sequence(&Token::RParen)?;
                    let end = self.expect(&Token::RParen, "')'")?.end;
                    let span = expr.span.start..end;
                    expr = Expr {
                        kind: ExprKind::Call {
                            func: Box::new(expr),
                            args,
                        },
                        span,
                    };
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    let end = self.expect(&Token::RBracket, "']'")?.end;
                    let span = expr.span.start..end;
                    expr = Expr {
                        kind: ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    };
                }
                Token::Dot => return Err(self.error_here("attribute access is not supported")),
                _ => return Ok(expr),
            }
        }
    }

    /// Comma-separated expressions up to (not including) `close`, trailing
    /// comma allowed.
    fn parse_sequence(&mut self, close: &Token) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let (token, span) = (self.peek().clone(), self.peek_span());

        let kind = match token {
            Token::Int(value) => ExprKind::Int(value),
            Token::Float(value) => ExprKind::Float(value),
            Token::Str(first) => {
                self.advance();
                let mut value = first;
                let mut end = span.end;
                while let Token::Str(next) = self.peek().clone() {
                    end = self.advance().1.end;
                    value.push_str(&next);
                }
                return Ok(Expr {
                    kind: ExprKind::Str(value),
                    span: span.start..end,
                });
            }
            Token::True => ExprKind::Bool(true),
            Token::False => ExprKind::Bool(false),
            Token::NoneKw => ExprKind::None,
            Token::Ident(name) => ExprKind::Name(name),
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                if self.check(&Token::Comma) {
                    return Err(self.error_here("tuples are not supported"));
                }
                let end = self.expect(&Token::RParen, "')'")?.end;
                return Ok(Expr {
                    kind: inner.kind,
                    span: span.start..end,
                });
            }
            Token::LBracket => {
                self.advance();
                let items = self.parse_sequence(&Token::RBracket)?;
                let end = self.expect(&Token::RBracket, "']'")?.end;
                return Ok(Expr {
                    kind: ExprKind::List(items),
                    span: span.start..end,
                });
            }
            Token::Lambda => return Err(self.error_here("lambda expressions are not supported")),
            other => {
                return Err(self.error_here(format!("invalid syntax: unexpected {}", describe(&other))));
            }
        };

        self.advance();
        Ok(Expr { kind, span })
    }
}
