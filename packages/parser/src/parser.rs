use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{template_segments, tokenize, Token};
use std::ops::Range;

/// Deepest nesting of sub-expressions and statements the parser accepts
pub const MAX_NESTING_DEPTH: usize = 32;

/// Recursive descent parser for binding expression text
pub struct Parser<'src> {
    source: &'src str,
    /// Text reported in errors (the enclosing source for interpolations)
    text: &'src str,
    /// Offset of `source` within `text`
    offset: usize,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Self::with_offset(source, source, 0)
    }

    fn with_offset(source: &'src str, text: &'src str, offset: usize) -> ParseResult<Self> {
        let tokens = tokenize(source).map_err(|e| e.shifted(offset, text))?;
        Ok(Self {
            source,
            text,
            offset,
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    /// Parse the whole input as one expression (a single trailing `;` is allowed)
    pub fn parse_expression_source(&mut self) -> ParseResult<Expression> {
        let expr = self.parse_expression()?;
        self.match_token(Token::Semicolon);
        if !self.is_at_end() {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    /// Parse the whole input as a statement sequence
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        self.nested(|parser| parser.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> ParseResult<Statement> {
        let start = self.current_start();

        let statement = match self.peek_token() {
            Some(Token::Semicolon) => {
                self.advance();
                return Ok(Statement::Empty {
                    span: self.span(start, self.prev_end()),
                });
            }
            Some(Token::Let) | Some(Token::Const) | Some(Token::Var) => {
                let kind = match self.advance() {
                    Some(Token::Let) => DeclKind::Let,
                    Some(Token::Const) => DeclKind::Const,
                    _ => DeclKind::Var,
                };
                let name_start = self.current_start();
                let name = self.expect_ident()?;
                let name_span = self.span(name_start, self.prev_end());
                let init = if self.match_token(Token::Equals) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Statement::Declare {
                    kind,
                    name,
                    name_span,
                    init,
                    span: self.span(start, self.prev_end()),
                }
            }
            Some(Token::If) => {
                self.advance();
                self.expect(Token::LParen)?;
                let test = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let consequent = Box::new(self.parse_statement()?);
                let alternate = if self.match_token(Token::Else) {
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                return Ok(Statement::If {
                    test,
                    consequent,
                    alternate,
                    span: self.span(start, self.prev_end()),
                });
            }
            Some(Token::LBrace) => {
                let body = self.parse_block()?;
                return Ok(Statement::Block {
                    body,
                    span: self.span(start, self.prev_end()),
                });
            }
            Some(Token::Return) => {
                self.advance();
                let value = match self.peek_token() {
                    None | Some(Token::Semicolon) | Some(Token::RBrace) => None,
                    _ => Some(self.parse_expression()?),
                };
                Statement::Return {
                    value,
                    span: self.span(start, self.prev_end()),
                }
            }
            _ => Statement::Expression(self.parse_expression()?),
        };

        // Semicolons are optional between statements
        self.match_token(Token::Semicolon);
        Ok(statement)
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect(Token::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.is_at_end() {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.parse_statement()?);
        }
        self.expect(Token::RBrace)?;
        Ok(body)
    }

    /// Run one level of recursive descent, failing once nesting gets too deep
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::invalid_syntax(
                self.offset + self.current_start(),
                "Expression nested too deeply",
                self.text,
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parse an expression with full operator precedence
    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_assignment()
    }

    /// Assignment and arrow functions (lowest precedence, right associative)
    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        self.nested(|parser| parser.parse_assignment_inner())
    }

    fn parse_assignment_inner(&mut self) -> ParseResult<Expression> {
        if self.is_arrow_ahead() {
            return self.parse_arrow();
        }

        let start = self.current_start();
        let target = self.parse_conditional()?;

        let Some(operator) = self.match_assign_op() else {
            return Ok(target);
        };

        if !target.is_assignable() {
            return Err(ParseError::invalid_syntax(
                self.offset + start,
                "Invalid assignment target",
                self.text,
            ));
        }

        let value = self.parse_assignment()?;
        Ok(Expression::Assign {
            target: Box::new(target),
            operator,
            value: Box::new(value),
            span: self.span(start, self.prev_end()),
        })
    }

    fn is_arrow_ahead(&self) -> bool {
        match self.peek_token() {
            Some(Token::Ident(_)) => matches!(self.peek_token_at(1), Some(Token::Arrow)),
            Some(Token::LParen) => {
                let mut depth = 0usize;
                let mut i = self.pos;
                while let Some((token, _)) = self.tokens.get(i) {
                    match token {
                        Token::LParen => depth += 1,
                        Token::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return matches!(
                                    self.tokens.get(i + 1).map(|(t, _)| t),
                                    Some(Token::Arrow)
                                );
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                false
            }
            _ => false,
        }
    }

    fn parse_arrow(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let mut params = Vec::new();

        if self.match_token(Token::LParen) {
            while !self.check(&Token::RParen) {
                let param_start = self.current_start();
                let name = self.expect_ident()?;
                params.push(Param {
                    name,
                    span: self.span(param_start, self.prev_end()),
                });
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
        } else {
            let param_start = self.current_start();
            let name = self.expect_ident()?;
            params.push(Param {
                name,
                span: self.span(param_start, self.prev_end()),
            });
        }

        self.expect(Token::Arrow)?;

        let body = if self.check(&Token::LBrace) {
            ArrowBody::Block(self.parse_block()?)
        } else {
            ArrowBody::Expression(Box::new(self.parse_assignment()?))
        };

        Ok(Expression::Arrow {
            params,
            body,
            span: self.span(start, self.prev_end()),
        })
    }

    /// Parse conditional expression (c ? a : b)
    fn parse_conditional(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let test = self.parse_nullish()?;

        if !self.match_token(Token::Question) {
            return Ok(test);
        }

        let consequent = self.parse_assignment()?;
        self.expect(Token::Colon)?;
        let alternate = self.parse_assignment()?;

        Ok(Expression::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span: self.span(start, self.prev_end()),
        })
    }

    fn parse_nullish(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let mut left = self.parse_or()?;

        while self.match_token(Token::Nullish) {
            let right = self.parse_or()?;
            left = self.logical(left, LogicalOp::Nullish, right, start);
        }

        Ok(left)
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let mut left = self.parse_and()?;

        while self.match_token(Token::Or) {
            let right = self.parse_and()?;
            left = self.logical(left, LogicalOp::Or, right, start);
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let mut left = self.parse_equality()?;

        while self.match_token(Token::And) {
            let right = self.parse_equality()?;
            left = self.logical(left, LogicalOp::And, right, start);
        }

        Ok(left)
    }

    /// Parse equality expression (== != === !==)
    fn parse_equality(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let mut left = self.parse_relational()?;

        while let Some(op) = self.match_equality_op() {
            let right = self.parse_relational()?;
            left = self.binary(left, op, right, start);
        }

        Ok(left)
    }

    /// Parse relational expression (< > <= >= in)
    fn parse_relational(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let mut left = self.parse_additive()?;

        while let Some(op) = self.match_relational_op() {
            let right = self.parse_additive()?;
            left = self.binary(left, op, right, start);
        }

        Ok(left)
    }

    /// Parse additive expression (+ -)
    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let mut left = self.parse_multiplicative()?;

        while let Some(op) = self.match_additive_op() {
            let right = self.parse_multiplicative()?;
            left = self.binary(left, op, right, start);
        }

        Ok(left)
    }

    /// Parse multiplicative expression (* / %)
    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let mut left = self.parse_exponent()?;

        while let Some(op) = self.match_multiplicative_op() {
            let right = self.parse_exponent()?;
            left = self.binary(left, op, right, start);
        }

        Ok(left)
    }

    /// Parse exponent expression (right associative)
    fn parse_exponent(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let base = self.parse_unary()?;

        if self.match_token(Token::StarStar) {
            let exponent = self.nested(|parser| parser.parse_exponent())?;
            return Ok(self.binary(base, BinaryOp::Exponent, exponent, start));
        }

        Ok(base)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();

        let operator = match self.peek_token() {
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Minus) => Some(UnaryOp::Negate),
            Some(Token::Plus) => Some(UnaryOp::Plus),
            Some(Token::Typeof) => Some(UnaryOp::Typeof),
            _ => None,
        };

        if let Some(operator) = operator {
            self.advance();
            let operand = self.nested(|parser| parser.parse_unary())?;
            return Ok(Expression::Unary {
                operator,
                operand: Box::new(operand),
                span: self.span(start, self.prev_end()),
            });
        }

        let update = match self.peek_token() {
            Some(Token::PlusPlus) => Some(UpdateOp::Increment),
            Some(Token::MinusMinus) => Some(UpdateOp::Decrement),
            _ => None,
        };

        if let Some(operator) = update {
            self.advance();
            let target = self.nested(|parser| parser.parse_unary())?;
            if !target.is_assignable() {
                return Err(ParseError::invalid_syntax(
                    self.offset + start,
                    "Invalid update target",
                    self.text,
                ));
            }
            return Ok(Expression::Update {
                target: Box::new(target),
                operator,
                prefix: true,
                span: self.span(start, self.prev_end()),
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let expr = self.parse_call_member()?;

        let operator = match self.peek_token() {
            Some(Token::PlusPlus) => UpdateOp::Increment,
            Some(Token::MinusMinus) => UpdateOp::Decrement,
            _ => return Ok(expr),
        };

        if !expr.is_assignable() {
            return Err(ParseError::invalid_syntax(
                self.offset + start,
                "Invalid update target",
                self.text,
            ));
        }

        self.advance();
        Ok(Expression::Update {
            target: Box::new(expr),
            operator,
            prefix: false,
            span: self.span(start, self.prev_end()),
        })
    }

    /// Member access, indexing and calls: a.b, a?.b, a[b], a(b)
    fn parse_call_member(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();
        let mut expr = self.parse_primary()?;

        loop {
            if self.match_token(Token::Dot) {
                expr = self.parse_member_property(expr, start, false)?;
            } else if self.match_token(Token::QuestionDot) {
                if self.match_token(Token::LParen) {
                    let arguments = self.parse_list_items(Token::RParen)?;
                    expr = Expression::Call {
                        callee: Box::new(expr),
                        arguments,
                        optional: true,
                        span: self.span(start, self.prev_end()),
                    };
                } else if self.match_token(Token::LBracket) {
                    let index = self.parse_expression()?;
                    self.expect(Token::RBracket)?;
                    expr = Expression::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: true,
                        span: self.span(start, self.prev_end()),
                    };
                } else {
                    expr = self.parse_member_property(expr, start, true)?;
                }
            } else if self.match_token(Token::LBracket) {
                let index = self.parse_expression()?;
                self.expect(Token::RBracket)?;
                expr = Expression::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    optional: false,
                    span: self.span(start, self.prev_end()),
                };
            } else if self.match_token(Token::LParen) {
                let arguments = self.parse_list_items(Token::RParen)?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    arguments,
                    optional: false,
                    span: self.span(start, self.prev_end()),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_member_property(
        &mut self,
        object: Expression,
        start: usize,
        optional: bool,
    ) -> ParseResult<Expression> {
        let property_start = self.current_start();
        let property = self.expect_property_name()?;
        Ok(Expression::Member {
            object: Box::new(object),
            property,
            property_span: self.span(property_start, self.prev_end()),
            optional,
            span: self.span(start, self.prev_end()),
        })
    }

    /// Parse primary expression (literals, identifiers, groups, arrays, objects)
    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let start = self.current_start();

        let Some((token, range)) = self.tokens.get(self.pos).cloned() else {
            return Err(self.unexpected("expression"));
        };

        let expr = match token {
            Token::Number(n) => {
                self.advance();
                let value = n.parse::<f64>().map_err(|_| {
                    ParseError::invalid_syntax(self.offset + start, "Invalid number", self.text)
                })?;
                Expression::Number {
                    value,
                    span: self.span(start, self.prev_end()),
                }
            }
            Token::String(s) => {
                self.advance();
                Expression::String {
                    value: unescape(&s[1..s.len() - 1]),
                    span: self.span(start, self.prev_end()),
                }
            }
            Token::Template(raw) => {
                self.advance();
                self.parse_template(raw, range.start)?
            }
            Token::True | Token::False => {
                self.advance();
                Expression::Boolean {
                    value: token == Token::True,
                    span: self.span(start, self.prev_end()),
                }
            }
            Token::Null => {
                self.advance();
                Expression::Null {
                    span: self.span(start, self.prev_end()),
                }
            }
            Token::Undefined => {
                self.advance();
                Expression::Undefined {
                    span: self.span(start, self.prev_end()),
                }
            }
            Token::This => {
                self.advance();
                Expression::This {
                    span: self.span(start, self.prev_end()),
                }
            }
            Token::Ident(name) => {
                self.advance();
                Expression::Identifier {
                    name: name.to_string(),
                    span: self.span(start, self.prev_end()),
                }
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                expr
            }
            Token::LBracket => {
                self.advance();
                let elements = self.parse_list_items(Token::RBracket)?;
                Expression::Array {
                    elements,
                    span: self.span(start, self.prev_end()),
                }
            }
            Token::LBrace => {
                self.advance();
                let properties = self.parse_object_properties()?;
                Expression::Object {
                    properties,
                    span: self.span(start, self.prev_end()),
                }
            }
            _ => return Err(self.unexpected("expression")),
        };

        Ok(expr)
    }

    /// Comma separated items up to `close` (consumed); spreads and a trailing comma allowed
    fn parse_list_items(&mut self, close: Token<'src>) -> ParseResult<Vec<ListItem>> {
        let mut items = Vec::new();

        while !self.check(&close) {
            if self.is_at_end() {
                return Err(self.unexpected(&close.to_string()));
            }
            if self.match_token(Token::Ellipsis) {
                items.push(ListItem::Spread(self.parse_assignment()?));
            } else {
                items.push(ListItem::Item(self.parse_assignment()?));
            }
            if !self.match_token(Token::Comma) {
                break;
            }
        }

        self.expect(close)?;
        Ok(items)
    }

    fn parse_object_properties(&mut self) -> ParseResult<Vec<Property>> {
        let mut properties = Vec::new();

        while !self.check(&Token::RBrace) {
            let start = self.current_start();

            if self.match_token(Token::Ellipsis) {
                properties.push(Property::Spread(self.parse_assignment()?));
            } else if self.match_token(Token::LBracket) {
                let key = self.parse_expression()?;
                self.expect(Token::RBracket)?;
                self.expect(Token::Colon)?;
                let value = self.parse_assignment()?;
                properties.push(Property::KeyValue {
                    key: PropertyKey::Computed(key),
                    value,
                    span: self.span(start, self.prev_end()),
                });
            } else {
                let (name, shorthand_allowed) = match self.peek_token() {
                    Some(Token::Ident(name)) => (name.to_string(), true),
                    Some(Token::String(s)) => (unescape(&s[1..s.len() - 1]), false),
                    Some(Token::Number(n)) => (n.to_string(), false),
                    Some(token) => match token.keyword_text() {
                        Some(keyword) => (keyword.to_string(), false),
                        None => return Err(self.unexpected("property name")),
                    },
                    None => return Err(self.unexpected("'}'")),
                };
                self.advance();
                let key_span = self.span(start, self.prev_end());

                if self.match_token(Token::Colon) {
                    let value = self.parse_assignment()?;
                    properties.push(Property::KeyValue {
                        key: PropertyKey::Named {
                            name,
                            span: key_span,
                        },
                        value,
                        span: self.span(start, self.prev_end()),
                    });
                } else if shorthand_allowed {
                    properties.push(Property::Shorthand {
                        name,
                        span: key_span,
                    });
                } else {
                    return Err(self.unexpected("':'"));
                }
            }

            if !self.match_token(Token::Comma) {
                break;
            }
        }

        self.expect(Token::RBrace)?;
        Ok(properties)
    }

    /// Parse template literal with ${...} interpolation
    fn parse_template(&mut self, raw: &'src str, token_start: usize) -> ParseResult<Expression> {
        let segments =
            template_segments(raw).map_err(|e| e.shifted(self.offset + token_start, self.text))?;

        let mut parts = Vec::new();
        let mut literal_start = 1;

        for segment in &segments {
            // `${` precedes every segment
            let literal = &raw[literal_start..segment.start - 2];
            if !literal.is_empty() {
                parts.push(TemplatePart::Literal(unescape(literal)));
            }

            let inner = &raw[segment.clone()];
            let mut sub_parser =
                Parser::with_offset(inner, self.text, self.offset + token_start + segment.start)?;
            sub_parser.depth = self.depth;
            let expr = sub_parser.parse_expression()?;
            if !sub_parser.is_at_end() {
                return Err(sub_parser.unexpected("'}'"));
            }
            parts.push(TemplatePart::Expression(expr));

            literal_start = segment.end + 1;
        }

        let tail = &raw[literal_start..raw.len() - 1];
        if !tail.is_empty() {
            parts.push(TemplatePart::Literal(unescape(tail)));
        }

        Ok(Expression::Template {
            parts,
            span: Span::new(
                self.offset + token_start,
                self.offset + token_start + raw.len(),
            ),
        })
    }

    // Helper methods for matching operators

    fn match_assign_op(&mut self) -> Option<AssignOp> {
        let op = match self.peek_token()? {
            Token::Equals => AssignOp::Assign,
            Token::PlusEquals => AssignOp::Add,
            Token::MinusEquals => AssignOp::Subtract,
            Token::StarEquals => AssignOp::Multiply,
            Token::SlashEquals => AssignOp::Divide,
            Token::PercentEquals => AssignOp::Remainder,
            Token::StarStarEquals => AssignOp::Exponent,
            Token::NullishEquals => AssignOp::Nullish,
            Token::OrEquals => AssignOp::Or,
            Token::AndEquals => AssignOp::And,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_equality_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek_token()? {
            Token::EqualsEquals => BinaryOp::Equals,
            Token::NotEquals => BinaryOp::NotEquals,
            Token::StrictEquals => BinaryOp::StrictEquals,
            Token::StrictNotEquals => BinaryOp::StrictNotEquals,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_relational_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek_token()? {
            Token::LessThan => BinaryOp::LessThan,
            Token::LessThanEquals => BinaryOp::LessThanOrEqual,
            Token::GreaterThan => BinaryOp::GreaterThan,
            Token::GreaterThanEquals => BinaryOp::GreaterThanOrEqual,
            Token::In => BinaryOp::In,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_additive_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek_token()? {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Subtract,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_multiplicative_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek_token()? {
            Token::Star => BinaryOp::Multiply,
            Token::Slash => BinaryOp::Divide,
            Token::Percent => BinaryOp::Remainder,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn binary(&self, left: Expression, operator: BinaryOp, right: Expression, start: usize) -> Expression {
        Expression::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span: self.span(start, self.prev_end()),
        }
    }

    fn logical(&self, left: Expression, operator: LogicalOp, right: Expression, start: usize) -> Expression {
        Expression::Logical {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span: self.span(start, self.prev_end()),
        }
    }

    // Helper methods

    fn peek_token(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_token_at(&self, offset: usize) -> Option<&Token<'src>> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<Token<'src>> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: &Token) -> bool {
        match self.peek_token() {
            Some(t) => std::mem::discriminant(t) == std::mem::discriminant(token),
            None => false,
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(&token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(&token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek_token() {
            Some(Token::Ident(s)) => {
                let name = s.to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Identifier or keyword used in property position (`a.in`, `x.this`)
    fn expect_property_name(&mut self) -> ParseResult<String> {
        let name = match self.peek_token() {
            Some(Token::Ident(s)) => s.to_string(),
            Some(token) => match token.keyword_text() {
                Some(keyword) => keyword.to_string(),
                None => return Err(self.unexpected("property name")),
            },
            None => return Err(self.unexpected("property name")),
        };
        self.advance();
        Ok(name)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some((token, range)) => ParseError::unexpected_token(
                self.offset + range.start,
                expected,
                token.to_string(),
                self.text,
            ),
            None => ParseError::unexpected_eof(self.offset + self.source.len(), self.text),
        }
    }

    fn current_start(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, range)| range.start)
            .unwrap_or(self.source.len())
    }

    fn prev_end(&self) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|(_, range)| range.end)
            .unwrap_or(0)
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.offset + start, self.offset + end.max(start))
    }
}

/// Resolve escape sequences in a string or template literal body
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

/// Parse a single expression
pub fn parse_expression(source: &str) -> ParseResult<Expression> {
    Parser::new(source)?.parse_expression_source()
}

/// Parse a statement sequence
pub fn parse_program(source: &str) -> ParseResult<Program> {
    Parser::new(source)?.parse_program()
}

/// Parse attribute text as an expression, falling back to a statement sequence
pub fn parse_source(source: &str) -> ParseResult<Source> {
    match parse_expression(source) {
        Ok(expr) => Ok(Source::Expression(expr)),
        Err(expression_error) => match parse_program(source) {
            Ok(program) => Ok(Source::Program(program)),
            // Report whichever attempt got further
            Err(program_error) if program_error.pos() >= expression_error.pos() => {
                Err(program_error)
            }
            Err(_) => Err(expression_error),
        },
    }
}

/// Parse an `:each` header: `item in expr`, `item, index in expr`, `(item, index) in expr`
pub fn parse_each(source: &str) -> ParseResult<EachHeader> {
    let mut parser = Parser::new(source)?;

    let parenthesized = parser.match_token(Token::LParen);
    let item = parser.expect_ident()?;
    let index = if parser.match_token(Token::Comma) {
        Some(parser.expect_ident()?)
    } else {
        None
    };
    if parenthesized {
        parser.expect(Token::RParen)?;
    }

    if !parser.check(&Token::In) {
        return Err(parser.unexpected("keyword 'in'"));
    }
    parser.advance();

    let iterable_start = parser.prev_end();
    let iterable_text = &source[iterable_start..];
    let mut iterable_parser = Parser::with_offset(iterable_text, source, iterable_start)?;
    let iterable = iterable_parser.parse_expression_source()?;

    Ok(EachHeader {
        item,
        index,
        iterable_source: iterable_text.trim().to_string(),
        iterable,
    })
}
