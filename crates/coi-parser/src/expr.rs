//! Expression grammar.
//!
//! Binding power, weakest first: ternary, `||`, `&&`, equality, comparison,
//! additive, multiplicative, unary (`- + ! & :`), postfix (`++ --`),
//! primary. Ternary is right-associative, everything else left-associative.

use std::num::IntErrorKind;

use crate::ast::{
    starts_uppercase, BinaryOp, Expression, MatchArm, MatchPattern, PostfixOp, UnaryOp,
};
use crate::parser::Parser;
use crate::ParseError;
use coi_lexer::TokenKind;

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_ternary()
    }

    /// Parse an expression where `>` ends the expression (view tags).
    pub(crate) fn parse_expression_no_gt(&mut self) -> Result<Expression, ParseError> {
        self.with_gt_comparison(false, |p| p.parse_or())
    }

    fn parse_ternary(&mut self) -> Result<Expression, ParseError> {
        let condition = self.parse_or()?;

        if !self.eat(TokenKind::Question) {
            return Ok(condition);
        }

        let then_expr = self.parse_expression()?;
        self.expect(TokenKind::Colon, "Expected ':' in ternary expression")?;
        let else_expr = self.parse_ternary()?;

        Ok(Expression::Ternary {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expression::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat(TokenKind::And) {
            let right = self.parse_equality()?;
            left = Expression::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Neq => BinaryOp::Neq,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt if self.allow_gt_comparison => BinaryOp::Gt,
                TokenKind::Lte => BinaryOp::Lte,
                TokenKind::Gte => BinaryOp::Gte,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Ampersand => {
                self.advance();
                return Ok(Expression::Reference(Box::new(self.parse_unary()?)));
            }
            TokenKind::Colon => {
                self.advance();
                return Ok(Expression::Move(Box::new(self.parse_unary()?)));
            }
            _ => None,
        };

        match op {
            Some(op) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::PlusPlus => PostfixOp::Increment,
                TokenKind::MinusMinus => PostfixOp::Decrement,
                _ => break,
            };
            self.advance();
            expr = Expression::Postfix {
                operand: Box::new(expr),
                op,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::IntLiteral => {
                let value = parse_int_literal(&token.value).map_err(|msg| self.error(msg))?;
                self.advance();
                Ok(Expression::Int(value))
            }
            TokenKind::FloatLiteral => {
                let value: f64 = token
                    .value
                    .parse()
                    .map_err(|_| self.error(format!("Invalid float literal '{}'", token.value)))?;
                self.advance();
                Ok(Expression::Float(value))
            }
            TokenKind::StringLiteral | TokenKind::TemplateString => {
                self.advance();
                Ok(Expression::Str {
                    value: token.value,
                    template: token.kind == TokenKind::TemplateString,
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Bool(false))
            }
            TokenKind::Identifier if token.value == "match" => match self.try_parse_match()? {
                Some(expr) => Ok(expr),
                None => self.parse_identifier_chain(),
            },
            TokenKind::Identifier | TokenKind::Key => self.parse_identifier_chain(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LParen => {
                self.advance();
                // `>` is unambiguous inside parentheses.
                let expr = self.with_gt_comparison(true, |p| p.parse_expression())?;
                self.expect(TokenKind::RParen, "Expected ')'")?;
                Ok(expr)
            }
            _ => Err(self.error(format!(
                "Unexpected token in expression: '{}'",
                token.value
            ))),
        }
    }

    /// Identifier-initiated chains: enum access, aggregate literal,
    /// construction or call, member access, index access, type literal.
    fn parse_identifier_chain(&mut self) -> Result<Expression, ParseError> {
        let name_token = self.peek().clone();
        let name = name_token.value;
        self.advance();

        if self.eat(TokenKind::DoubleColon) {
            let value = self.expect(TokenKind::Identifier, "Expected enum value name after '::'")?;
            return Ok(Expression::EnumAccess {
                component: None,
                enum_name: name,
                value: value.value,
            });
        }

        let mut expr = Expression::Ident(name.clone());

        loop {
            match self.peek().kind {
                TokenKind::LBrace
                    if self.allow_brace_init
                        && starts_uppercase(&name)
                        && expr.as_ident().is_some() =>
                {
                    self.advance();
                    let args = self.parse_call_args(TokenKind::RBrace)?;
                    self.expect(TokenKind::RBrace, "Expected '}'")?;
                    return Ok(Expression::Aggregate {
                        type_name: name,
                        args,
                    });
                }
                TokenKind::LParen => {
                    self.advance();
                    let is_component = expr.as_ident().is_some_and(starts_uppercase);
                    let args = self.parse_call_args(TokenKind::RParen)?;
                    self.expect(TokenKind::RParen, "Expected ')'")?;
                    expr = if is_component {
                        Expression::Construct {
                            component: expr.to_string(),
                            args,
                        }
                    } else {
                        Expression::Call {
                            name: expr.to_string(),
                            args,
                            line: name_token.span.line,
                        }
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let member = self.expect_identifier("Expected member name")?;

                    if self.eat(TokenKind::DoubleColon) {
                        let value = self
                            .expect(TokenKind::Identifier, "Expected enum value name after '::'")?;
                        return Ok(Expression::EnumAccess {
                            component: Some(expr.to_string()),
                            enum_name: member,
                            value: value.value,
                        });
                    }

                    expr = Expression::member(expr, member);
                }
                TokenKind::LBracket => {
                    if self.peek_at(1).kind == TokenKind::RBracket {
                        self.advance();
                        self.advance();
                        return Ok(Expression::TypeLiteral(format!("{expr}[]")));
                    }
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "Expected ']'")?;
                    expr = Expression::index(expr, index);
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// `[]`, `[a, b, c,]` or `[value; count]`.
    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        self.expect(TokenKind::LBracket, "Expected '['")?;

        if self.eat(TokenKind::RBracket) {
            return Ok(Expression::Array(Vec::new()));
        }

        let first = self.parse_expression()?;

        if self.eat(TokenKind::Semicolon) {
            let count = self.parse_expression()?;
            self.expect(TokenKind::RBracket, "Expected ']'")?;
            return Ok(Expression::ArrayRepeat {
                value: Box::new(first),
                count: Box::new(count),
            });
        }

        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.check(TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RBracket, "Expected ']'")?;
        Ok(Expression::Array(items))
    }

    // =========================================================================
    // Match
    // =========================================================================

    /// Try `match <subject> { arms }`. `match` is not reserved, so if no
    /// `{` follows the subject the cursor is restored and `match` is an
    /// ordinary identifier.
    fn try_parse_match(&mut self) -> Result<Option<Expression>, ParseError> {
        let checkpoint = self.checkpoint();
        self.advance(); // `match`

        let subject = match self.with_brace_init(false, |p| p.parse_expression()) {
            Ok(subject) if self.check(TokenKind::LBrace) => subject,
            _ => {
                self.restore(checkpoint);
                return Ok(None);
            }
        };

        self.expect(TokenKind::LBrace, "Expected '{'")?;
        let mut arms = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let pattern = self.parse_match_pattern()?;
            self.expect(TokenKind::Arrow, "Expected '=>' after match pattern")?;

            let body = if self.check(TokenKind::LBrace) {
                self.advance();
                let mut stmts = Vec::new();
                while !self.check(TokenKind::RBrace) && !self.is_at_end() {
                    stmts.push(self.parse_statement()?);
                }
                self.expect(TokenKind::RBrace, "Expected '}'")?;
                Expression::Block(stmts)
            } else {
                self.parse_expression()?
            };

            arms.push(MatchArm { pattern, body });
            self.eat(TokenKind::Comma);
        }
        self.expect(TokenKind::RBrace, "Expected '}'")?;

        if arms.is_empty() {
            return Err(self.error("Match expression must have at least one arm"));
        }

        Ok(Some(Expression::Match {
            subject: Box::new(subject),
            arms,
        }))
    }

    fn parse_match_pattern(&mut self) -> Result<MatchPattern, ParseError> {
        match self.peek().kind {
            TokenKind::Else => {
                self.advance();
                Ok(MatchPattern::Else)
            }
            TokenKind::Identifier => {
                let first = self.peek().value.clone();
                self.advance();

                if self.eat(TokenKind::DoubleColon) {
                    let value = self.expect(TokenKind::Identifier, "Expected enum value name")?;
                    return Ok(MatchPattern::Enum {
                        component: None,
                        enum_name: first,
                        value: value.value,
                    });
                }

                if self.eat(TokenKind::Dot) {
                    let enum_name = self.expect(TokenKind::Identifier, "Expected enum name")?;
                    self.expect(TokenKind::DoubleColon, "Expected '::'")?;
                    let value = self.expect(TokenKind::Identifier, "Expected enum value name")?;
                    return Ok(MatchPattern::Enum {
                        component: Some(first),
                        enum_name: enum_name.value,
                        value: value.value,
                    });
                }

                if self.eat(TokenKind::LParen) {
                    let binding = self.expect_identifier("Expected binding name")?;
                    self.expect(TokenKind::RParen, "Expected ')'")?;
                    return Ok(MatchPattern::Binding {
                        variant: first,
                        binding,
                    });
                }

                Err(self.error(format!("Invalid match pattern '{first}'")))
            }
            TokenKind::IntLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StringLiteral
            | TokenKind::TemplateString
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Minus => Ok(MatchPattern::Literal(self.parse_unary()?)),
            _ => Err(self.error("Expected match pattern")),
        }
    }
}

/// Parse decimal or `0x` hex text into an `i32`.
pub(crate) fn parse_int_literal(text: &str) -> Result<i32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => text.parse::<i64>(),
    };

    match parsed {
        Ok(value) => i32::try_from(value)
            .map_err(|_| format!("Integer literal '{text}' is too large")),
        Err(err) if matches!(err.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Err(format!("Integer literal '{text}' is too large"))
        }
        Err(_) => Err(format!("Invalid integer literal '{text}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CallArg, Statement};
    use coi_lexer::Scanner;
    use pretty_assertions::assert_eq;

    /// Helper: parse a single expression and require all input consumed.
    fn expr(source: &str) -> Expression {
        let mut parser = Parser::new(Scanner::tokenize(source).unwrap());
        let expr = parser.parse_expression().unwrap();
        assert!(parser.is_at_end(), "trailing tokens in {source:?}");
        expr
    }

    fn expr_err(source: &str) -> ParseError {
        let mut parser = Parser::new(Scanner::tokenize(source).unwrap());
        parser.parse_expression().unwrap_err()
    }

    // =========================================================================
    // Literals
    // =========================================================================

    #[test]
    fn test_int_literals() {
        assert_eq!(expr("42"), Expression::Int(42));
        assert_eq!(expr("0xFF"), Expression::Int(255));
        assert_eq!(expr("0xff"), Expression::Int(255));
        assert_eq!(expr("0x0"), Expression::Int(0));
    }

    #[test]
    fn test_int_too_large() {
        let err = expr_err("3000000000");
        assert_eq!(err.message, "Integer literal '3000000000' is too large");
        assert_eq!(err.line, 1);
        let err = expr_err("99999999999999999999999");
        assert!(err.message.ends_with("is too large"));
    }

    #[test]
    fn test_hex_without_digits_is_invalid() {
        let err = expr_err("0x");
        assert_eq!(err.message, "Invalid integer literal '0x'");
    }

    #[test]
    fn test_float_literal() {
        assert_eq!(expr("2.5"), Expression::Float(2.5));
        assert_eq!(expr("1."), Expression::Float(1.0));
    }

    #[test]
    fn test_string_and_template() {
        assert_eq!(expr("\"hi\""), Expression::string("hi"));
        assert_eq!(
            expr("`a{b}`"),
            Expression::Str {
                value: "a{b}".into(),
                template: true
            }
        );
    }

    #[test]
    fn test_bool_literals() {
        assert_eq!(expr("true"), Expression::Bool(true));
        assert_eq!(expr("false"), Expression::Bool(false));
    }

    // =========================================================================
    // Precedence
    // =========================================================================

    #[test]
    fn test_multiplication_binds_tighter() {
        assert_eq!(expr("1 + 2 * 3").to_string(), "(1 + (2 * 3))");
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(expr("a - b - c").to_string(), "((a - b) - c)");
    }

    #[test]
    fn test_ternary_right_associative() {
        assert_eq!(
            expr("a ? b : c ? d : e").to_string(),
            "(a ? b : (c ? d : e))"
        );
    }

    #[test]
    fn test_unary_wraps_postfix() {
        assert_eq!(
            expr("-a++"),
            Expression::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Expression::Postfix {
                    operand: Box::new(Expression::ident("a")),
                    op: PostfixOp::Increment,
                }),
            }
        );
    }

    #[test]
    fn test_logical_precedence() {
        assert_eq!(
            expr("a || b && c == d").to_string(),
            "(a || (b && (c == d)))"
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(expr("a < b").to_string(), "(a < b)");
        assert_eq!(expr("a > b").to_string(), "(a > b)");
        assert_eq!(expr("a >= b").to_string(), "(a >= b)");
    }

    #[test]
    fn test_reference_and_move() {
        assert_eq!(
            expr("&items"),
            Expression::Reference(Box::new(Expression::ident("items")))
        );
        assert_eq!(
            expr(":items"),
            Expression::Move(Box::new(Expression::ident("items")))
        );
    }

    // =========================================================================
    // `>` ambiguity
    // =========================================================================

    #[test]
    fn test_no_gt_stops_at_gt() {
        let mut parser = Parser::new(Scanner::tokenize("a > 0").unwrap());
        let cond = parser.parse_expression_no_gt().unwrap();
        assert_eq!(cond, Expression::ident("a"));
        assert_eq!(parser.peek().kind, TokenKind::Gt);
        assert!(parser.allow_gt_comparison);
    }

    #[test]
    fn test_parentheses_reenable_gt() {
        let mut parser = Parser::new(Scanner::tokenize("(a > 0) >").unwrap());
        let cond = parser.parse_expression_no_gt().unwrap();
        assert_eq!(cond.to_string(), "(a > 0)");
        assert_eq!(parser.peek().kind, TokenKind::Gt);
    }

    // =========================================================================
    // Identifier chains
    // =========================================================================

    #[test]
    fn test_enum_access() {
        assert_eq!(
            expr("Mode::Idle"),
            Expression::EnumAccess {
                component: None,
                enum_name: "Mode".into(),
                value: "Idle".into(),
            }
        );
    }

    #[test]
    fn test_qualified_enum_access() {
        assert_eq!(
            expr("App.Mode::Idle"),
            Expression::EnumAccess {
                component: Some("App".into()),
                enum_name: "Mode".into(),
                value: "Idle".into(),
            }
        );
    }

    #[test]
    fn test_aggregate_literal() {
        assert_eq!(
            expr("Point{1, y = 2}"),
            Expression::Aggregate {
                type_name: "Point".into(),
                args: vec![
                    CallArg::positional(Expression::Int(1)),
                    CallArg {
                        name: Some("y".into()),
                        value: Expression::Int(2),
                        is_reference: false,
                        is_move: false,
                    },
                ],
            }
        );
    }

    #[test]
    fn test_lowercase_brace_is_not_aggregate() {
        let mut parser = Parser::new(Scanner::tokenize("point{1}").unwrap());
        assert_eq!(parser.parse_expression().unwrap(), Expression::ident("point"));
        assert_eq!(parser.peek().kind, TokenKind::LBrace);
    }

    #[test]
    fn test_brace_init_suppressed() {
        let mut parser = Parser::new(Scanner::tokenize("Foo{1}").unwrap());
        let e = parser
            .with_brace_init(false, |p| p.parse_expression())
            .unwrap();
        assert_eq!(e, Expression::ident("Foo"));
        assert_eq!(parser.peek().kind, TokenKind::LBrace);
        assert!(parser.allow_brace_init);
    }

    #[test]
    fn test_component_construction() {
        assert_eq!(
            expr("Counter(5)"),
            Expression::Construct {
                component: "Counter".into(),
                args: vec![CallArg::positional(Expression::Int(5))],
            }
        );
    }

    #[test]
    fn test_function_call_carries_line() {
        let e = expr("\n\nInput.isKeyDown(32)");
        assert_eq!(
            e,
            Expression::Call {
                name: "Input.isKeyDown".into(),
                args: vec![CallArg::positional(Expression::Int(32))],
                line: 3,
            }
        );
    }

    #[test]
    fn test_method_call_on_chain() {
        let e = expr("rows[0].items.push(x)");
        match e {
            Expression::Call { name, .. } => assert_eq!(name, "rows[0].items.push"),
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_member_and_index_chain() {
        assert_eq!(expr("a.b[1].c").to_string(), "a.b[1].c");
    }

    #[test]
    fn test_type_literal() {
        let e = expr("Json.parse(User[], body)");
        match e {
            Expression::Call { name, args, .. } => {
                assert_eq!(name, "Json.parse");
                assert_eq!(args[0].value, Expression::TypeLiteral("User[]".into()));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_key_as_identifier() {
        assert_eq!(expr("key"), Expression::ident("key"));
    }

    // =========================================================================
    // Arrays
    // =========================================================================

    #[test]
    fn test_array_literals() {
        assert_eq!(expr("[]"), Expression::Array(vec![]));
        assert_eq!(
            expr("[1, 2,]"),
            Expression::Array(vec![Expression::Int(1), Expression::Int(2)])
        );
    }

    #[test]
    fn test_array_repeat() {
        assert_eq!(
            expr("[0; 16]"),
            Expression::ArrayRepeat {
                value: Box::new(Expression::Int(0)),
                count: Box::new(Expression::Int(16)),
            }
        );
    }

    // =========================================================================
    // Match
    // =========================================================================

    #[test]
    fn test_match_expression() {
        let e = expr(
            r#"match mode {
                Mode::Idle => "idle",
                App.Mode::Busy => "busy",
                else => "other"
            }"#,
        );
        let Expression::Match { subject, arms } = e else {
            panic!("expected match");
        };
        assert_eq!(*subject, Expression::ident("mode"));
        assert_eq!(arms.len(), 3);
        assert_eq!(
            arms[1].pattern,
            MatchPattern::Enum {
                component: Some("App".into()),
                enum_name: "Mode".into(),
                value: "Busy".into(),
            }
        );
        assert_eq!(arms[2].pattern, MatchPattern::Else);
    }

    #[test]
    fn test_match_binding_and_block_arm() {
        let e = expr(
            r#"match Json.parse(User, body) {
                Success(user) => { name = user.name; }
                Error(err) => 0
            }"#,
        );
        let Expression::Match { subject, arms } = e else {
            panic!("expected match");
        };
        assert!(matches!(*subject, Expression::Call { ref name, .. } if name == "Json.parse"));
        assert_eq!(
            arms[0].pattern,
            MatchPattern::Binding {
                variant: "Success".into(),
                binding: "user".into()
            }
        );
        assert!(matches!(
            &arms[0].body,
            Expression::Block(stmts) if matches!(stmts[0], Statement::Assign { .. })
        ));
        assert_eq!(arms[1].body, Expression::Int(0));
    }

    #[test]
    fn test_match_literal_patterns() {
        let e = expr("match n { 0 => a, -1 => b, else => c }");
        let Expression::Match { arms, .. } = e else {
            panic!("expected match");
        };
        assert_eq!(arms[0].pattern, MatchPattern::Literal(Expression::Int(0)));
        assert!(matches!(arms[1].pattern, MatchPattern::Literal(Expression::Unary { .. })));
    }

    #[test]
    fn test_match_as_identifier() {
        assert_eq!(
            expr("match + 1").to_string(),
            "(match + 1)"
        );
        assert!(matches!(expr("match(x)"), Expression::Call { ref name, .. } if name == "match"));
    }

    #[test]
    fn test_unexpected_token() {
        let err = expr_err(")");
        assert_eq!(err.message, "Unexpected token in expression: ')'");
    }

    #[test]
    fn test_expression_stops_at_lone_pipe() {
        let mut parser = Parser::new(Scanner::tokenize("a | b").unwrap());
        assert_eq!(parser.parse_expression().unwrap(), Expression::ident("a"));
        assert_eq!(parser.peek().kind, TokenKind::Unknown);
    }

    #[test]
    fn test_lone_pipe_in_operand_position() {
        let err = expr_err("| b");
        assert_eq!(err.message, "Unexpected token in expression: '|'");
    }
}
