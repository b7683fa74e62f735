//! Statement grammar.
//!
//! A statement starting with `mut`, a built-in type, or `Ident Ident`,
//! `Ident &`, `Ident [] Ident`, `Ident [N] Ident` is a declaration. Otherwise
//! a cursor scan past `[...]` and `.ident` chains decides between assignment
//! and expression statement.

use crate::ast::{ArrayKind, BinaryOp, Expression, Statement, TypeRef, VarDecl};
use crate::parser::Parser;
use crate::ParseError;
use coi_lexer::TokenKind;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.peek().kind {
            TokenKind::LBrace => return self.parse_block(),
            TokenKind::If => return self.parse_if(),
            TokenKind::For => return self.parse_for(),
            TokenKind::Return => {
                self.advance();
                let value = if self.check(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(TokenKind::Semicolon, "Expected ';'")?;
                return Ok(Statement::Return(value));
            }
            _ => {}
        }

        let is_mutable = self.eat(TokenKind::Mut);
        if is_mutable || self.starts_declaration() {
            if !self.is_type_token() {
                return Err(self.error("Expected type after 'mut'"));
            }
            let mut decl = self.parse_var_decl()?;
            decl.is_mutable = is_mutable;
            self.expect(TokenKind::Semicolon, "Expected ';'")?;
            return Ok(Statement::VarDecl(decl));
        }

        if self.is_identifier_token() && self.scan_for_assignment() {
            return self.parse_assignment();
        }

        let expr = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "Expected ';'")?;
        Ok(Statement::Expr(expr))
    }

    pub(crate) fn parse_block(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::LBrace, "Expected '{'")?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "Expected '}'")?;
        Ok(Statement::Block(stmts))
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::If, "Expected 'if'")?;
        self.expect(TokenKind::LParen, "Expected '('")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "Expected ')'")?;

        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// `for i in start:end body` or `for item in items body`.
    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::For, "Expected 'for'")?;

        if !(self.check(TokenKind::Identifier) && self.peek_at(1).kind == TokenKind::In) {
            return Err(self.error(
                "Unexpected token after 'for'. Expected range 'i in start:end' or foreach \
                 'i in array'. C-style for loops are not supported.",
            ));
        }

        let var = self.peek().value.clone();
        self.advance(); // variable
        self.advance(); // `in`

        let first = self.parse_expression()?;

        if self.eat(TokenKind::Colon) {
            // The body block follows the end expression directly.
            let end = self.with_brace_init(false, |p| p.parse_expression())?;
            let body = Box::new(self.parse_statement()?);
            return Ok(Statement::ForRange {
                var,
                start: first,
                end,
                body,
            });
        }

        let body = Box::new(self.parse_statement()?);
        Ok(Statement::ForEach {
            var,
            iterable: first,
            body,
        })
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Whether the tokens at the cursor begin a typed declaration.
    fn starts_declaration(&self) -> bool {
        if self.peek().kind.is_builtin_type() {
            return true;
        }
        if self.peek().kind != TokenKind::Identifier {
            return false;
        }

        let is_name = |kind: TokenKind| matches!(kind, TokenKind::Identifier | TokenKind::Key);
        match self.peek_at(1).kind {
            TokenKind::Identifier | TokenKind::Key => true,
            TokenKind::Ampersand => true,
            TokenKind::LBracket => match self.peek_at(2).kind {
                TokenKind::RBracket => is_name(self.peek_at(3).kind),
                TokenKind::IntLiteral => {
                    self.peek_at(3).kind == TokenKind::RBracket && is_name(self.peek_at(4).kind)
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Parse `Type[.Enum][&][[N]|[]]`. Returns the type and whether it is
    /// a reference.
    pub(crate) fn parse_declared_type(&mut self) -> Result<(TypeRef, bool), ParseError> {
        if !self.is_type_token() {
            return Err(self.error("Expected type"));
        }
        let mut name = self.peek().value.clone();
        self.advance();

        // Shared enum of another component: `App.Mode`
        if self.check(TokenKind::Dot) && self.peek_at(1).kind == TokenKind::Identifier {
            self.advance();
            name.push('.');
            name.push_str(&self.peek().value);
            self.advance();
        }

        let is_reference = self.eat(TokenKind::Ampersand);

        let mut array = ArrayKind::None;
        if self.eat(TokenKind::LBracket) {
            if self.check(TokenKind::IntLiteral) {
                let size_token = self.peek().clone();
                let size = size_token
                    .value
                    .parse::<usize>()
                    .map_err(|_| self.error(format!("Invalid array size '{}'", size_token.value)))?;
                self.advance();
                array = ArrayKind::Fixed(size);
            } else {
                array = ArrayKind::Dynamic;
            }
            self.expect(TokenKind::RBracket, "Expected ']'")?;
        }

        Ok((TypeRef { name, array }, is_reference))
    }

    /// Parse `Type[&][[N]] name [= expr | := expr]` without the trailing `;`.
    pub(crate) fn parse_var_decl(&mut self) -> Result<VarDecl, ParseError> {
        let (ty, is_reference) = self.parse_declared_type()?;
        let name = self.expect_identifier("Expected variable name")?;

        let mut decl = VarDecl::new(ty, name);
        decl.is_reference = is_reference;

        if self.eat(TokenKind::MoveAssign) {
            decl.is_move = true;
            decl.initializer = Some(self.parse_expression()?);
        } else if self.eat(TokenKind::Assign) {
            decl.initializer = Some(self.parse_expression()?);
        }

        Ok(decl)
    }

    // =========================================================================
    // Assignments
    // =========================================================================

    /// Look past `name`, any `[...]` groups and `.ident` chains for an
    /// assignment operator. The cursor is restored either way.
    fn scan_for_assignment(&mut self) -> bool {
        let checkpoint = self.checkpoint();
        self.advance(); // name

        loop {
            match self.peek().kind {
                TokenKind::LBracket => {
                    self.advance();
                    let mut depth = 1;
                    while depth > 0 && !self.is_at_end() {
                        match self.peek().kind {
                            TokenKind::LBracket => depth += 1,
                            TokenKind::RBracket => depth -= 1,
                            _ => {}
                        }
                        self.advance();
                    }
                }
                TokenKind::Dot => {
                    self.advance();
                    if !self.is_identifier_token() {
                        break;
                    }
                    self.advance();
                }
                _ => break,
            }
        }

        let is_assignment = self.peek().kind.is_assignment();
        self.restore(checkpoint);
        is_assignment
    }

    /// Parse `target op value;` where the target is a name, member chain
    /// or index expression.
    fn parse_assignment(&mut self) -> Result<Statement, ParseError> {
        let name = self.expect_identifier("Expected identifier")?;
        let mut target = Expression::Ident(name);

        loop {
            if self.eat(TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.expect(TokenKind::RBracket, "Expected ']'")?;
                target = Expression::index(target, index);
            } else if self.eat(TokenKind::Dot) {
                let member = self.expect_identifier("Expected member name")?;
                target = Expression::member(target, member);
            } else {
                break;
            }
        }

        let op = self.peek().kind;
        if !op.is_assignment() {
            return Err(self.error("Expected assignment operator"));
        }
        self.advance();

        let is_move = op == TokenKind::MoveAssign;
        let compound_op = op.compound_op().and_then(BinaryOp::from_compound);
        let value = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "Expected ';'")?;

        Ok(match target {
            Expression::Ident(name) => {
                let value = match compound_op {
                    Some(op) => Expression::binary(Expression::Ident(name.clone()), op, value),
                    None => value,
                };
                Statement::Assign {
                    name,
                    value,
                    is_move,
                }
            }
            Expression::Member { object, member } => Statement::MemberAssign {
                object: *object,
                member,
                value,
                compound_op,
                is_move,
            },
            Expression::Index { array, index } => Statement::IndexAssign {
                array: *array,
                index: *index,
                value,
                compound_op,
                is_move,
            },
            _ => return Err(self.error("Invalid assignment target")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coi_lexer::Scanner;
    use pretty_assertions::assert_eq;

    /// Helper: parse a single statement and require all input consumed.
    fn stmt(source: &str) -> Statement {
        let mut parser = Parser::new(Scanner::tokenize(source).unwrap());
        let stmt = parser.parse_statement().unwrap();
        assert!(parser.is_at_end(), "trailing tokens in {source:?}");
        stmt
    }

    fn stmt_err(source: &str) -> ParseError {
        let mut parser = Parser::new(Scanner::tokenize(source).unwrap());
        parser.parse_statement().unwrap_err()
    }

    fn decl(source: &str) -> VarDecl {
        match stmt(source) {
            Statement::VarDecl(decl) => decl,
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    #[test]
    fn test_builtin_declaration() {
        let d = decl("int count = 0;");
        assert_eq!(d.ty, TypeRef::new("int"));
        assert_eq!(d.name, "count");
        assert_eq!(d.initializer, Some(Expression::Int(0)));
        assert!(!d.is_mutable);
    }

    #[test]
    fn test_mutable_declaration_without_initializer() {
        let d = decl("mut string name;");
        assert!(d.is_mutable);
        assert_eq!(d.initializer, None);
    }

    #[test]
    fn test_user_type_declaration() {
        let d = decl("User u = User{1};");
        assert_eq!(d.ty, TypeRef::new("User"));
        assert!(matches!(d.initializer, Some(Expression::Aggregate { .. })));
    }

    #[test]
    fn test_reference_declaration() {
        let d = decl("Row& row = rows[0];");
        assert!(d.is_reference);
        assert_eq!(d.ty.name, "Row");
    }

    #[test]
    fn test_array_declarations() {
        assert_eq!(decl("int[] xs = [];").ty, TypeRef::array_of("int"));
        assert_eq!(decl("Row[] rows;").ty, TypeRef::array_of("Row"));
        assert_eq!(
            decl("float[4] v = [0.0; 4];").ty,
            TypeRef {
                name: "float".into(),
                array: ArrayKind::Fixed(4)
            }
        );
        assert_eq!(decl("Cell[8] cells;").ty.array, ArrayKind::Fixed(8));
    }

    #[test]
    fn test_move_initialized_declaration() {
        let d = decl("Data d := other;");
        assert!(d.is_move);
        assert_eq!(d.initializer, Some(Expression::ident("other")));
    }

    #[test]
    fn test_mut_without_type() {
        let err = stmt_err("mut = 3;");
        assert_eq!(err.message, "Expected type after 'mut'");
    }

    // =========================================================================
    // Assignments
    // =========================================================================

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            stmt("x = 5;"),
            Statement::Assign {
                name: "x".into(),
                value: Expression::Int(5),
                is_move: false
            }
        );
    }

    #[test]
    fn test_compound_assignment_desugars_on_names() {
        assert_eq!(
            stmt("x -= 2;"),
            Statement::Assign {
                name: "x".into(),
                value: Expression::binary(Expression::ident("x"), BinaryOp::Sub, Expression::Int(2)),
                is_move: false
            }
        );
    }

    #[test]
    fn test_move_assignment() {
        assert!(matches!(stmt("x := y;"), Statement::Assign { is_move: true, .. }));
    }

    #[test]
    fn test_index_assignment() {
        assert_eq!(
            stmt("a[i] = v;"),
            Statement::IndexAssign {
                array: Expression::ident("a"),
                index: Expression::ident("i"),
                value: Expression::ident("v"),
                compound_op: None,
                is_move: false
            }
        );
    }

    #[test]
    fn test_index_member_assignment() {
        assert_eq!(
            stmt("a[i].x = v;"),
            Statement::MemberAssign {
                object: Expression::index(Expression::ident("a"), Expression::ident("i")),
                member: "x".into(),
                value: Expression::ident("v"),
                compound_op: None,
                is_move: false
            }
        );
    }

    #[test]
    fn test_member_chain_compound_assignment() {
        assert_eq!(
            stmt("a.b.c += 1;"),
            Statement::MemberAssign {
                object: Expression::member(Expression::ident("a"), "b"),
                member: "c".into(),
                value: Expression::Int(1),
                compound_op: Some(BinaryOp::Add),
                is_move: false
            }
        );
    }

    #[test]
    fn test_nested_index_assignment() {
        assert!(matches!(
            stmt("grid[row[0]] *= 2;"),
            Statement::IndexAssign {
                compound_op: Some(BinaryOp::Mul),
                ..
            }
        ));
    }

    #[test]
    fn test_index_expression_statement() {
        assert_eq!(
            stmt("a[i];"),
            Statement::Expr(Expression::index(Expression::ident("a"), Expression::ident("i")))
        );
    }

    #[test]
    fn test_call_statement() {
        assert!(matches!(
            stmt("items.push(3);"),
            Statement::Expr(Expression::Call { ref name, .. }) if name == "items.push"
        ));
    }

    #[test]
    fn test_postfix_statement() {
        assert!(matches!(stmt("count++;"), Statement::Expr(Expression::Postfix { .. })));
    }

    #[test]
    fn test_missing_semicolon() {
        let err = stmt_err("x = 1");
        assert_eq!(err.message, "Expected ';'");
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    #[test]
    fn test_if_else() {
        let s = stmt("if (a > 1) { x = 1; } else x = 2;");
        let Statement::If {
            condition,
            then_branch,
            else_branch,
        } = s
        else {
            panic!("expected if");
        };
        assert_eq!(condition.to_string(), "(a > 1)");
        assert!(matches!(*then_branch, Statement::Block(_)));
        assert!(matches!(else_branch.as_deref(), Some(Statement::Assign { .. })));
    }

    #[test]
    fn test_return_forms() {
        assert_eq!(stmt("return;"), Statement::Return(None));
        assert_eq!(stmt("return 1;"), Statement::Return(Some(Expression::Int(1))));
    }

    #[test]
    fn test_range_for_with_uppercase_end() {
        let s = stmt("for i in 0:N { total += i; }");
        let Statement::ForRange {
            var,
            start,
            end,
            body,
        } = s
        else {
            panic!("expected range for");
        };
        assert_eq!(var, "i");
        assert_eq!(start, Expression::Int(0));
        assert_eq!(end, Expression::ident("N"));
        assert!(matches!(*body, Statement::Block(ref stmts) if stmts.len() == 1));
    }

    #[test]
    fn test_range_for_rejects_aggregate_end() {
        let err = stmt_err("for i in 0:Foo{1,2} { }");
        assert_eq!(err.message, "Expected ';'");
    }

    #[test]
    fn test_foreach() {
        let s = stmt("for row in rows { row.update(); }");
        assert!(matches!(
            s,
            Statement::ForEach { ref var, iterable: Expression::Ident(ref it), .. }
                if var == "row" && it == "rows"
        ));
    }

    #[test]
    fn test_c_style_for_rejected() {
        let err = stmt_err("for (int i = 0; i < 3; i++) { }");
        assert!(err.message.contains("C-style for loops are not supported"));
    }

    #[test]
    fn test_nested_blocks() {
        let s = stmt("{ int a = 1; { a = 2; } }");
        let Statement::Block(outer) = s else {
            panic!("expected block");
        };
        assert_eq!(outer.len(), 2);
        assert!(matches!(outer[1], Statement::Block(_)));
    }
}
