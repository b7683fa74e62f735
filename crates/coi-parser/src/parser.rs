//! Program parser for Coi.
//!
//! Holds the token cursor, the two context flags, and the top-level
//! grammar: imports, `pub` declarations, components, data types, enums and
//! the `app { }` block. Expressions, statements, views and component bodies
//! live in sibling modules as further `impl Parser` blocks.

use std::collections::BTreeMap;

use crate::ast::{AppConfig, CallArg, Expression, Program};
use crate::ParseError;
use coi_lexer::{Scanner, Token, TokenKind};

/// Coi recursive-descent parser.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// When false, `>` closes a view tag instead of comparing.
    pub(crate) allow_gt_comparison: bool,
    /// When false, `Name{` is not an aggregate literal.
    pub(crate) allow_brace_init: bool,
    /// Component-typed members of the component being parsed.
    pub(crate) component_members: BTreeMap<String, String>,
    /// Component-array members of the component being parsed.
    pub(crate) component_arrays: BTreeMap<String, String>,
}

impl Parser {
    /// Create a new parser for the given tokens. The stream must end in `Eof`.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }
        Self {
            tokens,
            pos: 0,
            allow_gt_comparison: true,
            allow_brace_init: true,
            component_members: BTreeMap::new(),
            component_arrays: BTreeMap::new(),
        }
    }

    /// Parse source code into a program.
    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = Scanner::tokenize(source)?;
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    /// Parse a standalone expression, such as the `{...}` part of an
    /// interpolated string.
    pub fn parse_expression_source(source: &str) -> Result<Expression, ParseError> {
        let tokens = Scanner::tokenize(source)?;
        let mut parser = Parser::new(tokens);
        let expr = parser.parse_expression()?;
        if !parser.is_at_end() {
            return Err(parser.error(format!(
                "Unexpected '{}' after expression",
                parser.peek().value
            )));
        }
        Ok(expr)
    }

    /// Parse a whole file.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();

        while !self.is_at_end() {
            let is_public = self.eat(TokenKind::Pub);
            if is_public
                && !matches!(
                    self.peek().kind,
                    TokenKind::Component | TokenKind::Enum | TokenKind::Data
                )
            {
                return Err(
                    self.error("'pub' can only be used with component, enum, or data declarations")
                );
            }

            match self.peek().kind {
                TokenKind::Import => {
                    self.advance();
                    let path = self.expect(TokenKind::StringLiteral, "Expected import path")?;
                    program.imports.push(path.value);
                    self.expect(TokenKind::Semicolon, "Expected ';'")?;
                }
                TokenKind::Component => {
                    let mut comp = self.parse_component()?;
                    comp.is_public = is_public;
                    if program.component(&comp.name).is_some() {
                        return Err(ParseError {
                            message: format!("Component '{}' is already defined", comp.name),
                            line: comp.line,
                            column: 1,
                        });
                    }
                    program.components.push(comp);
                }
                TokenKind::Enum => {
                    let mut def = self.parse_enum()?;
                    def.is_public = is_public;
                    program.enums.push(def);
                }
                TokenKind::Data => {
                    let mut def = self.parse_data()?;
                    def.is_public = is_public;
                    program.data.push(def);
                }
                TokenKind::Identifier if self.peek().value == "app" => {
                    self.advance();
                    self.parse_app(&mut program.app)?;
                }
                _ => {
                    return Err(self.error(format!(
                        "Unexpected '{}' at top level",
                        self.peek().value
                    )));
                }
            }
        }

        if program.app.root.is_none() && program.component("Main").is_some() {
            program.app.root = Some("Main".to_string());
        }

        Ok(program)
    }

    /// Parse `app { root = Name; title = "..."; routes = { "/": Name }; }`.
    fn parse_app(&mut self, app: &mut AppConfig) -> Result<(), ParseError> {
        self.expect(TokenKind::LBrace, "Expected '{'")?;

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let key = self.expect(TokenKind::Identifier, "Expected key")?.value;
            self.expect(TokenKind::Assign, "Expected '='")?;

            match key.as_str() {
                "root" => {
                    let name = self.expect(TokenKind::Identifier, "Expected component name")?;
                    app.root = Some(name.value);
                }
                "title" => {
                    app.title = self.expect(TokenKind::StringLiteral, "Expected string")?.value;
                }
                "description" => {
                    app.description =
                        self.expect(TokenKind::StringLiteral, "Expected string")?.value;
                }
                "lang" => {
                    app.lang = self.expect(TokenKind::StringLiteral, "Expected string")?.value;
                }
                "routes" => {
                    self.expect(TokenKind::LBrace, "Expected '{'")?;
                    while !self.check(TokenKind::RBrace) && !self.is_at_end() {
                        let path =
                            self.expect(TokenKind::StringLiteral, "Expected route string")?;
                        self.expect(TokenKind::Colon, "Expected ':'")?;
                        let comp =
                            self.expect(TokenKind::Identifier, "Expected component name")?;
                        app.routes.insert(path.value, comp.value);
                        self.eat(TokenKind::Comma);
                    }
                    self.expect(TokenKind::RBrace, "Expected '}'")?;
                }
                other => {
                    return Err(self.error(format!("Unknown app setting '{other}'")));
                }
            }
            self.expect(TokenKind::Semicolon, "Expected ';'")?;
        }
        self.expect(TokenKind::RBrace, "Expected '}'")?;
        Ok(())
    }

    /// Parse comma-separated arguments up to (not including) `end`.
    ///
    /// Supports positional values, named `name = v` / `name := v`, reference
    /// `&v` and move `:v` prefixes, and a trailing comma.
    pub(crate) fn parse_call_args(&mut self, end: TokenKind) -> Result<Vec<CallArg>, ParseError> {
        let mut args = Vec::new();

        while !self.check(end) && !self.is_at_end() {
            let mut is_reference = false;
            let mut is_move = false;
            if self.eat(TokenKind::Ampersand) {
                is_reference = true;
            } else if self.eat(TokenKind::Colon) {
                is_move = true;
            }

            let is_named = self.is_identifier_token()
                && matches!(
                    self.peek_at(1).kind,
                    TokenKind::Assign | TokenKind::MoveAssign
                );

            let name = if is_named {
                let name = self.peek().value.clone();
                self.advance();
                if self.eat(TokenKind::MoveAssign) {
                    is_move = true;
                } else {
                    self.expect(TokenKind::Assign, "Expected '=' or ':=' after argument name")?;
                }
                Some(name)
            } else {
                None
            };

            let value = self.parse_expression()?;
            args.push(CallArg {
                name,
                value,
                is_reference,
                is_move,
            });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        Ok(args)
    }

    // =========================================================================
    // Context flags
    // =========================================================================

    /// Run `f` with `allow_gt_comparison` set, restoring it afterwards.
    pub(crate) fn with_gt_comparison<T>(
        &mut self,
        allow: bool,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = self.allow_gt_comparison;
        self.allow_gt_comparison = allow;
        let result = f(self);
        self.allow_gt_comparison = saved;
        result
    }

    /// Run `f` with `allow_brace_init` set, restoring it afterwards.
    pub(crate) fn with_brace_init<T>(
        &mut self,
        allow: bool,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = self.allow_brace_init;
        self.allow_brace_init = allow;
        let result = f(self);
        self.allow_brace_init = saved;
        result
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    /// The token before the cursor.
    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    pub(crate) fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Consume the current token if it has the given kind.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of the given kind or fail with `message`.
    pub(crate) fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            let token = self.peek().clone();
            self.advance();
            Ok(token)
        } else {
            Err(self.error(message))
        }
    }

    /// Identifiers, plus soft keywords usable as names.
    pub(crate) fn is_identifier_token(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Identifier | TokenKind::Key)
    }

    pub(crate) fn expect_identifier(&mut self, message: &str) -> Result<String, ParseError> {
        if self.is_identifier_token() {
            let name = self.peek().value.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(message))
        }
    }

    /// Tokens usable as a type name in declarations.
    pub(crate) fn is_type_token(&self) -> bool {
        self.peek().kind.is_builtin_type() || self.peek().kind == TokenKind::Identifier
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.pos
    }

    pub(crate) fn restore(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError {
            message: message.into(),
            line: token.span.line,
            column: token.span.column,
        }
    }
}
