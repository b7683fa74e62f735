//! View grammar: elements, child components and `<if>` / `<for>` blocks.
//!
//! Text children are rebuilt from tokens. Tokens that touch in the source
//! are joined directly and any gap becomes a single space, including a
//! leading or trailing gap next to a tag or interpolation.

use crate::ast::{
    starts_uppercase, Attribute, ComponentInstance, Element, Expression, Prop, ViewNode,
};
use crate::expr::parse_int_literal;
use crate::parser::Parser;
use crate::ParseError;
use coi_lexer::{Token, TokenKind};

/// Whether source text separates two tokens.
pub(crate) fn is_separated(prev: &Token, next: &Token) -> bool {
    next.span.start > prev.span.end || next.span.line != prev.span.line
}

impl Parser {
    pub(crate) fn parse_view_node(&mut self) -> Result<ViewNode, ParseError> {
        if !self.check(TokenKind::Lt) {
            return Err(self.error("Expected '<'"));
        }
        match self.peek_at(1).kind {
            TokenKind::If => self.parse_view_if(),
            TokenKind::For => self.parse_view_for(),
            _ => self.parse_element(),
        }
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn parse_element(&mut self) -> Result<ViewNode, ParseError> {
        self.expect(TokenKind::Lt, "Expected '<'")?;

        if self.check(TokenKind::LBrace) {
            return self.parse_member_projection();
        }

        let tag = self.expect(TokenKind::Identifier, "Expected tag name")?.value;

        if tag == "route" {
            if !self.check(TokenKind::Slash) {
                return Err(self.error("<route> must be self-closing: <route />"));
            }
            self.advance();
            self.expect(TokenKind::Gt, "Expected '>'")?;
            return Ok(ViewNode::RoutePlaceholder);
        }

        if starts_uppercase(&tag) {
            let props = self.parse_props()?;
            if !self.eat(TokenKind::Slash) {
                return Err(self.error(format!(
                    "Custom components must be self-closing for now: {tag}"
                )));
            }
            self.expect(TokenKind::Gt, "Expected '>'")?;
            return Ok(ViewNode::Component(ComponentInstance {
                component: tag,
                props,
                member: None,
            }));
        }

        // `<counter/>` mounts a component-typed member.
        if self.check(TokenKind::Slash) {
            if let Some(component) = self.component_members.get(&tag).cloned() {
                self.advance();
                self.expect(TokenKind::Gt, "Expected '>'")?;
                return Ok(ViewNode::Component(ComponentInstance {
                    component,
                    props: Vec::new(),
                    member: Some(tag),
                }));
            }
        }

        let mut element = Element {
            tag,
            attributes: Vec::new(),
            children: Vec::new(),
            ref_binding: None,
        };
        self.parse_attributes(&mut element)?;

        if self.eat(TokenKind::Slash) {
            self.expect(TokenKind::Gt, "Expected '>'")?;
            return Ok(ViewNode::Element(element));
        }
        self.expect(TokenKind::Gt, "Expected '>'")?;

        element.children = self.parse_children(false)?;

        self.expect(TokenKind::Lt, "Expected '<'")?;
        self.expect(TokenKind::Slash, "Expected '/'")?;
        if self.peek().value != element.tag {
            return Err(self.error(format!(
                "Mismatched closing tag: expected {}, got {}",
                element.tag,
                self.peek().value
            )));
        }
        self.advance();
        self.expect(TokenKind::Gt, "Expected '>'")?;

        Ok(ViewNode::Element(element))
    }

    /// `<{member} props />`, after the `<`.
    fn parse_member_projection(&mut self) -> Result<ViewNode, ParseError> {
        self.expect(TokenKind::LBrace, "Expected '{'")?;
        let expr = self.parse_expression()?;
        self.expect(
            TokenKind::RBrace,
            "Expected '}' after component variable expression",
        )?;

        let Expression::Ident(member) = expr else {
            return Err(self.error("Expected identifier in <{...}/> syntax"));
        };
        let Some(component) = self.component_members.get(&member).cloned() else {
            return Err(self.error(format!(
                "Variable '{member}' is not a known component member. \
                 Use <{{var}}/> only for component-typed variables"
            )));
        };

        let props = self.parse_props()?;
        if !self.eat(TokenKind::Slash) {
            return Err(self.error(format!(
                "Expected '/>' - component variable projection must be self-closing: <{{{member}}}/>"
            )));
        }
        self.expect(TokenKind::Gt, "Expected '>'")?;

        Ok(ViewNode::Component(ComponentInstance {
            component,
            props,
            member: Some(member),
        }))
    }

    /// Component props: `name=value`, `&name={v}`, `:name={v}`, bare `name`.
    fn parse_props(&mut self) -> Result<Vec<Prop>, ParseError> {
        let mut props = Vec::new();

        while self.is_identifier_token()
            || self.check(TokenKind::Ampersand)
            || self.check(TokenKind::Colon)
        {
            let is_reference = self.eat(TokenKind::Ampersand);
            let is_move = !is_reference && self.eat(TokenKind::Colon);
            let name = self.expect_identifier("Expected prop name")?;

            let value = if self.eat(TokenKind::Assign) {
                self.parse_attribute_value()?
            } else {
                Expression::Bool(true)
            };

            props.push(Prop {
                name,
                value,
                is_reference,
                is_move,
            });
        }

        Ok(props)
    }

    /// HTML attributes up to `/` or `>`. Any token can name an attribute,
    /// with `-ident` parts joined (`data-id`, `stroke-width`).
    fn parse_attributes(&mut self, element: &mut Element) -> Result<(), ParseError> {
        while !matches!(
            self.peek().kind,
            TokenKind::Slash | TokenKind::Gt | TokenKind::Eof
        ) {
            if self.eat(TokenKind::Ampersand) {
                self.expect(
                    TokenKind::Assign,
                    "Expected '=' after '&' for element binding",
                )?;
                self.expect(TokenKind::LBrace, "Expected '{' after '&='")?;
                let var = self.expect(
                    TokenKind::Identifier,
                    "Expected variable name in element binding &={varName}",
                )?;
                self.expect(TokenKind::RBrace, "Expected '}' after variable name")?;
                element.ref_binding = Some(var.value);
                continue;
            }

            let mut name = self.peek().value.clone();
            self.advance();
            while self.check(TokenKind::Minus) && self.peek_at(1).kind == TokenKind::Identifier {
                self.advance();
                name.push('-');
                name.push_str(&self.peek().value);
                self.advance();
            }

            let value = if self.eat(TokenKind::Assign) {
                self.parse_attribute_value()?
            } else {
                Expression::Bool(true)
            };
            element.attributes.push(Attribute { name, value });
        }
        Ok(())
    }

    /// A literal string or number (optionally negated), or `{expr}`.
    fn parse_attribute_value(&mut self) -> Result<Expression, ParseError> {
        let negate = self.eat(TokenKind::Minus);
        let token = self.peek().clone();

        let value = match token.kind {
            TokenKind::StringLiteral if !negate => Expression::string(token.value),
            TokenKind::IntLiteral => {
                let value = parse_int_literal(&token.value).map_err(|msg| self.error(msg))?;
                Expression::Int(if negate { -value } else { value })
            }
            TokenKind::FloatLiteral => {
                let value: f64 = token.value.parse().map_err(|_| {
                    self.error(format!("Invalid float literal '{}'", token.value))
                })?;
                Expression::Float(if negate { -value } else { value })
            }
            TokenKind::LBrace if !negate => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RBrace, "Expected '}'")?;
                return Ok(expr);
            }
            _ if negate => {
                return Err(self.error("Expected number after '-' in prop or attribute value"));
            }
            _ => return Err(self.error("Expected prop or attribute value")),
        };

        self.advance();
        Ok(value)
    }

    // =========================================================================
    // Children
    // =========================================================================

    /// Parse children up to a closing `</...>`, or also `<else>` inside an
    /// `<if>` block. The closing tag itself is left for the caller.
    fn parse_children(&mut self, stop_at_else: bool) -> Result<Vec<ViewNode>, ParseError> {
        let mut children = Vec::new();
        let mut last = self.previous().clone();

        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Lt => {
                    let next = self.peek_at(1).kind;
                    if next == TokenKind::Slash || (stop_at_else && next == TokenKind::Else) {
                        break;
                    }
                    children.push(self.parse_view_node()?);
                }
                TokenKind::LBrace => {
                    self.advance();
                    let expr = self.parse_expression()?;
                    self.expect(TokenKind::RBrace, "Expected '}'")?;
                    children.push(ViewNode::Interpolation(expr));
                }
                _ => {
                    let text = self.parse_text(&last);
                    if !text.is_empty() {
                        children.push(ViewNode::Text(text));
                    }
                }
            }
            last = self.previous().clone();
        }

        Ok(children)
    }

    /// Join text tokens up to the next `<`, `{` or end of input.
    fn parse_text(&mut self, last: &Token) -> String {
        let mut text = String::new();
        if is_separated(last, self.peek()) {
            text.push(' ');
        }

        let mut prev: Option<Token> = None;
        while !matches!(
            self.peek().kind,
            TokenKind::Lt | TokenKind::LBrace | TokenKind::Eof
        ) {
            let token = self.peek().clone();
            if prev.as_ref().is_some_and(|p| is_separated(p, &token)) {
                text.push(' ');
            }
            if token.kind == TokenKind::StringLiteral {
                text.push('"');
                text.push_str(&token.value);
                text.push('"');
            } else {
                text.push_str(&token.value);
            }
            prev = Some(token);
            self.advance();
        }

        if let Some(prev) = prev {
            if !self.is_at_end() && is_separated(&prev, self.peek()) {
                text.push(' ');
            }
        }
        text
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    /// `<if cond> ... [<else> ... </else>] </if>`
    fn parse_view_if(&mut self) -> Result<ViewNode, ParseError> {
        self.expect(TokenKind::Lt, "Expected '<'")?;
        self.expect(TokenKind::If, "Expected 'if'")?;

        let condition = if self.eat(TokenKind::LBrace) {
            let expr = self.parse_expression()?;
            self.expect(TokenKind::RBrace, "Expected '}'")?;
            expr
        } else {
            self.parse_expression_no_gt()?
        };
        self.expect(TokenKind::Gt, "Expected '>'")?;

        let then_children = self.parse_children(true)?;

        let mut else_children = Vec::new();
        if self.check(TokenKind::Lt) && self.peek_at(1).kind == TokenKind::Else {
            self.advance();
            self.advance();
            self.expect(TokenKind::Gt, "Expected '>'")?;
            else_children = self.parse_children(false)?;
            self.expect_closing(TokenKind::Else, "Expected 'else'")?;
        }

        self.expect_closing(TokenKind::If, "Expected 'if'")?;

        Ok(ViewNode::If {
            condition,
            then_children,
            else_children,
        })
    }

    /// `<for i in start:end>` or `<for item in items key={item.id}>`
    fn parse_view_for(&mut self) -> Result<ViewNode, ParseError> {
        self.expect(TokenKind::Lt, "Expected '<'")?;
        self.expect(TokenKind::For, "Expected 'for'")?;
        let var = self
            .expect(TokenKind::Identifier, "Expected loop variable name")?
            .value;
        self.expect(TokenKind::In, "Expected 'in'")?;

        let first = self.parse_expression_no_gt()?;

        if self.eat(TokenKind::Colon) {
            let end = self.parse_expression_no_gt()?;
            self.expect(TokenKind::Gt, "Expected '>'")?;
            let children = self.parse_children(false)?;
            self.expect_closing(TokenKind::For, "Expected 'for'")?;
            return Ok(ViewNode::ForRange {
                var,
                start: first,
                end,
                children,
            });
        }

        if !self.eat(TokenKind::Key) {
            return Err(self.error(format!(
                "Expected 'key' for foreach loop. Use: <for {var} in array key={{{var}.id}}>"
            )));
        }
        self.expect(TokenKind::Assign, "Expected '=' after 'key'")?;
        self.expect(TokenKind::LBrace, "Expected '{' for key expression")?;
        let key = self.parse_expression()?;
        self.expect(TokenKind::RBrace, "Expected '}' after key expression")?;
        self.expect(TokenKind::Gt, "Expected '>'")?;

        // Inside a loop over a component array the loop variable can be
        // mounted like a member.
        let element_type = first
            .as_ident()
            .and_then(|name| self.component_arrays.get(name).cloned());
        let shadowed = element_type
            .map(|ty| self.component_members.insert(var.clone(), ty))
            .map(|previous| (var.clone(), previous));

        let children = self.parse_children(false);

        if let Some((name, previous)) = shadowed {
            match previous {
                Some(ty) => self.component_members.insert(name, ty),
                None => self.component_members.remove(&name),
            };
        }
        let children = children?;

        self.expect_closing(TokenKind::For, "Expected 'for'")?;
        Ok(ViewNode::ForEach {
            var,
            iterable: first,
            key,
            children,
        })
    }

    /// `</keyword>`
    fn expect_closing(&mut self, kind: TokenKind, message: &str) -> Result<(), ParseError> {
        self.expect(TokenKind::Lt, "Expected '<'")?;
        self.expect(TokenKind::Slash, "Expected '/'")?;
        self.expect(kind, message)?;
        self.expect(TokenKind::Gt, "Expected '>'")?;
        Ok(())
    }
}
