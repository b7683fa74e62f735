//! Component, data, enum and router declarations.

use crate::ast::{
    starts_uppercase, ArrayKind, CallbackSig, Component, ComponentParam, DataDef, DataField,
    EnumDef, FunctionDef, Param, Route, RouterDef, Statement, TypeRef,
};
use crate::parser::Parser;
use crate::view::is_separated;
use crate::ParseError;
use coi_lexer::TokenKind;

impl Parser {
    /// Parse `component Name[(params)] { body }`.
    pub(crate) fn parse_component(&mut self) -> Result<Component, ParseError> {
        self.component_members.clear();
        self.component_arrays.clear();

        self.expect(TokenKind::Component, "Expected 'component'")?;

        let mut comp = Component {
            line: self.peek().span.line,
            ..Component::default()
        };
        if self.check(TokenKind::Identifier) && !starts_uppercase(&self.peek().value) {
            return Err(self.error(format!(
                "Component name '{}' must start with an uppercase letter",
                self.peek().value
            )));
        }
        comp.name = self.expect(TokenKind::Identifier, "Expected component name")?.value;

        if self.eat(TokenKind::LParen) {
            comp.params = self.parse_component_params()?;
        }

        self.expect(TokenKind::LBrace, "Expected '{'")?;
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            self.parse_component_item(&mut comp)?;
        }
        self.expect(TokenKind::RBrace, "Expected '}'")?;

        comp.component_members = std::mem::take(&mut self.component_members);
        comp.component_arrays = std::mem::take(&mut self.component_arrays);
        Ok(comp)
    }

    /// Parse one member of a component body.
    fn parse_component_item(&mut self, comp: &mut Component) -> Result<(), ParseError> {
        let is_shared = self.eat(TokenKind::Shared);
        let is_public = self.eat(TokenKind::Pub);
        let is_mutable = self.eat(TokenKind::Mut);

        let kind = self.peek().kind;
        if self.is_type_token() {
            let mut decl = self.parse_var_decl()?;
            decl.is_public = is_public;
            decl.is_mutable = is_mutable;
            decl.is_shared = is_shared;

            if decl.is_reference && decl.initializer.is_none() {
                return Err(self.error(format!(
                    "Reference variable '{}' must be initialized immediately.",
                    decl.name
                )));
            }
            self.track_component_member(&decl.name, &decl.ty);

            self.expect(TokenKind::Semicolon, "Expected ';'")?;
            comp.state.push(decl);
            return Ok(());
        }

        if is_mutable && !is_public && kind != TokenKind::Def {
            return Err(self.error("Expected variable declaration after 'mut'"));
        }

        match kind {
            TokenKind::Data => comp.data.push(self.parse_data()?),
            TokenKind::Enum => {
                let mut def = self.parse_enum()?;
                def.is_shared = is_shared;
                if is_shared {
                    def.owner = Some(comp.name.clone());
                }
                comp.enums.push(def);
            }
            TokenKind::Def => {
                let mut method = self.parse_method()?;
                method.is_public = is_public;
                comp.methods.push(method);
            }
            TokenKind::Init | TokenKind::Mount => {
                let mut hook = FunctionDef::hook(&self.peek().value);
                self.advance();
                hook.body = self.parse_statement_list()?;
                comp.methods.push(hook);
            }
            TokenKind::Tick => {
                self.advance();
                let mut hook = FunctionDef::hook("tick");
                if self.eat(TokenKind::LParen) {
                    hook.params = self.parse_params()?;
                }
                hook.body = self.parse_statement_list()?;
                comp.methods.push(hook);
            }
            TokenKind::Style => {
                self.advance();
                let is_global = self.check(TokenKind::Identifier) && self.peek().value == "global";
                if is_global {
                    self.advance();
                }
                let css = self.parse_style_block()?;
                let target = if is_global { &mut comp.global_css } else { &mut comp.css };
                target.push_str(&css);
                target.push('\n');
            }
            TokenKind::Router => {
                if comp.router.is_some() {
                    return Err(self.error(format!(
                        "Component '{}' already has a router block",
                        comp.name
                    )));
                }
                comp.router = Some(self.parse_router()?);
            }
            TokenKind::View => {
                self.advance();
                self.expect(TokenKind::LBrace, "Expected '{'")?;
                while !self.check(TokenKind::RBrace) && !self.is_at_end() {
                    comp.view.push(self.parse_view_node()?);
                }
                self.expect(TokenKind::RBrace, "Expected '}'")?;
            }
            _ => {
                return Err(self.error(format!(
                    "Unexpected '{}' in component body",
                    self.peek().value
                )));
            }
        }
        Ok(())
    }

    /// Record members the view may mount as `<name/>` or iterate as
    /// component arrays.
    fn track_component_member(&mut self, name: &str, ty: &TypeRef) {
        if !ty.is_uppercase() || ty.name.contains('.') {
            return;
        }
        match ty.array {
            ArrayKind::None => {
                self.component_members.insert(name.to_string(), ty.name.clone());
            }
            ArrayKind::Dynamic => {
                self.component_arrays.insert(name.to_string(), ty.name.clone());
            }
            ArrayKind::Fixed(_) => {}
        }
    }

    // =========================================================================
    // Parameters and methods
    // =========================================================================

    /// Constructor parameters, after the opening `(`.
    fn parse_component_params(&mut self) -> Result<Vec<ComponentParam>, ParseError> {
        let mut params = Vec::new();

        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            let is_public = self.eat(TokenKind::Pub);
            let is_mutable = self.eat(TokenKind::Mut);

            let mut param = if self.eat(TokenKind::Def) {
                let name = self.expect_identifier("Expected param name")?;
                let callback = self.parse_callback_sig()?;
                ComponentParam {
                    name,
                    ty: TypeRef::new(callback.return_type.clone()),
                    default: None,
                    is_public,
                    is_mutable,
                    is_reference: false,
                    callback: Some(callback),
                }
            } else {
                if !self.is_type_token() {
                    return Err(self.error("Expected param type"));
                }
                let mut ty = TypeRef::new(self.peek().value.clone());
                self.advance();
                let is_reference = self.eat(TokenKind::Ampersand);
                if self.eat(TokenKind::LBracket) {
                    self.expect(TokenKind::RBracket, "Expected ']'")?;
                    ty.array = ArrayKind::Dynamic;
                }
                let name = self.expect_identifier("Expected param name")?;
                ComponentParam {
                    name,
                    ty,
                    default: None,
                    is_public,
                    is_mutable,
                    is_reference,
                    callback: None,
                }
            };

            if self.eat(TokenKind::Assign) {
                param.default = Some(self.parse_expression()?);
            }
            params.push(param);
            self.eat(TokenKind::Comma);
        }

        self.expect(TokenKind::RParen, "Expected ')'")?;
        Ok(params)
    }

    /// `[(T1, T2[])] : Ret` after a callback parameter's name.
    fn parse_callback_sig(&mut self) -> Result<CallbackSig, ParseError> {
        let mut params = Vec::new();

        if self.eat(TokenKind::LParen) {
            while !self.check(TokenKind::RParen) && !self.is_at_end() {
                if !(self.is_type_token() || self.check(TokenKind::Void)) {
                    return Err(self.error("Expected parameter type in callback definition"));
                }
                let mut ty = self.peek().value.clone();
                self.advance();
                if self.eat(TokenKind::LBracket) {
                    self.expect(TokenKind::RBracket, "Expected ']'")?;
                    ty.push_str("[]");
                }
                params.push(ty);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "Expected ')' after callback parameters")?;
        }

        self.expect(TokenKind::Colon, "Expected ':'")?;
        let return_type = self.parse_return_type()?;
        Ok(CallbackSig {
            params,
            return_type,
        })
    }

    /// `def name(params) : Ret { body }`
    fn parse_method(&mut self) -> Result<FunctionDef, ParseError> {
        self.expect(TokenKind::Def, "Expected 'def'")?;

        if self.check(TokenKind::Identifier) && starts_uppercase(&self.peek().value) {
            return Err(self.error(format!(
                "Method name '{}' must start with a lowercase letter",
                self.peek().value
            )));
        }
        let name = self.expect_identifier("Expected function name")?;

        self.expect(TokenKind::LParen, "Expected '('")?;
        let params = self.parse_params()?;

        if self.check(TokenKind::LBrace) {
            return Err(self.error(format!(
                "Missing return type for function '{name}'. Expected ':' followed by return type"
            )));
        }
        self.expect(TokenKind::Colon, "Expected ':' for return type")?;
        let return_type = self.parse_return_type()?;
        let body = self.parse_statement_list()?;

        Ok(FunctionDef {
            name,
            params,
            return_type,
            body,
            is_public: false,
        })
    }

    /// Method parameters `[mut] Type[[]] [&] name`, after the opening `(`.
    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();

        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            let is_mutable = self.eat(TokenKind::Mut);

            if !self.is_type_token() {
                return Err(self.error("Expected parameter type"));
            }
            let mut ty = TypeRef::new(self.peek().value.clone());
            self.advance();
            if self.eat(TokenKind::LBracket) {
                self.expect(TokenKind::RBracket, "Expected ']' for array type")?;
                ty.array = ArrayKind::Dynamic;
            }

            let is_reference = self.eat(TokenKind::Ampersand);
            let name = self.expect_identifier("Expected parameter name")?;

            params.push(Param {
                ty,
                name,
                is_mutable,
                is_reference,
            });
            self.eat(TokenKind::Comma);
        }

        self.expect(TokenKind::RParen, "Expected ')'")?;
        Ok(params)
    }

    fn parse_return_type(&mut self) -> Result<String, ParseError> {
        if !(self.is_type_token() || self.check(TokenKind::Void)) {
            return Err(self.error("Expected return type"));
        }
        let mut ty = self.peek().value.clone();
        self.advance();
        if self.check(TokenKind::LBracket) && self.peek_at(1).kind == TokenKind::RBracket {
            self.advance();
            self.advance();
            ty.push_str("[]");
        }
        Ok(ty)
    }

    /// `{ statements }` as a plain list.
    fn parse_statement_list(&mut self) -> Result<Vec<Statement>, ParseError> {
        match self.parse_block()? {
            Statement::Block(stmts) => Ok(stmts),
            other => Ok(vec![other]),
        }
    }

    // =========================================================================
    // Data, enums and routers
    // =========================================================================

    /// `data Name { Type field; ... }`
    pub(crate) fn parse_data(&mut self) -> Result<DataDef, ParseError> {
        self.expect(TokenKind::Data, "Expected 'data'")?;
        if self.check(TokenKind::Identifier) && !starts_uppercase(&self.peek().value) {
            return Err(self.error(format!(
                "Data type name '{}' must start with an uppercase letter",
                self.peek().value
            )));
        }
        let name = self.expect(TokenKind::Identifier, "Expected data name")?.value;
        self.expect(TokenKind::LBrace, "Expected '{'")?;

        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if !self.is_type_token() {
                return Err(self.error("Expected type in data field"));
            }
            let ty = self.peek().value.clone();
            self.advance();
            let name = self.expect_identifier("Expected field name")?;
            self.expect(TokenKind::Semicolon, "Expected ';'")?;
            fields.push(DataField { ty, name });
        }
        self.expect(TokenKind::RBrace, "Expected '}'")?;

        Ok(DataDef {
            name,
            fields,
            is_public: false,
            module: String::new(),
        })
    }

    /// `enum Name { A, B }` (commas optional)
    pub(crate) fn parse_enum(&mut self) -> Result<EnumDef, ParseError> {
        self.expect(TokenKind::Enum, "Expected 'enum'")?;
        if self.check(TokenKind::Identifier) && !starts_uppercase(&self.peek().value) {
            return Err(self.error(format!(
                "Enum type name '{}' must start with an uppercase letter",
                self.peek().value
            )));
        }
        let name = self.expect(TokenKind::Identifier, "Expected enum name")?.value;
        self.expect(TokenKind::LBrace, "Expected '{'")?;

        let mut values = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            values.push(self.expect(TokenKind::Identifier, "Expected enum value name")?.value);
            self.eat(TokenKind::Comma);
        }
        self.expect(TokenKind::RBrace, "Expected '}'")?;

        Ok(EnumDef {
            name,
            values,
            is_public: false,
            is_shared: false,
            owner: None,
            module: String::new(),
        })
    }

    /// `router { "/path" => Comp[(args)], ... }`
    fn parse_router(&mut self) -> Result<RouterDef, ParseError> {
        let start = self.expect(TokenKind::Router, "Expected 'router'")?;
        self.expect(TokenKind::LBrace, "Expected '{'")?;

        let mut routes = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let line = self.peek().span.line;
            let path = self
                .expect(TokenKind::StringLiteral, "Expected route path string")?
                .value;
            self.expect(TokenKind::Arrow, "Expected '=>' after route path")?;
            let component = self
                .expect(TokenKind::Identifier, "Expected component name after '=>'")?
                .value;

            let args = if self.eat(TokenKind::LParen) {
                let args = self.parse_call_args(TokenKind::RParen)?;
                self.expect(TokenKind::RParen, "Expected ')' after component arguments")?;
                args
            } else {
                Vec::new()
            };

            routes.push(Route {
                path,
                component,
                args,
                line,
            });
            self.eat(TokenKind::Comma);
        }
        self.expect(TokenKind::RBrace, "Expected '}'")?;

        if routes.is_empty() {
            return Err(ParseError {
                message: "Router block must have at least one route".to_string(),
                line: start.span.line,
                column: start.span.column,
            });
        }

        Ok(RouterDef {
            routes,
            line: start.span.line,
        })
    }

    // =========================================================================
    // Styles
    // =========================================================================

    /// Rebuild the CSS text of a `{ ... }` block from its tokens. Adjacent
    /// tokens are joined directly; any source gap becomes one space.
    fn parse_style_block(&mut self) -> Result<String, ParseError> {
        self.expect(TokenKind::LBrace, "Expected '{'")?;

        let mut css = String::new();
        let mut depth = 1usize;
        let mut prev = None;

        loop {
            if self.is_at_end() {
                return Err(self.error("Unterminated style block"));
            }
            let token = self.peek().clone();
            match token.kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                }
                _ => {}
            }

            if prev.as_ref().is_some_and(|p| is_separated(p, &token)) {
                css.push(' ');
            }
            if token.kind == TokenKind::StringLiteral {
                css.push('"');
                css.push_str(&token.value);
                css.push('"');
            } else {
                css.push_str(&token.value);
            }

            prev = Some(token);
            self.advance();
        }

        Ok(css)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expression, Program, ViewNode};
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Program {
        Parser::parse(source).unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        Parser::parse(source).unwrap_err()
    }

    fn component(source: &str) -> Component {
        parse(source).components.remove(0)
    }

    // =========================================================================
    // Header and parameters
    // =========================================================================

    #[test]
    fn test_component_name_must_be_uppercase() {
        let err = parse_err("component counter { }");
        assert_eq!(
            err.message,
            "Component name 'counter' must start with an uppercase letter"
        );
    }

    #[test]
    fn test_component_params() {
        let comp = component(
            "component Counter(pub mut int& value = 0, string[] labels, def onChange(int, string[]) : void) { }",
        );
        assert_eq!(comp.params.len(), 3);

        let value = &comp.params[0];
        assert_eq!(value.name, "value");
        assert!(value.is_public && value.is_mutable && value.is_reference);
        assert_eq!(value.default, Some(Expression::Int(0)));

        assert_eq!(comp.params[1].ty, TypeRef::array_of("string"));

        let callback = comp.params[2].callback.as_ref().unwrap();
        assert_eq!(callback.params, vec!["int", "string[]"]);
        assert_eq!(callback.return_type, "void");
    }

    #[test]
    fn test_callback_without_params() {
        let comp = component("component B(def onclick : void) { }");
        let callback = comp.params[0].callback.as_ref().unwrap();
        assert!(callback.params.is_empty());
    }

    // =========================================================================
    // State
    // =========================================================================

    #[test]
    fn test_state_declarations() {
        let comp = component(
            r#"
            component App {
                mut int count = 0;
                pub string title = "x";
                shared int total;
                float[4] weights;
                App.Mode mode;
            }
            "#,
        );
        assert_eq!(comp.state.len(), 5);
        assert!(comp.state[0].is_mutable);
        assert!(comp.state[1].is_public);
        assert!(comp.state[2].is_shared);
        assert_eq!(comp.state[3].ty.array, ArrayKind::Fixed(4));
        assert_eq!(comp.state[4].ty.name, "App.Mode");
        assert!(comp.component_members.is_empty());
    }

    #[test]
    fn test_component_members_are_tracked() {
        let comp = component(
            "component App { mut Counter counter; Row[] rows; int[] ids; }",
        );
        assert_eq!(comp.component_members.get("counter").map(String::as_str), Some("Counter"));
        assert_eq!(comp.component_arrays.get("rows").map(String::as_str), Some("Row"));
        assert!(!comp.component_arrays.contains_key("ids"));
    }

    #[test]
    fn test_members_reset_between_components() {
        let program = parse("component A { Counter c; } component B { }");
        assert!(program.components[1].component_members.is_empty());
    }

    #[test]
    fn test_reference_member_requires_initializer() {
        let err = parse_err("component A { int& x; }");
        assert_eq!(
            err.message,
            "Reference variable 'x' must be initialized immediately."
        );
    }

    #[test]
    fn test_mut_requires_declaration() {
        let err = parse_err("component A { mut view { } }");
        assert_eq!(err.message, "Expected variable declaration after 'mut'");
    }

    #[test]
    fn test_unexpected_body_token() {
        let err = parse_err("component A { 42 }");
        assert_eq!(err.message, "Unexpected '42' in component body");
    }

    // =========================================================================
    // Methods and hooks
    // =========================================================================

    #[test]
    fn test_methods_and_hooks() {
        let comp = component(
            r#"
            component App {
                mut int n = 0;
                pub def add(int by, mut Row[] rows, Row& row) : int { n += by; return n; }
                init { n = 1; }
                mount { }
                tick(float dt) { n++; }
            }
            "#,
        );
        let add = comp.method("add").unwrap();
        assert!(add.is_public);
        assert_eq!(add.return_type, "int");
        assert_eq!(add.params.len(), 3);
        assert!(add.params[1].is_mutable);
        assert_eq!(add.params[1].ty, TypeRef::array_of("Row"));
        assert!(add.params[2].is_reference);
        assert_eq!(add.body.len(), 2);

        assert_eq!(comp.method("init").unwrap().body.len(), 1);
        assert!(comp.method("mount").unwrap().is_lifecycle_hook());
        let tick = comp.method("tick").unwrap();
        assert_eq!(tick.params[0].name, "dt");
        assert_eq!(tick.return_type, "void");
        assert!(comp.has_tick());
    }

    #[test]
    fn test_tick_without_params() {
        let comp = component("component A { tick { } }");
        assert!(comp.method("tick").unwrap().params.is_empty());
    }

    #[test]
    fn test_method_name_must_be_lowercase() {
        let err = parse_err("component A { def Run() : void { } }");
        assert_eq!(err.message, "Method name 'Run' must start with a lowercase letter");
    }

    #[test]
    fn test_missing_return_type() {
        let err = parse_err("component A { def run() { } }");
        assert_eq!(
            err.message,
            "Missing return type for function 'run'. Expected ':' followed by return type"
        );
    }

    // =========================================================================
    // Data, enums and routers
    // =========================================================================

    #[test]
    fn test_nested_data_and_shared_enum() {
        let comp = component(
            r#"
            component App {
                data Point { int x; float y; User owner; }
                shared enum Mode { Idle Running }
                enum Local { A, B, }
            }
            "#,
        );
        assert_eq!(comp.data[0].fields.len(), 3);
        assert_eq!(comp.data[0].fields[2].ty, "User");
        assert_eq!(comp.enums[0].values, vec!["Idle", "Running"]);
        assert!(comp.enums[0].is_shared);
        assert_eq!(comp.enums[0].owner.as_deref(), Some("App"));
        assert_eq!(comp.enums[1].owner, None);
    }

    #[test]
    fn test_data_name_must_be_uppercase() {
        let err = parse_err("data point { int x; }");
        assert_eq!(
            err.message,
            "Data type name 'point' must start with an uppercase letter"
        );
    }

    #[test]
    fn test_enum_name_must_be_uppercase() {
        let err = parse_err("enum mode { A }");
        assert!(err.message.starts_with("Enum type name 'mode'"));
    }

    #[test]
    fn test_router() {
        let comp = component(
            r#"
            component App {
                router {
                    "/" => Home,
                    "/user" => Profile(id = 3, &session)
                }
            }
            "#,
        );
        let router = comp.router.unwrap();
        assert_eq!(router.routes.len(), 2);
        assert_eq!(router.routes[0].path, "/");
        assert_eq!(router.routes[1].component, "Profile");
        assert_eq!(router.routes[1].args.len(), 2);
        assert!(router.routes[1].args[1].is_reference);
        assert_eq!(router.routes[1].line, 5);
    }

    #[test]
    fn test_empty_router() {
        let err = parse_err("component App {\n router { }\n}");
        assert_eq!(err.message, "Router block must have at least one route");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_second_router_rejected() {
        let err = parse_err(r#"component App { router { "/" => A } router { "/" => B } }"#);
        assert_eq!(err.message, "Component 'App' already has a router block");
    }

    // =========================================================================
    // Styles and view
    // =========================================================================

    #[test]
    fn test_style_blocks() {
        let comp = component(
            r#"
            component App {
                style {
                    .btn, .btn:hover { color: #fff; margin: 0 4px; }
                }
                style global {
                    body { font-family: "Inter", sans-serif; }
                }
            }
            "#,
        );
        assert_eq!(
            comp.css,
            ".btn, .btn:hover { color: #fff; margin: 0 4px; }\n"
        );
        assert_eq!(
            comp.global_css,
            "body { font-family: \"Inter\", sans-serif; }\n"
        );
    }

    #[test]
    fn test_style_block_nested_braces() {
        let comp = component(
            "component A { style { @media (min-width: 600px) { .a { top: 1.5em; } } } }",
        );
        assert_eq!(
            comp.css,
            "@media (min-width: 600px) { .a { top: 1.5em; } }\n"
        );
    }

    #[test]
    fn test_unterminated_style_block() {
        let err = parse_err("component A { style { .a { color: red; }");
        assert_eq!(err.message, "Unterminated style block");
    }

    #[test]
    fn test_view_roots() {
        let comp = component("component A { view { <div></div> <p>hi</p> } }");
        assert_eq!(comp.view.len(), 2);
        assert!(matches!(comp.view[1], ViewNode::Element(ref el) if el.tag == "p"));
    }
}
