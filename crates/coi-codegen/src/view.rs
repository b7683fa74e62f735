//! View lowering.
//!
//! A component's view tree becomes the body of its `_render()` method:
//! straight-line DOM construction under the component's root element, with
//! `if`/`for` nodes lowered to host control flow. Event attributes register
//! callbacks on the global dispatchers and remember the element so the
//! registration can be released before the next render.

use coi_parser::ast::{
    Attribute, ComponentInstance, Element, Expression, Prop, ViewNode,
};

use crate::features::FeatureFlags;
use crate::lower::{escape_string, lower_expr, LowerCtx};

/// Storage for a child component instantiated inline in a view.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildSlot {
    /// `Counter _child_0;`
    Single { field: String, component: String },
    /// `webcc::vector<Counter*> _pool_0;` for instances inside loops, with
    /// `int _pool_0_used` counting the ones mounted by the last render.
    Pool { field: String, component: String },
}

impl ChildSlot {
    pub fn field(&self) -> &str {
        match self {
            ChildSlot::Single { field, .. } | ChildSlot::Pool { field, .. } => field,
        }
    }
}

/// Lowered view of one component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewOutput {
    /// Statements of `_render()`, indented for a method body.
    pub render: String,
    pub slots: Vec<ChildSlot>,
    pub has_route: bool,
}

/// Lower the view of `ctx.component`.
pub fn lower_view(ctx: &LowerCtx, flags: &FeatureFlags) -> ViewOutput {
    let Some(comp) = ctx.component else {
        return ViewOutput::default();
    };

    let mut lowering = ViewLowering {
        ctx,
        flags,
        scope: (!comp.css.is_empty()).then(|| comp.qualified_name()),
        next_el: 0,
        loop_vars: Vec::new(),
        out: ViewOutput::default(),
    };

    for node in &comp.view {
        lowering.node(node, "_root", 2);
    }
    lowering.out
}

struct ViewLowering<'a, 'b> {
    ctx: &'b LowerCtx<'a>,
    flags: &'b FeatureFlags,
    scope: Option<String>,
    next_el: usize,
    /// Loop variables in scope: (name, captured by reference).
    loop_vars: Vec<(String, bool)>,
    out: ViewOutput,
}

impl ViewLowering<'_, '_> {
    fn line(&mut self, depth: usize, text: &str) {
        self.out.render.push_str(&"    ".repeat(depth));
        self.out.render.push_str(text);
        self.out.render.push('\n');
    }

    fn expr(&self, expr: &Expression) -> String {
        lower_expr(expr, self.ctx)
    }

    fn node(&mut self, node: &ViewNode, parent: &str, depth: usize) {
        match node {
            ViewNode::Element(el) => self.element(el, parent, depth),
            ViewNode::If {
                condition,
                then_children,
                else_children,
            } => {
                let cond = self.expr(condition);
                self.line(depth, &format!("if ({cond}) {{"));
                for child in then_children {
                    self.node(child, parent, depth + 1);
                }
                if !else_children.is_empty() {
                    self.line(depth, "} else {");
                    for child in else_children {
                        self.node(child, parent, depth + 1);
                    }
                }
                self.line(depth, "}");
            }
            ViewNode::ForRange {
                var,
                start,
                end,
                children,
            } => {
                let (start, end) = (self.expr(start), self.expr(end));
                self.line(
                    depth,
                    &format!("for (int32_t {var} = {start}; {var} < {end}; {var}++) {{"),
                );
                self.loop_vars.push((var.clone(), false));
                for child in children {
                    self.node(child, parent, depth + 1);
                }
                self.loop_vars.pop();
                self.line(depth, "}");
            }
            ViewNode::ForEach {
                var,
                iterable,
                children,
                ..
            } => {
                let iterable = self.expr(iterable);
                self.line(depth, &format!("for (auto& {var} : {iterable}) {{"));
                self.loop_vars.push((var.clone(), true));
                for child in children {
                    self.node(child, parent, depth + 1);
                }
                self.loop_vars.pop();
                self.line(depth, "}");
            }
            ViewNode::Text(text) => {
                if !text.trim().is_empty() {
                    let value = format!("\"{}\"", escape_string(text));
                    self.text_span(&value, parent, depth);
                }
            }
            ViewNode::Interpolation(expr) => {
                let value = format!("webcc::string::concat({})", self.expr(expr));
                self.text_span(&value, parent, depth);
            }
            ViewNode::Component(instance) => self.component(instance, parent, depth),
            ViewNode::RoutePlaceholder => {
                self.out.has_route = true;
                self.line(depth, "_route_anchor = webcc::dom::create_element(\"coi-route\");");
                self.line(
                    depth,
                    "webcc::dom::set_attribute(_route_anchor, \"style\", \"display: contents\");",
                );
                self.line(
                    depth,
                    &format!("webcc::dom::append_child({parent}, _route_anchor);"),
                );
                self.line(depth, "_sync_route();");
            }
        }
    }

    fn new_element(&mut self, tag: &str, depth: usize) -> String {
        let var = format!("_el_{}", self.next_el);
        self.next_el += 1;
        self.line(
            depth,
            &format!("webcc::handle {var} = webcc::dom::create_element(\"{tag}\");"),
        );
        if let Some(scope) = &self.scope {
            let scope = scope.clone();
            self.line(
                depth,
                &format!("webcc::dom::set_attribute({var}, \"coi-scope\", \"{scope}\");"),
            );
        }
        var
    }

    /// Text mixed with elements is wrapped in a `<span>`.
    fn text_span(&mut self, value: &str, parent: &str, depth: usize) {
        let var = self.new_element("span", depth);
        self.line(depth, &format!("webcc::dom::set_inner_text({var}, {value});"));
        self.line(depth, &format!("webcc::dom::append_child({parent}, {var});"));
    }

    fn element(&mut self, el: &Element, parent: &str, depth: usize) {
        let var = self.new_element(&el.tag, depth);

        let mut has_events = false;
        for attr in &el.attributes {
            has_events |= self.attribute(attr, &var, depth);
        }
        if has_events {
            self.line(depth, &format!("_handles.push_back({var});"));
        }
        if let Some(binding) = &el.ref_binding {
            self.line(depth, &format!("{binding} = {var};"));
        }
        self.line(depth, &format!("webcc::dom::append_child({parent}, {var});"));

        let text_only = !el.children.is_empty()
            && el
                .children
                .iter()
                .all(|c| matches!(c, ViewNode::Text(_) | ViewNode::Interpolation(_)));

        if text_only {
            let text = self.inner_text(&el.children);
            self.line(depth, &format!("webcc::dom::set_inner_text({var}, {text});"));
        } else {
            for child in &el.children {
                self.node(child, &var, depth);
            }
        }
    }

    fn inner_text(&self, children: &[ViewNode]) -> String {
        let parts: Vec<String> = children
            .iter()
            .filter_map(|child| match child {
                ViewNode::Text(text) => Some(format!("\"{}\"", escape_string(text))),
                ViewNode::Interpolation(expr) => Some(self.expr(expr)),
                _ => None,
            })
            .collect();
        match (children, parts.as_slice()) {
            ([ViewNode::Text(_)], [single]) => single.clone(),
            _ => format!("webcc::string::concat({})", parts.join(", ")),
        }
    }

    /// Emit one attribute. Returns true when it registered an event.
    fn attribute(&mut self, attr: &Attribute, var: &str, depth: usize) -> bool {
        let event = match attr.name.as_str() {
            "onclick" if self.flags.click => Some(("g_dispatcher", "")),
            "oninput" if self.flags.input => {
                Some(("g_input_dispatcher", "const webcc::string& _v"))
            }
            "onchange" if self.flags.change => {
                Some(("g_change_dispatcher", "const webcc::string& _v"))
            }
            "onkeydown" if self.flags.keydown => Some(("g_keydown_dispatcher", "int _v")),
            _ => None,
        };

        if let Some((dispatcher, param)) = event {
            let body = self.handler_body(&attr.value, !param.is_empty());
            let captures = self.captures();
            self.line(
                depth,
                &format!("{dispatcher}.set({var}, [{captures}]({param}) {{ {body}; }});"),
            );
            return true;
        }

        let value = match &attr.value {
            Expression::Bool(true) => "\"\"".to_string(),
            Expression::Str { .. } => self.expr(&attr.value),
            other => format!("webcc::string::concat({})", self.expr(other)),
        };
        self.line(
            depth,
            &format!("webcc::dom::set_attribute({var}, \"{}\", {value});", attr.name),
        );
        false
    }

    /// A method name is called (with the event value when it takes one);
    /// any other expression is evaluated as the handler.
    fn handler_body(&self, value: &Expression, has_value: bool) -> String {
        if let Some(name) = value.as_ident() {
            if let Some(params) = self.ctx.method_params(name) {
                let arg = if has_value && params > 0 { "_v" } else { "" };
                return format!("this->{name}({arg})");
            }
        }
        self.expr(value)
    }

    fn captures(&self) -> String {
        let mut captures = vec!["this".to_string()];
        for (name, by_ref) in &self.loop_vars {
            captures.push(if *by_ref {
                format!("&{name}")
            } else {
                name.clone()
            });
        }
        captures.join(", ")
    }

    fn component(&mut self, instance: &ComponentInstance, parent: &str, depth: usize) {
        let target = match &instance.member {
            Some(member) => member.clone(),
            None => {
                let index = self.out.slots.len();
                let component = self
                    .ctx
                    .program
                    .component(&instance.component)
                    .map_or_else(|| instance.component.clone(), |c| c.qualified_name());

                if self.loop_vars.is_empty() {
                    let field = format!("_child_{index}");
                    self.out.slots.push(ChildSlot::Single {
                        field: field.clone(),
                        component,
                    });
                    field
                } else {
                    let field = format!("_pool_{index}");
                    self.line(
                        depth,
                        &format!(
                            "if ({field}_used >= static_cast<int>({field}.size())) {field}.push_back(new {component}());"
                        ),
                    );
                    self.line(
                        depth,
                        &format!("{component}& {field}_item = *{field}[{field}_used++];"),
                    );
                    self.out.slots.push(ChildSlot::Pool {
                        field: field.clone(),
                        component,
                    });
                    format!("{field}_item")
                }
            }
        };

        let mut notifies_ref = false;
        for prop in &instance.props {
            let line = self.prop(instance, prop, &target);
            self.line(depth, &line);
            notifies_ref |= prop.is_reference && !self.is_callback_param(instance, &prop.name);
        }
        if notifies_ref {
            self.line(
                depth,
                &format!("{target}._on_ref_change = [this]() {{ this->_dirty = true; }};"),
            );
        }
        self.line(depth, &format!("{target}.view({parent});"));
    }

    fn is_callback_param(&self, instance: &ComponentInstance, name: &str) -> bool {
        self.ctx
            .program
            .component(&instance.component)
            .and_then(|comp| comp.params.iter().find(|p| p.name == name))
            .is_some_and(|param| param.callback.is_some())
    }

    fn prop(&self, instance: &ComponentInstance, prop: &Prop, target: &str) -> String {
        let name = &prop.name;
        if self.is_callback_param(instance, name) {
            let value = match prop.value.as_ident() {
                Some(method) if self.ctx.method_params(method).is_some() => {
                    format!("[this](auto... _a) {{ return this->{method}(_a...); }}")
                }
                _ => self.expr(&prop.value),
            };
            return format!("{target}.{name} = {value};");
        }
        let value = self.expr(&prop.value);
        if prop.is_reference {
            format!("{target}.{name} = &({value});")
        } else if prop.is_move {
            format!("{target}.{name} = webcc::move({value});")
        } else {
            format!("{target}.{name} = {value};")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::detect_features;
    use coi_parser::ast::Program;
    use coi_parser::Parser;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn lower(source: &str, name: &str) -> ViewOutput {
        let program: Program = Parser::parse(source).unwrap();
        let flags = detect_features(&program, &BTreeSet::new());
        let ctx = LowerCtx::new(&program, program.component(name));
        lower_view(&ctx, &flags)
    }

    /// Strip the method-body indentation for readable expectations.
    fn dedent(render: &str) -> String {
        render
            .lines()
            .map(|line| line.strip_prefix("        ").unwrap_or(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    // =====================================================================
    // Elements
    // =====================================================================

    #[test]
    fn test_element_with_text_and_attribute() {
        let out = lower(
            r#"component App { mut int n = 0; view { <p class="big">Count: {n}</p> } }"#,
            "App",
        );
        assert_eq!(
            dedent(&out.render),
            [
                "webcc::handle _el_0 = webcc::dom::create_element(\"p\");",
                "webcc::dom::set_attribute(_el_0, \"class\", \"big\");",
                "webcc::dom::append_child(_root, _el_0);",
                "webcc::dom::set_inner_text(_el_0, webcc::string::concat(\"Count: \", n));",
            ]
            .join("\n")
        );
        assert!(out.slots.is_empty());
        assert!(!out.has_route);
    }

    #[test]
    fn test_scoped_component_tags_elements() {
        let out = lower(
            "component App { style { p { color: red; } } view { <div><p>hi</p></div> } }",
            "App",
        );
        assert_eq!(
            dedent(&out.render),
            [
                "webcc::handle _el_0 = webcc::dom::create_element(\"div\");",
                "webcc::dom::set_attribute(_el_0, \"coi-scope\", \"App\");",
                "webcc::dom::append_child(_root, _el_0);",
                "webcc::handle _el_1 = webcc::dom::create_element(\"p\");",
                "webcc::dom::set_attribute(_el_1, \"coi-scope\", \"App\");",
                "webcc::dom::append_child(_el_0, _el_1);",
                "webcc::dom::set_inner_text(_el_1, \"hi\");",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_bool_and_expression_attributes() {
        let out = lower(
            "component App { mut int w = 3; view { <input disabled width={w * 2}/> } }",
            "App",
        );
        let render = dedent(&out.render);
        assert!(render.contains("webcc::dom::set_attribute(_el_0, \"disabled\", \"\");"));
        assert!(render
            .contains("webcc::dom::set_attribute(_el_0, \"width\", webcc::string::concat((w * 2)));"));
    }

    #[test]
    fn test_ref_binding() {
        let out = lower(
            "component App { mut Canvas canvas; view { <canvas &={canvas}/> } }",
            "App",
        );
        assert!(out.render.contains("canvas = _el_0;"));
    }

    // =====================================================================
    // Events
    // =====================================================================

    #[test]
    fn test_click_handler_registers_and_tracks_element() {
        let out = lower(
            "component App { mut int n = 0; def inc() : void { n += 1; } view { <button onclick={inc}>+</button> } }",
            "App",
        );
        let render = dedent(&out.render);
        assert!(render.contains("g_dispatcher.set(_el_0, [this]() { this->inc(); });"));
        assert!(render.contains("_handles.push_back(_el_0);"));
    }

    #[test]
    fn test_input_handler_passes_value() {
        let out = lower(
            "component App { mut string s = \"\"; def set(string v) : void { s = v; } view { <input oninput={set}/> } }",
            "App",
        );
        assert!(out.render.contains(
            "g_input_dispatcher.set(_el_0, [this](const webcc::string& _v) { this->set(_v); });"
        ));
    }

    #[test]
    fn test_handler_in_loop_captures_loop_vars() {
        let out = lower(
            r#"component App {
                mut Row[] rows;
                def pick(int i) : void { }
                view {
                    <for row in rows key={row.id}>
                        <for i in 0:3>
                            <b onclick={pick(i)}>x</b>
                        </for>
                    </for>
                }
            }"#,
            "App",
        );
        let render = dedent(&out.render);
        assert!(render.contains("for (auto& row : rows) {"));
        assert!(render.contains("    for (int32_t i = 0; i < 3; i++) {"));
        assert!(render.contains("g_dispatcher.set(_el_0, [this, &row, i]() { pick(i); });"));
    }

    // =====================================================================
    // Control flow
    // =====================================================================

    #[test]
    fn test_view_if_else() {
        let out = lower(
            r#"component App { mut bool ok = true; view { <div><if ok><p>yes</p><else><p>no</p></else></if></div> } }"#,
            "App",
        );
        let render = dedent(&out.render);
        assert!(render.contains("if (ok) {\n    webcc::handle _el_1"));
        assert!(render.contains("} else {\n    webcc::handle _el_2"));
        assert!(render.contains("webcc::dom::append_child(_el_0, _el_2);"));
    }

    #[test]
    fn test_mixed_text_is_wrapped_in_spans() {
        let out = lower(
            "component App { view { <div>Hi <b>there</b></div> } }",
            "App",
        );
        let render = dedent(&out.render);
        assert!(render.contains("webcc::handle _el_1 = webcc::dom::create_element(\"span\");"));
        assert!(render.contains("webcc::dom::set_inner_text(_el_1, \"Hi \");"));
    }

    // =====================================================================
    // Components
    // =====================================================================

    #[test]
    fn test_inline_child_gets_a_slot() {
        let out = lower(
            r#"component Counter(int start = 0, def onDone : void) { }
            component App {
                mut int total = 0;
                def done() : void { }
                view { <div><Counter start={5} onDone={done}/></div> }
            }"#,
            "App",
        );
        assert_eq!(
            out.slots,
            vec![ChildSlot::Single {
                field: "_child_0".into(),
                component: "Counter".into()
            }]
        );
        let render = dedent(&out.render);
        assert!(render.contains("_child_0.start = 5;"));
        assert!(render
            .contains("_child_0.onDone = [this](auto... _a) { return this->done(_a...); };"));
        assert!(render.contains("_child_0.view(_el_0);"));
    }

    #[test]
    fn test_reference_prop_notifies_owner() {
        let out = lower(
            r#"component Counter(mut int& value) { }
            component App { mut int total = 0; view { <Counter &value={total}/> } }"#,
            "App",
        );
        let render = dedent(&out.render);
        assert!(render.contains("_child_0.value = &(total);"));
        assert!(render.contains("_child_0._on_ref_change = [this]() { this->_dirty = true; };"));
        assert!(render.contains("_child_0.view(_root);"));
    }

    #[test]
    fn test_children_in_loops_use_a_pool() {
        let out = lower(
            r#"component Item(int n = 0) { }
            component App { view { <for i in 0:3><Item n={i}/></for> } }"#,
            "App",
        );
        assert_eq!(
            out.slots,
            vec![ChildSlot::Pool {
                field: "_pool_0".into(),
                component: "Item".into()
            }]
        );
        let render = dedent(&out.render);
        assert!(render.contains(
            "if (_pool_0_used >= static_cast<int>(_pool_0.size())) _pool_0.push_back(new Item());"
        ));
        assert!(render.contains("Item& _pool_0_item = *_pool_0[_pool_0_used++];"));
        assert!(render.contains("_pool_0_item.n = i;"));
        assert_eq!(render.matches("_pool_0_used++").count(), 1);
        assert!(render.contains("_pool_0_item.view(_root);"));
    }

    #[test]
    fn test_member_mount_and_route() {
        let out = lower(
            r#"component Home { }
            component Panel { }
            component App {
                Panel side;
                router { "/" => Home }
                view { <div><side/><route/></div> }
            }"#,
            "App",
        );
        assert!(out.slots.is_empty());
        assert!(out.has_route);
        let render = dedent(&out.render);
        assert!(render.contains("side.view(_el_0);"));
        assert!(render.contains("webcc::dom::append_child(_el_0, _route_anchor);"));
        assert!(render.contains("_sync_route();"));
    }
}
