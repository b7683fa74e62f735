//! Feature analysis.
//!
//! One read-only pass over every component decides which host features the
//! program uses. The resulting [`FeatureFlags`] gate the emitted dispatcher
//! tables, event-loop arms and init calls.

use std::collections::BTreeSet;

use coi_parser::ast::{
    CallArg, Element, Expression, MatchArm, Program, Statement, ViewNode,
};

/// Host features used by a program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub click: bool,
    pub input: bool,
    pub change: bool,
    pub keydown: bool,
    pub keyboard: bool,
    pub router: bool,
    pub websocket: bool,
    pub fetch: bool,
    pub json: bool,
}

impl FeatureFlags {
    /// True when the `Dispatcher` template must be emitted.
    pub fn needs_dispatcher(&self) -> bool {
        self.click || self.input || self.change || self.keydown || self.websocket || self.fetch
    }
}

/// Free-function form of [`FeatureFlags::needs_dispatcher`].
pub fn needs_dispatcher(flags: &FeatureFlags) -> bool {
    flags.needs_dispatcher()
}

/// Detect the features a program uses. `headers` are the capability
/// headers supplied from outside (`websocket`, `fetch`).
pub fn detect_features(program: &Program, headers: &BTreeSet<String>) -> FeatureFlags {
    let mut flags = FeatureFlags {
        websocket: headers.contains("websocket"),
        fetch: headers.contains("fetch"),
        router: program.components.iter().any(|c| c.router.is_some()),
        ..FeatureFlags::default()
    };

    // Element events are collected apart so both view visitors can borrow.
    let mut events = FeatureFlags::default();
    for comp in &program.components {
        for method in &comp.methods {
            for stmt in &method.body {
                walk_stmt(stmt, &mut |expr| scan_expr(expr, &mut flags));
            }
        }
        for decl in &comp.state {
            if let Some(init) = &decl.initializer {
                walk_expr(init, &mut |expr| scan_expr(expr, &mut flags));
            }
        }
        for node in &comp.view {
            walk_view(
                node,
                &mut |el| scan_element(el, &mut events),
                &mut |expr| scan_expr(expr, &mut flags),
            );
        }
    }

    flags.click |= events.click;
    flags.input |= events.input;
    flags.change |= events.change;
    flags.keydown |= events.keydown;
    flags
}

/// Host headers the emitted program includes: `dom` and `system` always,
/// the rest by usage, plus any user-supplied headers.
pub fn required_headers(program: &Program, user_headers: &BTreeSet<String>) -> BTreeSet<String> {
    let mut headers: BTreeSet<String> = ["dom", "system"].iter().map(|h| h.to_string()).collect();
    headers.extend(user_headers.iter().cloned());

    let mut visit = |expr: &Expression| {
        if let Expression::Call { name, .. } = expr {
            if name.starts_with("WebSocket.") {
                headers.insert("websocket".to_string());
            } else if name.starts_with("FetchRequest.") {
                headers.insert("fetch".to_string());
            } else if name == "Json.parse" {
                headers.insert("json".to_string());
            } else if name.starts_with("Input.") {
                headers.insert("input".to_string());
            }
        }
        if is_key_query(expr) {
            headers.insert("input".to_string());
        }
    };

    for comp in &program.components {
        for method in &comp.methods {
            for stmt in &method.body {
                walk_stmt(stmt, &mut visit);
            }
        }
        for decl in &comp.state {
            if let Some(init) = &decl.initializer {
                walk_expr(init, &mut visit);
            }
        }
        for node in &comp.view {
            walk_view(node, &mut |_| {}, &mut visit);
        }
    }

    headers
}

fn scan_element(el: &Element, flags: &mut FeatureFlags) {
    for attr in &el.attributes {
        match attr.name.as_str() {
            "onclick" => flags.click = true,
            "oninput" => flags.input = true,
            "onchange" => flags.change = true,
            "onkeydown" => flags.keydown = true,
            _ => {}
        }
    }
}

fn scan_expr(expr: &Expression, flags: &mut FeatureFlags) {
    if is_key_query(expr) {
        flags.keyboard = true;
    }
    if let Expression::Call { name, .. } = expr {
        if name == "Json.parse" {
            flags.json = true;
        }
    }
}

/// `Input.isKeyDown(..)` as a call, or `Input.isKeyDown` as a member access.
fn is_key_query(expr: &Expression) -> bool {
    match expr {
        Expression::Call { name, .. } => name.contains("Input.isKeyDown"),
        Expression::Member { object, member } => {
            member == "isKeyDown" && object.as_ident() == Some("Input")
        }
        _ => false,
    }
}

// =========================================================================
// Traversal
// =========================================================================

/// Visit every expression reachable from a statement, outermost first.
pub fn walk_stmt(stmt: &Statement, visit: &mut dyn FnMut(&Expression)) {
    match stmt {
        Statement::Block(stmts) => {
            for s in stmts {
                walk_stmt(s, visit);
            }
        }
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            walk_expr(condition, visit);
            walk_stmt(then_branch, visit);
            if let Some(else_branch) = else_branch {
                walk_stmt(else_branch, visit);
            }
        }
        Statement::ForRange {
            start, end, body, ..
        } => {
            walk_expr(start, visit);
            walk_expr(end, visit);
            walk_stmt(body, visit);
        }
        Statement::ForEach { iterable, body, .. } => {
            walk_expr(iterable, visit);
            walk_stmt(body, visit);
        }
        Statement::Return(value) => {
            if let Some(value) = value {
                walk_expr(value, visit);
            }
        }
        Statement::VarDecl(decl) => {
            if let Some(init) = &decl.initializer {
                walk_expr(init, visit);
            }
        }
        Statement::Assign { value, .. } => walk_expr(value, visit),
        Statement::MemberAssign { object, value, .. } => {
            walk_expr(object, visit);
            walk_expr(value, visit);
        }
        Statement::IndexAssign {
            array,
            index,
            value,
            ..
        } => {
            walk_expr(array, visit);
            walk_expr(index, visit);
            walk_expr(value, visit);
        }
        Statement::Expr(expr) => walk_expr(expr, visit),
    }
}

/// Visit an expression and all of its sub-expressions, outermost first.
pub fn walk_expr(expr: &Expression, visit: &mut dyn FnMut(&Expression)) {
    visit(expr);
    match expr {
        Expression::Int(_)
        | Expression::Float(_)
        | Expression::Str { .. }
        | Expression::Bool(_)
        | Expression::Ident(_)
        | Expression::EnumAccess { .. }
        | Expression::TypeLiteral(_) => {}
        Expression::Member { object, .. } => walk_expr(object, visit),
        Expression::Index { array, index } => {
            walk_expr(array, visit);
            walk_expr(index, visit);
        }
        Expression::Call { args, .. }
        | Expression::Construct { args, .. }
        | Expression::Aggregate { args, .. } => walk_args(args, visit),
        Expression::Unary { operand, .. } | Expression::Postfix { operand, .. } => {
            walk_expr(operand, visit)
        }
        Expression::Binary { left, right, .. } => {
            walk_expr(left, visit);
            walk_expr(right, visit);
        }
        Expression::Ternary {
            condition,
            then_expr,
            else_expr,
        } => {
            walk_expr(condition, visit);
            walk_expr(then_expr, visit);
            walk_expr(else_expr, visit);
        }
        Expression::Array(items) => {
            for item in items {
                walk_expr(item, visit);
            }
        }
        Expression::ArrayRepeat { value, count } => {
            walk_expr(value, visit);
            walk_expr(count, visit);
        }
        Expression::Reference(inner) | Expression::Move(inner) => walk_expr(inner, visit),
        Expression::Match { subject, arms } => {
            walk_expr(subject, visit);
            walk_arms(arms, visit);
        }
        Expression::Block(stmts) => {
            for s in stmts {
                walk_stmt(s, visit);
            }
        }
    }
}

fn walk_args(args: &[CallArg], visit: &mut dyn FnMut(&Expression)) {
    for arg in args {
        walk_expr(&arg.value, visit);
    }
}

fn walk_arms(arms: &[MatchArm], visit: &mut dyn FnMut(&Expression)) {
    for arm in arms {
        walk_expr(&arm.body, visit);
    }
}

/// Visit every element and every expression in a view tree.
pub fn walk_view(
    node: &ViewNode,
    on_element: &mut dyn FnMut(&Element),
    on_expr: &mut dyn FnMut(&Expression),
) {
    match node {
        ViewNode::Element(el) => {
            on_element(el);
            for attr in &el.attributes {
                walk_expr(&attr.value, on_expr);
            }
            for child in &el.children {
                walk_view(child, on_element, on_expr);
            }
        }
        ViewNode::If {
            condition,
            then_children,
            else_children,
        } => {
            walk_expr(condition, on_expr);
            for child in then_children.iter().chain(else_children) {
                walk_view(child, on_element, on_expr);
            }
        }
        ViewNode::ForRange {
            start,
            end,
            children,
            ..
        } => {
            walk_expr(start, on_expr);
            walk_expr(end, on_expr);
            for child in children {
                walk_view(child, on_element, on_expr);
            }
        }
        ViewNode::ForEach {
            iterable,
            key,
            children,
            ..
        } => {
            walk_expr(iterable, on_expr);
            walk_expr(key, on_expr);
            for child in children {
                walk_view(child, on_element, on_expr);
            }
        }
        ViewNode::Interpolation(expr) => walk_expr(expr, on_expr),
        ViewNode::Component(instance) => {
            for prop in &instance.props {
                walk_expr(&prop.value, on_expr);
            }
        }
        ViewNode::Text(_) | ViewNode::RoutePlaceholder => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coi_parser::Parser;
    use pretty_assertions::assert_eq;

    fn detect(source: &str) -> FeatureFlags {
        let program = Parser::parse(source).unwrap();
        detect_features(&program, &BTreeSet::new())
    }

    // =====================================================================
    // DOM events
    // =====================================================================

    #[test]
    fn test_onclick_sets_click() {
        let flags = detect(
            "component App { def h() : void { } view { <button onclick={h}/> } }",
        );
        assert_eq!(
            flags,
            FeatureFlags {
                click: true,
                ..FeatureFlags::default()
            }
        );
        assert!(flags.needs_dispatcher());
    }

    #[test]
    fn test_nested_event_attributes() {
        let flags = detect(
            r#"component App {
                mut bool open = false;
                def set(string v) : void { }
                view {
                    <div>
                        <if open>
                            <input oninput={set}/>
                        <else>
                            <select onchange={set}></select>
                        </else>
                        </if>
                        <for i in 0:3>
                            <input onkeydown={set}/>
                        </for>
                    </div>
                }
            }"#,
        );
        assert!(flags.input);
        assert!(flags.change);
        assert!(flags.keydown);
        assert!(!flags.click);
    }

    #[test]
    fn test_plain_attributes_are_not_events() {
        let flags = detect(r#"component App { view { <a href="/x" class="onclick">x</a> } }"#);
        assert_eq!(flags, FeatureFlags::default());
        assert!(!needs_dispatcher(&flags));
    }

    // =====================================================================
    // Calls
    // =====================================================================

    #[test]
    fn test_key_query_sets_keyboard() {
        let flags = detect(
            "component App { mut int x = 0; tick { if (Input.isKeyDown(32)) { x += 1; } } }",
        );
        assert!(flags.keyboard);
        assert!(!flags.needs_dispatcher());
    }

    #[test]
    fn test_json_parse_sets_json() {
        let flags = detect(
            "component App { def load(string s) : void { User u = Json.parse(User, s); } }",
        );
        assert!(flags.json);
        assert!(!flags.keyboard);
    }

    #[test]
    fn test_detection_descends_into_nested_expressions() {
        let flags = detect(
            r#"component App {
                mut int x = 0;
                def f() : int {
                    return x > 0 ? (Input.isKeyDown(1) ? 1 : 0) : 0;
                }
                def g(string s) : void {
                    for i in 0:3 { x = -total(Json.parse(User, s)); }
                }
            }"#,
        );
        assert!(flags.keyboard);
        assert!(flags.json);
    }

    #[test]
    fn test_detection_descends_into_match_blocks() {
        let flags = detect(
            r#"component App {
                mut Mode m = Mode::Idle;
                def f() : void {
                    match m {
                        Mode::Idle => { bool k = Input.isKeyDown(5); },
                        else => 0
                    };
                }
            }"#,
        );
        assert!(flags.keyboard);
    }

    #[test]
    fn test_no_false_positives_for_similar_names() {
        let flags = detect(
            r#"component App {
                def f() : void { isKeyDown(1); Keys.isKeyDown(2); parse(3); Json.stringify(4); }
            }"#,
        );
        assert_eq!(flags, FeatureFlags::default());
    }

    // =====================================================================
    // Program-level features
    // =====================================================================

    #[test]
    fn test_router_and_headers() {
        let program = Parser::parse(
            r#"component Home { view { <p>home</p> } }
            component App { router { "/" => Home } view { <route /> } }"#,
        )
        .unwrap();
        let headers: BTreeSet<String> = ["websocket".to_string()].into_iter().collect();
        let flags = detect_features(&program, &headers);
        assert!(flags.router);
        assert!(flags.websocket);
        assert!(!flags.fetch);
        assert!(flags.needs_dispatcher());
    }

    #[test]
    fn test_required_headers_from_usage() {
        let program = Parser::parse(
            r#"component App {
                mut WebSocket ws;
                def go() : void {
                    ws = WebSocket.connect("ws://x");
                    FetchRequest.get("/api");
                    if (Input.isKeyDown(1)) { }
                }
            }"#,
        )
        .unwrap();
        let user: BTreeSet<String> = ["storage".to_string()].into_iter().collect();
        let headers: Vec<String> = required_headers(&program, &user).into_iter().collect();
        assert_eq!(
            headers,
            vec!["dom", "fetch", "input", "storage", "system", "websocket"]
        );
    }

    #[test]
    fn test_required_headers_minimum() {
        let program = Parser::parse("component App { view { <p>hi</p> } }").unwrap();
        let headers: Vec<String> = required_headers(&program, &BTreeSet::new())
            .into_iter()
            .collect();
        assert_eq!(headers, vec!["dom", "system"]);
    }
}
