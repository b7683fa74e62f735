//! Expression and statement lowering to host C++.
//!
//! A recursive pretty-print of the statement and expression grammar. The
//! only context needed is the program (for enums, data types and component
//! parameters) and the component whose body is being lowered (for fields,
//! reference parameters and methods).

use coi_parser::ast::{
    ArrayKind, CallArg, Component, Expression, MatchArm, MatchPattern, Program, Statement,
    TypeRef,
};
use coi_parser::Parser;

/// Host handle types and the namespace their functions live in.
const HANDLE_NAMESPACES: &[(&str, &str)] = &[
    ("DOMElement", "dom"),
    ("Canvas", "canvas"),
    ("CanvasContext2D", "canvas"),
    ("WebSocket", "websocket"),
    ("FetchRequest", "fetch"),
    ("Image", "image"),
    ("Audio", "audio"),
];

/// Lowering context: the program and the component being emitted.
#[derive(Clone, Copy)]
pub struct LowerCtx<'a> {
    pub program: &'a Program,
    pub component: Option<&'a Component>,
}

impl<'a> LowerCtx<'a> {
    pub fn new(program: &'a Program, component: Option<&'a Component>) -> Self {
        Self { program, component }
    }

    fn field_type(&self, name: &str) -> Option<&'a TypeRef> {
        let comp = self.component?;
        comp.state
            .iter()
            .find(|decl| decl.name == name)
            .map(|decl| &decl.ty)
            .or_else(|| comp.params.iter().find(|p| p.name == name).map(|p| &p.ty))
    }

    /// State variable or constructor parameter of the current component.
    pub fn is_field(&self, name: &str) -> bool {
        self.field_type(name).is_some()
    }

    /// Reference parameters are stored as pointers.
    pub fn is_ref_param(&self, name: &str) -> bool {
        self.component.is_some_and(|comp| {
            comp.params
                .iter()
                .any(|p| p.name == name && p.is_reference && p.callback.is_none())
        })
    }

    pub fn method_params(&self, name: &str) -> Option<usize> {
        self.component?.method(name).map(|m| m.params.len())
    }

    /// Emitted name for a data or enum type, flattening component-local
    /// declarations to `Comp_Name`.
    fn local_type(&self, name: &str) -> Option<String> {
        let comp = self.component?;
        let local = comp.data.iter().any(|d| d.name == name)
            || comp.enums.iter().any(|e| e.name == name);
        local.then(|| format!("{}_{name}", comp.qualified_name()))
    }

    fn is_enum(&self, name: &str) -> bool {
        self.program.enums.iter().any(|e| e.name == name)
            || self
                .component
                .is_some_and(|comp| comp.enums.iter().any(|e| e.name == name))
    }

    /// `Mode` or `App.Mode` to its emitted enum name.
    fn enum_name(&self, component: Option<&str>, enum_name: &str) -> String {
        match component {
            Some(owner) => match self.program.component(owner) {
                Some(comp) => format!("{}_{enum_name}", comp.qualified_name()),
                None => format!("{owner}_{enum_name}"),
            },
            None => self
                .local_type(enum_name)
                .unwrap_or_else(|| enum_name.to_string()),
        }
    }
}

// =========================================================================
// Types
// =========================================================================

/// Convert a declared type to its host type.
pub fn cpp_type(ty: &TypeRef, ctx: &LowerCtx) -> String {
    let base = cpp_base_type(&ty.name, ctx);
    match ty.array {
        ArrayKind::None => base,
        ArrayKind::Dynamic => format!("webcc::vector<{base}>"),
        ArrayKind::Fixed(n) => format!("webcc::array<{base}, {n}>"),
    }
}

pub fn cpp_base_type(name: &str, ctx: &LowerCtx) -> String {
    match name {
        "int" => "int32_t".to_string(),
        "float" => "double".to_string(),
        "float32" => "float".to_string(),
        "bool" => "bool".to_string(),
        "string" => "webcc::string".to_string(),
        "void" => "void".to_string(),
        _ => {
            if let Some((owner, inner)) = name.split_once('.') {
                return ctx.enum_name(Some(owner), inner);
            }
            if HANDLE_NAMESPACES.iter().any(|(handle, _)| *handle == name) {
                return format!("webcc::{name}");
            }
            if let Some(local) = ctx.local_type(name) {
                return local;
            }
            ctx.program
                .component(name)
                .map_or_else(|| name.to_string(), Component::qualified_name)
        }
    }
}

// =========================================================================
// Expressions
// =========================================================================

pub fn lower_expr(expr: &Expression, ctx: &LowerCtx) -> String {
    match expr {
        Expression::Int(v) => v.to_string(),
        Expression::Float(v) => format_float(*v),
        Expression::Str {
            value,
            template: false,
        } => lower_string(value, ctx),
        Expression::Str {
            value,
            template: true,
        } => format!("\"{}\"", escape_string(value)),
        Expression::Bool(v) => v.to_string(),
        Expression::Ident(name) => lower_ident(name, ctx),
        Expression::Member { object, member } => {
            format!("{}.{member}", lower_expr(object, ctx))
        }
        Expression::Index { array, index } => {
            format!("{}[{}]", lower_expr(array, ctx), lower_expr(index, ctx))
        }
        Expression::Call { name, args, .. } => lower_call(name, args, ctx),
        Expression::Construct { component, args } => lower_construct(component, args, ctx),
        Expression::Aggregate { type_name, args } => {
            if ctx.program.component(type_name).is_some() {
                return lower_construct(type_name, args, ctx);
            }
            let fields: Vec<String> = args
                .iter()
                .map(|arg| match &arg.name {
                    Some(name) => format!(".{name} = {}", lower_arg(arg, ctx)),
                    None => lower_arg(arg, ctx),
                })
                .collect();
            format!("{}{{{}}}", cpp_base_type(type_name, ctx), fields.join(", "))
        }
        Expression::EnumAccess {
            component,
            enum_name,
            value,
        } => format!("{}::{value}", ctx.enum_name(component.as_deref(), enum_name)),
        Expression::Unary { op, operand } => {
            format!("({}{})", op.as_str(), lower_expr(operand, ctx))
        }
        Expression::Binary { left, op, right } => format!(
            "({} {} {})",
            lower_expr(left, ctx),
            op.as_str(),
            lower_expr(right, ctx)
        ),
        Expression::Ternary {
            condition,
            then_expr,
            else_expr,
        } => format!(
            "({} ? {} : {})",
            lower_expr(condition, ctx),
            lower_expr(then_expr, ctx),
            lower_expr(else_expr, ctx)
        ),
        Expression::Postfix { operand, op } => {
            format!("{}{}", lower_expr(operand, ctx), op.as_str())
        }
        Expression::Array(items) => {
            let items: Vec<String> = items.iter().map(|item| lower_expr(item, ctx)).collect();
            format!("{{{}}}", items.join(", "))
        }
        Expression::ArrayRepeat { value, count } => {
            let value = lower_expr(value, ctx);
            let count = match count.as_ref() {
                Expression::Int(n) => usize::try_from(*n).unwrap_or(0),
                _ => 0,
            };
            format!("{{{}}}", vec![value; count].join(", "))
        }
        Expression::TypeLiteral(name) => type_literal(name, ctx),
        Expression::Reference(inner) => lower_expr(inner, ctx),
        Expression::Move(inner) => format!("webcc::move({})", lower_expr(inner, ctx)),
        Expression::Match { subject, arms } => lower_match_expr(subject, arms, ctx),
        Expression::Block(stmts) => {
            format!("[&]() {{ {} }}()", inline_body(stmts, ctx))
        }
    }
}

fn lower_ident(name: &str, ctx: &LowerCtx) -> String {
    if ctx.is_ref_param(name) {
        format!("(*{name})")
    } else {
        name.to_string()
    }
}

fn type_literal(name: &str, ctx: &LowerCtx) -> String {
    match name.strip_suffix("[]") {
        Some(inner) => format!("webcc::vector<{}>", cpp_base_type(inner, ctx)),
        None => cpp_base_type(name, ctx),
    }
}

fn lower_arg(arg: &CallArg, ctx: &LowerCtx) -> String {
    let value = lower_expr(&arg.value, ctx);
    if arg.is_move {
        format!("webcc::move({value})")
    } else {
        value
    }
}

fn lower_args(args: &[CallArg], ctx: &LowerCtx) -> Vec<String> {
    args.iter().map(|arg| lower_arg(arg, ctx)).collect()
}

/// `Counter(start = 1)` builds a component value in place.
fn lower_construct(component: &str, args: &[CallArg], ctx: &LowerCtx) -> String {
    let params = ctx
        .program
        .component(component)
        .map(|comp| comp.params.as_slice())
        .unwrap_or_default();
    let ty = ctx
        .program
        .component(component)
        .map_or_else(|| component.to_string(), Component::qualified_name);

    let mut out = format!("[&]() {{ {ty} _c; ");
    for (i, arg) in args.iter().enumerate() {
        let name = match &arg.name {
            Some(name) => name.clone(),
            None => match params.get(i) {
                Some(param) => param.name.clone(),
                None => continue,
            },
        };
        out.push_str(&format!("_c.{name} = {}; ", lower_arg(arg, ctx)));
    }
    out.push_str("return _c; }()");
    out
}

// =========================================================================
// Calls
// =========================================================================

fn lower_call(name: &str, args: &[CallArg], ctx: &LowerCtx) -> String {
    let lowered = lower_args(args, ctx);
    let first = lowered.first().cloned().unwrap_or_default();

    match name {
        "Input.isKeyDown" => return format!("g_key_state[{first}]"),
        "Input.isKeyUp" => return format!("!g_key_state[{first}]"),
        "System.random" => return "webcc::random()".to_string(),
        "System.navigate" => return format!("g_app_navigate({first})"),
        "System.getRoute" => return "g_app_get_route()".to_string(),
        "System.flush" => return "webcc::flush()".to_string(),
        "Json.parse" => {
            let ty = args
                .first()
                .map(|arg| match &arg.value {
                    Expression::Ident(ty) | Expression::TypeLiteral(ty) => type_literal(ty, ctx),
                    other => lower_expr(other, ctx),
                })
                .unwrap_or_default();
            let source = lowered.get(1).cloned().unwrap_or_default();
            return format!("json::parse<{ty}>({source})");
        }
        "WebSocket.connect" => return lower_websocket_connect(args, ctx),
        "FetchRequest.get" | "FetchRequest.post" => return lower_fetch(name, args, ctx),
        _ => {}
    }

    // Named arguments of plain calls keep their source order.
    let positional = lowered;

    let Some((object, method)) = name.rsplit_once('.') else {
        return format!("{name}({})", positional.join(", "));
    };

    let root = object.split('.').next().unwrap_or(object);
    let is_type = root.chars().next().is_some_and(|c| c.is_ascii_uppercase());

    if is_type {
        if method == "size" && args.is_empty() {
            let enum_cpp = match object.split_once('.') {
                Some((owner, inner)) => Some(ctx.enum_name(Some(owner), inner)),
                None if ctx.is_enum(object) => Some(ctx.enum_name(None, object)),
                None => None,
            };
            if let Some(enum_cpp) = enum_cpp {
                return format!("static_cast<int>({enum_cpp}::_COUNT)");
            }
        }
        return format!(
            "webcc::{}::{}({})",
            object.to_ascii_lowercase(),
            snake_case(method),
            positional.join(", ")
        );
    }

    let receiver = receiver_path(object, ctx);
    if let Some(ns) = ctx
        .field_type(root)
        .filter(|ty| ty.array == ArrayKind::None && root == object)
        .and_then(|ty| handle_namespace(&ty.name))
    {
        let mut call_args = vec![receiver];
        call_args.extend(positional);
        return format!("webcc::{ns}::{}({})", snake_case(method), call_args.join(", "));
    }

    match method {
        "push" => format!("{receiver}.push_back({})", positional.join(", ")),
        "pop" => format!("{receiver}.pop_back()"),
        "size" | "length" | "count" if args.is_empty() => {
            format!("static_cast<int>({receiver}.size())")
        }
        _ => format!("{receiver}.{method}({})", positional.join(", ")),
    }
}

/// `a.b.c` with the root lowered, so reference parameters dereference.
fn receiver_path(path: &str, ctx: &LowerCtx) -> String {
    match path.split_once('.') {
        Some((root, rest)) => format!("{}.{rest}", lower_ident(root, ctx)),
        None => lower_ident(path, ctx),
    }
}

fn handle_namespace(ty: &str) -> Option<&'static str> {
    HANDLE_NAMESPACES
        .iter()
        .find(|(handle, _)| *handle == ty)
        .map(|(_, ns)| *ns)
}

/// A callback argument bound to a method of the current component.
fn callback(arg: &CallArg, param: &str, ctx: &LowerCtx) -> Option<String> {
    let method = arg.value.as_ident()?;
    let takes_arg = ctx.method_params(method)? > 0;
    let (sig, call) = match (param.is_empty(), takes_arg) {
        (true, _) => (String::new(), String::new()),
        (false, true) => (format!("{param} _v"), "_v".to_string()),
        (false, false) => (format!("{param} _v"), String::new()),
    };
    Some(format!("[this]({sig}) {{ this->{method}({call}); }}"))
}

fn lower_websocket_connect(args: &[CallArg], ctx: &LowerCtx) -> String {
    let url = args
        .iter()
        .find(|arg| arg.name.is_none())
        .map(|arg| lower_arg(arg, ctx))
        .unwrap_or_default();

    let mut out = format!("[&]() {{ auto _ws = webcc::websocket::connect({url}); ");
    for arg in args {
        let (dispatcher, param) = match arg.name.as_deref() {
            Some("onMessage") => ("g_ws_message_dispatcher", "const webcc::string&"),
            Some("onOpen") => ("g_ws_open_dispatcher", ""),
            Some("onClose") => ("g_ws_close_dispatcher", ""),
            Some("onError") => ("g_ws_error_dispatcher", ""),
            _ => continue,
        };
        if let Some(cb) = callback(arg, param, ctx) {
            out.push_str(&format!("{dispatcher}.set(_ws, {cb}); "));
        }
    }
    out.push_str("return _ws; }()");
    out
}

fn lower_fetch(name: &str, args: &[CallArg], ctx: &LowerCtx) -> String {
    let func = if name.ends_with("post") { "post" } else { "get" };
    let positional: Vec<String> = args
        .iter()
        .filter(|arg| arg.name.is_none())
        .map(|arg| lower_arg(arg, ctx))
        .collect();

    let mut out = format!(
        "[&]() {{ auto _req = webcc::fetch::{func}({}); ",
        positional.join(", ")
    );
    for arg in args {
        let dispatcher = match arg.name.as_deref() {
            Some("onSuccess") => "g_fetch_success_dispatcher",
            Some("onError") => "g_fetch_error_dispatcher",
            _ => continue,
        };
        if let Some(cb) = callback(arg, "const webcc::string&", ctx) {
            out.push_str(&format!("{dispatcher}.set(_req, {cb}); "));
        }
    }
    out.push_str("return _req; }()");
    out
}

// =========================================================================
// Strings and numbers
// =========================================================================

/// Floats print without trailing zeros but always with a fraction.
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if text.contains(['.', 'e', 'E']) || !value.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

enum StringPart {
    Text(String),
    Expr(Expression),
}

/// Split `"Hi {name}!"` into text and interpolated expressions. `\{` and
/// `\}` are literal braces, as are braces whose content does not parse.
fn split_interpolation(value: &str) -> Vec<StringPart> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut rest = value;

    while let Some(c) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("\\{") {
            text.push('{');
            rest = after;
            continue;
        }
        if let Some(after) = rest.strip_prefix("\\}") {
            text.push('}');
            rest = after;
            continue;
        }
        if c == '{' {
            let after = &rest[1..];
            let parsed = after.find('}').and_then(|close| {
                let inner = after[..close].trim();
                if inner.is_empty() {
                    return None;
                }
                Parser::parse_expression_source(inner)
                    .ok()
                    .map(|expr| (expr, close))
            });
            if let Some((expr, close)) = parsed {
                if !text.is_empty() {
                    parts.push(StringPart::Text(std::mem::take(&mut text)));
                }
                parts.push(StringPart::Expr(expr));
                rest = &after[close + 1..];
                continue;
            }
        }
        text.push(c);
        rest = &rest[c.len_utf8()..];
    }
    if !text.is_empty() {
        parts.push(StringPart::Text(text));
    }
    parts
}

fn lower_string(value: &str, ctx: &LowerCtx) -> String {
    let parts = split_interpolation(value);
    let args: Vec<String> = parts
        .iter()
        .map(|part| match part {
            StringPart::Text(text) => format!("\"{}\"", escape_string(text)),
            StringPart::Expr(expr) => lower_expr(expr, ctx),
        })
        .collect();
    match (parts.as_slice(), args.as_slice()) {
        ([], _) => "\"\"".to_string(),
        ([StringPart::Text(_)], [single]) => single.clone(),
        _ => format!("webcc::string::concat({})", args.join(", ")),
    }
}

/// `isKeyDown` → `is_key_down`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// =========================================================================
// Match
// =========================================================================

fn pattern_condition(pattern: &MatchPattern, ctx: &LowerCtx) -> Option<String> {
    match pattern {
        MatchPattern::Else => None,
        MatchPattern::Enum {
            component,
            enum_name,
            value,
        } => Some(format!(
            "_m == {}::{value}",
            ctx.enum_name(component.as_deref(), enum_name)
        )),
        MatchPattern::Literal(expr) => Some(format!("_m == {}", lower_expr(expr, ctx))),
        MatchPattern::Binding { variant, .. } => Some(format!("_m.has_{}()", snake_case(variant))),
    }
}

fn pattern_binding(pattern: &MatchPattern) -> Option<String> {
    match pattern {
        MatchPattern::Binding { variant, binding } => Some(format!(
            "auto& {binding} = _m.{}();",
            snake_case(variant)
        )),
        _ => None,
    }
}

fn lower_match_expr(subject: &Expression, arms: &[MatchArm], ctx: &LowerCtx) -> String {
    let mut out = format!("[&]() {{ auto&& _m = {}; ", lower_expr(subject, ctx));
    for arm in arms {
        let body = match &arm.body {
            Expression::Block(stmts) => inline_body(stmts, ctx),
            expr => format!("return {};", lower_expr(expr, ctx)),
        };
        let binding = pattern_binding(&arm.pattern)
            .map(|b| format!("{b} "))
            .unwrap_or_default();
        match pattern_condition(&arm.pattern, ctx) {
            Some(cond) => out.push_str(&format!("if ({cond}) {{ {binding}{body} }} ")),
            None => out.push_str(&format!("{{ {body} }} ")),
        }
    }
    out.push_str("}()");
    out
}

/// A `match` used as a statement lowers to an if/else chain.
fn lower_match_stmt(
    subject: &Expression,
    arms: &[MatchArm],
    depth: usize,
    ctx: &LowerCtx,
    out: &mut String,
) {
    let indent = "    ".repeat(depth);
    out.push_str(&format!("{indent}{{\n"));
    out.push_str(&format!(
        "{indent}    auto&& _m = {};\n",
        lower_expr(subject, ctx)
    ));

    let mut first = true;
    for arm in arms {
        let head = match pattern_condition(&arm.pattern, ctx) {
            Some(cond) if first => format!("if ({cond}) {{"),
            Some(cond) => format!("}} else if ({cond}) {{"),
            None if first => "{".to_string(),
            None => "} else {".to_string(),
        };
        out.push_str(&format!("{indent}    {head}\n"));
        if let Some(binding) = pattern_binding(&arm.pattern) {
            out.push_str(&format!("{indent}        {binding}\n"));
        }
        match &arm.body {
            Expression::Block(stmts) => {
                for stmt in stmts {
                    lower_stmt(stmt, depth + 2, ctx, out);
                }
            }
            expr => out.push_str(&format!("{indent}        {};\n", lower_expr(expr, ctx))),
        }
        first = false;
        if matches!(arm.pattern, MatchPattern::Else) {
            break;
        }
    }
    if !first {
        out.push_str(&format!("{indent}    }}\n"));
    }
    out.push_str(&format!("{indent}}}\n"));
}

/// Statements flattened onto one line, for lambda bodies.
fn inline_body(stmts: &[Statement], ctx: &LowerCtx) -> String {
    let mut body = String::new();
    for stmt in stmts {
        lower_stmt(stmt, 0, ctx, &mut body);
    }
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// =========================================================================
// Statements
// =========================================================================

/// Lower a list of statements at the given indent depth.
pub fn lower_body(stmts: &[Statement], depth: usize, ctx: &LowerCtx) -> String {
    let mut out = String::new();
    for stmt in stmts {
        lower_stmt(stmt, depth, ctx, &mut out);
    }
    out
}

pub fn lower_stmt(stmt: &Statement, depth: usize, ctx: &LowerCtx, out: &mut String) {
    let indent = "    ".repeat(depth);
    match stmt {
        Statement::Block(stmts) => {
            out.push_str(&format!("{indent}{{\n"));
            out.push_str(&lower_body(stmts, depth + 1, ctx));
            out.push_str(&format!("{indent}}}\n"));
        }
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            out.push_str(&format!("{indent}if ({}) {{\n", lower_expr(condition, ctx)));
            lower_branch(then_branch, depth + 1, ctx, out);
            let mut else_branch = else_branch.as_deref();
            while let Some(branch) = else_branch {
                match branch {
                    Statement::If {
                        condition,
                        then_branch,
                        else_branch: next,
                    } => {
                        out.push_str(&format!(
                            "{indent}}} else if ({}) {{\n",
                            lower_expr(condition, ctx)
                        ));
                        lower_branch(then_branch, depth + 1, ctx, out);
                        else_branch = next.as_deref();
                    }
                    other => {
                        out.push_str(&format!("{indent}}} else {{\n"));
                        lower_branch(other, depth + 1, ctx, out);
                        else_branch = None;
                    }
                }
            }
            out.push_str(&format!("{indent}}}\n"));
        }
        Statement::ForRange {
            var,
            start,
            end,
            body,
        } => {
            out.push_str(&format!(
                "{indent}for (int32_t {var} = {}; {var} < {}; {var}++) {{\n",
                lower_expr(start, ctx),
                lower_expr(end, ctx)
            ));
            lower_branch(body, depth + 1, ctx, out);
            out.push_str(&format!("{indent}}}\n"));
        }
        Statement::ForEach {
            var,
            iterable,
            body,
        } => {
            out.push_str(&format!(
                "{indent}for (auto& {var} : {}) {{\n",
                lower_expr(iterable, ctx)
            ));
            lower_branch(body, depth + 1, ctx, out);
            out.push_str(&format!("{indent}}}\n"));
        }
        Statement::Return(None) => out.push_str(&format!("{indent}return;\n")),
        Statement::Return(Some(value)) => {
            out.push_str(&format!("{indent}return {};\n", lower_expr(value, ctx)))
        }
        Statement::VarDecl(decl) => {
            let ty = cpp_type(&decl.ty, ctx);
            let amp = if decl.is_reference { "&" } else { "" };
            match &decl.initializer {
                Some(init) => {
                    let mut value = lower_expr(init, ctx);
                    if decl.is_move {
                        value = format!("webcc::move({value})");
                    }
                    out.push_str(&format!("{indent}{ty}{amp} {} = {value};\n", decl.name));
                }
                None => out.push_str(&format!("{indent}{ty} {}{{}};\n", decl.name)),
            }
        }
        Statement::Assign {
            name,
            value,
            is_move,
        } => {
            let value = move_wrap(lower_expr(value, ctx), *is_move);
            out.push_str(&format!("{indent}{} = {value};\n", lower_ident(name, ctx)));
            mark_changed(name, &indent, ctx, out);
        }
        Statement::MemberAssign {
            object,
            member,
            value,
            compound_op,
            is_move,
        } => {
            let op = compound_op.map(|op| op.as_str()).unwrap_or("");
            let value = move_wrap(lower_expr(value, ctx), *is_move);
            out.push_str(&format!(
                "{indent}{}.{member} {op}= {value};\n",
                lower_expr(object, ctx)
            ));
            if let Some(root) = root_name(object) {
                mark_changed(root, &indent, ctx, out);
            }
        }
        Statement::IndexAssign {
            array,
            index,
            value,
            compound_op,
            is_move,
        } => {
            let op = compound_op.map(|op| op.as_str()).unwrap_or("");
            let value = move_wrap(lower_expr(value, ctx), *is_move);
            out.push_str(&format!(
                "{indent}{}[{}] {op}= {value};\n",
                lower_expr(array, ctx),
                lower_expr(index, ctx)
            ));
            if let Some(root) = root_name(array) {
                mark_changed(root, &indent, ctx, out);
            }
        }
        Statement::Expr(Expression::Match { subject, arms }) => {
            lower_match_stmt(subject, arms, depth, ctx, out);
        }
        Statement::Expr(expr) => {
            out.push_str(&format!("{indent}{};\n", lower_expr(expr, ctx)));
            if let Some(root) = mutated_root(expr) {
                mark_changed(root, &indent, ctx, out);
            }
        }
    }
}

/// Branch bodies are blocks in practice; their statements are inlined.
fn lower_branch(stmt: &Statement, depth: usize, ctx: &LowerCtx, out: &mut String) {
    match stmt {
        Statement::Block(stmts) => out.push_str(&lower_body(stmts, depth, ctx)),
        other => lower_stmt(other, depth, ctx, out),
    }
}

fn move_wrap(value: String, is_move: bool) -> String {
    if is_move {
        format!("webcc::move({value})")
    } else {
        value
    }
}

/// Root variable of a member/index chain.
fn root_name(expr: &Expression) -> Option<&str> {
    match expr {
        Expression::Ident(name) => Some(name),
        Expression::Member { object, .. } => root_name(object),
        Expression::Index { array, .. } => root_name(array),
        _ => None,
    }
}

/// Field touched by an expression statement: `count++`, `items.push(x)`.
fn mutated_root(expr: &Expression) -> Option<&str> {
    match expr {
        Expression::Postfix { operand, .. } => root_name(operand),
        Expression::Call { name, .. } => name
            .split_once('.')
            .map(|(root, _)| root)
            .filter(|root| !root.starts_with(|c: char| c.is_ascii_uppercase())),
        _ => None,
    }
}

/// After a write to a field, flag the component for re-render. Writes
/// through a reference parameter also notify the owner.
fn mark_changed(root: &str, indent: &str, ctx: &LowerCtx, out: &mut String) {
    if ctx.is_ref_param(root) {
        out.push_str(&format!("{indent}_ref_changed();\n"));
    } else if ctx.is_field(root) {
        out.push_str(&format!("{indent}_dirty = true;\n"));
    }
}
