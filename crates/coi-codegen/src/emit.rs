//! Host program emitter.
//!
//! Layout of the emitted source:
//!
//! ```text
//! #include lines
//! Dispatcher template            (only when a dispatcher is needed)
//! feature globals                (emit_globals)
//! json runtime + parsers         (only when Json.parse is used)
//! enums, data structs, forward declarations
//! one struct per component       (dependencies first)
//! root pointer, navigation hooks
//! dispatch_events                (emit_dispatch_arms)
//! update_wrapper, main           (emit_init)
//! ```
//!
//! Components render with a dirty flag: state writes mark the component,
//! and once per frame `_sync()` rebuilds every dirty subtree.

use std::collections::BTreeSet;

use coi_parser::ast::{
    ArrayKind, CallArg, Component, ComponentParam, EnumDef, FunctionDef, Program, TypeRef,
    VarDecl, ViewNode,
};

use crate::features::FeatureFlags;
use crate::json;
use crate::lower::{cpp_type, lower_body, lower_expr, LowerCtx};
use crate::view::{lower_view, ChildSlot, ViewOutput};

const CORE_INCLUDES: &[&str] = &[
    "core/function",
    "core/allocator",
    "core/new",
    "core/array",
    "core/vector",
    "core/random",
];

const DISPATCHER_TEMPLATE: &str = "\
template<typename Callback, int MaxListeners = 64>
struct Dispatcher {
    int32_t handles[MaxListeners];
    Callback callbacks[MaxListeners];
    int count = 0;
    void set(webcc::handle h, Callback cb) {
        int32_t hid = (int32_t)h;
        for (int i = 0; i < count; i++) {
            if (handles[i] == hid) { callbacks[i] = cb; return; }
        }
        if (count < MaxListeners) {
            handles[count] = hid;
            callbacks[count] = cb;
            count++;
        }
    }
    void remove(webcc::handle h) {
        int32_t hid = (int32_t)h;
        for (int i = 0; i < count; i++) {
            if (handles[i] == hid) {
                handles[i] = handles[count-1];
                callbacks[i] = callbacks[count-1];
                count--;
                return;
            }
        }
    }
    template<typename... Args>
    bool dispatch(webcc::handle h, Args&&... args) {
        int32_t hid = (int32_t)h;
        for (int i = 0; i < count; i++) {
            if (handles[i] == hid) { callbacks[i](args...); return true; }
        }
        return false;
    }
};
";

/// A DOM event wired through a dispatcher.
struct DomEvent {
    enabled: fn(&FeatureFlags) -> bool,
    dispatcher: &'static str,
    global: &'static str,
    arm: &'static str,
}

const DOM_EVENTS: &[DomEvent] = &[
    DomEvent {
        enabled: |f| f.click,
        dispatcher: "g_dispatcher",
        global: "Dispatcher<webcc::function<void()>, 128> g_dispatcher;\n",
        arm: "        } else if (e.opcode == webcc::dom::ClickEvent::OPCODE) {\n\
              \x20           if (auto evt = e.as<webcc::dom::ClickEvent>()) g_dispatcher.dispatch(evt->handle);\n",
    },
    DomEvent {
        enabled: |f| f.input,
        dispatcher: "g_input_dispatcher",
        global: "Dispatcher<webcc::function<void(const webcc::string&)>> g_input_dispatcher;\n",
        arm: "        } else if (e.opcode == webcc::dom::InputEvent::OPCODE) {\n\
              \x20           if (auto evt = e.as<webcc::dom::InputEvent>()) g_input_dispatcher.dispatch(evt->handle, webcc::string(evt->value));\n",
    },
    DomEvent {
        enabled: |f| f.change,
        dispatcher: "g_change_dispatcher",
        global: "Dispatcher<webcc::function<void(const webcc::string&)>> g_change_dispatcher;\n",
        arm: "        } else if (e.opcode == webcc::dom::ChangeEvent::OPCODE) {\n\
              \x20           if (auto evt = e.as<webcc::dom::ChangeEvent>()) g_change_dispatcher.dispatch(evt->handle, webcc::string(evt->value));\n",
    },
    DomEvent {
        enabled: |f| f.keydown,
        dispatcher: "g_keydown_dispatcher",
        global: "Dispatcher<webcc::function<void(int)>> g_keydown_dispatcher;\n",
        arm: "        } else if (e.opcode == webcc::dom::KeydownEvent::OPCODE) {\n\
              \x20           if (auto evt = e.as<webcc::dom::KeydownEvent>()) g_keydown_dispatcher.dispatch(evt->handle, evt->keycode);\n",
    },
];

const WS_DISPATCHERS: &[&str] = &[
    "g_ws_message_dispatcher",
    "g_ws_open_dispatcher",
    "g_ws_close_dispatcher",
    "g_ws_error_dispatcher",
];

const FETCH_DISPATCHERS: &[&str] = &["g_fetch_success_dispatcher", "g_fetch_error_dispatcher"];

// =========================================================================
// Feature-gated regions
// =========================================================================

/// Global dispatchers, key state and popstate slot for the enabled features.
pub fn emit_globals(flags: &FeatureFlags) -> String {
    let mut out = String::new();
    for event in DOM_EVENTS.iter().filter(|e| (e.enabled)(flags)) {
        out.push_str(event.global);
    }
    if flags.keyboard {
        out.push_str("bool g_key_state[256] = {};\n");
    }
    if flags.router {
        out.push_str("webcc::function<void(const webcc::string&)> g_popstate_callback;\n");
    }
    if flags.websocket {
        out.push_str(
            "Dispatcher<webcc::function<void(const webcc::string&)>> g_ws_message_dispatcher;\n",
        );
        out.push_str("Dispatcher<webcc::function<void()>> g_ws_open_dispatcher;\n");
        out.push_str("Dispatcher<webcc::function<void()>> g_ws_close_dispatcher;\n");
        out.push_str("Dispatcher<webcc::function<void()>> g_ws_error_dispatcher;\n");
    }
    if flags.fetch {
        out.push_str(
            "Dispatcher<webcc::function<void(const webcc::string&)>> g_fetch_success_dispatcher;\n",
        );
        out.push_str(
            "Dispatcher<webcc::function<void(const webcc::string&)>> g_fetch_error_dispatcher;\n",
        );
    }
    out
}

/// `} else if (opcode) {` arms for `dispatch_events`.
pub fn emit_dispatch_arms(flags: &FeatureFlags) -> String {
    let mut out = String::new();
    for event in DOM_EVENTS.iter().filter(|e| (e.enabled)(flags)) {
        out.push_str(event.arm);
    }

    if flags.keyboard {
        for (event, pressed) in [("KeyDownEvent", "true"), ("KeyUpEvent", "false")] {
            out.push_str(&format!(
                "        }} else if (e.opcode == webcc::input::{event}::OPCODE) {{\n"
            ));
            out.push_str(&format!(
                "            if (auto evt = e.as<webcc::input::{event}>()) {{ if (evt->key_code >= 0 && evt->key_code < 256) g_key_state[evt->key_code] = {pressed}; }}\n"
            ));
        }
    }

    if flags.router {
        out.push_str("        } else if (e.opcode == webcc::system::PopstateEvent::OPCODE) {\n");
        out.push_str("            if (auto evt = e.as<webcc::system::PopstateEvent>()) { if (g_popstate_callback) g_popstate_callback(webcc::string(evt->path)); }\n");
    }

    if flags.websocket {
        out.push_str("        } else if (e.opcode == webcc::websocket::MessageEvent::OPCODE) {\n");
        out.push_str("            if (auto evt = e.as<webcc::websocket::MessageEvent>()) g_ws_message_dispatcher.dispatch(evt->handle, webcc::string(evt->data));\n");
        out.push_str("        } else if (e.opcode == webcc::websocket::OpenEvent::OPCODE) {\n");
        out.push_str("            if (auto evt = e.as<webcc::websocket::OpenEvent>()) g_ws_open_dispatcher.dispatch(evt->handle);\n");
        for (event, dispatcher) in [
            ("CloseEvent", "g_ws_close_dispatcher"),
            ("ErrorEvent", "g_ws_error_dispatcher"),
        ] {
            out.push_str(&format!(
                "        }} else if (e.opcode == webcc::websocket::{event}::OPCODE) {{\n"
            ));
            out.push_str(&format!(
                "            if (auto evt = e.as<webcc::websocket::{event}>()) {{\n"
            ));
            out.push_str(&format!("                {dispatcher}.dispatch(evt->handle);\n"));
            for target in WS_DISPATCHERS {
                out.push_str(&format!("                {target}.remove(evt->handle);\n"));
            }
            out.push_str("            }\n");
        }
    }

    if flags.fetch {
        for (event, dispatcher, field) in [
            ("SuccessEvent", "g_fetch_success_dispatcher", "data"),
            ("ErrorEvent", "g_fetch_error_dispatcher", "error"),
        ] {
            out.push_str(&format!(
                "        }} else if (e.opcode == webcc::fetch::{event}::OPCODE) {{\n"
            ));
            out.push_str(&format!("            if (auto evt = e.as<webcc::fetch::{event}>()) {{\n"));
            out.push_str(&format!(
                "                {dispatcher}.dispatch(evt->id, webcc::string(evt->{field}));\n"
            ));
            for target in FETCH_DISPATCHERS {
                out.push_str(&format!("                {target}.remove(evt->id);\n"));
            }
            out.push_str("            }\n");
        }
    }

    out
}

/// Feature initialization run in `main` before the first render.
pub fn emit_init(flags: &FeatureFlags) -> String {
    let mut out = String::new();
    if flags.keyboard {
        out.push_str("    webcc::input::init_keyboard();\n");
    }
    if flags.router {
        out.push_str("    g_popstate_callback = [](const webcc::string& path) {\n");
        out.push_str("        if (app) app->_handle_popstate(path);\n");
        out.push_str("    };\n");
        out.push_str("    webcc::system::init_popstate();\n");
    }
    out
}

// =========================================================================
// Program
// =========================================================================

/// Emit the complete host program with `root` as the application root.
pub fn emit_program(
    program: &Program,
    root: &Component,
    flags: &FeatureFlags,
    headers: &BTreeSet<String>,
) -> String {
    // Popstate events are forwarded to the root only.
    let flags = &FeatureFlags {
        router: flags.router && root.router.is_some(),
        ..*flags
    };
    let mut out = String::new();

    for header in headers {
        out.push_str(&format!("#include \"webcc/{header}.h\"\n"));
    }
    for header in CORE_INCLUDES {
        out.push_str(&format!("#include \"webcc/{header}.h\"\n"));
    }
    out.push('\n');

    if flags.needs_dispatcher() {
        out.push_str(DISPATCHER_TEMPLATE);
        out.push('\n');
    }

    let globals = emit_globals(flags);
    if !globals.is_empty() {
        out.push_str(&globals);
        out.push('\n');
    }

    if flags.json {
        out.push_str(&json::emit_runtime());
        out.push('\n');
    }

    out.push_str(&emit_types(program));
    if flags.json {
        out.push_str(&json::emit_parsers(program));
        out.push('\n');
    }

    let sorted = sort_components(program);
    for comp in &sorted {
        out.push_str(&format!("struct {};\n", comp.qualified_name()));
    }
    out.push('\n');
    out.push_str("void g_app_navigate(const webcc::string& route);\n");
    out.push_str("webcc::string g_app_get_route();\n\n");

    for comp in &sorted {
        out.push_str(&emit_component(comp, program, flags));
        out.push('\n');
    }

    let root_name = root.qualified_name();
    out.push_str(&format!("{root_name}* app = nullptr;\n"));
    if root.router.is_some() {
        out.push_str(
            "void g_app_navigate(const webcc::string& route) { if (app) app->navigate(route); }\n",
        );
        out.push_str(
            "webcc::string g_app_get_route() { return app ? app->_current_route : \"\"; }\n",
        );
    } else {
        out.push_str("void g_app_navigate(const webcc::string& route) {}\n");
        out.push_str("webcc::string g_app_get_route() { return \"\"; }\n");
    }
    out.push('\n');

    out.push_str("void dispatch_events(const webcc::Event* events, uint32_t event_count) {\n");
    out.push_str("    for (uint32_t i = 0; i < event_count; i++) {\n");
    out.push_str("        const auto& e = events[i];\n");
    out.push_str("        if (false) {\n");
    out.push_str(&emit_dispatch_arms(flags));
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    out.push_str("void update_wrapper(double time) {\n");
    out.push_str("    static double last_time = 0;\n");
    out.push_str("    double dt = (time - last_time) / 1000.0;\n");
    out.push_str("    last_time = time;\n");
    out.push_str("    if (dt > 0.1) dt = 0.1;\n");
    out.push_str("    static webcc::Event events[64];\n");
    out.push_str("    uint32_t count = 0;\n");
    out.push_str("    webcc::Event e;\n");
    out.push_str("    while (count < 64 && webcc::poll_event(e)) {\n");
    out.push_str("        events[count++] = e;\n");
    out.push_str("    }\n");
    out.push_str("    dispatch_events(events, count);\n");
    if root.has_tick() {
        out.push_str("    if (app) app->tick(dt);\n");
    }
    out.push_str("    if (app) app->_sync();\n");
    out.push_str("    webcc::flush();\n");
    out.push_str("}\n\n");

    out.push_str("int main() {\n");
    out.push_str(&format!(
        "    void* app_mem = webcc::malloc(sizeof({root_name}));\n"
    ));
    out.push_str(&format!("    app = new (app_mem) {root_name}();\n"));
    out.push_str(&emit_init(flags));
    out.push_str("    app->view();\n");
    out.push_str("    webcc::system::set_main_loop(update_wrapper);\n");
    out.push_str("    webcc::flush();\n");
    out.push_str("    return 0;\n");
    out.push_str("}\n");

    out
}

// =========================================================================
// Types
// =========================================================================

/// Enums first (global, then component-local), then data structs.
fn emit_types(program: &Program) -> String {
    let mut out = String::new();
    let global = LowerCtx::new(program, None);

    for def in &program.enums {
        out.push_str(&emit_enum(&def.name, def));
    }
    for comp in &program.components {
        for def in &comp.enums {
            out.push_str(&emit_enum(&format!("{}_{}", comp.qualified_name(), def.name), def));
        }
    }

    for def in &program.data {
        out.push_str(&format!("struct {} {{\n", def.name));
        for field in &def.fields {
            out.push_str(&format!(
                "    {} {};\n",
                cpp_type(&type_from_str(&field.ty), &global),
                field.name
            ));
        }
        out.push_str("};\n");
    }
    for comp in &program.components {
        let ctx = LowerCtx::new(program, Some(comp));
        for def in &comp.data {
            out.push_str(&format!("struct {}_{} {{\n", comp.qualified_name(), def.name));
            for field in &def.fields {
                out.push_str(&format!(
                    "    {} {};\n",
                    cpp_type(&type_from_str(&field.ty), &ctx),
                    field.name
                ));
            }
            out.push_str("};\n");
        }
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn emit_enum(name: &str, def: &EnumDef) -> String {
    let count = def.values.len() + 1;
    let repr = if count <= 256 {
        "uint8_t"
    } else if count <= 65536 {
        "uint16_t"
    } else {
        "uint32_t"
    };
    let mut out = format!("enum struct {name} : {repr} {{\n");
    for value in &def.values {
        out.push_str(&format!("    {value},\n"));
    }
    out.push_str("    _COUNT\n};\n");
    out
}

/// A type written as text (`int`, `Row[]`, `float[4]`).
fn type_from_str(text: &str) -> TypeRef {
    if let Some(base) = text.strip_suffix("[]") {
        return TypeRef {
            name: base.to_string(),
            array: ArrayKind::Dynamic,
        };
    }
    if let Some((base, size)) = text
        .strip_suffix(']')
        .and_then(|rest| rest.split_once('['))
    {
        if let Ok(size) = size.parse() {
            return TypeRef {
                name: base.to_string(),
                array: ArrayKind::Fixed(size),
            };
        }
    }
    TypeRef::new(text)
}

// =========================================================================
// Component ordering
// =========================================================================

/// Components ordered so that every component appears after the components
/// it embeds. Cycles fall back to declaration order.
pub fn sort_components(program: &Program) -> Vec<&Component> {
    let mut sorted = Vec::new();
    let mut visiting = BTreeSet::new();
    let mut done = BTreeSet::new();

    for comp in &program.components {
        visit(program, comp, &mut visiting, &mut done, &mut sorted);
    }
    sorted
}

fn visit<'a>(
    program: &'a Program,
    comp: &'a Component,
    visiting: &mut BTreeSet<String>,
    done: &mut BTreeSet<String>,
    sorted: &mut Vec<&'a Component>,
) {
    if done.contains(&comp.name) || !visiting.insert(comp.name.clone()) {
        return;
    }
    for dep in dependencies(comp) {
        if let Some(dep) = program.component(&dep) {
            visit(program, dep, visiting, done, sorted);
        }
    }
    visiting.remove(&comp.name);
    done.insert(comp.name.clone());
    sorted.push(comp);
}

/// Components used by value or constructed inside `comp`.
fn dependencies(comp: &Component) -> BTreeSet<String> {
    let mut deps: BTreeSet<String> = comp
        .component_members
        .values()
        .chain(comp.component_arrays.values())
        .cloned()
        .collect();
    if let Some(router) = &comp.router {
        deps.extend(router.routes.iter().map(|route| route.component.clone()));
    }
    collect_instances(&comp.view, &mut deps);
    deps.remove(&comp.name);
    deps
}

fn collect_instances(nodes: &[ViewNode], deps: &mut BTreeSet<String>) {
    for node in nodes {
        match node {
            ViewNode::Component(instance) => {
                deps.insert(instance.component.clone());
            }
            ViewNode::Element(el) => collect_instances(&el.children, deps),
            ViewNode::If {
                then_children,
                else_children,
                ..
            } => {
                collect_instances(then_children, deps);
                collect_instances(else_children, deps);
            }
            ViewNode::ForRange { children, .. } | ViewNode::ForEach { children, .. } => {
                collect_instances(children, deps)
            }
            ViewNode::Text(_) | ViewNode::Interpolation(_) | ViewNode::RoutePlaceholder => {}
        }
    }
}

// =========================================================================
// Components
// =========================================================================

fn emit_component(comp: &Component, program: &Program, flags: &FeatureFlags) -> String {
    let ctx = LowerCtx::new(program, Some(comp));
    let view = lower_view(&ctx, flags);
    let name = comp.qualified_name();
    let has_ref_params = comp
        .params
        .iter()
        .any(|p| p.is_reference && p.callback.is_none());

    let mut out = format!("struct {name} {{\n");

    for param in &comp.params {
        out.push_str(&format!("    {};\n", param_field(param, &ctx)));
    }
    for decl in &comp.state {
        out.push_str(&format!("    {};\n", state_field(decl, &ctx)));
    }

    out.push_str("    webcc::handle _parent;\n");
    out.push_str("    webcc::handle _root;\n");
    out.push_str("    bool _initialized = false;\n");
    out.push_str("    bool _live = false;\n");
    out.push_str("    bool _dirty = false;\n");
    out.push_str("    webcc::vector<webcc::handle> _handles;\n");
    for slot in &view.slots {
        match slot {
            ChildSlot::Single { field, component } => {
                out.push_str(&format!("    {component} {field};\n"));
            }
            ChildSlot::Pool { field, component } => {
                out.push_str(&format!("    webcc::vector<{component}*> {field};\n"));
                out.push_str(&format!("    int {field}_used = 0;\n"));
            }
        }
    }
    if let Some(router) = &comp.router {
        for (i, route) in router.routes.iter().enumerate() {
            let target = program
                .component(&route.component)
                .map_or_else(|| route.component.clone(), Component::qualified_name);
            out.push_str(&format!("    {target}* _route_{i} = nullptr;\n"));
        }
        out.push_str("    int _active_route = -1;\n");
        out.push_str("    webcc::string _current_route;\n");
        out.push_str("    webcc::handle _route_anchor;\n");
    }
    if has_ref_params {
        out.push_str("    webcc::function<void()> _on_ref_change;\n");
    }
    out.push('\n');

    if has_ref_params {
        out.push_str("    void _ref_changed() {\n");
        out.push_str("        _dirty = true;\n");
        out.push_str("        if (_on_ref_change) _on_ref_change();\n");
        out.push_str("    }\n\n");
    }

    for method in &comp.methods {
        out.push_str(&emit_method(method, &ctx));
    }

    out.push_str(&emit_lifecycle(comp, &view, flags));

    if comp.router.is_some() {
        out.push_str(&emit_router_methods(comp, &ctx));
    }

    out.push_str("};\n");
    out
}

fn param_field(param: &ComponentParam, ctx: &LowerCtx) -> String {
    let name = &param.name;
    if let Some(sig) = &param.callback {
        let args: Vec<String> = sig
            .params
            .iter()
            .map(|ty| cpp_type(&type_from_str(ty), ctx))
            .collect();
        let ret = cpp_type(&type_from_str(&sig.return_type), ctx);
        return format!("webcc::function<{ret}({})> {name}", args.join(", "));
    }
    let ty = cpp_type(&param.ty, ctx);
    if param.is_reference {
        return format!("{ty}* {name} = nullptr");
    }
    match &param.default {
        Some(default) => format!("{ty} {name} = {}", lower_expr(default, ctx)),
        None => format!("{ty} {name}{{}}"),
    }
}

fn state_field(decl: &VarDecl, ctx: &LowerCtx) -> String {
    let ty = cpp_type(&decl.ty, ctx);
    let name = &decl.name;
    let prefix = if decl.is_shared { "static inline " } else { "" };
    let amp = if decl.is_reference { "&" } else { "" };
    match &decl.initializer {
        Some(init) => {
            let mut value = lower_expr(init, ctx);
            if decl.is_move {
                value = format!("webcc::move({value})");
            }
            format!("{prefix}{ty}{amp} {name} = {value}")
        }
        None => format!("{prefix}{ty} {name}{{}}"),
    }
}

fn emit_method(method: &FunctionDef, ctx: &LowerCtx) -> String {
    let name = if method.is_lifecycle_hook() {
        format!("_user_{}", method.name)
    } else {
        method.name.clone()
    };
    let params: Vec<String> = method
        .params
        .iter()
        .map(|p| {
            let amp = if p.is_reference { "&" } else { "" };
            format!("{}{amp} {}", cpp_type(&p.ty, ctx), p.name)
        })
        .collect();
    let ret = cpp_type(&type_from_str(&method.return_type), ctx);

    let mut out = format!("    {ret} {name}({}) {{\n", params.join(", "));
    out.push_str(&lower_body(&method.body, 2, ctx));
    out.push_str("    }\n\n");
    out
}

/// `view`, `_render`, `_release`, `_rebuild`, `_destroy`, `_sync` and
/// `tick` for a component.
fn emit_lifecycle(comp: &Component, view: &ViewOutput, flags: &FeatureFlags) -> String {
    let mut out = String::new();

    out.push_str("    void view(webcc::handle parent = webcc::dom::get_body()) {\n");
    out.push_str("        bool first = !_initialized;\n");
    out.push_str("        if (first) {\n");
    out.push_str("            _initialized = true;\n");
    if comp.router.is_some() {
        out.push_str("            _current_route = webcc::system::get_pathname();\n");
    }
    if comp.method("init").is_some() {
        out.push_str("            _user_init();\n");
    }
    out.push_str("        }\n");
    out.push_str("        if (_live) _release();\n");
    out.push_str("        _parent = parent;\n");
    out.push_str("        _root = webcc::dom::create_element(\"coi-view\");\n");
    out.push_str("        webcc::dom::set_attribute(_root, \"style\", \"display: contents\");\n");
    out.push_str("        webcc::dom::append_child(_parent, _root);\n");
    out.push_str("        _live = true;\n");
    out.push_str("        _render();\n");
    out.push_str("        _dirty = false;\n");
    if comp.method("mount").is_some() {
        out.push_str("        if (first) _user_mount();\n");
    }
    out.push_str("    }\n\n");

    out.push_str("    void _render() {\n");
    for slot in &view.slots {
        if let ChildSlot::Pool { field, .. } = slot {
            out.push_str(&format!("        {field}_used = 0;\n"));
        }
    }
    out.push_str(&view.render);
    out.push_str("    }\n\n");

    out.push_str("    void _release() {\n");
    let dispatchers: Vec<&str> = DOM_EVENTS
        .iter()
        .filter(|e| (e.enabled)(flags))
        .map(|e| e.dispatcher)
        .collect();
    if !dispatchers.is_empty() {
        out.push_str("        for (auto h : _handles) {\n");
        for dispatcher in dispatchers {
            out.push_str(&format!("            {dispatcher}.remove(h);\n"));
        }
        out.push_str("        }\n");
    }
    out.push_str("        _handles.clear();\n");
    out.push_str(&child_calls(comp, view, "_release()"));
    out.push_str("    }\n\n");

    out.push_str("    void _rebuild() {\n");
    out.push_str("        _release();\n");
    out.push_str("        webcc::dom::set_inner_html(_root, \"\");\n");
    out.push_str("        _render();\n");
    out.push_str("        _dirty = false;\n");
    out.push_str("    }\n\n");

    out.push_str("    void _destroy() {\n");
    out.push_str("        _release();\n");
    out.push_str("        if (_live) webcc::dom::remove_element(_root);\n");
    out.push_str("        _live = false;\n");
    out.push_str("    }\n\n");

    out.push_str("    void _sync() {\n");
    out.push_str("        if (!_live) return;\n");
    out.push_str("        if (_dirty) {\n");
    out.push_str("            _rebuild();\n");
    out.push_str("            return;\n");
    out.push_str("        }\n");
    out.push_str(&child_calls(comp, view, "_sync()"));
    out.push_str("    }\n");

    if let Some(tick) = comp.method("tick") {
        let call = if tick.params.is_empty() {
            "_user_tick()"
        } else {
            "_user_tick(dt)"
        };
        out.push_str("\n    void tick(double dt) {\n");
        out.push_str(&format!("        {call};\n"));
        out.push_str("    }\n");
    }

    out
}

/// Call `method` on every child component: inline instances, pooled
/// instances, component members and arrays, and active routes.
fn child_calls(comp: &Component, view: &ViewOutput, method: &str) -> String {
    let mut out = String::new();
    for slot in &view.slots {
        match slot {
            ChildSlot::Single { field, .. } => {
                out.push_str(&format!("        {field}.{method};\n"));
            }
            ChildSlot::Pool { field, .. } => {
                out.push_str(&format!(
                    "        for (int i = 0; i < {field}_used; i++) {field}[i]->{method};\n"
                ));
            }
        }
    }
    for member in comp.component_members.keys() {
        out.push_str(&format!("        {member}.{method};\n"));
    }
    for array in comp.component_arrays.keys() {
        out.push_str(&format!("        for (auto& c : {array}) c.{method};\n"));
    }
    if let Some(router) = &comp.router {
        for i in 0..router.routes.len() {
            out.push_str(&format!("        if (_route_{i}) _route_{i}->{method};\n"));
        }
    }
    out
}

// =========================================================================
// Router
// =========================================================================

fn emit_router_methods(comp: &Component, ctx: &LowerCtx) -> String {
    let Some(router) = &comp.router else {
        return String::new();
    };
    let mut out = String::from("\n");

    out.push_str("    void navigate(const webcc::string& route) {\n");
    out.push_str("        if (_current_route == route) return;\n");
    out.push_str("        _current_route = route;\n");
    out.push_str("        webcc::system::push_state(route);\n");
    out.push_str("        webcc::dom::scroll_to_top();\n");
    out.push_str("        _sync_route();\n");
    out.push_str("    }\n\n");

    out.push_str("    void _handle_popstate(const webcc::string& path) {\n");
    out.push_str("        if (_current_route == path) return;\n");
    out.push_str("        _current_route = path;\n");
    out.push_str("        _sync_route();\n");
    out.push_str("    }\n\n");

    // Unknown paths fall back to the first route.
    out.push_str("    void _sync_route() {\n");
    out.push_str("        int next = 0;\n");
    for (i, route) in router.routes.iter().enumerate() {
        let keyword = if i == 0 { "if" } else { "else if" };
        out.push_str(&format!(
            "        {keyword} (_current_route == \"{}\") next = {i};\n",
            route.path
        ));
    }
    out.push_str("        if (next != _active_route) {\n");
    for i in 0..router.routes.len() {
        out.push_str(&format!(
            "            if (_route_{i}) {{ _route_{i}->_destroy(); delete _route_{i}; _route_{i} = nullptr; }}\n"
        ));
    }
    out.push_str("            _active_route = next;\n");
    for (i, route) in router.routes.iter().enumerate() {
        let target = ctx
            .program
            .component(&route.component)
            .map_or_else(|| route.component.clone(), Component::qualified_name);
        out.push_str(&format!("            if (next == {i}) {{\n"));
        out.push_str(&format!("                _route_{i} = new {target}();\n"));
        for line in route_args(&route.component, &route.args, &format!("_route_{i}->"), ctx) {
            out.push_str(&format!("                {line}\n"));
        }
        out.push_str("            }\n");
    }
    out.push_str("        }\n");
    for i in 0..router.routes.len() {
        out.push_str(&format!(
            "        if (_route_{i}) _route_{i}->view(_route_anchor);\n"
        ));
    }
    out.push_str("    }\n");
    out
}

/// Assignments for route arguments. Positional arguments bind to the
/// target's parameters in order; `&method` binds a callback.
fn route_args(component: &str, args: &[CallArg], target: &str, ctx: &LowerCtx) -> Vec<String> {
    let params: &[ComponentParam] = ctx
        .program
        .component(component)
        .map(|comp| comp.params.as_slice())
        .unwrap_or_default();

    let mut lines = Vec::new();
    let mut notifies_ref = false;
    for (index, arg) in args.iter().enumerate() {
        let param = match &arg.name {
            Some(name) => params.iter().find(|p| &p.name == name),
            None => params.get(index),
        };
        let Some(field) = arg
            .name
            .clone()
            .or_else(|| param.map(|p| p.name.clone()))
        else {
            continue;
        };

        let is_callback = param.is_some_and(|p| p.callback.is_some());
        let method = arg
            .value
            .as_ident()
            .filter(|name| ctx.method_params(name).is_some());

        let value = match method {
            Some(method) if is_callback || arg.is_reference => {
                format!("[this](auto... a) {{ return this->{method}(a...); }}")
            }
            _ if arg.is_reference => {
                notifies_ref = true;
                format!("&({})", lower_expr(&arg.value, ctx))
            }
            _ if arg.is_move => format!("webcc::move({})", lower_expr(&arg.value, ctx)),
            _ => lower_expr(&arg.value, ctx),
        };
        lines.push(format!("{target}{field} = {value};"));
    }
    if notifies_ref {
        lines.push(format!(
            "{target}_on_ref_change = [this]() {{ this->_dirty = true; }};"
        ));
    }
    lines
}
