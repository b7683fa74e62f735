//! Rendering classified definitions as `.d.coi` text.

use crate::classify::{to_camel_case, to_coi_type, Definitions, HandleDefs, NamespaceDefs};
use crate::schema::Command;

const RULE: &str = "// =========================================================\n";

const WEBSOCKET_INTRINSICS: &str = r#"    // Connect with optional callbacks (compiler intrinsic)
    @intrinsic("ws_connect")
    shared def connect(string url, def onMessage(string) : void = void, def onOpen() : void = void, def onClose() : void = void, def onError() : void = void): WebSocket

    // Whether the connection handle is valid
    @inline("$self.is_valid()")
    def isConnected(): bool

    // Callback registration (compiler intrinsics)
    @intrinsic("ws_on_message")
    def onMessage(def callback(string) : void): void

    @intrinsic("ws_on_open")
    def onOpen(def callback : void): void

    @intrinsic("ws_on_close")
    def onClose(def callback : void): void

    @intrinsic("ws_on_error")
    def onError(def callback : void): void
"#;

const FETCH_INTRINSICS: &str = r#"    // GET with optional callbacks (compiler intrinsic)
    @intrinsic("fetch_get")
    shared def get(string url, def onSuccess(string) : void = void, def onError(string) : void = void): FetchRequest

    // POST with optional callbacks (compiler intrinsic)
    @intrinsic("fetch_post")
    shared def post(string url, string body, def onSuccess(string) : void = void, def onError(string) : void = void): FetchRequest
"#;

const INPUT_INTRINSICS: &str = r#"    // Keyboard state queries (compiler intrinsics)
    @intrinsic("key_down")
    shared def isKeyDown(int keyCode): bool

    @intrinsic("key_up")
    shared def isKeyUp(int keyCode): bool
"#;

const SYSTEM_INTRINSICS: &str = r#"    // Router navigation (compiler intrinsics)
    @intrinsic("navigate")
    shared def navigate(string route): void

    @intrinsic("get_route")
    shared def getRoute(): string

    // Flush pending DOM operations (compiler intrinsic)
    @intrinsic("flush")
    shared def flush(): void
"#;

const LANGUAGE_CONSTRUCTS: &str = r#"// - init { ... }          : Runs once before the first render
// - mount { ... }         : Runs once after the first render
// - tick { ... }          : Main loop (replaces setMainLoop)
// - style { ... }         : Scoped CSS styles for this component
// - style global { ... }  : Global CSS styles (not scoped)
// - onclick={handler}     : Click events (replaces addEventListener)
// - oninput / onchange    : Form events
// - onkeydown={handler}   : Keyboard events
// - router { ... }        : Client-side routes, rendered at <route />
// - view { ... }          : DOM generation
// - component Name { }    : Component definition
// - mut Type name         : Mutable state
"#;

/// Which kind of method a command is declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodKind {
    Shared,
    Instance,
}

fn method(out: &mut String, ns: &str, cmd: &Command, kind: MethodKind) {
    let params = match kind {
        MethodKind::Shared => &cmd.params[..],
        MethodKind::Instance => cmd.params.get(1..).unwrap_or_default(),
    };
    let params = params
        .iter()
        .map(|p| {
            let name = if p.name.is_empty() { "arg" } else { &p.name };
            format!("{} {name}", to_coi_type(&p.ty, &p.handle_type))
        })
        .collect::<Vec<_>>()
        .join(", ");
    let ret = to_coi_type(&cmd.return_type, &cmd.return_handle_type);
    let shared = if kind == MethodKind::Shared { "shared " } else { "" };

    out.push_str(&format!("    @map(\"{ns}::{}\")\n", cmd.func_name));
    out.push_str(&format!(
        "    {shared}def {}({params}): {ret}\n\n",
        to_camel_case(&cmd.func_name)
    ));
}

fn handle_block(out: &mut String, ns: &NamespaceDefs, name: &str, handle: &HandleDefs) {
    out.push_str(RULE);
    match &handle.extends {
        Some(parent) => out.push_str(&format!("// {name} (extends {parent})\n")),
        None => out.push_str(&format!("// {name}\n")),
    }
    out.push_str(RULE);
    out.push('\n');

    match &handle.extends {
        Some(parent) => out.push_str(&format!("type {name} extends {parent} {{\n")),
        None => out.push_str(&format!("@nocopy\ntype {name} {{\n")),
    }

    if !handle.factories.is_empty() {
        out.push_str(&format!("    // Shared methods (call as {name}.methodName(...))\n"));
        for cmd in &handle.factories {
            method(out, &ns.ns, cmd, MethodKind::Shared);
        }
    }
    if !handle.methods.is_empty() {
        out.push_str("    // Instance methods (call as instance.methodName(...))\n");
        for cmd in &handle.methods {
            method(out, &ns.ns, cmd, MethodKind::Instance);
        }
    }
    // Utilities join the handle named after their namespace.
    if name == ns.type_name() && !ns.utilities.is_empty() {
        out.push_str("    // Namespace utilities\n");
        for cmd in &ns.utilities {
            method(out, &ns.ns, cmd, MethodKind::Shared);
        }
    }

    match name {
        "WebSocket" => out.push_str(WEBSOCKET_INTRINSICS),
        "FetchRequest" => out.push_str(FETCH_INTRINSICS),
        _ => {}
    }
    out.push_str("}\n\n");
}

fn utility_block(out: &mut String, ns: &NamespaceDefs) {
    let name = ns.type_name();
    out.push_str(RULE);
    out.push_str(&format!("// {name} (static utilities - not instantiable)\n"));
    out.push_str(RULE);
    out.push_str(&format!("// Usage: {name}.methodName(...)\n\n"));

    out.push_str(&format!("type {name} {{\n"));
    if !ns.utilities.is_empty() {
        out.push_str(&format!("    // Shared methods (call as {name}.methodName(...))\n"));
        for cmd in &ns.utilities {
            method(out, &ns.ns, cmd, MethodKind::Shared);
        }
    }
    match ns.ns.as_str() {
        "input" => out.push_str(INPUT_INTRINSICS),
        "system" => out.push_str(SYSTEM_INTRINSICS),
        _ => {}
    }
    out.push_str("}\n\n");
}

/// The contents of `<ns>.d.coi`.
pub fn render_namespace(ns: &NamespaceDefs) -> String {
    let mut out = String::from("// GENERATED FILE - DO NOT EDIT\n");
    out.push_str(&format!("// Coi definitions for {} namespace\n", ns.ns));
    out.push_str(&format!("// Maps to: webcc/{}.h\n\n", ns.ns));

    for (name, handle) in &ns.handles {
        handle_block(&mut out, ns, name, handle);
    }
    if ns.has_utility_type() {
        utility_block(&mut out, ns);
    }
    out
}

/// The contents of `index.d.coi`.
pub fn render_index(defs: &Definitions) -> String {
    let mut out = String::from("// GENERATED FILE - DO NOT EDIT\n");
    out.push_str("// Coi Standard Library Index\n");
    out.push_str("//\n");
    out.push_str("// These definitions map to the webcc library for web platform access.\n");
    out.push_str("//\n");
    out.push_str("// Available modules:\n");
    for ns in defs.namespaces.values() {
        out.push_str(&format!("//   - {}.d.coi ({} functions)\n", ns.ns, ns.command_count));
    }

    out.push('\n');
    out.push_str(RULE);
    out.push_str("// All Handle Types\n");
    out.push_str(RULE);
    out.push('\n');
    for handle in &defs.handles {
        match defs.inheritance.get(handle) {
            Some(parent) => {
                out.push_str(&format!("// {handle} extends {parent}\n"));
                out.push_str(&format!("type {handle} extends {parent} {{}}\n\n"));
            }
            None => {
                out.push_str(&format!("// {handle}\n"));
                out.push_str(&format!("@nocopy\ntype {handle} {{}}\n\n"));
            }
        }
    }

    out.push_str(RULE);
    out.push_str("// Language Constructs (built into Coi)\n");
    out.push_str(RULE);
    out.push_str("//\n");
    out.push_str(LANGUAGE_CONSTRUCTS);
    out.push_str("//\n");
    out
}
