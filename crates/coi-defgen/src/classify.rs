//! Sorting host commands into the types that expose them.
//!
//! Within a namespace `ns` every command lands in exactly one bucket:
//!
//! 1. an instance method on `H` when its first parameter is a handle `H`,
//! 2. a shared factory on `H` when it returns handle `H` and `H` is named
//!    after the namespace (`Capitalized(ns)`, or the same first letter),
//! 3. a shared utility on `Capitalized(ns)` otherwise.

use std::collections::{BTreeMap, BTreeSet};

use coi_codegen::diagnostics::DiagnosticSink;

use crate::schema::{Command, Schema};

/// Commands the language exposes through its own constructs.
pub const EXCLUDED_FUNCTIONS: &[&str] = &[
    "system::set_main_loop",
    "dom::add_click_listener",
    "input::init_keyboard",
    "input::init_mouse",
    "dom::create_element_deferred",
    "dom::create_element_deferred_scoped",
    "dom::create_element_scoped",
    "dom::create_comment_deferred",
    "dom::add_input_listener",
    "dom::add_change_listener",
    "dom::add_keydown_listener",
    "websocket::connect",
    "fetch::get",
    "fetch::post",
];

/// Namespaces whose utility type carries compiler intrinsics.
const INTRINSIC_NAMESPACES: &[&str] = &["input", "system"];

/// Methods declared on one handle type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandleDefs<'a> {
    pub extends: Option<String>,
    pub factories: Vec<&'a Command>,
    pub methods: Vec<&'a Command>,
}

/// Everything generated for one namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceDefs<'a> {
    pub ns: String,
    /// Commands kept after exclusion.
    pub command_count: usize,
    pub handles: BTreeMap<String, HandleDefs<'a>>,
    pub utilities: Vec<&'a Command>,
}

impl NamespaceDefs<'_> {
    /// `storage` → `Storage`
    pub fn type_name(&self) -> String {
        capitalize(&self.ns)
    }

    /// Whether the namespace gets a utility type of its own.
    pub fn has_utility_type(&self) -> bool {
        !self.handles.contains_key(&self.type_name())
            && (!self.utilities.is_empty() || INTRINSIC_NAMESPACES.contains(&self.ns.as_str()))
    }
}

/// The whole classified schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definitions<'a> {
    pub namespaces: BTreeMap<String, NamespaceDefs<'a>>,
    /// Every handle type mentioned anywhere in the schema.
    pub handles: BTreeSet<String>,
    pub inheritance: BTreeMap<String, String>,
}

pub fn is_excluded(cmd: &Command) -> bool {
    EXCLUDED_FUNCTIONS.contains(&cmd.path().as_str())
}

pub fn classify<'a>(schema: &'a Schema, sink: &mut dyn DiagnosticSink) -> Definitions<'a> {
    let mut defs = Definitions {
        inheritance: schema.inheritance.iter().cloned().collect(),
        ..Definitions::default()
    };

    for cmd in &schema.commands {
        let ns_type = capitalize(&cmd.ns);

        // Handles returned by a namespace belong to it even when every
        // command producing them is excluded.
        if !cmd.return_handle_type.is_empty() {
            defs.handles.insert(cmd.return_handle_type.clone());
            namespace(&mut defs, &cmd.ns)
                .handles
                .entry(cmd.return_handle_type.clone())
                .or_default();
        }
        for param in &cmd.params {
            if !param.handle_type.is_empty() {
                defs.handles.insert(param.handle_type.clone());
            }
        }

        if is_excluded(cmd) {
            if INTRINSIC_NAMESPACES.contains(&cmd.ns.as_str()) {
                namespace(&mut defs, &cmd.ns);
            }
            continue;
        }
        if cmd.has_func_ptr() {
            sink.warning(&format!(
                "Skipping {}: function pointer parameters are not supported",
                cmd.path()
            ));
            continue;
        }

        let defs_ns = namespace(&mut defs, &cmd.ns);
        defs_ns.command_count += 1;

        if let Some(receiver) = cmd.receiver() {
            defs_ns
                .handles
                .entry(receiver.to_string())
                .or_default()
                .methods
                .push(cmd);
        } else if is_factory(cmd, &ns_type) {
            defs_ns
                .handles
                .entry(cmd.return_handle_type.clone())
                .or_default()
                .factories
                .push(cmd);
        } else {
            defs_ns.utilities.push(cmd);
        }
    }

    for event in &schema.events {
        for param in &event.params {
            if !param.handle_type.is_empty() {
                defs.handles.insert(param.handle_type.clone());
            }
        }
    }
    for (child, parent) in &schema.inheritance {
        defs.handles.insert(child.clone());
        defs.handles.insert(parent.clone());
    }

    let inheritance = defs.inheritance.clone();
    for ns in defs.namespaces.values_mut() {
        for (name, handle) in ns.handles.iter_mut() {
            handle.extends = inheritance.get(name).cloned();
        }
    }

    defs
}

fn namespace<'d, 'a>(defs: &'d mut Definitions<'a>, ns: &str) -> &'d mut NamespaceDefs<'a> {
    defs.namespaces
        .entry(ns.to_string())
        .or_insert_with(|| NamespaceDefs {
            ns: ns.to_string(),
            ..NamespaceDefs::default()
        })
}

fn is_factory(cmd: &Command, ns_type: &str) -> bool {
    let handle = &cmd.return_handle_type;
    if handle.is_empty() {
        return false;
    }
    let first_matches = match (handle.chars().next(), cmd.ns.chars().next()) {
        (Some(h), Some(n)) => h.to_ascii_lowercase() == n,
        _ => false,
    };
    handle == ns_type || first_matches
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// `set_inner_text` → `setInnerText`
pub fn to_camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for c in snake.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Host type name to language type name.
pub fn to_coi_type(ty: &str, handle_type: &str) -> String {
    match ty {
        "handle" if !handle_type.is_empty() => handle_type.to_string(),
        "func_ptr" => "func".to_string(),
        "" => "void".to_string(),
        other => other.to_string(),
    }
}
