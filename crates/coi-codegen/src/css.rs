//! CSS generator.
//!
//! Bundles the project's `styles/` tree, then every component's global CSS
//! and its scoped CSS. Scoping rewrites selectors to target elements whose
//! `coi-scope` attribute is the component's qualified name:
//!
//! ```text
//! .btn, .btn:hover { … }  →  .btn[coi-scope="Foo"],.btn[coi-scope="Foo"]:hover { … }
//! ```
//!
//! `@keyframes` blocks pass through untouched; `@media` blocks keep their
//! query and have their inner rules scoped.

use std::fs;
use std::path::{Path, PathBuf};

use coi_parser::ast::Component;
use walkdir::WalkDir;

use crate::diagnostics::DiagnosticSink;

/// The project root for an input directory: its parent when the directory
/// is named `src`, the directory itself otherwise.
pub fn project_root(input_dir: &Path) -> PathBuf {
    match (input_dir.file_name(), input_dir.parent()) {
        (Some(name), Some(parent)) if name == "src" => parent.to_path_buf(),
        _ => input_dir.to_path_buf(),
    }
}

/// Build the full stylesheet: bundled `styles/*.css` first (when a project
/// root is given), then each component's CSS in program order.
pub fn generate_css(
    components: &[Component],
    project_root: Option<&Path>,
    sink: &mut dyn DiagnosticSink,
) -> String {
    let mut out = String::new();

    if let Some(root) = project_root {
        out.push_str(&bundle_styles(root, sink));
    }

    for comp in components {
        if comp.global_css.is_empty() && comp.css.is_empty() {
            continue;
        }
        out.push_str(&format!("/* {} */\n", comp.name));

        if !comp.global_css.is_empty() {
            out.push_str(&comp.global_css);
            out.push('\n');
        }
        if !comp.css.is_empty() {
            out.push_str(&scope_css(&comp.css, &comp.qualified_name()));
            out.push('\n');
        }
    }

    out
}

/// Concatenate every `.css` file under `<root>/styles`, sorted by path
/// string. Each file is preceded by a `/* styles/<rel> */` header.
pub fn bundle_styles(root: &Path, sink: &mut dyn DiagnosticSink) -> String {
    let styles_dir = root.join("styles");
    if !styles_dir.is_dir() {
        return String::new();
    }

    let mut files: Vec<(String, PathBuf)> = WalkDir::new(&styles_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "css"))
        .map(|entry| {
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            (rel, entry.into_path())
        })
        .collect();
    files.sort();

    let mut out = String::new();
    for (rel, path) in files {
        match fs::read_to_string(&path) {
            Ok(contents) => {
                out.push_str(&format!("/* {rel} */\n"));
                out.push_str(&contents);
                out.push('\n');
            }
            Err(_) => sink.warning(&format!("Could not open stylesheet: {}", path.display())),
        }
    }
    out
}

/// Write the stylesheet. Failure to write is silent; success is reported
/// as a `Generated <path>` note.
pub fn write_css(path: &Path, css: &str, sink: &mut dyn DiagnosticSink) -> bool {
    if fs::write(path, css).is_err() {
        return false;
    }
    sink.note(&format!("Generated {}", path.display()));
    true
}

// =========================================================================
// Selector scoping
// =========================================================================

/// Rewrite a component's CSS so every selector carries
/// `[coi-scope="<scope>"]`.
pub fn scope_css(css: &str, scope: &str) -> String {
    let mut out = String::new();
    let mut rest = css;

    loop {
        let trimmed = rest.trim_start();
        out.push_str(&rest[..rest.len() - trimmed.len()]);
        rest = trimmed;
        if rest.is_empty() {
            break;
        }

        if rest.starts_with("@keyframes") {
            let Some(open) = rest.find('{') else {
                out.push_str(rest);
                break;
            };
            match matching_brace(rest, open) {
                Some(close) => {
                    out.push_str(&rest[..=close]);
                    rest = &rest[close + 1..];
                }
                None => {
                    out.push_str(rest);
                    break;
                }
            }
            continue;
        }

        if rest.starts_with("@media") {
            let Some(open) = rest.find('{') else {
                out.push_str(rest);
                break;
            };
            let Some(close) = matching_brace(rest, open) else {
                out.push_str(rest);
                break;
            };
            out.push_str(&rest[..=open]);
            out.push('\n');
            scope_rules(&rest[open + 1..close], scope, &mut out);
            out.push_str("}\n");
            rest = &rest[close + 1..];
            continue;
        }

        let Some(open) = rest.find('{') else {
            out.push_str(rest);
            break;
        };
        scope_selector_group(&rest[..open], scope, &mut out);
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            out.push_str(&rest[open..]);
            break;
        };
        out.push_str(&rest[open..=close]);
        out.push('\n');
        rest = &rest[close + 1..];
    }

    out
}

/// Scope the flat rules inside an `@media` body. Each rule ends with a
/// newline; a trailing unterminated rule is emitted verbatim.
fn scope_rules(body: &str, scope: &str, out: &mut String) {
    let mut rest = body;
    while let Some(open) = rest.find('{') {
        scope_selector_group(&rest[..open], scope, out);
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            out.push_str(&rest[open..]);
            return;
        };
        out.push_str(&rest[open..=close]);
        out.push('\n');
        rest = &rest[close + 1..];
    }
}

/// Scope every selector in a comma-separated group. The group's trailing
/// whitespace (before `{`) is kept.
fn scope_selector_group(group: &str, scope: &str, out: &mut String) {
    let trailing = &group[group.trim_end().len()..];
    let scoped: Vec<String> = group
        .split(',')
        .map(|selector| scope_selector(selector, scope))
        .collect();
    out.push_str(&scoped.join(","));
    out.push_str(trailing);
}

fn scope_selector(selector: &str, scope: &str) -> String {
    let selector = selector.trim();
    if selector.is_empty() {
        return String::new();
    }
    let attr = format!("[coi-scope=\"{scope}\"]");
    match selector.find(':') {
        Some(colon) => format!("{}{attr}{}", &selector[..colon], &selector[colon..]),
        None => format!("{selector}{attr}"),
    }
}

/// Byte index of the `}` matching the `{` at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, byte) in text.bytes().enumerate().skip(open) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
