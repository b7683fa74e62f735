//! Coi Code Generator
//!
//! Compiles a parsed [`Program`] into the host C++ source, the bundled
//! stylesheet and the HTML page template. Feature analysis runs first so
//! the emitted program only carries the dispatchers, event arms and
//! runtime helpers it actually uses.
//!
//! ```text
//! Program → required_headers / detect_features → FeatureFlags
//!         → emit_program()  → app.cc
//!         → generate_css()  → app.css
//!         → generate_template() → index.template.html
//! ```

pub mod css;
pub mod diagnostics;
pub mod emit;
pub mod features;
pub mod html;
pub mod json;
pub mod lower;
pub mod view;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use coi_parser::ast::Program;

use crate::diagnostics::DiagnosticSink;

/// Options supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileOptions {
    /// Capability headers enabled from outside, such as `websocket`.
    pub headers: BTreeSet<String>,
}

/// The compiled outputs of a program.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerOutput {
    pub cpp: String,
    pub css: String,
    pub html: String,
}

/// Code generation error.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("Could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No root component defined. Use 'app {{ root = ComponentName; }}' to define the entry point")]
    NoRootComponent,
    #[error("Component '{0}' is already defined")]
    DuplicateComponent(String),
}

/// Compile a program. `project_root` locates the `styles/` directory.
pub fn compile(
    program: &Program,
    options: &CompileOptions,
    project_root: Option<&Path>,
    sink: &mut dyn DiagnosticSink,
) -> Result<CompilerOutput, CodegenError> {
    check_duplicates(program)?;
    let root = program
        .root_component()
        .ok_or(CodegenError::NoRootComponent)?;

    let headers = features::required_headers(program, &options.headers);
    let flags = features::detect_features(program, &headers);

    Ok(CompilerOutput {
        cpp: emit::emit_program(program, root, &flags, &headers),
        css: css::generate_css(&program.components, project_root, sink),
        html: html::generate_template(&program.app),
    })
}

/// Combine programs parsed from separate files. Declarations are
/// concatenated in order; later `app { }` settings override earlier ones.
pub fn merge_programs(programs: Vec<Program>) -> Result<Program, CodegenError> {
    let mut merged = Program::default();

    for program in programs {
        for comp in program.components {
            if merged.component(&comp.name).is_some() {
                return Err(CodegenError::DuplicateComponent(comp.name));
            }
            merged.components.push(comp);
        }
        merged.data.extend(program.data);
        merged.enums.extend(program.enums);
        merged.imports.extend(program.imports);

        let app = program.app;
        if app.root.is_some() {
            merged.app.root = app.root;
        }
        if !app.title.is_empty() {
            merged.app.title = app.title;
        }
        if !app.description.is_empty() {
            merged.app.description = app.description;
        }
        if !app.lang.is_empty() {
            merged.app.lang = app.lang;
        }
        merged.app.routes.extend(app.routes);
    }

    Ok(merged)
}

fn check_duplicates(program: &Program) -> Result<(), CodegenError> {
    let mut seen = BTreeSet::new();
    for comp in &program.components {
        if !seen.insert(comp.name.as_str()) {
            return Err(CodegenError::DuplicateComponent(comp.name.clone()));
        }
    }
    Ok(())
}

impl CompilerOutput {
    /// Write `app.cc`, `app.css` and `index.template.html` into `dir`.
    /// A stylesheet that cannot be written is skipped silently.
    pub fn write_to(&self, dir: &Path, sink: &mut dyn DiagnosticSink) -> Result<(), CodegenError> {
        let write = |name: &str, contents: &str| -> Result<PathBuf, CodegenError> {
            let path = dir.join(name);
            fs::write(&path, contents).map_err(|source| CodegenError::Io {
                path: path.clone(),
                source,
            })?;
            Ok(path)
        };

        let cpp = write("app.cc", &self.cpp)?;
        sink.note(&format!("Generated {}", cpp.display()));
        css::write_css(&dir.join("app.css"), &self.css, sink);
        let html = write("index.template.html", &self.html)?;
        sink.note(&format!("Generated {}", html.display()));
        Ok(())
    }
}
