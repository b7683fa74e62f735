//! Coi Definition Generator
//!
//! Reads the host runtime schema and writes one `<ns>.d.coi` declaration
//! file per namespace plus an `index.d.coi` summary.
//!
//! ```text
//! schema.json → Schema → classify() → Definitions → render_*() → def/web/*.d.coi
//! ```

pub mod classify;
pub mod schema;
pub mod writer;

use std::fs;
use std::path::{Path, PathBuf};

use coi_codegen::diagnostics::DiagnosticSink;

pub use crate::schema::Schema;

#[derive(Debug, thiserror::Error)]
pub enum DefgenError {
    #[error("Invalid schema: {0}")]
    Schema(#[from] serde_json::Error),
    #[error("Cannot create {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read a schema from a JSON file.
pub fn load_schema(path: &Path) -> Result<Schema, DefgenError> {
    let source = fs::read_to_string(path).map_err(|source| DefgenError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Schema::from_json(&source)?)
}

/// Render every definition file, keyed by file name, in write order.
pub fn generate(schema: &Schema, sink: &mut dyn DiagnosticSink) -> Vec<(String, String)> {
    let defs = classify::classify(schema, sink);
    let mut files: Vec<(String, String)> = defs
        .namespaces
        .values()
        .map(|ns| (format!("{}.d.coi", ns.ns), writer::render_namespace(ns)))
        .collect();
    files.push(("index.d.coi".to_string(), writer::render_index(&defs)));
    files
}

/// Generate into `out_dir`, creating it if needed. Returns the written paths.
pub fn generate_to_dir(
    schema: &Schema,
    out_dir: &Path,
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<PathBuf>, DefgenError> {
    fs::create_dir_all(out_dir).map_err(|source| DefgenError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();
    for (name, contents) in generate(schema, sink) {
        let path = out_dir.join(&name);
        fs::write(&path, contents).map_err(|source| DefgenError::Io {
            path: path.clone(),
            source,
        })?;
        sink.note(&format!("Generated {}", path.display()));
        written.push(path);
    }
    Ok(written)
}
