use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use coi_codegen::diagnostics::StderrSink;
use coi_codegen::{css, CompileOptions};
use coi_parser::ast::Program;

#[derive(Parser)]
#[command(name = "coi")]
#[command(about = "Coi component language compiler")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a .coi file or directory to app.cc, app.css and an HTML template
    Build {
        /// Input .coi file or directory
        input: PathBuf,

        /// Output directory (defaults to the input's directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Extra host headers to enable, e.g. websocket,fetch
        #[arg(long, value_delimiter = ',')]
        headers: Vec<String>,
    },

    /// Check a .coi file or directory for errors without generating output
    Check {
        /// Input .coi file or directory
        input: PathBuf,
    },

    /// Generate .d.coi definition files from a host schema
    GenDefs {
        /// Schema JSON file
        schema: PathBuf,

        /// Output directory
        #[arg(long, default_value = "def/web")]
        out_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Build {
            input,
            out_dir,
            headers,
        } => cmd_build(&input, out_dir, headers),
        Command::Check { input } => cmd_check(&input),
        Command::GenDefs { schema, out_dir } => cmd_gen_defs(&schema, &out_dir),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {message}", "error:".red().bold());
    std::process::exit(1);
}

/// Every `.coi` file for an input, sorted by path.
fn source_files(input: &Path) -> Vec<PathBuf> {
    if !input.exists() {
        fail(format!("file not found: {}", input.display()));
    }
    if input.is_file() {
        return vec![input.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "coi"))
        .collect();
    files.sort();
    if files.is_empty() {
        fail(format!("no .coi files in {}", input.display()));
    }
    files
}

fn load_program(input: &Path) -> Program {
    let mut programs = Vec::new();
    for path in source_files(input) {
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) => fail(format!("cannot read {}: {e}", path.display())),
        };
        match coi_parser::Parser::parse(&source) {
            Ok(program) => programs.push(program),
            Err(e) => fail(format!("{}: {e}", path.display())),
        }
    }

    match coi_codegen::merge_programs(programs) {
        Ok(program) => program,
        Err(e) => fail(e),
    }
}

fn input_dir(input: &Path) -> PathBuf {
    if input.is_dir() {
        input.to_path_buf()
    } else {
        input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf()
    }
}

fn cmd_build(input: &Path, out_dir: Option<PathBuf>, headers: Vec<String>) {
    let program = load_program(input);
    let dir = input_dir(input);
    let root = css::project_root(&dir);
    let mut sink = StderrSink;

    let options = CompileOptions {
        headers: headers
            .into_iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect::<BTreeSet<_>>(),
    };

    let output = match coi_codegen::compile(&program, &options, Some(&root), &mut sink) {
        Ok(output) => output,
        Err(e) => fail(e),
    };

    let out_dir = out_dir.unwrap_or(dir);
    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        fail(format!("cannot create {}: {e}", out_dir.display()));
    }
    if let Err(e) = output.write_to(&out_dir, &mut sink) {
        fail(e);
    }
}

fn cmd_check(input: &Path) {
    let program = load_program(input);

    // Codegen catches a missing root and duplicate components.
    let root = css::project_root(&input_dir(input));
    if let Err(e) = coi_codegen::compile(
        &program,
        &CompileOptions::default(),
        Some(&root),
        &mut StderrSink,
    ) {
        fail(e);
    }

    eprintln!("{} {}", "ok:".green().bold(), input.display());
}

fn cmd_gen_defs(schema: &Path, out_dir: &Path) {
    let schema = match coi_defgen::load_schema(schema) {
        Ok(schema) => schema,
        Err(e) => fail(e),
    };
    if let Err(e) = coi_defgen::generate_to_dir(&schema, out_dir, &mut StderrSink) {
        fail(e);
    }
}
