//! Coi Parser
//!
//! Parses a token stream into a [`Program`]: components with their state,
//! methods, view trees, styles and routers, plus top-level data types,
//! enums, imports and the `app { }` configuration.
//!
//! The parser is recursive descent with one-token lookahead. Two context
//! flags resolve the grammar's ambiguities: `>` inside a view tag, and
//! `Name{` before a block.

pub mod ast;
mod component;
mod expr;
pub mod parser;
mod stmt;
mod view;

pub use ast::{Component, Expression, Program, Statement, ViewNode};
pub use parser::Parser;

use coi_lexer::LexerError;

/// Parser error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<LexerError> for ParseError {
    fn from(err: LexerError) -> Self {
        ParseError {
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }
}
