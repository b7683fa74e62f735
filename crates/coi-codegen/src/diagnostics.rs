//! Non-fatal diagnostics.
//!
//! Library code never prints. Warnings (an unreadable stylesheet, a schema
//! command that cannot be expressed) and notes (a generated file) go through
//! a [`DiagnosticSink`] supplied by the caller.

use owo_colors::OwoColorize;

pub trait DiagnosticSink {
    fn warning(&mut self, message: &str);
    fn note(&mut self, message: &str);
}

/// Prints to stderr with colored prefixes. Used by the CLI.
#[derive(Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn warning(&mut self, message: &str) {
        eprintln!("{} {message}", "warning:".yellow().bold());
    }

    fn note(&mut self, message: &str) {
        eprintln!("{} {message}", "note:".cyan().bold());
    }
}

/// Records every message in order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CollectSink {
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticSink for CollectSink {
    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn note(&mut self, message: &str) {
        self.notes.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collect_sink_keeps_order() {
        let mut sink = CollectSink::new();
        sink.warning("first");
        sink.note("generated");
        sink.warning("second");
        assert_eq!(sink.warnings, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(sink.notes, vec!["generated".to_string()]);
    }

    #[test]
    fn test_sink_as_trait_object() {
        let mut sink = CollectSink::new();
        {
            let dyn_sink: &mut dyn DiagnosticSink = &mut sink;
            dyn_sink.note("hello");
        }
        assert_eq!(sink.notes.len(), 1);
    }
}
