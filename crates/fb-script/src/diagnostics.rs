//! Structural warnings produced while loading story text.
//!
//! Loading never fails on malformed content, so every diagnostic is a
//! warning: the loader recovered, usually by skipping a line or inventing a
//! placeholder id.

use ariadne::{Color, Label, Report, ReportKind, Source};
use std::fmt;

use crate::ast::Span;

/// A recovered loader problem tied to a line of story text.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Byte range of the offending line.
    pub span: Span,
    /// What went wrong.
    pub message: String,
    /// How the loader patched it up, shown under the highlighted span.
    pub label: Option<String>,
}

impl Diagnostic {
    /// A warning for the line at `span`.
    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            label: None,
        }
    }

    /// Say how the loader recovered.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// 1-based line number of the span start within `source`.
    pub fn line_in(&self, source: &str) -> usize {
        let end = self.span.start.min(source.len());
        source[..end].matches('\n').count() + 1
    }

    fn report<'a>(&'a self, filename: &'a str) -> Report<'a, (&'a str, Span)> {
        let note = self.label.as_deref().unwrap_or(&self.message);
        Report::build(ReportKind::Warning, (filename, self.span.clone()))
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.clone()))
                    .with_message(note)
                    .with_color(Color::Yellow),
            )
            .finish()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {}", self.message)
    }
}

/// Render warnings with source context for terminal output.
pub fn render_diagnostics(source: &str, filename: &str, diagnostics: &[Diagnostic]) -> String {
    let mut output = Vec::new();
    let mut cache = (filename, Source::from(source));
    for diagnostic in diagnostics {
        if diagnostic.report(filename).write(&mut cache, &mut output).is_err() {
            break;
        }
    }
    String::from_utf8(output).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::warning(0..7, "HOTSPOT without an id");
        assert_eq!(d.to_string(), "warning: HOTSPOT without an id");
    }

    #[test]
    fn line_numbers() {
        let source = "SCENE hall\n  HOTSPOT\nEND\n";
        let d = Diagnostic::warning(13..20, "HOTSPOT without an id");
        assert_eq!(d.line_in(source), 2);
    }

    #[test]
    fn render_produces_output() {
        let source = "SCENE hall\n  HOTSPOT\n  END\nEND\n";
        let diags = vec![
            Diagnostic::warning(13..20, "HOTSPOT without an id").with_label("placeholder id used"),
        ];
        let output = render_diagnostics(source, "act1.story", &diags);
        assert!(output.contains("HOTSPOT without an id"));
    }
}
