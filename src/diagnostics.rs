//! Non-fatal diagnostics reported while snapshotting

use serde::Serialize;
use std::cell::RefCell;
use std::fmt;

/// A degradable condition: traversal continued with a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// None of the computed font families is declared by the document
    UnknownFont { family: String },
    /// No eligible face of a known family covers a character
    MissingGlyph {
        family: String,
        weight: String,
        style: String,
        character: char,
    },
    /// Rules of a style sheet could not be read
    UnreadableStyleSheet { href: Option<String> },
    /// A rule was skipped because its selector is not understood
    InvalidSelector { selector: String },
    /// An embedded frame was cloned structurally instead of by content
    FrameFallback { reason: String },
    /// A `@font-face` rule was left out of the registry
    InvalidFontFace { family: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownFont { family } => write!(f, "Unknown font: {}", family),
            Diagnostic::MissingGlyph {
                family,
                weight,
                style,
                character,
            } => write!(
                f,
                "Failed to find font face for {} {} {} (U+{:04X})",
                family, weight, style, *character as u32
            ),
            Diagnostic::UnreadableStyleSheet { href } => write!(
                f,
                "Could not read CSS rules from {}",
                href.as_deref().unwrap_or("<inline>")
            ),
            Diagnostic::InvalidSelector { selector } => {
                write!(f, "Skipping rule with unsupported selector: {}", selector)
            }
            Diagnostic::FrameFallback { reason } => {
                write!(f, "Embedded frame cloned structurally: {}", reason)
            }
            Diagnostic::InvalidFontFace { family, reason } => {
                write!(f, "Ignoring font face {}: {}", family, reason)
            }
        }
    }
}

/// Sink shared by every branch of one snapshot.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: RefCell<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a diagnostic.
    pub fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::FrameFallback { .. } | Diagnostic::InvalidSelector { .. } => {
                log::debug!("{}", diagnostic)
            }
            _ => log::warn!("{}", diagnostic),
        }
        self.entries.borrow_mut().push(diagnostic);
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_report_order() {
        let sink = Diagnostics::new();
        sink.report(Diagnostic::UnknownFont { family: "Nope".into() });
        sink.report(Diagnostic::UnreadableStyleSheet { href: None });
        let all = sink.snapshot();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].to_string(), "Unknown font: Nope");
        assert_eq!(all[1].to_string(), "Could not read CSS rules from <inline>");
    }
}
