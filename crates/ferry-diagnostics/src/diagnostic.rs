//! Diagnostic types for bridge-level errors, warnings, and hints.

use crate::exception::ScriptException;
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational hint
    Hint,
    /// Warning (the call completed, but something was off)
    Warning,
    /// Error (a script exception was swallowed at the boundary)
    Error,
}

impl Severity {
    /// Get the string representation for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Script exceptions caught at the boundary (B001-B099)
    /// A function invoked through call-property threw
    CallPropertyThrew,
    /// An event emitter's `emit` threw
    EmitThrew,
    /// A context (window) propagation method threw
    ContextMethodThrew,
    /// A bridged property's change hook failed
    AccessorHookFailed,

    // Lifecycle (B101-B199)
    /// Release was requested for a proxy that is still attached
    ReleaseWhileAttached,
    /// A handle no longer refers to a live proxy
    StaleHandle,
}

impl DiagnosticCode {
    /// All codes, in numbering order.
    pub const ALL: &'static [DiagnosticCode] = &[
        Self::CallPropertyThrew,
        Self::EmitThrew,
        Self::ContextMethodThrew,
        Self::AccessorHookFailed,
        Self::ReleaseWhileAttached,
        Self::StaleHandle,
    ];

    /// Get the code string (e.g., "B001").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CallPropertyThrew => "B001",
            Self::EmitThrew => "B002",
            Self::ContextMethodThrew => "B003",
            Self::AccessorHookFailed => "B004",

            Self::ReleaseWhileAttached => "B101",
            Self::StaleHandle => "B102",
        }
    }

    /// Look a code up by its string form.
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    /// Get the default severity for this code.
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::CallPropertyThrew
            | Self::EmitThrew
            | Self::ContextMethodThrew
            | Self::AccessorHookFailed => Severity::Error,

            Self::StaleHandle => Severity::Warning,

            Self::ReleaseWhileAttached => Severity::Hint,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bridge diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Unique code
    pub code: DiagnosticCode,
    /// Severity level
    pub severity: Severity,
    /// Short message (single line)
    pub message: String,
    /// The captured script exception, if this diagnostic came from one
    pub exception: Option<ScriptException>,
    /// Help text
    pub help: Option<String>,
    /// Extra context lines (operation, handle, property name...)
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Create a diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, code.default_severity(), message)
    }

    /// Create a diagnostic describing a captured script exception.
    pub fn from_exception(code: DiagnosticCode, exception: &ScriptException) -> Diagnostic {
        Self::new(code, exception.title())
            .with_exception(exception.clone())
            .build()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn is_hint(&self) -> bool {
        self.severity == Severity::Hint
    }
}

/// Builder for constructing diagnostics fluently.
pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity,
                message: message.into(),
                exception: None,
                help: None,
                notes: Vec::new(),
            },
        }
    }

    /// Attach the captured exception.
    pub fn with_exception(mut self, exception: ScriptException) -> Self {
        self.inner.exception = Some(exception);
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.help = Some(help.into());
        self
    }

    /// Add a note line.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.inner.notes.push(note.into());
        self
    }

    /// Build the diagnostic.
    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Collection of diagnostics with summary statistics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// All diagnostics
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Keep only the newest `limit` diagnostics. Returns how many were dropped.
    pub fn retain_last(&mut self, limit: usize) -> usize {
        let excess = self.items.len().saturating_sub(limit);
        self.items.drain(..excess);
        excess
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_warning()).count()
    }

    pub fn hint_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_hint()).count()
    }

    /// Count diagnostics carrying the given code.
    pub fn count_of(&self, code: DiagnosticCode) -> usize {
        self.items.iter().filter(|d| d.code == code).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
