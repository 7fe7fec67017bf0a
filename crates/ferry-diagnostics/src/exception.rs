//! Captured script exceptions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A script exception captured at the bridge boundary.
///
/// This is the engine-neutral snapshot of what a try/catch around a script
/// call observed. Location fields are optional because native functions and
/// some engine-internal failures carry no script position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptException {
    /// Error class name (e.g. "TypeError")
    pub name: String,
    /// Exception message
    pub message: String,
    /// Script resource name the exception was thrown from
    pub source_name: Option<String>,
    /// 1-indexed line
    pub line: Option<u32>,
    /// 1-indexed column
    pub column: Option<u32>,
    /// Text of the offending line, when the engine provides it
    pub line_source: Option<String>,
    /// Formatted stack trace
    pub stack: Option<String>,
}

impl ScriptException {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            source_name: None,
            line: None,
            column: None,
            line_source: None,
            stack: None,
        }
    }

    /// Shorthand for a plain `Error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    /// Attach a script location.
    pub fn at(mut self, source_name: impl Into<String>, line: u32, column: u32) -> Self {
        self.source_name = Some(source_name.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_line_source(mut self, text: impl Into<String>) -> Self {
        self.line_source = Some(text.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// "name: message", the way script engines print uncaught errors.
    pub fn title(&self) -> String {
        if self.name.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {}", self.name, self.message)
        }
    }

    /// "file:line:column" if the location is known.
    pub fn location(&self) -> Option<String> {
        let source = self.source_name.as_deref()?;
        match (self.line, self.column) {
            (Some(line), Some(column)) => Some(format!("{}:{}:{}", source, line, column)),
            (Some(line), None) => Some(format!("{}:{}", source, line)),
            _ => Some(source.to_string()),
        }
    }
}

impl fmt::Display for ScriptException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())?;
        if let Some(loc) = self.location() {
            write!(f, " ({})", loc)?;
        }
        Ok(())
    }
}
