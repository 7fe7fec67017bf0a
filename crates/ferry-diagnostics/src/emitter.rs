//! Diagnostic emitters for different output formats.
//!
//! An emitter is the developer-facing half of the diagnostic channel: it is
//! where a swallowed script exception becomes visible.

use crate::diagnostic::{Diagnostic, Diagnostics, Severity};
use crate::source_cache::SourceCache;
use std::io::Write;

/// Trait for emitting diagnostics in various formats.
pub trait DiagnosticEmitter {
    /// Emit a single diagnostic.
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()>;

    /// Emit multiple diagnostics.
    fn emit_all(&mut self, diagnostics: &Diagnostics, cache: &SourceCache) -> std::io::Result<()> {
        for diag in diagnostics.iter() {
            self.emit(diag, cache)?;
        }
        Ok(())
    }

    /// Emit a summary line.
    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()>;
}

/// The offending line for a diagnostic: what the engine captured, else
/// what the source cache knows.
fn offending_line<'a>(diagnostic: &'a Diagnostic, cache: &'a SourceCache) -> Option<&'a str> {
    let exc = diagnostic.exception.as_ref()?;
    if let Some(text) = exc.line_source.as_deref() {
        return Some(text);
    }
    cache.line_text(exc.source_name.as_deref()?, exc.line?)
}

/// Rich terminal output with colors and code snippets.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colored: bool,
}

impl<W: Write> TerminalEmitter<W> {
    /// Create a new terminal emitter.
    pub fn new(writer: W, colored: bool) -> Self {
        Self { writer, colored }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Get ANSI color code for severity.
    fn severity_color(&self, severity: Severity) -> &'static str {
        if !self.colored {
            return "";
        }
        match severity {
            Severity::Error => "\x1b[31m",   // Red
            Severity::Warning => "\x1b[33m", // Yellow
            Severity::Hint => "\x1b[34m",    // Blue
        }
    }

    /// Get ANSI reset code.
    fn reset(&self) -> &'static str {
        if self.colored {
            "\x1b[0m"
        } else {
            ""
        }
    }

    /// Get bold ANSI code.
    fn bold(&self) -> &'static str {
        if self.colored {
            "\x1b[1m"
        } else {
            ""
        }
    }

    /// Get cyan ANSI code (for line numbers).
    fn cyan(&self) -> &'static str {
        if self.colored {
            "\x1b[36m"
        } else {
            ""
        }
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let color = self.severity_color(diagnostic.severity);
        let reset = self.reset();
        let bold = self.bold();
        let cyan = self.cyan();

        // Header: error[B001]: TypeError: message
        writeln!(
            self.writer,
            "{}{}{}[{}]{}: {}",
            bold,
            color,
            diagnostic.severity.as_str(),
            diagnostic.code.as_str(),
            reset,
            diagnostic.message
        )?;

        if let Some(exc) = &diagnostic.exception {
            if let Some(loc) = exc.location() {
                writeln!(self.writer, "  {}-->{} {}", cyan, reset, loc)?;
            }

            if let (Some(line_num), Some(line_text)) = (exc.line, offending_line(diagnostic, cache)) {
                let line_str = format!("{}", line_num);
                let padding = " ".repeat(line_str.len());

                writeln!(self.writer, "{} {}|{}", padding, cyan, reset)?;
                writeln!(self.writer, "{}{} |{} {}", cyan, line_str, reset, line_text)?;

                if let Some(column) = exc.column {
                    let caret_col = (column.max(1) - 1) as usize;
                    let caret_col = caret_col.min(line_text.len());
                    writeln!(
                        self.writer,
                        "{} {}|{} {}{}^{}",
                        padding,
                        cyan,
                        reset,
                        " ".repeat(caret_col),
                        color,
                        reset
                    )?;
                }
            }

            if let Some(stack) = &exc.stack {
                for frame in stack.lines() {
                    writeln!(self.writer, "  {}|{} {}", cyan, reset, frame)?;
                }
            }
        }

        for note in &diagnostic.notes {
            writeln!(self.writer, "  {}= note:{} {}", cyan, reset, note)?;
        }

        if let Some(ref help) = diagnostic.help {
            writeln!(self.writer, "  {}= help:{} {}", cyan, reset, help)?;
        }

        writeln!(self.writer)?;
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let errors = diagnostics.error_count();
        let warnings = diagnostics.warning_count();

        let color = if errors > 0 {
            self.severity_color(Severity::Error)
        } else if warnings > 0 {
            self.severity_color(Severity::Warning)
        } else {
            ""
        };
        let reset = self.reset();

        if errors > 0 || warnings > 0 {
            write!(self.writer, "{}", color)?;
            if errors > 0 {
                write!(
                    self.writer,
                    "{} script error{}",
                    errors,
                    if errors == 1 { "" } else { "s" }
                )?;
            }
            if errors > 0 && warnings > 0 {
                write!(self.writer, " and ")?;
            }
            if warnings > 0 {
                write!(
                    self.writer,
                    "{} warning{}",
                    warnings,
                    if warnings == 1 { "" } else { "s" }
                )?;
            }
            writeln!(self.writer, " caught at the bridge{}", reset)?;
        }

        Ok(())
    }
}

/// JSON output for tooling integration.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    /// Create a new JSON emitter.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let exc = diagnostic.exception.as_ref();

        let json = serde_json::json!({
            "code": diagnostic.code.as_str(),
            "severity": diagnostic.severity.as_str(),
            "message": diagnostic.message,
            "exception": exc.map(|e| serde_json::json!({
                "name": e.name,
                "message": e.message,
                "source": e.source_name,
                "line": e.line,
                "column": e.column,
                "lineSource": offending_line(diagnostic, cache),
                "stack": e.stack,
            })),
            "notes": diagnostic.notes,
            "help": diagnostic.help,
        });

        serde_json::to_writer(&mut self.writer, &json)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let summary = serde_json::json!({
            "type": "summary",
            "errors": diagnostics.error_count(),
            "warnings": diagnostics.warning_count(),
            "hints": diagnostics.hint_count(),
            "total": diagnostics.len(),
        });
        serde_json::to_writer(&mut self.writer, &summary)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

/// Simple text output (no colors, one line per diagnostic).
pub struct SimpleEmitter<W: Write> {
    writer: W,
}

impl<W: Write> SimpleEmitter<W> {
    /// Create a new simple emitter.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DiagnosticEmitter for SimpleEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, _cache: &SourceCache) -> std::io::Result<()> {
        let loc = diagnostic.exception.as_ref().and_then(|e| e.location());

        if let Some(loc) = loc {
            writeln!(
                self.writer,
                "{}: {}: {} [{}]",
                loc,
                diagnostic.severity.as_str(),
                diagnostic.message,
                diagnostic.code.as_str()
            )
        } else {
            writeln!(
                self.writer,
                "{}: {} [{}]",
                diagnostic.severity.as_str(),
                diagnostic.message,
                diagnostic.code.as_str()
            )
        }
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{} error(s), {} warning(s)",
            diagnostics.error_count(),
            diagnostics.warning_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::exception::ScriptException;

    fn sample() -> Diagnostic {
        let exc = ScriptException::new("TypeError", "undefined is not a function").at("app.js", 2, 5);
        Diagnostic::from_exception(DiagnosticCode::CallPropertyThrew, &exc)
    }

    #[test]
    fn test_terminal_renders_cached_line() {
        let mut cache = SourceCache::new();
        cache.add_script("app.js", "var a = 1;\nfoo.bar();\n");

        let mut emitter = TerminalEmitter::new(Vec::new(), false);
        emitter.emit(&sample(), &cache).unwrap();
        let out = String::from_utf8(emitter.into_inner()).unwrap();

        assert!(out.starts_with("error[B001]: TypeError: undefined is not a function\n"));
        assert!(out.contains("--> app.js:2:5"));
        assert!(out.contains("2 | foo.bar();"));
        assert!(out.contains("|     ^"));
    }

    #[test]
    fn test_terminal_prefers_engine_line_source() {
        let exc = ScriptException::error("boom")
            .at("app.js", 1, 1)
            .with_line_source("throw new Error('boom');");
        let diag = Diagnostic::from_exception(DiagnosticCode::EmitThrew, &exc);

        let mut emitter = TerminalEmitter::new(Vec::new(), false);
        emitter.emit(&diag, &SourceCache::new()).unwrap();
        let out = String::from_utf8(emitter.into_inner()).unwrap();
        assert!(out.contains("1 | throw new Error('boom');"));
    }

    #[test]
    fn test_terminal_renders_notes_and_help() {
        let diag = Diagnostic::new(DiagnosticCode::ReleaseWhileAttached, "release of proxy 0x1 ignored")
            .with_note("operation: release")
            .with_help("detach the proxy before releasing it")
            .build();

        let mut emitter = TerminalEmitter::new(Vec::new(), false);
        emitter.emit(&diag, &SourceCache::new()).unwrap();
        let out = String::from_utf8(emitter.into_inner()).unwrap();

        assert!(out.starts_with("hint[B101]: release of proxy 0x1 ignored\n"));
        assert!(out.contains("  = note: operation: release\n"));
        assert!(out.contains("  = help: detach the proxy before releasing it\n"));
    }

    #[test]
    fn test_json_emitter() {
        let mut emitter = JsonEmitter::new(Vec::new());
        emitter.emit(&sample(), &SourceCache::new()).unwrap();
        let out = String::from_utf8(emitter.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();

        assert_eq!(value["code"], "B001");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["exception"]["name"], "TypeError");
        assert_eq!(value["exception"]["line"], 2);
        assert!(value["exception"]["lineSource"].is_null());
    }

    #[test]
    fn test_simple_emitter() {
        let mut emitter = SimpleEmitter::new(Vec::new());
        emitter.emit(&sample(), &SourceCache::new()).unwrap();
        let out = String::from_utf8(emitter.into_inner()).unwrap();
        assert_eq!(
            out,
            "app.js:2:5: error: TypeError: undefined is not a function [B001]\n"
        );
    }
}
