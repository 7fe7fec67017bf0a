//! Diagnostic channel for the ferry bridge.
//!
//! Script exceptions raised while the bridge invokes script code never cross
//! back into the managed runtime. They are captured as [`ScriptException`]
//! records and handed to an [`ExceptionReporter`], which:
//! - presents them to the developer (terminal, JSON or plain text output)
//! - reports them through the host's error path (`log::error!`)
//!
//! # Example
//!
//! ```
//! use ferry_diagnostics::{
//!     DiagnosticChannel, DiagnosticCode, ExceptionReporter, ScriptException,
//!     SimpleEmitter,
//! };
//!
//! let channel = DiagnosticChannel::new(Box::new(SimpleEmitter::new(Vec::new())));
//! let exception = ScriptException::new("TypeError", "x is not a function")
//!     .at("app.js", 3, 7);
//! channel.diagnose(DiagnosticCode::CallPropertyThrew, &exception);
//! assert_eq!(channel.report_count(), 1);
//! ```

pub mod channel;
pub mod diagnostic;
pub mod emitter;
pub mod exception;
pub mod source_cache;

// Re-export commonly used types
pub use channel::{DiagnosticChannel, ExceptionReporter, DEFAULT_HISTORY};
pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Diagnostics, Severity};
pub use emitter::{DiagnosticEmitter, JsonEmitter, SimpleEmitter, TerminalEmitter};
pub use exception::ScriptException;
pub use source_cache::{ScriptSource, SourceCache};
