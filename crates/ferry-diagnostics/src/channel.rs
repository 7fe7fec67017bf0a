//! The diagnostic channel the bridge reports script exceptions through.

use crate::diagnostic::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::emitter::DiagnosticEmitter;
use crate::exception::ScriptException;
use crate::source_cache::SourceCache;
use std::cell::{Cell, RefCell};

/// Receiver for exceptions caught at the bridge boundary.
///
/// Every caught exception goes through both halves: `present` shows it to
/// the developer, `report` sends it down the host's error-reporting path.
pub trait ExceptionReporter {
    /// Developer-facing presentation (the "error dialog").
    fn present(&self, code: DiagnosticCode, exception: &ScriptException);

    /// Log/report path.
    fn report(&self, code: DiagnosticCode, exception: &ScriptException);

    /// Non-exception diagnostics (lifecycle warnings and hints).
    fn notice(&self, _diagnostic: Diagnostic) {}

    /// Present and report, in that order.
    fn diagnose(&self, code: DiagnosticCode, exception: &ScriptException) {
        self.present(code, exception);
        self.report(code, exception);
    }
}

/// Diagnostics a channel keeps between summaries unless told otherwise.
pub const DEFAULT_HISTORY: usize = 256;

/// Default [`ExceptionReporter`]: renders through an emitter, logs with
/// `log::error!`, and keeps the most recent diagnostics for the summary.
pub struct DiagnosticChannel {
    emitter: RefCell<Box<dyn DiagnosticEmitter>>,
    sources: RefCell<SourceCache>,
    recorded: RefCell<Diagnostics>,
    history: usize,
    reports: Cell<usize>,
    dropped: Cell<usize>,
}

impl DiagnosticChannel {
    pub fn new(emitter: Box<dyn DiagnosticEmitter>) -> Self {
        Self {
            emitter: RefCell::new(emitter),
            sources: RefCell::new(SourceCache::new()),
            recorded: RefCell::new(Diagnostics::new()),
            history: DEFAULT_HISTORY,
            reports: Cell::new(0),
            dropped: Cell::new(0),
        }
    }

    /// Keep at most `history` diagnostics; older ones are dropped first.
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }

    /// A channel whose presentation half writes nowhere.
    pub fn silent() -> Self {
        Self::new(Box::new(crate::emitter::SimpleEmitter::new(std::io::sink())))
    }

    /// Register script text so presentations can show the offending line.
    pub fn add_script(&self, name: impl Into<String>, source: impl Into<String>) {
        self.sources.borrow_mut().add_script(name, source);
    }

    /// Number of exceptions that went through the report path.
    pub fn report_count(&self) -> usize {
        self.reports.get()
    }

    /// Diagnostics dropped because the history was full.
    pub fn dropped_count(&self) -> usize {
        self.dropped.get()
    }

    /// Snapshot of the diagnostics recorded since the last summary.
    pub fn diagnostics(&self) -> Diagnostics {
        self.recorded.borrow().clone()
    }

    /// Write the summary line through the presentation emitter and start a
    /// new batch.
    pub fn emit_summary(&self) -> std::io::Result<()> {
        let mut recorded = self.recorded.borrow_mut();
        self.emitter.borrow_mut().emit_summary(&recorded)?;
        recorded.clear();
        Ok(())
    }

    fn record(&self, diagnostic: Diagnostic) {
        let mut recorded = self.recorded.borrow_mut();
        recorded.push(diagnostic);
        let dropped = recorded.retain_last(self.history);
        self.dropped.set(self.dropped.get() + dropped);
    }
}

impl ExceptionReporter for DiagnosticChannel {
    fn present(&self, code: DiagnosticCode, exception: &ScriptException) {
        let diagnostic = Diagnostic::from_exception(code, exception);
        let sources = self.sources.borrow();
        if let Err(e) = self.emitter.borrow_mut().emit(&diagnostic, &sources) {
            log::warn!("failed to present script exception: {}", e);
        }
    }

    fn report(&self, code: DiagnosticCode, exception: &ScriptException) {
        log::error!("[{}] {}", code, exception);
        if let Some(stack) = &exception.stack {
            log::error!("{}", stack);
        }
        self.record(Diagnostic::from_exception(code, exception));
        self.reports.set(self.reports.get() + 1);
    }

    fn notice(&self, diagnostic: Diagnostic) {
        log::warn!("[{}] {}", diagnostic.code, diagnostic.message);
        self.record(diagnostic);
    }
}
