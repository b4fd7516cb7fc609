//! Diagnostic reporting.
//!
//! [`DiagnosticReporter`] is how the core reports anything a host may want to
//! surface or record: each report is emitted as a `tracing` event and, when a
//! [`DiagnosticSink`] was configured, delivered to it as a [`Diagnostic`].

use bridge_traits::diagnostics::{Diagnostic, DiagnosticLevel, DiagnosticSink};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Component names used as diagnostic targets.
pub mod targets {
    pub const SYNC: &str = "sync";
    pub const QUERY: &str = "query";
    pub const STORE: &str = "store";
}

#[derive(Clone, Default)]
pub struct DiagnosticReporter {
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl DiagnosticReporter {
    pub fn new(sink: Option<Arc<dyn DiagnosticSink>>) -> Self {
        Self { sink }
    }

    /// Reporter that only logs.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Log and forward one diagnostic.
    pub fn report(&self, diagnostic: Diagnostic) {
        let fields = render_fields(&diagnostic);
        let component = diagnostic.target.as_str();
        let message = diagnostic.message.as_str();
        match diagnostic.level {
            DiagnosticLevel::Trace => trace!(component, fields = %fields, "{}", message),
            DiagnosticLevel::Debug => debug!(component, fields = %fields, "{}", message),
            DiagnosticLevel::Info => info!(component, fields = %fields, "{}", message),
            DiagnosticLevel::Warn => warn!(component, fields = %fields, "{}", message),
            DiagnosticLevel::Error => error!(component, fields = %fields, "{}", message),
        }

        if let Some(sink) = &self.sink {
            if diagnostic.level >= sink.min_level() {
                sink.report(&diagnostic);
            }
        }
    }

    pub fn warn(&self, target: &str, message: impl Into<String>) -> Report<'_> {
        Report::new(self, DiagnosticLevel::Warn, target, message)
    }

    pub fn error(&self, target: &str, message: impl Into<String>) -> Report<'_> {
        Report::new(self, DiagnosticLevel::Error, target, message)
    }

    pub fn info(&self, target: &str, message: impl Into<String>) -> Report<'_> {
        Report::new(self, DiagnosticLevel::Info, target, message)
    }
}

impl fmt::Debug for DiagnosticReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticReporter")
            .field("has_sink", &self.has_sink())
            .finish()
    }
}

/// A diagnostic being assembled; sent by [`Report::emit`].
#[must_use = "call `emit()` to deliver the diagnostic"]
pub struct Report<'a> {
    reporter: &'a DiagnosticReporter,
    diagnostic: Diagnostic,
}

impl<'a> Report<'a> {
    fn new(
        reporter: &'a DiagnosticReporter,
        level: DiagnosticLevel,
        target: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            reporter,
            diagnostic: Diagnostic::new(level, target, message),
        }
    }

    pub fn field(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.diagnostic = self.diagnostic.with_field(key, value.to_string());
        self
    }

    /// Attach an underlying error; only logs and the sink ever see it.
    pub fn cause(self, cause: &dyn std::error::Error) -> Self {
        self.field("cause", cause)
    }

    pub fn emit(self) {
        self.reporter.report(self.diagnostic);
    }
}

fn render_fields(diagnostic: &Diagnostic) -> String {
    diagnostic
        .fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(" ")
}
