//! Diagnostic Hook
//!
//! Lets the host observe what the core considers noteworthy (initialization
//! failures, misbehaving progress streams, failed queries) without the core
//! writing to a console of its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured diagnostic record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity
    pub level: DiagnosticLevel,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Component that produced the diagnostic (e.g. `sync`, `query`)
    pub target: String,
    /// Human-readable message
    pub message: String,
    /// Structured fields
    pub fields: BTreeMap<String, String>,
}

impl Diagnostic {
    pub fn new(
        level: DiagnosticLevel,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Receiver for core diagnostics.
///
/// Called synchronously from whichever task produced the diagnostic, so
/// implementations should hand off slow work (disk, network) themselves.
///
/// Any `Fn(&Diagnostic) + Send + Sync` closure is a sink:
///
/// ```
/// use bridge_traits::diagnostics::{Diagnostic, DiagnosticSink};
/// use std::sync::Arc;
///
/// let sink: Arc<dyn DiagnosticSink> = Arc::new(|diagnostic: &Diagnostic| {
///     eprintln!("[{:?}] {}", diagnostic.level, diagnostic.message);
/// });
/// ```
pub trait DiagnosticSink: Send + Sync {
    /// Deliver one diagnostic.
    fn report(&self, diagnostic: &Diagnostic);

    /// Diagnostics below this level are not delivered.
    fn min_level(&self) -> DiagnosticLevel {
        DiagnosticLevel::Info
    }
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn report(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}
