//! # Logging & Tracing Infrastructure
//!
//! Configures `tracing-subscriber` for host applications embedding the core:
//! - Pretty, JSON and compact output formats
//! - Module-level filtering via `EnvFilter`
//! - Optional mirroring of every surviving event into a [`DiagnosticSink`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::diagnostics::DiagnosticLevel;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(DiagnosticLevel::Debug);
//! init_logging(config)?;
//!
//! tracing::info!("Index core started");
//! ```
//!
//! The core itself never installs a subscriber; it only emits `tracing`
//! events. Structured diagnostics meant for the host UI go through
//! [`DiagnosticReporter`](crate::diagnostics::DiagnosticReporter) instead, so a
//! sink passed here and a sink passed in `CoreConfig` would see overlapping
//! reports. Hosts normally pick one.

use crate::error::{Error, Result};

use bridge_traits::diagnostics::{Diagnostic, DiagnosticLevel, DiagnosticSink};

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level
    pub level: DiagnosticLevel,
    /// Custom filter string (e.g., "core_sync=trace,core_library=debug")
    pub filter: Option<String>,
    /// Optional sink that receives a copy of every event
    pub diagnostic_sink: Option<Arc<dyn DiagnosticSink>>,
    /// Log span enter/exit
    pub enable_spans: bool,
    /// Display target module in logs
    pub display_target: bool,
    /// Display thread info
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: DiagnosticLevel::Info,
            filter: None,
            diagnostic_sink: None,
            enable_spans: false,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("diagnostic_sink", &self.diagnostic_sink.is_some())
            .field("enable_spans", &self.enable_spans)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: DiagnosticLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostic_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Install the global `tracing` subscriber.
///
/// Call once at startup; a second call fails because a global subscriber is
/// already set.
///
/// # Errors
///
/// Returns [`Error::Config`] if the filter string is invalid or a subscriber
/// is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    let fmt_layer = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(config.display_target)
            .with_thread_ids(config.display_thread_info)
            .with_thread_names(config.display_thread_info)
            .with_span_events(if config.enable_spans {
                FmtSpan::ACTIVE
            } else {
                FmtSpan::NONE
            })
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .with_target(config.display_target)
            .with_thread_ids(config.display_thread_info)
            .with_thread_names(config.display_thread_info)
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(config.display_target)
            .with_thread_ids(config.display_thread_info)
            .with_thread_names(config.display_thread_info)
            .with_writer(io::stdout)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(DiagnosticSinkLayer::new(config.diagnostic_sink.clone()))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn level_directive(level: DiagnosticLevel) -> &'static str {
    match level {
        DiagnosticLevel::Trace => "trace",
        DiagnosticLevel::Debug => "debug",
        DiagnosticLevel::Info => "info",
        DiagnosticLevel::Warn => "warn",
        DiagnosticLevel::Error => "error",
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let filter_string = match &config.filter {
        Some(custom_filter) => custom_filter.clone(),
        None => {
            // Our crates at the requested level, everything else at warn
            let level = level_directive(config.level);
            let crates = [
                "core_runtime",
                "core_sync",
                "core_library",
                "core_service",
                "ipfs_index_workspace",
            ];
            let mut directives = vec!["warn".to_string()];
            directives.extend(crates.iter().map(|name| format!("{}={}", name, level)));
            directives.join(",")
        }
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

/// Layer that forwards events to a `DiagnosticSink`.
struct DiagnosticSinkLayer {
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl DiagnosticSinkLayer {
    fn new(sink: Option<Arc<dyn DiagnosticSink>>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for DiagnosticSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let metadata = event.metadata();
        let level = tracing_level_to_diagnostic_level(*metadata.level());

        if level < sink.min_level() {
            return;
        }

        let mut visitor = SinkVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .message
            .unwrap_or_else(|| metadata.name().to_string());

        let mut diagnostic = Diagnostic::new(level, metadata.target(), message);
        diagnostic.fields = visitor.fields;

        if let Some(span) = ctx.lookup_current() {
            diagnostic = diagnostic.with_field("span", span.name());
        }

        sink.report(&diagnostic);
    }
}

#[derive(Default)]
struct SinkVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl SinkVisitor {
    fn record_value(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for SinkVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{:?}", value));
    }
}

fn tracing_level_to_diagnostic_level(level: tracing::Level) -> DiagnosticLevel {
    match level {
        tracing::Level::TRACE => DiagnosticLevel::Trace,
        tracing::Level::DEBUG => DiagnosticLevel::Debug,
        tracing::Level::INFO => DiagnosticLevel::Info,
        tracing::Level::WARN => DiagnosticLevel::Warn,
        tracing::Level::ERROR => DiagnosticLevel::Error,
    }
}
