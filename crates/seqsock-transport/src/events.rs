//! Injectable diagnostics context.
//!
//! Every notable transport event or failure is reported through an [`Events`]
//! handle rather than a process-wide singleton, so a hosting application (or a
//! test) can install its own sink per instance. The default sink forwards to
//! the `tracing` subscriber.

use std::fmt;
use std::sync::{Arc, Mutex};

/// How serious an event is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// A notable but expected event (socket opened, connection accepted, ...).
    Notice,
    /// An operation failed.
    Error,
}

/// A single diagnostic event.
#[derive(Clone, Debug)]
pub struct Event {
    pub severity: Severity,
    /// Name of the operation that reported the event.
    pub origin: &'static str,
    /// Event or error name ("socket_opened", "bind", ...).
    pub name: &'static str,
    /// Formatted description.
    pub detail: String,
    /// OS error code when a syscall failed.
    pub os_error: Option<i32>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.detail)?;
        if let Some(code) = self.os_error {
            write!(f, " (os error {code})")?;
        }
        Ok(())
    }
}

/// Receives diagnostic events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &Event);
}

/// Default sink: forwards events to the `tracing` subscriber.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &Event) {
        match event.severity {
            Severity::Notice => {
                tracing::debug!(origin = event.origin, name = event.name, "{}", event.detail);
            }
            Severity::Error => {
                tracing::error!(
                    origin = event.origin,
                    name = event.name,
                    os_error = event.os_error,
                    "{}",
                    event.detail
                );
            }
        }
    }
}

/// Sink that retains every event, for assertions in tests and for hosting
/// applications that post-process diagnostics.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<Event>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Whether an event with the given name was recorded.
    pub fn saw(&self, name: &str) -> bool {
        self.events().iter().any(|event| event.name == name)
    }
}

impl EventSink for CaptureSink {
    fn record(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

/// Cheaply cloneable handle to an event sink.
#[derive(Clone)]
pub struct Events {
    sink: Arc<dyn EventSink>,
}

impl Default for Events {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events").finish_non_exhaustive()
    }
}

impl Events {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Report a notable event.
    pub fn notice(&self, origin: &'static str, name: &'static str, detail: impl Into<String>) {
        self.sink.record(&Event {
            severity: Severity::Notice,
            origin,
            name,
            detail: detail.into(),
            os_error: None,
        });
    }

    /// Report a failure that carries no OS error code.
    pub fn error(&self, origin: &'static str, name: &'static str, detail: impl Into<String>) {
        self.sink.record(&Event {
            severity: Severity::Error,
            origin,
            name,
            detail: detail.into(),
            os_error: None,
        });
    }

    /// Report a failed syscall together with its OS error code.
    pub fn os_error(
        &self,
        origin: &'static str,
        name: &'static str,
        source: &std::io::Error,
        detail: impl Into<String>,
    ) {
        self.sink.record(&Event {
            severity: Severity::Error,
            origin,
            name,
            detail: format!("{}: {source}", detail.into()),
            os_error: source.raw_os_error(),
        });
    }
}
