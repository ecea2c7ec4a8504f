//! Observability for ramvfs
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed events
//! - Per-disk counters
//!
//! Observability is read-only: nothing here touches the disk.
//!
//! ```ignore
//! use ramvfs::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::EntryCreated, &[("addr", "1")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{min_severity, set_min_severity, Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

fn severity_for(event: Event) -> Severity {
    if event.is_failure() {
        Severity::Warn
    } else if event.is_detail() {
        Severity::Trace
    } else {
        Severity::Info
    }
}

/// Log an event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_for(event), event.as_str(), fields);
}
