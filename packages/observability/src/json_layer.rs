//! JSONL event layer.
//!
//! One line per event:
//!
//! ```text
//! {"timestamp":"...Z","level":"WARN","service":"message-dispatcher","pid":42,
//!  "target":"dispatch_core::dispatcher","message":"Failed to send message",
//!  "fields":{"message_id":7,"error":"..."},"spans":["cycle"],"location":"src/dispatcher.rs:88"}
//! ```

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// One serialized log line.
#[derive(Debug, Serialize)]
pub struct LogEntry<'a> {
    pub timestamp: String,
    pub level: &'a str,
    pub service: &'a str,
    pub pid: u32,
    pub target: &'a str,
    pub message: String,
    /// Structured event fields, sorted by name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<&'static str, Value>,
    /// Enclosing span names, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<&'static str>,
    /// `file:line` of the callsite when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Splits an event into its message and the remaining fields.
#[derive(Default)]
struct EventFields {
    message: String,
    fields: BTreeMap<&'static str, Value>,
}

impl EventFields {
    fn record_value(&mut self, field: &Field, value: Value) {
        match (field.name(), value) {
            ("message", Value::String(text)) => self.message = text,
            (name, value) => {
                self.fields.insert(name, value);
            }
        }
    }
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::from(value));
    }

    // Non-finite floats have no JSON number form; `Value::from` maps them to null.
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, Value::String(value.to_string()));
    }
}

/// Layer that writes every event as a single JSON line to `make_writer`.
pub struct JsonLayer<W> {
    service_name: String,
    pid: u32,
    make_writer: W,
}

impl<W> JsonLayer<W> {
    pub fn new(service_name: String, make_writer: W) -> Self {
        Self {
            service_name,
            pid: std::process::id(),
            make_writer,
        }
    }
}

impl<S, W> Layer<S> for JsonLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut recorded = EventFields::default();
        event.record(&mut recorded);

        let spans = ctx
            .event_scope(event)
            .map(|scope| scope.from_root().map(|span| span.name()).collect())
            .unwrap_or_default();
        let location = metadata
            .file()
            .zip(metadata.line())
            .map(|(file, line)| format!("{file}:{line}"));

        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            level: metadata.level().as_str(),
            service: &self.service_name,
            pid: self.pid,
            target: metadata.target(),
            message: recorded.message,
            fields: recorded.fields,
            spans,
            location,
        };

        // Build the whole line first so concurrent writers never interleave.
        let mut line = match serde_json::to_vec(&entry) {
            Ok(line) => line,
            Err(_) => return,
        };
        line.push(b'\n');
        let _ = self.make_writer.make_writer().write_all(&line);
    }
}
