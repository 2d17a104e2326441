use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// One recorded event: its message plus every other field, formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

/// A `tracing` layer that keeps every event it sees, in emission order.
///
/// Clones share one buffer, so a test keeps a clone for assertions and hands
/// another to the subscriber.
#[derive(Debug, Clone, Default)]
pub struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a registry with this layer the current thread's subscriber until
    /// the guard drops. Events on other threads are not seen.
    pub fn set_default(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Values of `field` on events whose message is `message`, in order.
    pub fn field_values(&self, message: &str, field: &str) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.message == message)
            .filter_map(|e| e.fields.get(field).cloned())
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for EventCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: BTreeMap<String, String>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let value = format!("{value:?}");
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_message_and_display_fields() {
        let capture = EventCapture::new();
        {
            let _guard = capture.set_default();
            let name = "build";
            tracing::debug!(task = %name, attempt = 2, "task started");
            tracing::info!("unrelated");
        }
        tracing::info!(task = "late", "task started");

        assert_eq!(capture.events().len(), 2);
        assert_eq!(capture.field_values("task started", "task"), vec!["build"]);
        assert_eq!(capture.field_values("task started", "attempt"), vec!["2"]);
    }
}
