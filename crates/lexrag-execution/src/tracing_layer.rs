//! Custom tracing layer for streaming refinement events to a front-end.
//!
//! Captures events emitted by the `lexrag*` crates together with the fields
//! of their enclosing spans (`query_id`, `session_id`) and forwards them over
//! a tokio channel, so an interactive shell can show loop progress live.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

const TARGET_PREFIX: &str = "lexrag";

/// Event data sent to the front-end
#[derive(Debug, Clone, serde::Serialize)]
pub struct RefinementEvent {
    /// Event target (e.g., "lexrag_application::controller")
    pub target: String,
    /// Log level (INFO, WARN, ERROR)
    pub level: String,
    /// Human-readable message
    pub message: String,
    /// Structured fields from the event
    pub fields: HashMap<String, Value>,
    /// Fields of every enclosing span, outermost first
    pub span: HashMap<String, Value>,
    /// Timestamp
    pub timestamp: String,
}

impl RefinementEvent {
    /// The refinement step this event reports on, if any.
    pub fn step(&self) -> Option<&str> {
        self.fields.get("step").and_then(Value::as_str)
    }

    pub fn iteration(&self) -> Option<u64> {
        self.fields.get("iteration").and_then(Value::as_u64)
    }

    pub fn confidence(&self) -> Option<f64> {
        self.fields.get("confidence").and_then(Value::as_f64)
    }
}

/// A tracing layer that sends `lexrag` events at INFO and above to a channel.
pub struct RefinementEventLayer {
    sender: mpsc::UnboundedSender<RefinementEvent>,
}

impl RefinementEventLayer {
    pub fn new(sender: mpsc::UnboundedSender<RefinementEvent>) -> Self {
        Self { sender }
    }

    /// Creates a layer and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RefinementEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

#[derive(Default)]
struct SpanFields(HashMap<String, Value>);

impl<S> Layer<S> for RefinementEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = SpanFields::default();
        attrs.record(&mut FieldVisitor(&mut fields.0));
        span.extensions_mut().insert(fields);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with(TARGET_PREFIX) || *metadata.level() > Level::INFO {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let mut span_fields = HashMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(stored) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(stored.0.clone());
                }
            }
        }

        let message = fields
            .remove("message")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        // Receiver may be gone; events are best-effort.
        let _ = self.sender.send(RefinementEvent {
            target: metadata.target().to_string(),
            level: metadata.level().to_string(),
            message,
            fields,
            span: span_fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
    }
}

/// Field visitor that extracts tracing fields into a HashMap
struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn forwards_lexrag_events_with_span_fields() {
        let (layer, mut rx) = RefinementEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("refinement", query_id = "q-1", session_id = "default");
            let _entered = span.enter();
            tracing::info!(
                target: "lexrag_application::controller",
                step = "verify",
                iteration = 2u64,
                confidence = 0.5,
                "Step completed"
            );
            tracing::info!(target: "hyper::client", "ignored");
            tracing::debug!(target: "lexrag_application::controller", "too verbose");
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(event.message, "Step completed");
        assert_eq!(event.step(), Some("verify"));
        assert_eq!(event.iteration(), Some(2));
        assert_eq!(event.confidence(), Some(0.5));
        assert_eq!(event.span.get("query_id"), Some(&serde_json::json!("q-1")));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn display_fields_are_recorded_as_text() {
        let (layer, mut rx) = RefinementEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);
        let status = "NEEDS_CORRECTION".to_string();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "lexrag_core", status = %status, "degraded");
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(event.level, "WARN");
        assert_eq!(event.fields.get("status"), Some(&serde_json::json!("NEEDS_CORRECTION")));
    }
}
