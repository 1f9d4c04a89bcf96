//! Recording notification sink.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use readflow_core::event::EventEnvelope;
use readflow_core::sink::NotificationSink;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// [`NotificationSink`] that records every delivery for assertions.
#[derive(Clone, Default)]
pub struct RecordingNotificationSink {
    deliveries: Arc<Mutex<Vec<(String, EventEnvelope)>>>,
}

impl RecordingNotificationSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(topic, envelope)` deliveries so far, in order.
    #[must_use]
    pub fn deliveries(&self) -> Vec<(String, EventEnvelope)> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Topics delivered to so far, in order, with repeats.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    /// Number of deliveries so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    /// Whether nothing has been delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deliveries.lock().unwrap().is_empty()
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn notify<'a>(
        &'a self,
        topic: &'a str,
        envelope: &'a EventEnvelope,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.deliveries
                .lock()
                .unwrap()
                .push((topic.to_string(), envelope.clone()));
        })
    }
}
