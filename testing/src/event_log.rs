//! In-memory event log doubling as a live event source.
//!
//! [`InMemoryEventLog`] implements both boundary traits: [`EventLogReader`]
//! for replays (a finite snapshot of everything appended so far) and
//! [`EventSource`] for live pipelines (appended events are pushed to open
//! subscriptions as they arrive).

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use futures::Stream;
use readflow_core::event::EventEnvelope;
use readflow_core::source::{EventLogReader, EventSource, EventSourceError, EventStream};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

struct LogInner {
    events: Vec<EventEnvelope>,
    subscribers: Vec<(Vec<String>, mpsc::UnboundedSender<EventEnvelope>)>,
    closed: bool,
}

/// In-memory event log and live source for pipeline and replay tests.
///
/// A subscription delivers every already-appended matching event first,
/// then each later append as it happens. [`close`](Self::close) ends all
/// open subscription streams, letting a pipeline run to end-of-stream.
///
/// # Example
///
/// ```
/// use readflow_testing::event_log::InMemoryEventLog;
///
/// let log = InMemoryEventLog::new();
/// // log.append(envelope);
/// log.close();
/// ```
#[derive(Clone)]
pub struct InMemoryEventLog {
    inner: Arc<Mutex<LogInner>>,
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogInner {
                events: Vec::new(),
                subscribers: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Append an envelope to the log and push it to open subscriptions.
    pub fn append(&self, envelope: EventEnvelope) {
        let mut inner = self.inner.lock().unwrap();
        inner.subscribers.retain(|(types, sender)| {
            if !types.contains(&envelope.aggregate_type) {
                return true;
            }
            sender.send(envelope.clone()).is_ok()
        });
        inner.events.push(envelope);
    }

    /// Number of appended events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().events.len()
    }

    /// Whether nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().events.is_empty()
    }

    /// End all open subscription streams and refuse new live deliveries.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        inner.subscribers.clear();
    }

    fn snapshot(&self, aggregate_types: &[String]) -> Vec<EventEnvelope> {
        self.inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| aggregate_types.contains(&e.aggregate_type))
            .cloned()
            .collect()
    }
}

impl EventLogReader for InMemoryEventLog {
    fn read_all(
        &self,
        aggregate_type: &str,
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventSourceError>> + Send + '_>> {
        let snapshot = self.snapshot(&[aggregate_type.to_string()]);
        Box::pin(async move {
            let stream = futures::stream::iter(snapshot.into_iter().map(Ok));
            Ok(Box::pin(stream) as EventStream)
        })
    }
}

impl EventSource for InMemoryEventLog {
    fn subscribe(
        &self,
        aggregate_types: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventSourceError>> + Send + '_>> {
        let types: Vec<String> = aggregate_types.iter().map(ToString::to_string).collect();
        Box::pin(async move {
            let (snapshot, receiver) = {
                let mut inner = self.inner.lock().unwrap();
                let snapshot: Vec<EventEnvelope> = inner
                    .events
                    .iter()
                    .filter(|e| types.contains(&e.aggregate_type))
                    .cloned()
                    .collect();
                let receiver = if inner.closed {
                    None
                } else {
                    let (sender, receiver) = mpsc::unbounded_channel();
                    inner.subscribers.push((types.clone(), sender));
                    Some(receiver)
                };
                (snapshot, receiver)
            };

            let stream = async_stream::stream! {
                for envelope in snapshot {
                    yield Ok(envelope);
                }
                if let Some(mut receiver) = receiver {
                    while let Some(envelope) = receiver.recv().await {
                        yield Ok(envelope);
                    }
                }
            };
            Ok(Box::pin(stream)
                as Pin<Box<dyn Stream<Item = Result<EventEnvelope, EventSourceError>> + Send>>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use readflow_core::aggregate::{AggregateId, SequenceNumber};

    fn envelope(aggregate_type: &str, seq: u64) -> EventEnvelope {
        EventEnvelope {
            aggregate_id: AggregateId::new("id-1"),
            aggregate_type: aggregate_type.to_string(),
            sequence_number: SequenceNumber::new(seq),
            event_type: "Something.v1".to_string(),
            data: Vec::new(),
            metadata: None,
            recorded_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn read_all_filters_by_aggregate_type() {
        let log = InMemoryEventLog::new();
        log.append(envelope("order", 1));
        log.append(envelope("courier", 1));
        log.append(envelope("order", 2));

        let mut stream = log.read_all("order").await.unwrap();
        let mut seen = Vec::new();
        while let Some(item) = stream.next().await {
            seen.push(item.unwrap().sequence_number.value());
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn subscribe_delivers_past_then_live_events() {
        let log = InMemoryEventLog::new();
        log.append(envelope("order", 1));

        let mut stream = log.subscribe(&["order"]).await.unwrap();
        assert_eq!(
            stream.next().await.unwrap().unwrap().sequence_number.value(),
            1
        );

        log.append(envelope("order", 2));
        assert_eq!(
            stream.next().await.unwrap().unwrap().sequence_number.value(),
            2
        );
    }

    #[tokio::test]
    async fn close_ends_the_stream() {
        let log = InMemoryEventLog::new();
        let mut stream = log.subscribe(&["order"]).await.unwrap();
        log.close();
        assert!(stream.next().await.is_none());
    }
}
