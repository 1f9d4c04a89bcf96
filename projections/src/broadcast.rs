//! Outbound update broadcasting.
//!
//! Broadcast handlers push raw event envelopes to a notification topic
//! alongside the store-updating handler of their group. Delivery to the
//! outside world is not repeatable, so broadcasters are replay-ineligible:
//! the router skips them entirely during rebuilds, making each broadcast
//! fire exactly once per event over the system's lifetime.

use readflow_core::event::EventEnvelope;
use readflow_core::projection::Result;
use readflow_core::sink::NotificationSink;
use readflow_engine::router::{DispatchMode, ProjectionHandler};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Replay-ineligible handler forwarding envelopes to a sink topic.
///
/// Registered after the store-updating handler of the same group, so the
/// read model is already current when the broadcast fires.
pub struct UpdateBroadcaster {
    aggregate_type: &'static str,
    event_types: &'static [&'static str],
    topic: &'static str,
    sink: Arc<dyn NotificationSink>,
}

impl UpdateBroadcaster {
    /// Create a broadcaster for one group's event types.
    #[must_use]
    pub fn new(
        aggregate_type: &'static str,
        event_types: &'static [&'static str],
        topic: &'static str,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            aggregate_type,
            event_types,
            topic,
            sink,
        }
    }

    /// The topic this broadcaster delivers to.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        self.topic
    }
}

impl ProjectionHandler for UpdateBroadcaster {
    fn aggregate_type(&self) -> &'static str {
        self.aggregate_type
    }

    fn event_types(&self) -> &'static [&'static str] {
        self.event_types
    }

    fn replay_eligible(&self, _event_type: &str) -> bool {
        false
    }

    fn apply<'a>(
        &'a self,
        envelope: &'a EventEnvelope,
        _mode: DispatchMode,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.sink.notify(self.topic, envelope).await;
            Ok(())
        })
    }
}
