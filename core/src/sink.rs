//! Outbound notification boundary.
//!
//! Some handlers broadcast updates to the outside world (e.g. a websocket
//! topic) in addition to maintaining their read model. Those broadcasts are
//! not safe to repeat, so the handlers carrying them are registered as
//! replay-ineligible and skipped entirely during replays.

use crate::event::EventEnvelope;
use std::future::Future;
use std::pin::Pin;

/// Fire-and-forget outbound notification delivery.
///
/// The core requires no delivery guarantee from the sink: a notification
/// that cannot be delivered is simply lost. Implementations are external
/// collaborators (message brokers, websocket broadcasters); tests use a
/// recording mock.
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns to enable trait object
/// usage (`Arc<dyn NotificationSink>`).
pub trait NotificationSink: Send + Sync {
    /// Deliver the envelope to subscribers of `topic`. Never fails; errors
    /// are the sink's own concern.
    fn notify<'a>(
        &'a self,
        topic: &'a str,
        envelope: &'a EventEnvelope,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}
