use futures::{stream::BoxStream, StreamExt};
use pitboard_types::events::SystemEvent;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;

/// In-process fan-out of console events backed by a broadcast channel.
/// Slow subscribers skip what they missed; the next view catches them up.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<SystemEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: SystemEvent) {
        if self.tx.send(event).is_err() {
            trace!("No console subscribers");
        }
    }

    pub fn subscribe(&self) -> BoxStream<'static, SystemEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move { event.ok() })
            .boxed()
    }
}
