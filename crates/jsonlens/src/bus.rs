use tokio::sync::broadcast;

use crate::event::LensEvent;

pub const DEFAULT_BUS_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<LensEvent>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LensEvent> {
        self.sender.subscribe()
    }

    /// Publish to all current subscribers. Having none is not a failure,
    /// the event is simply dropped.
    pub fn publish(&self, event: LensEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!("no subscribers for {event:?}");
                0
            }
        }
    }
}
