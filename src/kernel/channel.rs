use tokio::sync::mpsc;
use tracing::{debug, info};

use super::event::Relayable;
use crate::error::ChannelError;

pub type Object = Box<dyn Relayable>;

/// Producer side of the object channel. Cheap to clone; each producer owns
/// its own handle.
///
/// The channel is closed once every handle is gone. `close` drops the
/// orchestrator's handle explicitly; the relay then sees end-of-stream only
/// after the remaining producers finish and every queued item is drained.
#[derive(Debug, Clone)]
pub struct ObjectSender {
    tx: mpsc::Sender<Object>,
}

/// Consumer side. Exactly one exists, owned by the outbound relay.
#[derive(Debug)]
pub struct ObjectReceiver {
    rx: mpsc::Receiver<Object>,
}

/// Bounded FIFO: a full channel stalls producers until the relay catches up.
pub fn object_channel(capacity: usize) -> (ObjectSender, ObjectReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ObjectSender { tx }, ObjectReceiver { rx })
}

impl ObjectSender {
    pub async fn send(&self, object: Object) -> Result<(), ChannelError> {
        self.tx.send(object).await.map_err(|_| ChannelError::QueueClosed)
    }

    /// Releases this handle. No further writes go through it.
    pub fn close(self) {
        info!("closing object channel");
        drop(self);
    }
}

impl ObjectReceiver {
    /// Next object in arrival order, `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<Object> {
        let next = self.rx.recv().await;
        if next.is_none() {
            debug!("object channel drained");
        }
        next
    }
}
