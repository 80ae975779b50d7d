use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::channel::ObjectReceiver;
use super::context::RunContext;
use crate::error::RelayError;
use crate::services::broker::Broker;

/// Close handle of the outbound relay.
pub struct RelayHandle<B: Broker> {
    task: JoinHandle<(Result<u64, RelayError>, B)>,
}

/// Starts the single consumer of the object channel.
///
/// Each object is branded, encoded and delivered before the next one is
/// dequeued. The first encode or delivery failure stops the loop; nothing
/// is retried and nothing already delivered is undone.
pub fn relay<B: Broker>(objects: ObjectReceiver, broker: B, ctx: Arc<RunContext>) -> RelayHandle<B> {
    let task = tokio::spawn(async move {
        let mut broker = broker;
        let result = drain(objects, &mut broker, &ctx).await;
        (result, broker)
    });
    RelayHandle { task }
}

async fn drain<B: Broker>(
    mut objects: ObjectReceiver,
    broker: &mut B,
    ctx: &RunContext,
) -> Result<u64, RelayError> {
    let mut delivered = 0u64;

    // `objects` is dropped on every exit path, so producers see a closed
    // channel instead of blocking on a relay that stopped.
    while let Some(mut object) = objects.recv().await {
        let id = Uuid::new_v4();
        object.brand(id, &ctx.checksum);

        let payload = object
            .encode()
            .map_err(|source| RelayError::Encode { id, source })?;
        let topic = object.topic(&ctx.topics);
        debug!(%id, topic, bytes = payload.len(), "producer got {}", String::from_utf8_lossy(&payload));

        broker
            .send(topic, payload)
            .await
            .map_err(|source| RelayError::Delivery { id, source })?;
        delivered += 1;
    }

    Ok(delivered)
}

impl<B: Broker> RelayHandle<B> {
    /// Waits for the loop to end (channel drained, or aborted), then releases
    /// the broker. Returns how many objects were delivered.
    pub async fn close(self) -> Result<u64, RelayError> {
        let (result, broker) = self.task.await?;
        info!("closing broker producer");
        broker.close().await;
        result
    }
}
