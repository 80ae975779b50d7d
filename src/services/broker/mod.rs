pub mod kafka;

use std::future::Future;

use crate::error::BrokerError;

pub use kafka::KafkaBroker;

/// Destination of relayed records.
///
/// `send` is awaited to completion before the relay dequeues the next item,
/// so an implementation never sees two deliveries in flight.
pub trait Broker: Send + 'static {
    fn send(
        &mut self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Releases the connection. Called once, after the last send.
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}
