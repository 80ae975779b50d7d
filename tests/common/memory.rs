use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use std::sync::{Arc, Mutex};

use wrap::error::BrokerError;
use wrap::services::broker::Broker;

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Broker that records every delivery. Clones share the log, so a test keeps
/// one clone and hands the other to the relay.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    fail_after: Option<usize>,
    closed: Arc<Mutex<bool>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses every delivery after the first `n`.
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

impl Broker for MemoryBroker {
    async fn send(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        let mut deliveries = self.deliveries.lock().unwrap();

        if let Some(limit) = self.fail_after {
            if deliveries.len() >= limit {
                return Err(BrokerError::Rejected {
                    topic: topic.to_string(),
                    source: KafkaError::MessageProduction(RDKafkaErrorCode::MessageSizeTooLarge),
                });
            }
        }

        deliveries.push(Delivery {
            topic: topic.to_string(),
            payload: serde_json::from_slice(&payload).expect("relayed payload is JSON"),
        });
        Ok(())
    }

    async fn close(self) {
        *self.closed.lock().unwrap() = true;
    }
}
