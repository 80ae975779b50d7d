use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::Broker;
use crate::config::WrapConfig;
use crate::error::BrokerError;

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);
const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Synchronous-style Kafka producer: every `send` waits for the broker's
/// acknowledgement before returning.
pub struct KafkaBroker {
    producer: FutureProducer,
    bootstrap: String,
}

impl KafkaBroker {
    /// Producer settings derived from config: mutual TLS with the decoded PEM
    /// material, leader acknowledgement, and the configured client id.
    ///
    /// Keys are handed to OpenSSL as-is, so PKCS#1, PKCS#8 and SEC1 EC keys
    /// are all accepted.
    pub fn client_config(config: &WrapConfig) -> ClientConfig {
        let verify = if config.insecure_skip_verify { "false" } else { "true" };

        let mut client = ClientConfig::new();
        client
            .set("client.id", config.client_id.as_str())
            .set("acks", "1")
            .set("security.protocol", "ssl")
            .set("ssl.ca.pem", pem(&config.tls.ca))
            .set("ssl.certificate.pem", pem(&config.tls.cert))
            .set("ssl.key.pem", pem(&config.tls.private_key))
            .set("enable.ssl.certificate.verification", verify);
        if config.insecure_skip_verify {
            client.set("ssl.endpoint.identification.algorithm", "none");
        }
        client
    }

    /// Connects to the `host:port` brokers from config.
    pub async fn connect(config: &WrapConfig) -> Result<Self, BrokerError> {
        Self::connect_with(Self::client_config(config), &config.brokers, METADATA_TIMEOUT).await
    }

    /// Creates the producer and waits for cluster metadata, so an unreachable
    /// cluster fails here rather than on the first delivery.
    pub async fn connect_with(
        mut client: ClientConfig,
        brokers: &[String],
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        if brokers.is_empty() {
            return Err(BrokerError::NoBrokers);
        }

        let bootstrap = brokers.join(",");
        let producer: FutureProducer = client
            .set("bootstrap.servers", bootstrap.as_str())
            .create()
            .map_err(BrokerError::Config)?;

        let lookup = producer.clone();
        let metadata = tokio::task::spawn_blocking(move || lookup.client().fetch_metadata(None, timeout))
            .await?
            .map_err(|source| BrokerError::Unreachable {
                brokers: bootstrap.clone(),
                source,
            })?;

        info!(brokers = %bootstrap, cluster_size = metadata.brokers().len(), "broker connected");
        Ok(Self { producer, bootstrap })
    }

    pub fn bootstrap(&self) -> &str {
        &self.bootstrap
    }
}

impl Broker for KafkaBroker {
    async fn send(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        let record = FutureRecord::<(), [u8]>::to(topic).payload(&payload);
        self.producer
            .send(record, QUEUE_TIMEOUT)
            .await
            .map_err(|(source, _)| BrokerError::Rejected {
                topic: topic.to_string(),
                source,
            })?;

        debug!(topic, bytes = payload.len(), "delivered");
        Ok(())
    }

    async fn close(self) {
        info!(brokers = %self.bootstrap, "closing broker producer");
        let producer = self.producer;
        match tokio::task::spawn_blocking(move || producer.flush(FLUSH_TIMEOUT)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("producer flush failed: {}", e),
            Err(e) => warn!("producer flush task failed: {}", e),
        }
    }
}

fn pem(material: &[u8]) -> String {
    String::from_utf8_lossy(material).into_owned()
}
