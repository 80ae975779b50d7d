//! Error types, one enum per component.
//!
//! Startup errors (config, integrity, bind, broker connect, spawn) end the
//! run. Errors reported by close handles at shutdown are logged only.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("incomplete configuration, missing: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] figment::Error),

    #[error("{key} is not valid base64: {source}")]
    Encoding {
        key: &'static str,
        #[source]
        source: base64::DecodeError,
    },
}

#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("executable not found: {0}")]
    NotFound(String),

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("release check request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("release check returned unexpected status {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("failed to start child {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting on child: {0}")]
    Wait(#[source] std::io::Error),
}

/// Errors of the two local IPC listeners.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("cannot bind {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record on line {line}: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("record on line {line} exceeds {limit} bytes")]
    Oversized { line: u64, limit: usize },

    #[error("object channel closed")]
    QueueClosed,

    #[error("listener task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("invalid producer configuration: {0}")]
    Config(#[source] rdkafka::error::KafkaError),

    #[error("no broker configured")]
    NoBrokers,

    #[error("no broker reachable at {brokers}: {source}")]
    Unreachable {
        brokers: String,
        #[source]
        source: rdkafka::error::KafkaError,
    },

    #[error("delivery to {topic} failed: {source}")]
    Rejected {
        topic: String,
        #[source]
        source: rdkafka::error::KafkaError,
    },

    #[error("producer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("failed to encode {id}: {source}")]
    Encode {
        id: uuid::Uuid,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to deliver {id}: {source}")]
    Delivery {
        id: uuid::Uuid,
        #[source]
        source: BrokerError,
    },

    #[error("relay task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
