use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::error;

use crate::error::ConfigError;

pub const ENV_PREFIX: &str = "AUKLET_";

/// Keys that must be present. Their values are always taken as text.
const REQUIRED: [&str; 7] = [
    "base_url",
    "brokers",
    "prof_topic",
    "event_topic",
    "ca",
    "cert",
    "private_key",
];

/// Resolved configuration. Every required value is present and non-empty.
#[derive(Debug, Clone)]
pub struct WrapConfig {
    pub base_url: String,
    pub brokers: Vec<String>,
    pub prof_topic: String,
    pub event_topic: String,
    pub tls: TlsMaterial,
    pub socket_dir: PathBuf,
    pub queue_capacity: usize,
    pub client_id: String,
    pub insecure_skip_verify: bool,
}

/// Decoded PEM material for the broker connection.
#[derive(Clone)]
pub struct TlsMaterial {
    pub ca: Vec<u8>,
    pub cert: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("ca", &format_args!("{} bytes", self.ca.len()))
            .field("cert", &format_args!("{} bytes", self.cert.len()))
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Shape extracted from figment before validation.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default, deserialize_with = "text")]
    base_url: Option<String>,
    #[serde(default, deserialize_with = "text")]
    brokers: Option<String>,
    #[serde(default, deserialize_with = "text")]
    prof_topic: Option<String>,
    #[serde(default, deserialize_with = "text")]
    event_topic: Option<String>,
    #[serde(default, deserialize_with = "text")]
    ca: Option<String>,
    #[serde(default, deserialize_with = "text")]
    cert: Option<String>,
    #[serde(default, deserialize_with = "text")]
    private_key: Option<String>,
    socket_dir: PathBuf,
    queue_capacity: usize,
    client_id: String,
    insecure_skip_verify: bool,
}

#[derive(Serialize)]
struct ConfigDefaults {
    socket_dir: PathBuf,
    queue_capacity: usize,
    client_id: String,
    insecure_skip_verify: bool,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            socket_dir: PathBuf::from("."),
            queue_capacity: 100,
            client_id: "wrap".to_string(),
            insecure_skip_verify: false,
        }
    }
}

impl WrapConfig {
    /// Defaults, then `AUKLET_*` environment variables.
    ///
    /// The env provider parses values as data, so `007` would arrive as the
    /// number 7. Required keys are layered again on top, verbatim.
    pub fn load() -> Result<Self, ConfigError> {
        let env = Env::prefixed(ENV_PREFIX);
        let verbatim: BTreeMap<String, String> = env
            .iter()
            .map(|(key, value)| (key.as_str().to_ascii_lowercase(), value))
            .filter(|(key, _)| REQUIRED.contains(&key.as_str()))
            .collect();

        Self::from_figment(
            Figment::new()
                .merge(env)
                .merge(Serialized::defaults(verbatim)),
        )
    }

    /// Resolves from any figment; crate defaults sit underneath it.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let raw: RawConfig = Figment::from(Serialized::defaults(ConfigDefaults::default()))
            .merge(figment)
            .extract()?;

        let mut missing = Vec::new();
        let mut require = |key: &str, value: Option<String>| -> String {
            match value.filter(|v| !v.trim().is_empty()) {
                Some(v) => v,
                None => {
                    error!("empty envar {}{}", ENV_PREFIX, key.to_uppercase());
                    missing.push(format!("{}{}", ENV_PREFIX, key.to_uppercase()));
                    String::new()
                }
            }
        };

        let base_url = require("base_url", raw.base_url);
        let brokers = require("brokers", raw.brokers);
        let prof_topic = require("prof_topic", raw.prof_topic);
        let event_topic = require("event_topic", raw.event_topic);
        let ca = require("ca", raw.ca);
        let cert = require("cert", raw.cert);
        let private_key = require("private_key", raw.private_key);

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            brokers: split_brokers(&brokers),
            prof_topic,
            event_topic,
            tls: TlsMaterial {
                ca: decode("ca", &ca)?,
                cert: decode("cert", &cert)?,
                private_key: decode("private_key", &private_key)?,
            },
            socket_dir: raw.socket_dir,
            queue_capacity: raw.queue_capacity.max(1),
            client_id: raw.client_id,
            insecure_skip_verify: raw.insecure_skip_verify,
        })
    }
}

/// Scalar values a provider may hand over for a text setting.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Flag(bool),
}

fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Flag(b) => b.to_string(),
    }))
}

fn split_brokers(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}

fn decode(key: &'static str, value: &str) -> Result<Vec<u8>, ConfigError> {
    STANDARD
        .decode(value.trim())
        .map_err(|source| ConfigError::Encoding { key, source })
}
