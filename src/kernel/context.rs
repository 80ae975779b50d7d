use std::path::{Path, PathBuf};

use crate::config::WrapConfig;

/// Per-kind destination topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub event: String,
    pub profile: String,
}

/// Immutable run context, built once before any task starts.
///
/// Everything that brands records or names sockets reads from here;
/// nothing writes to it after construction.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub checksum: String,
    pub topics: Topics,
    pub socket_dir: PathBuf,
    pub pid: u32,
}

impl RunContext {
    pub fn new(checksum: String, topics: Topics, socket_dir: impl Into<PathBuf>) -> Self {
        Self {
            checksum,
            topics,
            socket_dir: socket_dir.into(),
            pid: std::process::id(),
        }
    }

    pub fn from_config(checksum: String, config: &WrapConfig) -> Self {
        Self::new(
            checksum,
            Topics {
                event: config.event_topic.clone(),
                profile: config.prof_topic.clone(),
            },
            &config.socket_dir,
        )
    }

    /// `<socket_dir>/data-<pid>`
    pub fn data_socket(&self) -> PathBuf {
        socket_path(&self.socket_dir, "data", self.pid)
    }

    /// `<socket_dir>/log-<pid>`
    pub fn log_socket(&self) -> PathBuf {
        socket_path(&self.socket_dir, "log", self.pid)
    }
}

fn socket_path(dir: &Path, kind: &str, pid: u32) -> PathBuf {
    dir.join(format!("{}-{}", kind, pid))
}
