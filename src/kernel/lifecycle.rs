use std::fmt;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tracing::{error, info};

use super::channel::{object_channel, ObjectSender};
use super::context::RunContext;
use super::relay::{relay, RelayHandle};
use crate::error::{ChannelError, RelayError};
use crate::ipc::{listen_data, listen_log, DataHandle, LogHandle};
use crate::services::broker::Broker;

/// Top-level run stages, in the only order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Init,
    DigestCheck,
    PipelineUp,
    Supervising,
    Draining,
    Shutdown,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::DigestCheck),
            Stage::DigestCheck => Some(Stage::PipelineUp),
            Stage::PipelineUp => Some(Stage::Supervising),
            Stage::Supervising => Some(Stage::Draining),
            Stage::Draining => Some(Stage::Shutdown),
            Stage::Shutdown => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "INIT",
            Stage::DigestCheck => "DIGEST_CHECK",
            Stage::PipelineUp => "PIPELINE_UP",
            Stage::Supervising => "SUPERVISING",
            Stage::Draining => "DRAINING",
            Stage::Shutdown => "SHUTDOWN",
        };
        f.write_str(name)
    }
}

/// Forward-only stage tracker.
#[derive(Debug)]
pub struct Lifecycle {
    stage: Stage,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self { stage: Stage::Init }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Moves to the next stage. `None` once in `Shutdown`.
    pub fn advance(&mut self) -> Option<Stage> {
        let next = self.stage.next()?;
        info!(from = %self.stage, to = %next, "stage");
        self.stage = next;
        Some(next)
    }
}

/// What each component reported when it was closed.
#[derive(Debug)]
pub struct ShutdownReport {
    pub log_bytes: Result<u64, ChannelError>,
    pub profiles: Result<u64, ChannelError>,
    pub delivered: Result<u64, RelayError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.log_bytes.is_ok() && self.profiles.is_ok() && self.delivered.is_ok()
    }
}

/// The running relay and both listeners.
pub struct Pipeline<B: Broker> {
    relay: RelayHandle<B>,
    data: DataHandle,
    log: LogHandle,
}

impl<B: Broker> Pipeline<B> {
    /// Starts the relay, then the data listener, then the log listener.
    ///
    /// Returns the producer handle of the object channel for the supervisor.
    /// Dropping it (via `ObjectSender::close`) is what lets the relay drain
    /// and finish.
    pub fn start<W>(
        ctx: Arc<RunContext>,
        broker: B,
        log_sink: W,
        capacity: usize,
    ) -> Result<(Self, ObjectSender), ChannelError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (objects, queue) = object_channel(capacity);
        let relay = relay(queue, broker, ctx.clone());
        let data = listen_data(&ctx, objects.clone())?;
        let log = listen_log(&ctx, log_sink)?;

        Ok((Self { relay, data, log }, objects))
    }

    pub fn data_socket(&self) -> &std::path::Path {
        self.data.path()
    }

    pub fn log_socket(&self) -> &std::path::Path {
        self.log.path()
    }

    /// Closes components in reverse start order, each one blocking until it
    /// is quiet. Errors are logged and handed back, never escalated.
    ///
    /// Call only after the object channel has been closed by its owner,
    /// otherwise the relay never sees the end of the stream.
    pub async fn shutdown(self) -> ShutdownReport {
        let log_bytes = self.log.close().await;
        if let Err(e) = &log_bytes {
            error!("logs channel: {}", e);
        }

        let profiles = self.data.close().await;
        if let Err(e) = &profiles {
            error!("data channel: {}", e);
        }

        let delivered = self.relay.close().await;
        match &delivered {
            Ok(n) => info!(delivered = n, "relay drained"),
            Err(e) => error!("relay: {}", e),
        }

        ShutdownReport {
            log_bytes,
            profiles,
            delivered,
        }
    }
}
