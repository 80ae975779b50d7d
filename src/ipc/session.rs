use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ChannelError;

/// Owns the filesystem name of a bound socket and unlinks it on drop.
#[derive(Debug)]
pub struct SocketGuard {
    path: PathBuf,
}

impl SocketGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "failed to remove socket: {}", e),
        }
    }
}

/// Binds a stream socket at `path`, replacing a stale socket file left by an
/// earlier process with the same pid.
pub fn bind(path: &Path) -> Result<(UnixListener, SocketGuard), ChannelError> {
    if path.exists() {
        fs::remove_file(path).map_err(|source| ChannelError::Bind {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let listener = UnixListener::bind(path).map_err(|source| ChannelError::Bind {
        path: path.to_path_buf(),
        source,
    })?;

    Ok((
        listener,
        SocketGuard {
            path: path.to_path_buf(),
        },
    ))
}

/// Waits for the single client of this listener.
///
/// The listener is consumed: once a client is in, the socket stops
/// listening and later connection attempts are refused. `stop` only matters
/// while nobody has connected yet; it yields `None`.
pub async fn accept_one(
    name: &'static str,
    listener: UnixListener,
    stop: &CancellationToken,
) -> Result<Option<UnixStream>, ChannelError> {
    tokio::select! {
        biased;
        accepted = listener.accept() => {
            let (stream, _) = accepted.map_err(ChannelError::Accept)?;
            info!("{} connection accepted", name);
            Ok(Some(stream))
        }
        _ = stop.cancelled() => {
            info!("{} socket: no client connected", name);
            Ok(None)
        }
    }
}

/// Close handle of a single-session listener.
#[derive(Debug)]
pub struct SessionHandle<T> {
    name: &'static str,
    task: JoinHandle<Result<T, ChannelError>>,
    stop: CancellationToken,
    guard: SocketGuard,
}

impl<T> SessionHandle<T> {
    pub(crate) fn new(
        name: &'static str,
        task: JoinHandle<Result<T, ChannelError>>,
        stop: CancellationToken,
        guard: SocketGuard,
    ) -> Self {
        Self {
            name,
            task,
            stop,
            guard,
        }
    }

    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    /// Blocks until the session finished, then releases the socket.
    ///
    /// A session that has a client is always awaited until that client
    /// closes its end. If the client never closes, this never returns.
    pub async fn close(self) -> Result<T, ChannelError> {
        let Self {
            name,
            task,
            stop,
            guard,
        } = self;

        stop.cancel();
        let result = task.await?;
        info!("closing {} socket", name);
        drop(guard);
        result
    }
}
