use nix::sys::signal::Signal;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Host signals the supervisor passes on to its child.
pub fn relayed() -> [(SignalKind, Signal); 4] {
    [
        (SignalKind::interrupt(), Signal::SIGINT),
        (SignalKind::terminate(), Signal::SIGTERM),
        (SignalKind::hangup(), Signal::SIGHUP),
        (SignalKind::quit(), Signal::SIGQUIT),
    ]
}

/// Subscribes to the relayed host signals and funnels them into one channel.
///
/// Installing a handler means the supervisor no longer dies from these
/// signals itself. A signal that cannot be subscribed keeps its default
/// disposition and is only logged.
pub fn host_signals() -> mpsc::Receiver<Signal> {
    let (tx, rx) = mpsc::channel(16);

    for (kind, sig) in relayed() {
        let mut stream = match signal(kind) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(signal = %sig, "cannot subscribe to signal: {}", e);
                continue;
            }
        };

        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                debug!(signal = %sig, "host signal received");
                if tx.send(sig).await.is_err() {
                    break;
                }
            }
        });
    }

    rx
}
