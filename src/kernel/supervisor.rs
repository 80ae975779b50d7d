use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::channel::ObjectSender;
use super::context::RunContext;
use super::event::Event;
use super::telemetry::MetricsSampler;
use crate::error::SupervisorError;
use crate::ipc::{DATA_SOCKET_ENV, LOG_SOCKET_ENV};

/// Child command with inherited stdio and the IPC socket paths exported.
pub fn child_command<I, S>(ctx: &RunContext, program: impl AsRef<OsStr>, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .env(DATA_SOCKET_ENV, ctx.data_socket())
        .env(LOG_SOCKET_ENV, ctx.log_socket())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    command
}

/// Runs the child to completion.
///
/// Every signal arriving on `signals` is passed on to the child; the
/// supervisor itself keeps waiting. Once the child is gone its exit event is
/// pushed onto the object channel and also returned.
///
/// Failing to start the child is the only error: there is nothing to
/// supervise without it.
pub async fn supervise(
    mut command: Command,
    objects: &ObjectSender,
    mut signals: mpsc::Receiver<Signal>,
    mut sampler: MetricsSampler,
) -> Result<Event, SupervisorError> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    info!(%program, "starting child");
    let mut child = command
        .spawn()
        .map_err(|source| SupervisorError::Spawn { program, source })?;
    let pid = child.id();
    sampler.prime();

    let mut signals_open = true;
    let status = loop {
        tokio::select! {
            status = child.wait() => break status.map_err(SupervisorError::Wait)?,
            received = signals.recv(), if signals_open => match received {
                Some(sig) => relay_signal(pid, sig),
                None => signals_open = false,
            },
        }
    };
    info!(%status, "child exited");

    let event = Event::from_exit(status, sampler.snapshot());
    if let Err(e) = objects.send(Box::new(event.clone())).await {
        warn!("exit event dropped: {}", e);
    }
    Ok(event)
}

fn relay_signal(pid: Option<u32>, sig: Signal) {
    let Some(pid) = pid else {
        warn!(signal = %sig, "child already reaped, signal not relayed");
        return;
    };

    info!(signal = %sig, pid, "relaying signal");
    if let Err(e) = kill(Pid::from_raw(pid as i32), sig) {
        warn!(signal = %sig, pid, "failed to relay signal: {}", e);
    }
}
