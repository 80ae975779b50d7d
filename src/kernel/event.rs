use chrono::{DateTime, Utc};
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use uuid::Uuid;

use super::context::Topics;
use super::telemetry::metrics::SystemMetrics;

/// Anything the outbound relay can ship.
///
/// The relay only ever sees `Box<dyn Relayable>`: it asks for the topic,
/// brands the record and encodes it. New record kinds plug in here without
/// touching the relay.
pub trait Relayable: Send + Debug {
    /// Destination topic for this kind of record.
    fn topic<'a>(&self, topics: &'a Topics) -> &'a str;

    /// Assign identity. Only the id and checksum fields change.
    fn brand(&mut self, id: Uuid, checksum: &str);

    /// Wire encoding sent to the broker.
    fn encode(&self) -> serde_json::Result<Vec<u8>>;

    fn id(&self) -> Uuid;
}

/// Terminal outcome of the supervised child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub checksum: String,
    pub uuid: Uuid,
    pub timestamp: DateTime<Utc>,
    pub exit_status: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    pub system_metrics: SystemMetrics,
}

impl Event {
    /// Builds the (unbranded) event for a finished child.
    ///
    /// A child killed by a signal has no exit code; it is reported as -1
    /// with the signal name set.
    pub fn from_exit(status: ExitStatus, system_metrics: SystemMetrics) -> Self {
        let signal = status.signal().map(signal_name);
        Self {
            checksum: String::new(),
            uuid: Uuid::nil(),
            timestamp: Utc::now(),
            exit_status: status.code().unwrap_or(-1),
            signal,
            system_metrics,
        }
    }
}

/// Descriptive signal name as carried on the wire (`interrupt`, `killed`,
/// `terminated`, ...). Unknown numbers read `signal N`.
pub fn signal_name(raw: i32) -> String {
    let Ok(sig) = Signal::try_from(raw) else {
        return format!("signal {}", raw);
    };

    let name = match sig {
        Signal::SIGHUP => "hangup",
        Signal::SIGINT => "interrupt",
        Signal::SIGQUIT => "quit",
        Signal::SIGILL => "illegal instruction",
        Signal::SIGTRAP => "trace/breakpoint trap",
        Signal::SIGABRT => "aborted",
        Signal::SIGBUS => "bus error",
        Signal::SIGFPE => "floating point exception",
        Signal::SIGKILL => "killed",
        Signal::SIGUSR1 => "user defined signal 1",
        Signal::SIGSEGV => "segmentation fault",
        Signal::SIGUSR2 => "user defined signal 2",
        Signal::SIGPIPE => "broken pipe",
        Signal::SIGALRM => "alarm clock",
        Signal::SIGTERM => "terminated",
        Signal::SIGCHLD => "child exited",
        Signal::SIGCONT => "continued",
        Signal::SIGSTOP => "stopped (signal)",
        Signal::SIGTSTP => "stopped",
        Signal::SIGTTIN => "stopped (tty input)",
        Signal::SIGTTOU => "stopped (tty output)",
        Signal::SIGURG => "urgent I/O condition",
        Signal::SIGXCPU => "CPU time limit exceeded",
        Signal::SIGXFSZ => "file size limit exceeded",
        Signal::SIGVTALRM => "virtual timer expired",
        Signal::SIGPROF => "profiling timer expired",
        Signal::SIGWINCH => "window changed",
        Signal::SIGIO => "I/O possible",
        Signal::SIGSYS => "bad system call",
        #[cfg(any(target_os = "linux", target_os = "android"))]
        Signal::SIGPWR => "power failure",
        #[allow(unreachable_patterns)]
        _ => return format!("signal {}", raw),
    };
    name.to_string()
}

impl Relayable for Event {
    fn topic<'a>(&self, topics: &'a Topics) -> &'a str {
        &topics.event
    }

    fn brand(&mut self, id: Uuid, checksum: &str) {
        self.uuid = id;
        self.checksum = checksum.to_string();
    }

    fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    fn id(&self) -> Uuid {
        self.uuid
    }
}

/// One instrumentation record received on the data channel.
/// The payload is opaque and passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub checksum: String,
    pub uuid: Uuid,
    pub profile: serde_json::Value,
}

impl Profile {
    pub fn new(profile: serde_json::Value) -> Self {
        Self {
            checksum: String::new(),
            uuid: Uuid::nil(),
            profile,
        }
    }
}

impl Relayable for Profile {
    fn topic<'a>(&self, topics: &'a Topics) -> &'a str {
        &topics.profile
    }

    fn brand(&mut self, id: Uuid, checksum: &str) {
        self.uuid = id;
        self.checksum = checksum.to_string();
    }

    fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    fn id(&self) -> Uuid {
        self.uuid
    }
}
