// Local IPC channels offered to the instrumented child.
// Both sockets live at `<socket_dir>/{data,log}-<pid>` and serve exactly
// one client each. The child learns the paths from its environment.

pub mod data;
pub mod log;
pub mod session;

pub use data::{listen_data, DataHandle};
pub use log::{listen_log, LogHandle};
pub use session::SessionHandle;

/// Environment variable carrying the data socket path to the child.
pub const DATA_SOCKET_ENV: &str = "AUKLET_DATA_SOCKET";
/// Environment variable carrying the log socket path to the child.
pub const LOG_SOCKET_ENV: &str = "AUKLET_LOG_SOCKET";
