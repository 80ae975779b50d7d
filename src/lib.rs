pub mod config;
pub mod error;
pub mod ipc;
pub mod kernel;
pub mod services;

// Entry points used by the binary
pub use kernel::context::RunContext;
pub use kernel::lifecycle::Pipeline;
