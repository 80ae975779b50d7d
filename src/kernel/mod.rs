pub mod channel;
pub mod context;
pub mod event;
pub mod integrity;
pub mod lifecycle;
pub mod relay;
pub mod signals;
pub mod supervisor;
pub mod telemetry;
