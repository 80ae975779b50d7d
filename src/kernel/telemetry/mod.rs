// Telemetry Module
// System figures sampled at child exit. Sampling never fails: missing
// sources read as zero.

pub mod metrics;

pub use metrics::{memory_percent, MetricsSampler, SystemMetrics};
