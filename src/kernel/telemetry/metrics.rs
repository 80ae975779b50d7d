use serde::{Deserialize, Serialize};
use sysinfo::{CpuExt, NetworkExt, NetworksExt, System, SystemExt};
use tracing::debug;

/// System-wide figures attached to the exit event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_percent: f64,
    pub mem_percent: f64,
    #[serde(rename = "inbound_traffic")]
    pub inbound_bytes: u64,
    #[serde(rename = "outbound_traffic")]
    pub outbound_bytes: u64,
}

/// Best-effort sampler. Figures the platform cannot provide come back as zero.
///
/// CPU load is a delta: `prime` takes a baseline and the next `snapshot`
/// reports the global load since then.
pub struct MetricsSampler {
    system: System,
}

impl std::fmt::Debug for MetricsSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsSampler").finish_non_exhaustive()
    }
}

impl Default for MetricsSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSampler {
    pub fn new() -> Self {
        Self { system: System::new() }
    }

    pub fn prime(&mut self) {
        self.system.refresh_cpu();
    }

    pub fn snapshot(&mut self) -> SystemMetrics {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.system.refresh_networks_list();
        self.system.refresh_networks();

        let metrics = SystemMetrics {
            cpu_percent: clamp_percent(self.system.global_cpu_info().cpu_usage() as f64),
            mem_percent: memory_percent(self.system.used_memory(), self.system.total_memory()),
            inbound_bytes: self
                .system
                .networks()
                .iter()
                .map(|(_, data)| data.total_received())
                .sum(),
            outbound_bytes: self
                .system
                .networks()
                .iter()
                .map(|(_, data)| data.total_transmitted())
                .sum(),
        };
        debug!(?metrics, "system metrics sampled");
        metrics
    }
}

/// Used share of physical memory, in percent. Zero when the total is unknown.
pub fn memory_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    clamp_percent(used as f64 / total as f64 * 100.0)
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
