//! Display-ready ratios computed from combined cgroup records.

use super::correlate::{CombinedCgroupRecord, CorrelatedCgroups};
use crate::metrics::CpuTopology;
use serde::{Deserialize, Serialize};

/// Per-cgroup CPU usage as measured by process accounting.
///
/// Cgroup CPU accounting alone cannot say how busy a cgroup is, so usage is
/// always looked up here by canonical name. `None` means no data yet.
pub trait ProcessCpuAttribution {
    fn cpu_usage_percent(&self, cgroup: &str) -> Option<f64>;
}

impl<F> ProcessCpuAttribution for F
where
    F: Fn(&str) -> Option<f64>,
{
    fn cpu_usage_percent(&self, cgroup: &str) -> Option<f64> {
        self(cgroup)
    }
}

/// Knobs for derived values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivePolicy {
    /// Cores excluded from the throttling denominator (e.g. a core kept
    /// for system daemons)
    pub reserved_cores: usize,
}

impl Default for DerivePolicy {
    fn default() -> Self {
        Self { reserved_cores: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuDerived {
    pub usage_pct: f64,
    pub throttle_pct: f64,
    /// Quota in cores
    pub quota: f64,
    /// Cores the quota competes for; `None` when the topology is unknown
    pub available_cores: Option<usize>,
}

impl CpuDerived {
    /// "quota/available-cores", e.g. "2.0/4"
    pub fn quota_display(&self) -> String {
        match self.available_cores {
            Some(cores) => format!("{:.1}/{}", self.quota, cores),
            None => format!("{:.1}/?", self.quota),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemDerived {
    pub usage_bytes: u64,
    pub soft_limit_bytes: Option<u64>,
    /// Present only when a non-zero soft limit exists
    pub usage_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedCgroupMetrics {
    pub name: String,
    pub cpu: Option<CpuDerived>,
    pub mem: Option<MemDerived>,
}

/// Compute the derived values of one combined record
pub fn derive(
    record: &CombinedCgroupRecord,
    topology: Option<&CpuTopology>,
    attribution: &dyn ProcessCpuAttribution,
    policy: &DerivePolicy,
) -> DerivedCgroupMetrics {
    debug_assert!(
        record.cpu().is_some() || record.mem().is_some(),
        "combined record without cpu or memory data"
    );

    let cpu = record.cpu().map(|cpu| CpuDerived {
        usage_pct: finite_or_zero(attribution.cpu_usage_percent(record.name()).unwrap_or(0.0)),
        throttle_pct: finite_or_zero(cpu.throttle) * 100.0,
        quota: finite_or_zero(cpu.quota),
        available_cores: topology.map(|t| t.core_count.saturating_sub(policy.reserved_cores)),
    });

    let mem = record.mem().map(|mem| {
        let soft_limit = mem.soft_limit_bytes.filter(|limit| *limit > 0);
        MemDerived {
            usage_bytes: mem.usage_bytes,
            soft_limit_bytes: soft_limit,
            usage_pct: soft_limit.map(|limit| mem.usage_bytes as f64 / limit as f64 * 100.0),
        }
    });

    DerivedCgroupMetrics {
        name: record.name().to_string(),
        cpu,
        mem,
    }
}

/// Derive every record, in canonical-name order
pub fn derive_all(
    cgroups: &CorrelatedCgroups,
    topology: Option<&CpuTopology>,
    attribution: &dyn ProcessCpuAttribution,
    policy: &DerivePolicy,
) -> Vec<DerivedCgroupMetrics> {
    cgroups
        .values()
        .map(|record| derive(record, topology, attribution, policy))
        .collect()
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
