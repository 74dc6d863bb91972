//! Report rendering: disks, interfaces and correlated cgroups as text lines
//! or as a serializable document.

use crate::cgroup::{self, DerivePolicy, DerivedCgroupMetrics, ProcessCpuAttribution};
use crate::format::{bit_rate, byte_size};
use crate::metrics::{CgroupCpuSnapshot, CgroupMemSnapshot, CpuTopology, DiskSnapshot, InterfaceSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;

const SECTION_SEPARATOR: &str = "---";

/// Everything one reporting cycle collected.
///
/// A `None` snapshot means its collector failed this cycle; the matching
/// section is left out of the report.
pub struct ReportInput<'a> {
    pub disks: Option<&'a DiskSnapshot>,
    pub interfaces: Option<&'a InterfaceSnapshot>,
    pub cgroup_mem: Option<&'a CgroupMemSnapshot>,
    pub cgroup_cpu: Option<&'a CgroupCpuSnapshot>,
    pub topology: Option<&'a CpuTopology>,
    pub attribution: &'a dyn ProcessCpuAttribution,
    pub policy: DerivePolicy,
}

impl ReportInput<'_> {
    /// Correlated and derived cgroup metrics; `None` when neither cgroup
    /// collector produced a snapshot
    pub fn cgroup_metrics(&self) -> Option<Vec<DerivedCgroupMetrics>> {
        if self.cgroup_mem.is_none() && self.cgroup_cpu.is_none() {
            return None;
        }
        let joined = cgroup::correlate(self.cgroup_mem, self.cgroup_cpu);
        Some(cgroup::derive_all(&joined, self.topology, self.attribution, &self.policy))
    }
}

/// Render the report as text lines: disks, interfaces, cgroups, each
/// section introduced by a separator line
pub fn render_report(input: &ReportInput<'_>) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(disks) = input.disks {
        lines.push(SECTION_SEPARATOR.to_string());
        for (id, disk) in &disks.disks {
            lines.push(format!("disk: {} usage: {}", id, usage_pct(disk.usage)));
        }
    }

    if let Some(interfaces) = input.interfaces {
        lines.push(SECTION_SEPARATOR.to_string());
        for (name, rates) in &interfaces.interfaces {
            lines.push(format!(
                "iface: {} TX: {}/s, RX: {}/s",
                name,
                bit_rate(rates.tx_bits_per_sec),
                bit_rate(rates.rx_bits_per_sec)
            ));
        }
    }

    if let Some(cgroups) = input.cgroup_metrics() {
        lines.push(SECTION_SEPARATOR.to_string());
        lines.extend(cgroups.iter().map(cgroup_line));
    }

    lines
}

fn usage_pct(fraction: Option<f64>) -> String {
    match fraction.filter(|f| f.is_finite()) {
        Some(f) => format!("{:.1}%", f * 100.0),
        None => "n/a".to_string(),
    }
}

/// "cgroup:<name> [cpu clause] [mem clause]", absent data leaves its clause out
pub fn cgroup_line(metrics: &DerivedCgroupMetrics) -> String {
    let mut clauses = vec![format!("cgroup:{}", metrics.name)];

    if let Some(cpu) = &metrics.cpu {
        clauses.push(format!(
            "cpu: {:.1}% cpu_throttling: {:.1}% ({})",
            cpu.usage_pct,
            cpu.throttle_pct,
            cpu.quota_display()
        ));
    }

    if let Some(mem) = &metrics.mem {
        let used = byte_size(mem.usage_bytes as f64);
        match (mem.usage_pct, mem.soft_limit_bytes) {
            (Some(pct), Some(limit)) => {
                clauses.push(format!("mem: {:.1}% ({}/{})", pct, used, byte_size(limit as f64)));
            }
            _ => clauses.push(format!("mem: {} (no soft limit)", used)),
        }
    }

    clauses.join(" ")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskEntry {
    pub id: String,
    pub usage_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceEntry {
    pub name: String,
    pub tx_bits_per_sec: f64,
    pub rx_bits_per_sec: f64,
}

/// One reporting cycle as a serializable value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub timestamp: DateTime<Utc>,
    pub disks: Option<Vec<DiskEntry>>,
    pub interfaces: Option<Vec<InterfaceEntry>>,
    pub cgroups: Option<Vec<DerivedCgroupMetrics>>,
}

/// Same content as [`render_report`], as structured data
pub fn build_document(input: &ReportInput<'_>, timestamp: DateTime<Utc>) -> ReportDocument {
    let disks = input.disks.map(|snap| {
        snap.disks
            .iter()
            .map(|(id, disk)| DiskEntry {
                id: id.clone(),
                usage_pct: disk.usage.filter(|f| f.is_finite()).map(|f| f * 100.0),
            })
            .collect()
    });

    let interfaces = input.interfaces.map(|snap| {
        snap.interfaces
            .iter()
            .map(|(name, rates)| InterfaceEntry {
                name: name.clone(),
                tx_bits_per_sec: rates.tx_bits_per_sec,
                rx_bits_per_sec: rates.rx_bits_per_sec,
            })
            .collect()
    });

    ReportDocument {
        timestamp,
        disks,
        interfaces,
        cgroups: input.cgroup_metrics(),
    }
}
