//! Per-cgroup CPU attribution from process accounting in /proc/[pid]/.
//!
//! The cpu controller only exposes quota and throttling; how much CPU a
//! cgroup actually burned is summed up from its member processes here.

use crate::cgroup::{ProcessCpuAttribution, ROOT_CGROUP};
use crate::error::{CollectError, CollectResult};
use crate::metrics::Collector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// CPU time and cgroup membership of one process at sample time
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    /// utime + stime in clock ticks
    pub cpu_ticks: u64,
    /// Canonical name of the cgroup in the cpu hierarchy
    pub cgroup: String,
}

/// Aggregate CPU usage per cgroup for one poll, in percent of one core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessCpuUsage {
    pub by_cgroup: BTreeMap<String, f64>,
}

impl ProcessCpuAttribution for ProcessCpuUsage {
    fn cpu_usage_percent(&self, cgroup: &str) -> Option<f64> {
        self.by_cgroup.get(cgroup).copied()
    }
}

/// Scans the process table and attributes CPU time deltas to cgroups
pub struct ProcessCpuCollector {
    proc_root: PathBuf,
    clock_ticks_per_sec: u64,
    prev_ticks: HashMap<u32, u64>,
    prev_time: Option<Instant>,
}

impl ProcessCpuCollector {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        // SAFETY: sysconf has no preconditions
        let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        Self {
            proc_root: proc_root.into(),
            clock_ticks_per_sec: if ticks > 0 { ticks as u64 } else { 100 },
            prev_ticks: HashMap::new(),
            prev_time: None,
        }
    }

    pub fn with_clock_ticks(mut self, ticks_per_sec: u64) -> Self {
        self.clock_ticks_per_sec = ticks_per_sec.max(1);
        self
    }

    /// Attribute the CPU time consumed since the previous sample. Processes
    /// seen for the first time contribute nothing until their next sample.
    pub fn sample(&mut self, processes: &[ProcessSample], now: Instant) -> ProcessCpuUsage {
        let elapsed_secs = self
            .prev_time
            .map(|prev| now.saturating_duration_since(prev).as_secs_f64());

        let mut by_cgroup: BTreeMap<String, f64> = BTreeMap::new();
        let mut current = HashMap::with_capacity(processes.len());

        for proc in processes {
            current.insert(proc.pid, proc.cpu_ticks);

            let (Some(prev), Some(secs)) = (self.prev_ticks.get(&proc.pid), elapsed_secs) else {
                continue;
            };
            if secs <= 0.0 {
                continue;
            }

            let cpu_secs = proc.cpu_ticks.saturating_sub(*prev) as f64 / self.clock_ticks_per_sec as f64;
            *by_cgroup.entry(proc.cgroup.clone()).or_default() += cpu_secs / secs * 100.0;
        }

        self.prev_ticks = current;
        self.prev_time = Some(now);

        ProcessCpuUsage { by_cgroup }
    }

    fn scan(&self) -> CollectResult<Vec<ProcessSample>> {
        let entries = fs::read_dir(&self.proc_root).map_err(|e| CollectError::io(&self.proc_root, e))?;

        let mut samples = Vec::new();
        for entry in entries.flatten() {
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            // Processes exit between readdir and open; skip them quietly
            if let Some(sample) = read_process(&entry.path(), pid) {
                samples.push(sample);
            }
        }

        Ok(samples)
    }
}

impl Collector for ProcessCpuCollector {
    type Snapshot = ProcessCpuUsage;

    fn collect(&mut self) -> CollectResult<ProcessCpuUsage> {
        let samples = self.scan()?;
        Ok(self.sample(&samples, Instant::now()))
    }
}

fn read_process(proc_path: &Path, pid: u32) -> Option<ProcessSample> {
    let stat = fs::read_to_string(proc_path.join("stat")).ok()?;
    let cpu_ticks = parse_cpu_ticks(&stat)?;
    let cgroup_file = fs::read_to_string(proc_path.join("cgroup")).ok()?;
    let cgroup = cpu_cgroup(&cgroup_file)?;

    Some(ProcessSample {
        pid,
        cpu_ticks,
        cgroup,
    })
}

/// utime + stime from /proc/[pid]/stat. The comm field may contain spaces
/// and parentheses, so fields are counted from the last ')'.
fn parse_cpu_ticks(stat: &str) -> Option<u64> {
    let comm_end = stat.rfind(')')?;
    let fields: Vec<&str> = stat.get(comm_end + 2..)?.split_whitespace().collect();
    // Fields after comm start at state (field 3); utime is 14, stime is 15
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}

/// Canonical cpu-hierarchy cgroup name from /proc/[pid]/cgroup. A v1 line
/// naming the cpu controller wins over the unified "0::" line.
fn cpu_cgroup(content: &str) -> Option<String> {
    let mut unified = None;

    for line in content.lines() {
        let mut parts = line.splitn(3, ':');
        let (Some(id), Some(controllers), Some(path)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };

        if controllers.split(',').any(|c| c == "cpu") {
            return Some(relative_name(path));
        }
        if id == "0" && controllers.is_empty() {
            unified = Some(relative_name(path));
        }
    }

    unified
}

/// Hierarchy-relative path in the same form the cgroup normalizer produces
fn relative_name(path: &str) -> String {
    let trimmed = path.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        ROOT_CGROUP.to_string()
    } else {
        trimmed.to_string()
    }
}
