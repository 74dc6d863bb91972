//! CPU topology from /proc/stat and per-cgroup CPU quota/throttling from the
//! cpu controller hierarchy.

use super::cgroupfs::{self, CgroupSnapshot};
use super::Collector;
use crate::error::{CollectError, CollectResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Logical CPU layout of the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTopology {
    pub core_count: usize,
}

/// Counts per-core "cpuN" lines in /proc/stat
pub struct TopologyCollector {
    stat: PathBuf,
}

impl TopologyCollector {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            stat: proc_root.into().join("stat"),
        }
    }
}

impl Collector for TopologyCollector {
    type Snapshot = CpuTopology;

    fn collect(&mut self) -> CollectResult<CpuTopology> {
        let content = fs::read_to_string(&self.stat).map_err(|e| CollectError::io(&self.stat, e))?;
        let core_count = count_cores(&content);
        if core_count == 0 {
            return Err(CollectError::parse(&self.stat, "no per-core cpu lines"));
        }
        Ok(CpuTopology { core_count })
    }
}

fn count_cores(stat: &str) -> usize {
    stat.lines()
        .filter(|line| {
            line.strip_prefix("cpu")
                .and_then(|rest| rest.split(char::is_whitespace).next())
                .map(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
                .unwrap_or(false)
        })
        .count()
}

/// CPU quota and throttling of one cgroup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgroupCpuRecord {
    /// Absolute path of the cgroup directory
    pub path: PathBuf,
    /// Fraction of enforcement periods in the window that hit the quota, in [0, 1]
    pub throttle: f64,
    /// Quota expressed in cores (quota / period)
    pub quota: f64,
    /// Time covered by `throttle`; zero on the first sample, where the
    /// ratio is cumulative since the cgroup was created
    pub window: Duration,
}

pub type CgroupCpuSnapshot = CgroupSnapshot<CgroupCpuRecord>;

#[derive(Debug, Clone, Copy)]
struct ThrottleCounters {
    nr_periods: u64,
    nr_throttled: u64,
}

/// Walks the cpu hierarchy and reports every cgroup that carries a CFS quota
pub struct CgroupCpuCollector {
    mountpoint: PathBuf,
    prev_counters: HashMap<PathBuf, ThrottleCounters>,
    prev_time: Option<Instant>,
}

impl CgroupCpuCollector {
    pub fn new(mountpoint: impl Into<PathBuf>) -> Self {
        Self {
            mountpoint: mountpoint.into(),
            prev_counters: HashMap::new(),
            prev_time: None,
        }
    }
}

impl Collector for CgroupCpuCollector {
    type Snapshot = CgroupCpuSnapshot;

    fn collect(&mut self) -> CollectResult<CgroupCpuSnapshot> {
        let now = Instant::now();
        let window = self
            .prev_time
            .map(|prev| now.saturating_duration_since(prev))
            .unwrap_or_default();

        let mut snapshot = CgroupSnapshot::new(&self.mountpoint);
        let mut current = HashMap::new();

        for dir in cgroupfs::cgroup_dirs(&self.mountpoint, "cpu")? {
            let sample = match read_cpu(&dir) {
                Ok(Some(sample)) => sample,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(error = %e, cgroup = %dir.display(), "skipping cpu cgroup");
                    continue;
                }
            };

            let (periods, throttled) = match self.prev_counters.get(&dir) {
                Some(prev) => (
                    sample.counters.nr_periods.saturating_sub(prev.nr_periods),
                    sample.counters.nr_throttled.saturating_sub(prev.nr_throttled),
                ),
                None => (sample.counters.nr_periods, sample.counters.nr_throttled),
            };
            let throttle = if periods > 0 {
                (throttled as f64 / periods as f64).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let window = if self.prev_counters.contains_key(&dir) {
                window
            } else {
                Duration::ZERO
            };

            current.insert(dir.clone(), sample.counters);
            snapshot.records.push(CgroupCpuRecord {
                path: dir,
                throttle,
                quota: sample.quota,
                window,
            });
        }

        self.prev_counters = current;
        self.prev_time = Some(now);

        Ok(snapshot)
    }
}

struct CpuSample {
    quota: f64,
    counters: ThrottleCounters,
}

/// `None` for cgroups without a quota; they cannot be throttled
fn read_cpu(dir: &Path) -> CollectResult<Option<CpuSample>> {
    let Some(quota) = read_quota(dir)? else {
        return Ok(None);
    };

    let stat = cgroupfs::read_value(dir, "cpu.stat")?.unwrap_or_default();
    let counters = ThrottleCounters {
        nr_periods: cgroupfs::keyed_u64(&stat, "nr_periods").unwrap_or(0),
        nr_throttled: cgroupfs::keyed_u64(&stat, "nr_throttled").unwrap_or(0),
    };

    Ok(Some(CpuSample { quota, counters }))
}

/// Quota in cores from v1 cfs files or the v2 cpu.max pair
fn read_quota(dir: &Path) -> CollectResult<Option<f64>> {
    if let Some(quota_us) = cgroupfs::read_value(dir, "cpu.cfs_quota_us")? {
        let quota_us: i64 = quota_us
            .parse()
            .map_err(|_| CollectError::parse(dir.join("cpu.cfs_quota_us"), quota_us.clone()))?;
        let period_us = cgroupfs::read_u64(dir, "cpu.cfs_period_us")?.unwrap_or(0);
        return Ok(cores(quota_us, period_us));
    }

    if let Some(max) = cgroupfs::read_value(dir, "cpu.max")? {
        let mut parts = max.split_whitespace();
        let quota = parts.next().unwrap_or("max");
        if quota == "max" {
            return Ok(None);
        }
        let quota_us: i64 = quota
            .parse()
            .map_err(|_| CollectError::parse(dir.join("cpu.max"), max.clone()))?;
        let period_us = parts.next().and_then(|p| p.parse().ok()).unwrap_or(100_000);
        return Ok(cores(quota_us, period_us));
    }

    Ok(None)
}

fn cores(quota_us: i64, period_us: u64) -> Option<f64> {
    if quota_us <= 0 || period_us == 0 {
        return None;
    }
    Some(quota_us as f64 / period_us as f64)
}
