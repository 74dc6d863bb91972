//! Disk utilization from /proc/diskstats.

use super::Collector;
use crate::error::{CollectError, CollectResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

/// Utilization of a single disk over the last sample window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    /// Fraction of wall time the device had I/O in flight, in [0, 1].
    /// `None` until two samples have been taken.
    pub usage: Option<f64>,
}

/// Per-disk utilization, keyed by device name (e.g. "sda", "nvme0n1")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskSnapshot {
    pub disks: BTreeMap<String, DiskUsage>,
}

/// Disk collector keeping the previous io-ticks counters for rate calculation
pub struct DiskCollector {
    diskstats: PathBuf,
    include_partitions: bool,
    prev_io_ticks: HashMap<String, u64>,
    prev_time: Option<Instant>,
}

impl DiskCollector {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            diskstats: proc_root.into().join("diskstats"),
            include_partitions: false,
            prev_io_ticks: HashMap::new(),
            prev_time: None,
        }
    }

    /// Report partitions and virtual block devices too
    pub fn include_partitions(mut self, include: bool) -> Self {
        self.include_partitions = include;
        self
    }

    /// Turn one read of /proc/diskstats into a snapshot, using `now` as the
    /// sample timestamp.
    pub fn sample(&mut self, diskstats: &str, now: Instant) -> DiskSnapshot {
        let elapsed_ms = self
            .prev_time
            .map(|prev| now.saturating_duration_since(prev).as_secs_f64() * 1000.0);

        let mut current: HashMap<String, u64> = HashMap::new();
        let mut disks = BTreeMap::new();

        for line in diskstats.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 14 {
                continue;
            }

            let device = parts[2];
            if !self.include_partitions && !is_whole_disk(device) {
                continue;
            }

            // Field 13: milliseconds spent doing I/Os
            let io_ticks: u64 = parts[12].parse().unwrap_or(0);
            current.insert(device.to_string(), io_ticks);

            let usage = match (self.prev_io_ticks.get(device), elapsed_ms) {
                (Some(prev), Some(ms)) if ms > 0.0 => {
                    let busy_ms = io_ticks.saturating_sub(*prev) as f64;
                    Some((busy_ms / ms).clamp(0.0, 1.0))
                }
                _ => None,
            };
            disks.insert(device.to_string(), DiskUsage { usage });
        }

        self.prev_io_ticks = current;
        self.prev_time = Some(now);

        DiskSnapshot { disks }
    }
}

impl Collector for DiskCollector {
    type Snapshot = DiskSnapshot;

    fn collect(&mut self) -> CollectResult<DiskSnapshot> {
        let content = fs::read_to_string(&self.diskstats)
            .map_err(|e| CollectError::io(&self.diskstats, e))?;
        Ok(self.sample(&content, Instant::now()))
    }
}

/// Skip partitions (sda1, nvme0n1p2) as well as loop, ram and device-mapper devices
fn is_whole_disk(device: &str) -> bool {
    if device.starts_with("loop") || device.starts_with("ram") || device.starts_with("dm-") {
        return false;
    }

    let ends_with_digit = device
        .chars()
        .last()
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false);

    let is_partition = if device.starts_with("nvme") || device.starts_with("mmcblk") {
        device.contains('p') && ends_with_digit
    } else {
        ends_with_digit
    };

    !is_partition
}
