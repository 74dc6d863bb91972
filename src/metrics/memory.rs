//! Per-cgroup memory usage and soft limits from the memory controller hierarchy.

use super::cgroupfs::{self, CgroupSnapshot};
use super::Collector;
use crate::error::CollectResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// v1 reports "no limit" as a page-aligned i64::MAX; anything this large is unset
const V1_UNLIMITED_THRESHOLD: u64 = 1 << 60;

/// Memory usage of one cgroup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgroupMemRecord {
    /// Absolute path of the cgroup directory
    pub path: PathBuf,
    /// Current usage in bytes
    pub usage_bytes: u64,
    /// Soft limit in bytes; `None` when unset. Never `Some(0)`.
    pub soft_limit_bytes: Option<u64>,
}

impl CgroupMemRecord {
    pub fn new(path: impl Into<PathBuf>, usage_bytes: u64, soft_limit_bytes: Option<u64>) -> Self {
        Self {
            path: path.into(),
            usage_bytes,
            soft_limit_bytes: soft_limit_bytes.filter(|limit| *limit > 0),
        }
    }
}

pub type CgroupMemSnapshot = CgroupSnapshot<CgroupMemRecord>;

/// Walks the memory hierarchy and reads usage and soft limit of every cgroup
pub struct CgroupMemCollector {
    mountpoint: PathBuf,
}

impl CgroupMemCollector {
    pub fn new(mountpoint: impl Into<PathBuf>) -> Self {
        Self {
            mountpoint: mountpoint.into(),
        }
    }
}

impl Collector for CgroupMemCollector {
    type Snapshot = CgroupMemSnapshot;

    fn collect(&mut self) -> CollectResult<CgroupMemSnapshot> {
        let mut snapshot = CgroupSnapshot::new(&self.mountpoint);

        for dir in cgroupfs::cgroup_dirs(&self.mountpoint, "memory")? {
            match read_memory(&dir) {
                Ok(Some(record)) => snapshot.records.push(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(error = %e, cgroup = %dir.display(), "skipping memory cgroup");
                }
            }
        }

        Ok(snapshot)
    }
}

/// Read one cgroup directory, v1 layout first, then v2. `None` when the
/// directory carries no memory accounting (e.g. the v2 root).
fn read_memory(dir: &Path) -> CollectResult<Option<CgroupMemRecord>> {
    if let Some(usage) = cgroupfs::read_u64(dir, "memory.usage_in_bytes")? {
        let soft_limit = cgroupfs::read_u64(dir, "memory.soft_limit_in_bytes")?
            .filter(|limit| *limit < V1_UNLIMITED_THRESHOLD);
        return Ok(Some(CgroupMemRecord::new(dir, usage, soft_limit)));
    }

    if let Some(usage) = cgroupfs::read_u64(dir, "memory.current")? {
        // memory.high is the v2 throttling boundary: reclaim pressure, no OOM
        let soft_limit = cgroupfs::read_value(dir, "memory.high")?
            .filter(|s| s != "max")
            .and_then(|s| s.parse().ok());
        return Ok(Some(CgroupMemRecord::new(dir, usage, soft_limit)));
    }

    Ok(None)
}
