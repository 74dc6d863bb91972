//! Joins per-cgroup memory and CPU snapshots on the canonical cgroup name.

use super::normalize::canonical_name;
use crate::metrics::{CgroupCpuRecord, CgroupCpuSnapshot, CgroupMemRecord, CgroupMemSnapshot};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Memory and CPU data for one logical cgroup in one reporting cycle.
///
/// At least one side is always present: records are only created from an
/// observed memory or CPU record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedCgroupRecord {
    name: String,
    cpu: Option<CgroupCpuRecord>,
    mem: Option<CgroupMemRecord>,
}

impl CombinedCgroupRecord {
    pub fn from_cpu(name: impl Into<String>, cpu: CgroupCpuRecord) -> Self {
        Self {
            name: name.into(),
            cpu: Some(cpu),
            mem: None,
        }
    }

    pub fn from_mem(name: impl Into<String>, mem: CgroupMemRecord) -> Self {
        Self {
            name: name.into(),
            cpu: None,
            mem: Some(mem),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpu(&self) -> Option<&CgroupCpuRecord> {
        self.cpu.as_ref()
    }

    pub fn mem(&self) -> Option<&CgroupMemRecord> {
        self.mem.as_ref()
    }
}

/// Combined records keyed by canonical name
pub type CorrelatedCgroups = BTreeMap<String, CombinedCgroupRecord>;

/// Full outer join of the two cgroup snapshots.
///
/// A cgroup seen by only one controller still gets a record with the other
/// side unset. A missing snapshot (collector failed this cycle) joins as
/// empty. If two paths of the same snapshot collapse to one name, the later
/// record wins.
pub fn correlate(
    mem: Option<&CgroupMemSnapshot>,
    cpu: Option<&CgroupCpuSnapshot>,
) -> CorrelatedCgroups {
    let mut combined = CorrelatedCgroups::new();

    if let Some(snapshot) = mem {
        for record in &snapshot.records {
            let name = canonical_name(&record.path, &snapshot.mountpoint);
            match combined.entry(name) {
                Entry::Occupied(mut slot) => {
                    let slot = slot.get_mut();
                    if slot.mem.is_some() {
                        tracing::debug!(cgroup = %slot.name, "duplicate memory cgroup name, keeping last");
                    }
                    slot.mem = Some(record.clone());
                }
                Entry::Vacant(slot) => {
                    let name = slot.key().clone();
                    slot.insert(CombinedCgroupRecord::from_mem(name, record.clone()));
                }
            }
        }
    }

    if let Some(snapshot) = cpu {
        for record in &snapshot.records {
            let name = canonical_name(&record.path, &snapshot.mountpoint);
            match combined.entry(name) {
                Entry::Occupied(mut slot) => {
                    let slot = slot.get_mut();
                    if slot.cpu.is_some() {
                        tracing::debug!(cgroup = %slot.name, "duplicate cpu cgroup name, keeping last");
                    }
                    slot.cpu = Some(record.clone());
                }
                Entry::Vacant(slot) => {
                    let name = slot.key().clone();
                    slot.insert(CombinedCgroupRecord::from_cpu(name, record.clone()));
                }
            }
        }
    }

    combined
}
