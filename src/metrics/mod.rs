//! Snapshot collectors for disks, interfaces, cgroups and CPU topology.

pub mod cgroupfs;
pub mod cpu;
pub mod disk;
pub mod memory;
pub mod network;

use crate::error::CollectResult;

pub use cgroupfs::CgroupSnapshot;
pub use cpu::{CgroupCpuCollector, CgroupCpuRecord, CgroupCpuSnapshot, CpuTopology, TopologyCollector};
pub use disk::{DiskCollector, DiskSnapshot, DiskUsage};
pub use memory::{CgroupMemCollector, CgroupMemRecord, CgroupMemSnapshot};
pub use network::{InterfaceCollector, InterfaceRates, InterfaceSnapshot};

/// A long-lived provider handle that produces one snapshot per poll.
///
/// Collectors may keep counters from the previous poll to turn cumulative
/// kernel counters into rates; the snapshots they return are plain values.
pub trait Collector {
    type Snapshot;

    fn collect(&mut self) -> CollectResult<Self::Snapshot>;
}

impl<C: Collector + ?Sized> Collector for Box<C> {
    type Snapshot = C::Snapshot;

    fn collect(&mut self) -> CollectResult<Self::Snapshot> {
        (**self).collect()
    }
}
