// Shared test helpers

#![allow(dead_code)]

use osinspect::app::Collectors;
use osinspect::error::{CollectError, CollectResult};
use osinspect::metrics::*;
use osinspect::process::ProcessCpuUsage;
use std::path::PathBuf;
use std::time::Duration;

pub const MB: u64 = 1024 * 1024;

pub fn mem_snapshot(mountpoint: &str, records: &[(&str, u64, Option<u64>)]) -> CgroupMemSnapshot {
    CgroupSnapshot::with_records(
        mountpoint,
        records
            .iter()
            .map(|(path, usage, limit)| CgroupMemRecord::new(*path, *usage, *limit))
            .collect(),
    )
}

pub fn cpu_snapshot(mountpoint: &str, records: &[(&str, f64, f64)]) -> CgroupCpuSnapshot {
    CgroupSnapshot::with_records(
        mountpoint,
        records
            .iter()
            .map(|(path, throttle, quota)| CgroupCpuRecord {
                path: PathBuf::from(path),
                throttle: *throttle,
                quota: *quota,
                window: Duration::from_secs(1),
            })
            .collect(),
    )
}

pub fn usage(entries: &[(&str, f64)]) -> ProcessCpuUsage {
    ProcessCpuUsage {
        by_cgroup: entries.iter().map(|(name, pct)| (name.to_string(), *pct)).collect(),
    }
}

/// Returns the same snapshot on every poll
pub struct FixedCollector<S> {
    snapshot: S,
}

impl<S> FixedCollector<S> {
    pub fn new(snapshot: S) -> Self {
        Self { snapshot }
    }
}

impl<S: Clone> Collector for FixedCollector<S> {
    type Snapshot = S;

    fn collect(&mut self) -> CollectResult<S> {
        Ok(self.snapshot.clone())
    }
}

/// Fails every poll
pub struct BrokenCollector<S>(std::marker::PhantomData<S>);

impl<S> BrokenCollector<S> {
    pub fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<S> Collector for BrokenCollector<S> {
    type Snapshot = S;

    fn collect(&mut self) -> CollectResult<S> {
        Err(CollectError::NotMounted("memory".to_string()))
    }
}

/// The worked example: cgroup "a" in both hierarchies, five cores
pub fn example_collectors() -> Collectors {
    let mut disks = DiskSnapshot::default();
    disks.disks.insert("sda".into(), DiskUsage { usage: Some(0.25) });
    let mut interfaces = InterfaceSnapshot::default();
    interfaces.interfaces.insert(
        "eth0".into(),
        InterfaceRates {
            tx_bits_per_sec: 8000.0,
            rx_bits_per_sec: 16000.0,
        },
    );

    Collectors {
        disks: Box::new(FixedCollector::new(disks)),
        interfaces: Box::new(FixedCollector::new(interfaces)),
        cgroup_mem: Box::new(FixedCollector::new(mem_snapshot(
            "/m",
            &[("/m/a", 500 * MB, Some(1000 * MB))],
        ))),
        cgroup_cpu: Box::new(FixedCollector::new(cpu_snapshot("/c", &[("/c/a", 0.2, 2.0)]))),
        topology: Box::new(FixedCollector::new(CpuTopology { core_count: 5 })),
        processes: Box::new(FixedCollector::new(usage(&[("a", 37.5)]))),
    }
}
