//! The reporting loop: polls every collector once per cycle and hands the
//! snapshots to the renderer.

use crate::cgroup::DerivePolicy;
use crate::config::{AppConfig, OutputFormat};
use crate::error::CollectResult;
use crate::metrics::cgroupfs;
use crate::metrics::{
    CgroupCpuCollector, CgroupCpuSnapshot, CgroupMemCollector, CgroupMemSnapshot, Collector,
    CpuTopology, DiskCollector, DiskSnapshot, InterfaceCollector, InterfaceSnapshot,
    TopologyCollector,
};
use crate::output::ReportWriter;
use crate::process::{ProcessCpuCollector, ProcessCpuUsage};
use crate::report::{self, ReportDocument, ReportInput};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

const DEFAULT_MEMORY_ROOT: &str = "/sys/fs/cgroup/memory";
const DEFAULT_CPU_ROOT: &str = "/sys/fs/cgroup/cpu";

pub type BoxedCollector<S> = Box<dyn Collector<Snapshot = S> + Send>;

/// Provider handles, injected so tests can substitute fakes
pub struct Collectors {
    pub disks: BoxedCollector<DiskSnapshot>,
    pub interfaces: BoxedCollector<InterfaceSnapshot>,
    pub cgroup_mem: BoxedCollector<CgroupMemSnapshot>,
    pub cgroup_cpu: BoxedCollector<CgroupCpuSnapshot>,
    pub topology: BoxedCollector<CpuTopology>,
    pub processes: BoxedCollector<ProcessCpuUsage>,
}

impl Collectors {
    /// Host collectors reading procfs and the cgroup hierarchies
    pub fn from_config(config: &AppConfig) -> Self {
        let proc_root = config.host.proc_root.as_path();
        let memory_root = hierarchy_root(
            config.cgroup.memory_root.as_deref(),
            proc_root,
            "memory",
            DEFAULT_MEMORY_ROOT,
        );
        let cpu_root = hierarchy_root(config.cgroup.cpu_root.as_deref(), proc_root, "cpu", DEFAULT_CPU_ROOT);
        tracing::info!(
            memory_root = %memory_root.display(),
            cpu_root = %cpu_root.display(),
            "cgroup hierarchies"
        );

        Self {
            disks: Box::new(
                DiskCollector::new(proc_root).include_partitions(config.disk.include_partitions),
            ),
            interfaces: Box::new(InterfaceCollector::new(proc_root)),
            cgroup_mem: Box::new(CgroupMemCollector::new(memory_root)),
            cgroup_cpu: Box::new(CgroupCpuCollector::new(cpu_root)),
            topology: Box::new(TopologyCollector::new(proc_root)),
            processes: Box::new(ProcessCpuCollector::new(proc_root)),
        }
    }
}

fn hierarchy_root(configured: Option<&Path>, proc_root: &Path, controller: &str, fallback: &str) -> PathBuf {
    if let Some(root) = configured {
        return root.to_path_buf();
    }
    match cgroupfs::discover_mountpoint(proc_root, controller) {
        Ok(root) => root,
        Err(e) => {
            tracing::warn!(error = %e, controller, fallback, "cgroup mount discovery failed");
            PathBuf::from(fallback)
        }
    }
}

/// Snapshots of one cycle. `None` marks a collector that failed.
pub struct CycleSnapshots {
    pub disks: Option<DiskSnapshot>,
    pub interfaces: Option<InterfaceSnapshot>,
    pub cgroup_mem: Option<CgroupMemSnapshot>,
    pub cgroup_cpu: Option<CgroupCpuSnapshot>,
    pub topology: Option<CpuTopology>,
    pub processes: ProcessCpuUsage,
}

impl CycleSnapshots {
    pub fn report_input(&self, policy: DerivePolicy) -> ReportInput<'_> {
        ReportInput {
            disks: self.disks.as_ref(),
            interfaces: self.interfaces.as_ref(),
            cgroup_mem: self.cgroup_mem.as_ref(),
            cgroup_cpu: self.cgroup_cpu.as_ref(),
            topology: self.topology.as_ref(),
            attribution: &self.processes,
            policy,
        }
    }
}

pub struct App {
    collectors: Collectors,
    policy: DerivePolicy,
    cycles: u64,
}

impl App {
    pub fn new(collectors: Collectors, policy: DerivePolicy) -> Self {
        Self {
            collectors,
            policy,
            cycles: 0,
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Poll every collector once. Failures are logged and leave their
    /// snapshot empty; they never abort the cycle.
    pub fn poll(&mut self) -> CycleSnapshots {
        self.cycles += 1;
        let c = &mut self.collectors;

        CycleSnapshots {
            disks: checked("disks", c.disks.collect()),
            interfaces: checked("interfaces", c.interfaces.collect()),
            cgroup_mem: checked("cgroup_mem", c.cgroup_mem.collect()),
            cgroup_cpu: checked("cgroup_cpu", c.cgroup_cpu.collect()),
            topology: checked("topology", c.topology.collect()),
            processes: checked("processes", c.processes.collect()).unwrap_or_default(),
        }
    }

    /// Poll and render one text report
    pub fn poll_cycle(&mut self) -> Vec<String> {
        let policy = self.policy;
        let snapshots = self.poll();
        report::render_report(&snapshots.report_input(policy))
    }

    /// Poll and build one structured report
    pub fn poll_document(&mut self) -> ReportDocument {
        let policy = self.policy;
        let snapshots = self.poll();
        report::build_document(&snapshots.report_input(policy), Utc::now())
    }
}

fn checked<T>(operation: &str, result: CollectResult<T>) -> Option<T> {
    match result {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!(error = %e, operation, "collector failed, section omitted");
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub interval: Duration,
    /// Stop after this many reports
    pub count: Option<u64>,
}

impl RunSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.monitoring.interval_ms),
            count: config.monitoring.count,
        }
    }
}

/// Report every `interval` until `count` reports were written or Ctrl-C.
///
/// Collectors are primed once before the first report so rates cover a
/// full interval. Returns the number of reports written.
pub async fn run(mut app: App, settings: RunSettings, mut writer: ReportWriter) -> anyhow::Result<u64> {
    app.poll();

    let mut tick = interval(settings.interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    tick.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        if settings.count.is_some_and(|count| writer.reports_written() >= count) {
            break;
        }

        tokio::select! {
            _ = tick.tick() => {
                match writer.format() {
                    OutputFormat::Text => writer.write_lines(&app.poll_cycle())?,
                    OutputFormat::Json => writer.write_document(&app.poll_document())?,
                }
                tracing::debug!(cycle = app.cycles(), "report written");
            }
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }

    Ok(writer.reports_written())
}
