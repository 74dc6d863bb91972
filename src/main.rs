//! osinspect - periodic disk, interface and cgroup resource report.

use anyhow::Result;
use clap::Parser;
use osinspect::app::{self, App, Collectors, RunSettings};
use osinspect::cgroup::DerivePolicy;
use osinspect::config::{AppConfig, OutputFormat};
use osinspect::logging;
use osinspect::output::ReportWriter;
use std::path::PathBuf;

/// Report disk, interface and per-cgroup CPU/memory usage
#[derive(Parser, Debug)]
#[command(name = "osinspect")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (TOML); falls back to $OSINSPECT_CONFIG
    #[arg(long)]
    config: Option<PathBuf>,

    /// Polling interval in milliseconds
    #[arg(short = 'i', long)]
    interval_ms: Option<u64>,

    /// Exit after this many reports
    #[arg(short, long)]
    count: Option<u64>,

    /// Root of the memory cgroup hierarchy
    #[arg(long)]
    memory_root: Option<PathBuf>,

    /// Root of the cpu cgroup hierarchy
    #[arg(long)]
    cpu_root: Option<PathBuf>,

    /// Cores left out of the available-core count
    #[arg(long)]
    reserved_cores: Option<usize>,

    /// Emit one JSON document per report instead of text
    #[arg(long)]
    json: bool,

    /// Write reports to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// procfs mount point
    #[arg(long)]
    proc_root: Option<PathBuf>,
}

impl Args {
    /// Command-line values win over the config file
    fn apply(self, config: &mut AppConfig) {
        if let Some(interval_ms) = self.interval_ms {
            config.monitoring.interval_ms = interval_ms;
        }
        if self.count.is_some() {
            config.monitoring.count = self.count;
        }
        if self.memory_root.is_some() {
            config.cgroup.memory_root = self.memory_root;
        }
        if self.cpu_root.is_some() {
            config.cgroup.cpu_root = self.cpu_root;
        }
        if let Some(reserved) = self.reserved_cores {
            config.report.reserved_cores = reserved;
        }
        if self.json {
            config.report.format = OutputFormat::Json;
        }
        if self.output.is_some() {
            config.report.output = self.output;
        }
        if let Some(proc_root) = self.proc_root {
            config.host.proc_root = proc_root;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init("info");

    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let writer = match &config.report.output {
        Some(path) => ReportWriter::create(path, config.report.format)?,
        None => ReportWriter::stdout(config.report.format),
    };

    let policy = DerivePolicy {
        reserved_cores: config.report.reserved_cores,
    };
    let app = App::new(Collectors::from_config(&config), policy);

    tracing::info!(
        interval_ms = config.monitoring.interval_ms,
        count = ?config.monitoring.count,
        "osinspect starting"
    );
    let written = app::run(app, RunSettings::from_config(&config), writer).await?;

    if let Some(path) = &config.report.output {
        tracing::info!(reports = written, path = %path.display(), "reports written");
    }

    Ok(())
}
