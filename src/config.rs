use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file when `--config` is absent
pub const CONFIG_ENV: &str = "OSINSPECT_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitoring: MonitoringConfig,
    pub host: HostConfig,
    pub cgroup: CgroupConfig,
    pub report: ReportConfig,
    pub disk: DiskConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub interval_ms: u64,
    /// Stop after this many reports; run until interrupted when unset
    pub count: Option<u64>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            count: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub proc_root: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

/// Hierarchy roots; discovered from mountinfo when unset
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CgroupConfig {
    pub memory_root: Option<PathBuf>,
    pub cpu_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Cores left out of the throttling denominator
    pub reserved_cores: usize,
    pub format: OutputFormat,
    /// Write reports here instead of stdout
    pub output: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            reserved_cores: 1,
            format: OutputFormat::Text,
            output: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    pub include_partitions: bool,
}

impl AppConfig {
    /// Load from `path`, else from `$OSINSPECT_CONFIG`, else defaults.
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        };

        match path {
            Some(path) => {
                let s = std::fs::read_to_string(&path)
                    .with_context(|| format!("config {}", path.display()))?;
                Self::load_from_str(&s)
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.monitoring.interval_ms > 0,
            "monitoring.interval_ms must be > 0, got {}",
            self.monitoring.interval_ms
        );
        if let Some(count) = self.monitoring.count {
            anyhow::ensure!(count > 0, "monitoring.count must be > 0, got {}", count);
        }
        anyhow::ensure!(
            !self.host.proc_root.as_os_str().is_empty(),
            "host.proc_root must be non-empty"
        );
        for (key, root) in [
            ("cgroup.memory_root", &self.cgroup.memory_root),
            ("cgroup.cpu_root", &self.cgroup.cpu_root),
        ] {
            if let Some(root) = root {
                anyhow::ensure!(!root.as_os_str().is_empty(), "{} must be non-empty", key);
            }
        }
        Ok(())
    }
}
