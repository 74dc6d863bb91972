//! Shared plumbing for the cgroup filesystem collectors: hierarchy discovery,
//! directory walking and small control-file readers.

use crate::error::{CollectError, CollectResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Records read from one cgroup controller hierarchy in a single poll.
///
/// Every record path lies under `mountpoint`; the walk only ever descends
/// from that root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgroupSnapshot<R> {
    pub mountpoint: PathBuf,
    pub records: Vec<R>,
}

impl<R> CgroupSnapshot<R> {
    pub fn new(mountpoint: impl Into<PathBuf>) -> Self {
        Self {
            mountpoint: mountpoint.into(),
            records: Vec::new(),
        }
    }

    pub fn with_records(mountpoint: impl Into<PathBuf>, records: Vec<R>) -> Self {
        Self {
            mountpoint: mountpoint.into(),
            records,
        }
    }
}

/// Find where the hierarchy carrying `controller` is mounted.
///
/// A v1 hierarchy listing the controller in its super options wins; a
/// unified (cgroup2) mount is the fallback.
pub fn find_cgroup_mount(mountinfo: &str, controller: &str) -> Option<PathBuf> {
    let mut unified = None;

    for line in mountinfo.lines() {
        // <id> <parent> <maj:min> <root> <mountpoint> <opts> [optional...] - <fstype> <source> <superopts>
        let Some((pre, post)) = line.split_once(" - ") else {
            continue;
        };
        let Some(mountpoint) = pre.split_whitespace().nth(4) else {
            continue;
        };
        let mut post = post.split_whitespace();
        let fstype = post.next().unwrap_or("");
        let superopts = post.nth(1).unwrap_or("");

        match fstype {
            "cgroup" if superopts.split(',').any(|opt| opt == controller) => {
                return Some(PathBuf::from(mountpoint));
            }
            "cgroup2" if unified.is_none() => unified = Some(PathBuf::from(mountpoint)),
            _ => {}
        }
    }

    unified
}

/// Read `<proc_root>/self/mountinfo` and locate the hierarchy for `controller`
pub fn discover_mountpoint(proc_root: &Path, controller: &str) -> CollectResult<PathBuf> {
    let path = proc_root.join("self").join("mountinfo");
    let mountinfo = fs::read_to_string(&path).map_err(|e| CollectError::io(&path, e))?;
    find_cgroup_mount(&mountinfo, controller)
        .ok_or_else(|| CollectError::NotMounted(controller.to_string()))
}

/// All cgroup directories under `root`, root included.
///
/// Directories that vanish mid-walk are skipped; cgroups come and go.
pub fn cgroup_dirs(root: &Path, controller: &str) -> CollectResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CollectError::NotMounted(controller.to_string()));
    }

    let dirs = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => Some(entry.into_path()),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, controller, "skipping unreadable cgroup entry");
                None
            }
        })
        .collect();

    Ok(dirs)
}

/// Read a single-value control file. `None` when the file is absent.
pub fn read_value(dir: &Path, file: &str) -> CollectResult<Option<String>> {
    let path = dir.join(file);
    match fs::read_to_string(&path) {
        Ok(s) => Ok(Some(s.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CollectError::io(path, e)),
    }
}

/// Read an unsigned control file, failing on non-numeric content
pub fn read_u64(dir: &Path, file: &str) -> CollectResult<Option<u64>> {
    match read_value(dir, file)? {
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| CollectError::parse(dir.join(file), format!("expected integer, got '{s}'"))),
        None => Ok(None),
    }
}

/// Look up `key` in a flat keyed file such as cpu.stat ("nr_periods 42")
pub fn keyed_u64(content: &str, key: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next()? == key {
            parts.next()?.parse().ok()
        } else {
            None
        }
    })
}
