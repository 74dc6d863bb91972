//! Canonical cgroup names.
//!
//! The cpu and memory controllers may be mounted at different roots, so the
//! same logical cgroup shows up under two unrelated absolute paths. Both are
//! reduced to the path relative to their own mountpoint before joining.

use std::path::{Component, Path};

/// Name given to the hierarchy root itself
pub const ROOT_CGROUP: &str = ".";

/// Relativize `path` against `mountpoint`.
///
/// A path outside the mountpoint (symlink race, misconfigured root, a `..`
/// escaping the root) is returned unchanged so a single bad entry never
/// aborts the report. Non-UTF-8 components are kept lossily; distinct
/// directories never share a name.
pub fn canonical_name(path: &Path, mountpoint: &Path) -> String {
    let parts = path.strip_prefix(mountpoint).ok().and_then(|rel| {
        rel.components()
            .map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
    });

    match parts {
        Some(parts) if parts.is_empty() => ROOT_CGROUP.to_string(),
        Some(parts) => parts.join("/"),
        None => {
            tracing::warn!(
                path = %path.display(),
                mountpoint = %mountpoint.display(),
                "cgroup path outside its hierarchy root, using it verbatim"
            );
            path.to_string_lossy().into_owned()
        }
    }
}
