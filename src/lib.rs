//! Host resource reporter.
//!
//! Polls disk, interface and per-cgroup CPU/memory snapshots, joins the two
//! cgroup hierarchies by canonical name and renders one report per cycle.

pub mod app;
pub mod cgroup;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod process;
pub mod report;
