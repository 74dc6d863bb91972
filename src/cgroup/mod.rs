//! Cgroup correlation: canonical naming, the memory/CPU join and the
//! derived ratios shown in reports.
//!
//! Everything in here is pure computation over snapshots that were already
//! collected; no I/O and no state carried between cycles.

pub mod correlate;
pub mod derive;
pub mod normalize;

pub use correlate::{correlate, CombinedCgroupRecord, CorrelatedCgroups};
pub use derive::{
    derive, derive_all, CpuDerived, DerivePolicy, DerivedCgroupMetrics, MemDerived,
    ProcessCpuAttribution,
};
pub use normalize::{canonical_name, ROOT_CGROUP};
