// End-to-end report rendering over in-memory snapshots

mod common;

use common::*;
use osinspect::cgroup::{DerivePolicy, ProcessCpuAttribution};
use osinspect::metrics::CpuTopology;
use osinspect::report::{build_document, render_report, ReportInput};

fn cgroup_input<'a>(
    mem: Option<&'a osinspect::metrics::CgroupMemSnapshot>,
    cpu: Option<&'a osinspect::metrics::CgroupCpuSnapshot>,
    topology: Option<&'a CpuTopology>,
    attribution: &'a dyn ProcessCpuAttribution,
) -> ReportInput<'a> {
    ReportInput {
        disks: None,
        interfaces: None,
        cgroup_mem: mem,
        cgroup_cpu: cpu,
        topology,
        attribution,
        policy: DerivePolicy::default(),
    }
}

#[test]
fn test_cgroup_in_both_hierarchies() {
    let mem = mem_snapshot("/m", &[("/m/a", 500 * MB, Some(1000 * MB))]);
    let cpu = cpu_snapshot("/c", &[("/c/a", 0.2, 2.0)]);
    let topology = CpuTopology { core_count: 5 };
    let lookup = |name: &str| (name == "a").then_some(37.5);

    let lines = render_report(&cgroup_input(Some(&mem), Some(&cpu), Some(&topology), &lookup));
    assert_eq!(
        lines,
        vec![
            "---",
            "cgroup:a cpu: 37.5% cpu_throttling: 20.0% (2.0/4) mem: 50.0% (500.00 MB/1000.00 MB)",
        ]
    );
}

#[test]
fn test_memory_only_cgroup() {
    let mem = mem_snapshot("/m", &[("/m/b", 100 * MB, Some(400 * MB))]);
    let cpu = cpu_snapshot("/c", &[]);
    let lookup = |_: &str| None::<f64>;

    let lines = render_report(&cgroup_input(Some(&mem), Some(&cpu), None, &lookup));
    assert_eq!(lines, vec!["---", "cgroup:b mem: 25.0% (100.00 MB/400.00 MB)"]);
}

#[test]
fn test_hierarchy_root_is_dot() {
    let mem = mem_snapshot("/sys/fs/cgroup/memory", &[("/sys/fs/cgroup/memory", 2048, None)]);
    let lookup = |_: &str| None::<f64>;

    let lines = render_report(&cgroup_input(Some(&mem), None, None, &lookup));
    assert_eq!(lines, vec!["---", "cgroup:. mem: 2.00 KB (no soft limit)"]);
}

#[test]
fn test_cgroups_sorted_by_name() {
    let mem = mem_snapshot("/m", &[("/m/z", 1, None), ("/m/a/b", 1, None)]);
    let cpu = cpu_snapshot("/c", &[("/c/k", 0.0, 1.0)]);
    let lookup = |_: &str| None::<f64>;

    let lines = render_report(&cgroup_input(Some(&mem), Some(&cpu), None, &lookup));
    let names: Vec<&str> = lines
        .iter()
        .skip(1)
        .filter_map(|l| l.strip_prefix("cgroup:"))
        .filter_map(|l| l.split(' ').next())
        .collect();
    assert_eq!(names, vec!["a/b", "k", "z"]);
}

#[test]
fn test_no_nan_reaches_the_report() {
    let mem = mem_snapshot("/m", &[("/m/a", 10, Some(0)), ("/m/b", 0, None)]);
    let cpu = cpu_snapshot("/c", &[("/c/a", f64::NAN, f64::INFINITY), ("/c/c", 0.0, 0.0)]);
    let topology = CpuTopology { core_count: 0 };
    let lookup = |_: &str| Some(f64::NAN);

    let lines = render_report(&cgroup_input(Some(&mem), Some(&cpu), Some(&topology), &lookup));
    assert_eq!(lines.len(), 4);
    for line in &lines {
        assert!(!line.contains("NaN"), "{}", line);
        assert!(!line.contains("inf"), "{}", line);
    }
}

#[test]
fn test_rendering_is_idempotent() {
    let mem = mem_snapshot("/m", &[("/m/a", 500 * MB, Some(1000 * MB)), ("/m/b", MB, None)]);
    let cpu = cpu_snapshot("/c", &[("/c/a", 0.2, 2.0), ("/c/c", 0.5, 0.5)]);
    let topology = CpuTopology { core_count: 8 };
    let lookup = |name: &str| (name != "c").then_some(12.0);

    let input = cgroup_input(Some(&mem), Some(&cpu), Some(&topology), &lookup);
    assert_eq!(render_report(&input), render_report(&input));
}

#[test]
fn test_missing_cpu_snapshot_keeps_memory_data() {
    let mem = mem_snapshot("/m", &[("/m/a", 512, Some(1024))]);
    let lookup = |_: &str| None::<f64>;

    let lines = render_report(&cgroup_input(Some(&mem), None, None, &lookup));
    assert_eq!(lines, vec!["---", "cgroup:a mem: 50.0% (512 B/1.00 KB)"]);
}

#[test]
fn test_document_carries_derived_cgroups() {
    let mem = mem_snapshot("/m", &[("/m/a", 500 * MB, Some(1000 * MB))]);
    let cpu = cpu_snapshot("/c", &[("/c/a", 0.2, 2.0)]);
    let topology = CpuTopology { core_count: 5 };
    let lookup = |_: &str| Some(37.5);

    let doc = build_document(
        &cgroup_input(Some(&mem), Some(&cpu), Some(&topology), &lookup),
        chrono::Utc::now(),
    );
    let cgroups = doc.cgroups.expect("cgroup section");
    assert_eq!(cgroups.len(), 1);
    let cpu = cgroups[0].cpu.as_ref().unwrap();
    assert_eq!(cpu.available_cores, Some(4));
    assert_eq!(cgroups[0].mem.as_ref().unwrap().usage_pct, Some(50.0));

    let json = serde_json::to_value(&cgroups[0]).unwrap();
    assert_eq!(json["name"], "a");
    assert_eq!(json["cpu"]["throttle_pct"], 20.0);
}
