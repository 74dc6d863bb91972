// Real collectors over a fake procfs and cgroup tree

use osinspect::app::{App, Collectors};
use osinspect::cgroup::DerivePolicy;
use osinspect::config::AppConfig;
use std::fs;
use std::path::Path;

const MB: u64 = 1024 * 1024;

fn write(dir: &Path, file: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(file), content).unwrap();
}

fn fake_proc(root: &Path) {
    write(
        root,
        "diskstats",
        "   8       0 sda 100 0 800 50 20 0 160 30 0 40 80\n   8       1 sda1 10 0 80 5 2 0 16 3 0 4 8\n",
    );
    write(
        &root.join("net"),
        "dev",
        "Inter-|   Receive                                                |  Transmit\n \
         face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    \
         lo: 100 1 0 0 0 0 0 0 100 1 0 0 0 0 0 0\n  \
         eth0: 1000 10 0 0 0 0 0 0 2000 20 0 0 0 0 0 0\n",
    );
    let mut stat = String::from("cpu  10 0 10 100 0 0 0 0 0 0\n");
    for core in 0..5 {
        stat.push_str(&format!("cpu{} 2 0 2 20 0 0 0 0 0 0\n", core));
    }
    stat.push_str("intr 0\n");
    write(root, "stat", &stat);
}

fn config_for(proc: &Path, memory: &Path, cpu: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.host.proc_root = proc.to_path_buf();
    config.cgroup.memory_root = Some(memory.to_path_buf());
    config.cgroup.cpu_root = Some(cpu.to_path_buf());
    config
}

#[test]
fn test_first_cycle_over_fake_host() {
    let dir = tempfile::TempDir::new().unwrap();
    let proc = dir.path().join("proc");
    let memory = dir.path().join("memory");
    let cpu = dir.path().join("cpu");
    fake_proc(&proc);

    write(&memory.join("a"), "memory.usage_in_bytes", &format!("{}\n", 500 * MB));
    write(&memory.join("a"), "memory.soft_limit_in_bytes", &format!("{}\n", 1000 * MB));
    write(&cpu.join("a"), "cpu.cfs_quota_us", "200000\n");
    write(&cpu.join("a"), "cpu.cfs_period_us", "100000\n");
    write(&cpu.join("a"), "cpu.stat", "nr_periods 10\nnr_throttled 2\nthrottled_time 0\n");

    let config = config_for(&proc, &memory, &cpu);
    let mut app = App::new(Collectors::from_config(&config), DerivePolicy::default());

    assert_eq!(
        app.poll_cycle(),
        vec![
            "---",
            "disk: sda usage: n/a",
            "---",
            "iface: eth0 TX: 0 bit/s, RX: 0 bit/s",
            "---",
            "cgroup:a cpu: 0.0% cpu_throttling: 20.0% (2.0/4) mem: 50.0% (500.00 MB/1000.00 MB)",
        ]
    );
}

#[test]
fn test_missing_memory_hierarchy_keeps_cpu_data() {
    let dir = tempfile::TempDir::new().unwrap();
    let proc = dir.path().join("proc");
    let cpu = dir.path().join("cpu");
    fake_proc(&proc);
    write(&cpu.join("web"), "cpu.max", "50000 100000\n");

    let config = config_for(&proc, &dir.path().join("absent"), &cpu);
    let mut app = App::new(Collectors::from_config(&config), DerivePolicy { reserved_cores: 0 });

    let lines = app.poll_cycle();
    assert_eq!(
        lines.last().map(String::as_str),
        Some("cgroup:web cpu: 0.0% cpu_throttling: 0.0% (0.5/5)")
    );
}

#[test]
fn test_missing_procfs_drops_host_sections() {
    let dir = tempfile::TempDir::new().unwrap();
    let memory = dir.path().join("memory");
    write(&memory.join("a"), "memory.usage_in_bytes", "1024\n");

    let config = config_for(&dir.path().join("noproc"), &memory, &dir.path().join("nocpu"));
    let mut app = App::new(Collectors::from_config(&config), DerivePolicy::default());

    assert_eq!(app.poll_cycle(), vec!["---", "cgroup:a mem: 1.00 KB (no soft limit)"]);
}
