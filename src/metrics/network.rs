//! Network interface bandwidth from /proc/net/dev.

use super::Collector;
use crate::error::{CollectError, CollectResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

/// Transmit/receive bandwidth of one interface, in bits per second
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceRates {
    pub tx_bits_per_sec: f64,
    pub rx_bits_per_sec: f64,
}

/// Per-interface bandwidth, keyed by interface name (e.g. "eth0", "ens5")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSnapshot {
    pub interfaces: BTreeMap<String, InterfaceRates>,
}

#[derive(Debug, Clone, Copy, Default)]
struct RawCounters {
    rx_bytes: u64,
    tx_bytes: u64,
}

/// Interface collector with state for rate calculations
pub struct InterfaceCollector {
    netdev: PathBuf,
    prev_counters: HashMap<String, RawCounters>,
    prev_time: Option<Instant>,
}

impl InterfaceCollector {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            netdev: proc_root.into().join("net").join("dev"),
            prev_counters: HashMap::new(),
            prev_time: None,
        }
    }

    /// Turn one read of /proc/net/dev into a snapshot. Rates are zero until
    /// a previous sample exists for the interface.
    pub fn sample(&mut self, netdev: &str, now: Instant) -> InterfaceSnapshot {
        let elapsed_secs = self
            .prev_time
            .map(|prev| now.saturating_duration_since(prev).as_secs_f64());

        let mut current: HashMap<String, RawCounters> = HashMap::new();
        let mut interfaces = BTreeMap::new();

        // Two header lines
        for line in netdev.lines().skip(2) {
            let Some((name, counters)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if name == "lo" {
                continue;
            }

            let parts: Vec<&str> = counters.split_whitespace().collect();
            if parts.len() < 16 {
                continue;
            }

            let raw = RawCounters {
                rx_bytes: parts[0].parse().unwrap_or(0),
                tx_bytes: parts[8].parse().unwrap_or(0),
            };
            current.insert(name.to_string(), raw);

            let rates = match (self.prev_counters.get(name), elapsed_secs) {
                (Some(prev), Some(secs)) if secs > 0.0 => InterfaceRates {
                    tx_bits_per_sec: raw.tx_bytes.saturating_sub(prev.tx_bytes) as f64 * 8.0 / secs,
                    rx_bits_per_sec: raw.rx_bytes.saturating_sub(prev.rx_bytes) as f64 * 8.0 / secs,
                },
                _ => InterfaceRates::default(),
            };
            interfaces.insert(name.to_string(), rates);
        }

        self.prev_counters = current;
        self.prev_time = Some(now);

        InterfaceSnapshot { interfaces }
    }
}

impl Collector for InterfaceCollector {
    type Snapshot = InterfaceSnapshot;

    fn collect(&mut self) -> CollectResult<InterfaceSnapshot> {
        let content =
            fs::read_to_string(&self.netdev).map_err(|e| CollectError::io(&self.netdev, e))?;
        Ok(self.sample(&content, Instant::now()))
    }
}
