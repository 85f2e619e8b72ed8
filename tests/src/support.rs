use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use lanwatch_common::config::{Config, HistoryConfig};
use lanwatch_core::cycle::ScanCycle;
use lanwatch_core::history::HistoryStore;
use lanwatch_core::presence::PresenceDetector;
use lanwatch_core::probe::NetworkProber;
use lanwatch_core::probe::scripted::ScriptedProber;
use lanwatch_core::vendors::NoVendors;

pub const NAS_MAC: &str = "AA:BB:CC:DD:EE:FF";

pub fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
}

pub fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// A scripted network plus a history in a throwaway directory.
pub struct Lab {
    pub dir: TempDir,
    pub net: Arc<ScriptedProber>,
    pub cycle: ScanCycle,
}

impl Lab {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(mut cfg: Config) -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        cfg.history = HistoryConfig {
            data_dir: dir.path().join("data"),
            ..cfg.history
        };

        let net = Arc::new(ScriptedProber::new());
        let prober: Arc<dyn NetworkProber> = net.clone();
        let detector = Arc::new(PresenceDetector::new(prober, cfg.presence.clone()));
        let store = Arc::new(HistoryStore::open(cfg.history.clone())?);
        let cycle = ScanCycle::new(detector, store, Box::new(NoVendors));
        Ok(Self { dir, net, cycle })
    }

    pub fn history_file(&self) -> std::path::PathBuf {
        self.dir.path().join("data").join("network_history.json")
    }

    pub fn store(&self) -> &HistoryStore {
        self.cycle.store()
    }

    /// A second store over the same file, as another process would open it.
    pub fn reopen(&self) -> anyhow::Result<HistoryStore> {
        Ok(HistoryStore::open(self.store().config().clone())?)
    }
}
