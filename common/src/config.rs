use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;

pub const HISTORY_FILE_NAME: &str = "network_history.json";

/// Runtime settings for one lanwatch process.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub presence: PresenceConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// Upper bound for a single ping round trip.
    pub ping_timeout: Duration,
    /// Upper bound for helper commands such as reading the ARP table.
    pub helper_timeout: Duration,
    /// How long a finished [`PresenceResult`](crate::network::host::PresenceResult) is reused.
    pub result_ttl: Duration,
    pub arp_ttl: Duration,
    /// Ceiling on probes in flight within one batch.
    pub max_concurrent_probes: usize,
    /// Disables the per-host result cache. The ARP cache stays active.
    pub no_cache: bool,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            ping_timeout: Duration::from_secs(1),
            helper_timeout: Duration::from_secs(2),
            result_ttl: Duration::from_secs(300),
            arp_ttl: Duration::from_secs(60),
            max_concurrent_probes: 32,
            no_cache: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub data_dir: PathBuf,
    /// A device seen again after a longer absence produces a reconnection.
    pub reconnection_threshold: TimeDelta,
    /// Absent devices last seen longer ago than this never produce a disconnection.
    pub disconnection_horizon: TimeDelta,
    /// Devices seen within this window are listed as recent.
    pub recent_window: TimeDelta,
}

impl HistoryConfig {
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE_NAME)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            reconnection_threshold: TimeDelta::hours(1),
            disconnection_horizon: TimeDelta::hours(24),
            recent_window: TimeDelta::minutes(5),
        }
    }
}
