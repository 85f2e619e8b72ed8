use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use lanwatch_common::history::document::HistoryDocument;
use lanwatch_common::history::event::{DeviceEvent, ScanEvent};
use lanwatch_common::history::record::{DeviceRecord, DeviceSnapshot};

use super::HistoryStore;
use super::reconcile::addresses_of;

/// Time since a device was last seen, at display granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum LastSeen {
    Minutes(i64),
    Hours(i64),
    Days(i64),
}

impl LastSeen {
    pub fn from_elapsed(elapsed: TimeDelta) -> Self {
        let secs = elapsed.num_seconds().max(0);
        if secs < 3600 {
            LastSeen::Minutes(secs / 60)
        } else if secs < 86_400 {
            LastSeen::Hours(secs / 3600)
        } else {
            LastSeen::Days(secs / 86_400)
        }
    }
}

impl fmt::Display for LastSeen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastSeen::Minutes(n) => write!(f, "{n}min ago"),
            LastSeen::Hours(n) => write!(f, "{n}h ago"),
            LastSeen::Days(n) => write!(f, "{n}d ago"),
        }
    }
}

/// A record flattened for listing.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub key: String,
    pub current: DeviceSnapshot,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub scan_count: u64,
    pub present: bool,
    pub ip_count: usize,
    pub mac_count: usize,
    pub hostname_count: usize,
    pub vendor_count: usize,
    pub all_ips: Vec<IpAddr>,
    /// Addresses bound to this device by the latest scan.
    pub current_ips: Vec<IpAddr>,
    pub last_seen: LastSeen,
    pub is_recent: bool,
}

impl DeviceSummary {
    fn new(doc: &HistoryDocument, key: &str, record: &DeviceRecord, now: DateTime<Utc>, recent_window: TimeDelta) -> Self {
        let elapsed = now - record.last_seen_at;
        Self {
            key: key.to_string(),
            current: record.current.clone(),
            first_seen_at: record.first_seen_at,
            last_seen_at: record.last_seen_at,
            scan_count: record.scan_count,
            present: record.present,
            ip_count: record.ip_history.len(),
            mac_count: record.mac_history.len(),
            hostname_count: record.hostname_history.len(),
            vendor_count: record.vendor_history.len(),
            all_ips: record.ip_history.clone(),
            current_ips: addresses_of(doc, key),
            last_seen: LastSeen::from_elapsed(elapsed),
            is_recent: elapsed < recent_window,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_scans: u64,
    pub unique_devices: usize,
    pub last_scan: Option<ScanEvent>,
    pub last_updated: Option<DateTime<Utc>>,
    pub recent_events_count: usize,
    pub has_data: bool,
}

/// Heads of the three event logs, newest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecentEvents {
    pub connection_events: Vec<DeviceEvent>,
    pub ip_changes: Vec<DeviceEvent>,
    pub mac_changes: Vec<DeviceEvent>,
}

impl RecentEvents {
    pub fn is_empty(&self) -> bool {
        self.connection_events.is_empty() && self.ip_changes.is_empty() && self.mac_changes.is_empty()
    }
}

/// Every record, most recently seen first.
pub fn summarize(doc: &HistoryDocument, now: DateTime<Utc>, recent_window: TimeDelta) -> Vec<DeviceSummary> {
    let mut devices: Vec<DeviceSummary> = doc
        .devices_by_identity
        .iter()
        .map(|(key, record)| DeviceSummary::new(doc, key, record, now, recent_window))
        .collect();
    devices.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at).then_with(|| a.key.cmp(&b.key)));
    devices
}

pub fn stats_of(doc: &HistoryDocument) -> StoreStats {
    StoreStats {
        total_scans: doc.stats.total_scans,
        unique_devices: doc.devices_by_identity.len(),
        last_scan: doc.last_scan.clone(),
        last_updated: doc.stats.last_updated,
        recent_events_count: doc.connection_events.len(),
        has_data: doc.last_scan.is_some(),
    }
}

impl HistoryStore {
    pub fn devices(&self) -> Vec<DeviceSummary> {
        summarize(&self.load(), Utc::now(), self.cfg.recent_window)
    }

    pub fn stats(&self) -> StoreStats {
        stats_of(&self.load())
    }

    pub fn recent_events(&self, limit: usize) -> RecentEvents {
        let doc = self.load();
        RecentEvents {
            connection_events: doc.connection_events.recent(limit),
            ip_changes: doc.ip_changes.recent(limit),
            mac_changes: doc.mac_changes.recent(limit),
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
