use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{DeviceEvent, ScanEvent};
use super::record::DeviceRecord;
use crate::utils::bounded_log::BoundedLog;

pub const SCHEMA_VERSION: u32 = 3;
pub const SCAN_EVENTS_CAP: usize = 50;
pub const CONNECTION_EVENTS_CAP: usize = 100;
pub const IP_CHANGES_CAP: usize = 50;
pub const MAC_CHANGES_CAP: usize = 50;

/// The persisted history, as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryDocument {
    pub version: u32,
    /// Identity key (see [`IdentityKey`](super::record::IdentityKey)) to record.
    pub devices_by_identity: BTreeMap<String, DeviceRecord>,
    /// Addresses seen in the latest scan only.
    pub identity_by_ip: BTreeMap<IpAddr, String>,
    pub scan_events: BoundedLog<ScanEvent>,
    pub connection_events: BoundedLog<DeviceEvent>,
    pub ip_changes: BoundedLog<DeviceEvent>,
    pub mac_changes: BoundedLog<DeviceEvent>,
    pub last_scan: Option<ScanEvent>,
    pub stats: DocumentStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total_scans: u64,
    pub unique_devices: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for HistoryDocument {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            devices_by_identity: BTreeMap::new(),
            identity_by_ip: BTreeMap::new(),
            scan_events: BoundedLog::new(SCAN_EVENTS_CAP),
            connection_events: BoundedLog::new(CONNECTION_EVENTS_CAP),
            ip_changes: BoundedLog::new(IP_CHANGES_CAP),
            mac_changes: BoundedLog::new(MAC_CHANGES_CAP),
            last_scan: None,
            stats: DocumentStats::default(),
        }
    }
}

impl HistoryDocument {
    /// Brings a freshly loaded document back under the current caps.
    pub fn normalize(&mut self) {
        self.scan_events.set_capacity(SCAN_EVENTS_CAP);
        self.connection_events.set_capacity(CONNECTION_EVENTS_CAP);
        self.ip_changes.set_capacity(IP_CHANGES_CAP);
        self.mac_changes.set_capacity(MAC_CHANGES_CAP);
        for record in self.devices_by_identity.values_mut() {
            record.enforce_caps();
        }
        self.stats.unique_devices = self.devices_by_identity.len();
    }

    /// Resolves a MAC (any notation), placeholder key, or current-scan IP.
    pub fn find(&self, mac_key_or_ip: &str) -> Option<&DeviceRecord> {
        let needle = mac_key_or_ip.trim();
        if let Some(record) = self.devices_by_identity.get(needle) {
            return Some(record);
        }
        if let Ok(key) = needle.parse::<super::record::IdentityKey>() {
            if let Some(record) = self.devices_by_identity.get(&key.to_string()) {
                return Some(record);
            }
        }
        let ip: IpAddr = needle.parse().ok()?;
        let key = self.identity_by_ip.get(&ip)?;
        self.devices_by_identity.get(key)
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
