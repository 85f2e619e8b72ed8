use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A change derived by diffing one scan against the stored history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    /// Identity key of the device, as stored.
    pub key: String,
    pub mac: Option<String>,
    pub ip: IpAddr,
    pub hostname: Option<String>,
    pub vendor: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    NewDevice,
    Reconnection { time_offline_secs: i64 },
    Disconnection { time_offline_secs: i64 },
    IpChange { old_ip: IpAddr, new_ip: IpAddr },
    /// Reserved: no policy decides yet when a new MAC is the same device.
    MacChange { old_mac: String, new_mac: String },
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::NewDevice => "new device",
            EventKind::Reconnection { .. } => "reconnection",
            EventKind::Disconnection { .. } => "disconnection",
            EventKind::IpChange { .. } => "ip change",
            EventKind::MacChange { .. } => "mac change",
        }
    }
}

/// One completed scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub at: DateTime<Utc>,
    pub device_count: usize,
    pub duration_secs: f64,
}

/// Per-cycle tally of derived events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub new_devices: usize,
    pub reconnections: usize,
    pub disconnections: usize,
    pub ip_changes: usize,
    pub mac_changes: usize,
    /// Observations dropped because they could not be reconciled.
    pub skipped_observations: usize,
}

impl ChangeSummary {
    pub fn record(&mut self, kind: &EventKind) {
        match kind {
            EventKind::NewDevice => self.new_devices += 1,
            EventKind::Reconnection { .. } => self.reconnections += 1,
            EventKind::Disconnection { .. } => self.disconnections += 1,
            EventKind::IpChange { .. } => self.ip_changes += 1,
            EventKind::MacChange { .. } => self.mac_changes += 1,
        }
    }

    pub fn total_events(&self) -> usize {
        self.new_devices + self.reconnections + self.disconnections + self.ip_changes + self.mac_changes
    }

    pub fn is_quiet(&self) -> bool {
        self.total_events() == 0
    }
}

impl<'a> FromIterator<&'a DeviceEvent> for ChangeSummary {
    fn from_iter<I: IntoIterator<Item = &'a DeviceEvent>>(events: I) -> Self {
        let mut summary = ChangeSummary::default();
        for event in events {
            summary.record(&event.kind);
        }
        summary
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn event(kind: EventKind) -> DeviceEvent {
        DeviceEvent {
            kind,
            key: "AA:BB:CC:DD:EE:FF".into(),
            mac: Some("AA:BB:CC:DD:EE:FF".into()),
            ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
            hostname: None,
            vendor: None,
            at: Utc::now(),
        }
    }

    #[test]
    fn summary_should_tally_each_kind() {
        let events = vec![
            event(EventKind::NewDevice),
            event(EventKind::NewDevice),
            event(EventKind::Disconnection { time_offline_secs: 600 }),
        ];
        let summary: ChangeSummary = events.iter().collect();
        assert_eq!(summary.new_devices, 2);
        assert_eq!(summary.disconnections, 1);
        assert_eq!(summary.total_events(), 3);
        assert!(!summary.is_quiet());
    }

    #[test]
    fn event_should_serialize_with_type_tag() {
        let json = serde_json::to_value(event(EventKind::Reconnection { time_offline_secs: 4000 })).unwrap();
        assert_eq!(json["type"], "reconnection");
        assert_eq!(json["time_offline_secs"], 4000);
        assert_eq!(json["ip"], "192.168.1.10");
    }
}
