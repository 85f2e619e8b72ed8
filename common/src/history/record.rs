use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::network::mac;
use crate::network::observation::DeviceObservation;
use crate::utils::bounded_log::BoundedLog;

pub const SNAPSHOT_HISTORY_CAP: usize = 20;

const VOLATILE_PREFIX: &str = "no_mac_";

/// The key a device's history is stored under.
///
/// A MAC gives a stable identity. Without one the IP stands in, which means
/// a MAC-less device that changes address shows up as a new device and its
/// old record stops being updated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IdentityKey {
    Stable(String),
    Volatile(IpAddr),
}

impl IdentityKey {
    pub fn for_observation(canonical_mac: Option<String>, ip: IpAddr) -> Self {
        match canonical_mac {
            Some(mac) => IdentityKey::Stable(mac),
            None => IdentityKey::Volatile(ip),
        }
    }

    pub fn mac(&self) -> Option<&str> {
        match self {
            IdentityKey::Stable(mac) => Some(mac),
            IdentityKey::Volatile(_) => None,
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Stable(mac) => f.write_str(mac),
            IdentityKey::Volatile(ip) => write!(f, "{VOLATILE_PREFIX}{ip}"),
        }
    }
}

impl FromStr for IdentityKey {
    type Err = String;

    /// Accepts a MAC in any common notation or a `no_mac_<ip>` placeholder.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(ip) = s.strip_prefix(VOLATILE_PREFIX) {
            return ip
                .parse()
                .map(IdentityKey::Volatile)
                .map_err(|_| format!("invalid placeholder identity: {s}"));
        }
        mac::normalize(s)
            .map(IdentityKey::Stable)
            .ok_or_else(|| format!("invalid identity key: {s}"))
    }
}

/// The attributes a scan observed for a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub ip: IpAddr,
    pub mac: Option<String>,
    pub hostname: Option<String>,
    pub vendor: Option<String>,
    pub os_guess: Option<String>,
    pub device_type: Option<String>,
    pub open_ports: Vec<u16>,
    pub ping_success: bool,
}

impl DeviceSnapshot {
    pub fn from_observation(obs: &DeviceObservation, ip: IpAddr) -> Self {
        Self {
            ip,
            mac: obs.canonical_mac(),
            hostname: obs.hostname().map(str::to_owned),
            vendor: obs.vendor().map(str::to_owned),
            os_guess: obs.os_detected.clone().filter(|v| !v.trim().is_empty()),
            device_type: obs.device_type.clone().filter(|v| !v.trim().is_empty()),
            open_ports: obs.open_ports.clone(),
            ping_success: obs.ping_success,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedSnapshot {
    pub observed_at: DateTime<Utc>,
    pub snapshot: DeviceSnapshot,
}

/// Everything known about one physical device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub identity: IdentityKey,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub scan_count: u64,
    /// Whether the device was in the most recent batch that considered it.
    /// Cleared when a disconnection is recorded, so one absence yields one event.
    pub present: bool,
    pub current: DeviceSnapshot,
    pub ip_history: Vec<IpAddr>,
    pub mac_history: Vec<String>,
    pub hostname_history: Vec<String>,
    pub vendor_history: Vec<String>,
    pub snapshots: BoundedLog<TimedSnapshot>,
}

/// What a record looked like before [`DeviceRecord::observe`] updated it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorSighting {
    pub ip: IpAddr,
    pub hostname: Option<String>,
    pub vendor: Option<String>,
    pub last_seen_at: DateTime<Utc>,
    pub was_present: bool,
}

impl DeviceRecord {
    /// Seeds a record from its first sighting.
    pub fn first_seen(identity: IdentityKey, snapshot: DeviceSnapshot, now: DateTime<Utc>) -> Self {
        let mut snapshots = BoundedLog::new(SNAPSHOT_HISTORY_CAP);
        snapshots.push(TimedSnapshot {
            observed_at: now,
            snapshot: snapshot.clone(),
        });

        Self {
            mac_history: identity.mac().map(str::to_owned).into_iter().collect(),
            identity,
            first_seen_at: now,
            last_seen_at: now,
            scan_count: 1,
            present: true,
            ip_history: vec![snapshot.ip],
            hostname_history: snapshot.hostname.iter().cloned().collect(),
            vendor_history: snapshot.vendor.iter().cloned().collect(),
            current: snapshot,
            snapshots,
        }
    }

    /// Folds a new sighting into the record and returns what it replaced.
    pub fn observe(&mut self, snapshot: DeviceSnapshot, now: DateTime<Utc>) -> PriorSighting {
        let prior = PriorSighting {
            ip: self.current.ip,
            hostname: self.current.hostname.clone(),
            vendor: self.current.vendor.clone(),
            last_seen_at: self.last_seen_at,
            was_present: self.present,
        };

        append_distinct(&mut self.ip_history, snapshot.ip);
        if let Some(hostname) = &snapshot.hostname {
            if prior.hostname.as_ref() != Some(hostname) {
                append_distinct(&mut self.hostname_history, hostname.clone());
            }
        }
        if let Some(vendor) = &snapshot.vendor {
            if prior.vendor.as_ref() != Some(vendor) {
                append_distinct(&mut self.vendor_history, vendor.clone());
            }
        }

        self.last_seen_at = now;
        self.scan_count += 1;
        self.present = true;
        self.snapshots.push(TimedSnapshot {
            observed_at: now,
            snapshot: snapshot.clone(),
        });
        self.current = snapshot;

        prior
    }

    /// Re-applies the snapshot cap after loading a document written elsewhere.
    pub fn enforce_caps(&mut self) {
        self.snapshots.set_capacity(SNAPSHOT_HISTORY_CAP);
        append_distinct(&mut self.ip_history, self.current.ip);
    }
}

/// Ordered-set append: keeps first-seen order and never duplicates.
fn append_distinct<T: PartialEq>(history: &mut Vec<T>, value: T) {
    if !history.contains(&value) {
        history.push(value);
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
    use chrono::TimeDelta;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
    }

    fn snapshot(ip: IpAddr, hostname: Option<&str>, vendor: Option<&str>) -> DeviceSnapshot {
        DeviceSnapshot {
            ip,
            mac: Some("AA:BB:CC:DD:EE:FF".into()),
            hostname: hostname.map(Into::into),
            vendor: vendor.map(Into::into),
            os_guess: None,
            device_type: None,
            open_ports: Vec::new(),
            ping_success: true,
        }
    }

    #[test]
    fn identity_key_should_render_and_parse() {
        let stable: IdentityKey = "aa-bb-cc-dd-ee-ff".parse().unwrap();
        assert_eq!(stable, IdentityKey::Stable("AA:BB:CC:DD:EE:FF".into()));
        assert_eq!(stable.to_string(), "AA:BB:CC:DD:EE:FF");

        let volatile = IdentityKey::for_observation(None, ip(7));
        assert_eq!(volatile.to_string(), "no_mac_192.168.1.7");
        assert_eq!("no_mac_192.168.1.7".parse::<IdentityKey>().unwrap(), volatile);
        assert!("no_mac_nonsense".parse::<IdentityKey>().is_err());
    }

    #[test]
    fn first_seen_should_seed_every_history() {
        let now = Utc::now();
        let key = IdentityKey::Stable("AA:BB:CC:DD:EE:FF".into());
        let record = DeviceRecord::first_seen(key, snapshot(ip(10), Some("nas"), None), now);

        assert_eq!(record.scan_count, 1);
        assert_eq!(record.ip_history, vec![ip(10)]);
        assert_eq!(record.mac_history, vec!["AA:BB:CC:DD:EE:FF".to_string()]);
        assert_eq!(record.hostname_history, vec!["nas".to_string()]);
        assert!(record.vendor_history.is_empty());
        assert_eq!(record.snapshots.len(), 1);
    }

    #[test]
    fn volatile_identity_should_not_enter_mac_history() {
        let record = DeviceRecord::first_seen(
            IdentityKey::Volatile(ip(3)),
            snapshot(ip(3), None, None),
            Utc::now(),
        );
        assert!(record.mac_history.is_empty());
    }

    #[test]
    fn observe_should_return_prior_state_and_dedupe_histories() {
        let t0 = Utc::now();
        let key = IdentityKey::Stable("AA:BB:CC:DD:EE:FF".into());
        let mut record = DeviceRecord::first_seen(key, snapshot(ip(10), Some("nas"), Some("Acme")), t0);

        let t1 = t0 + TimeDelta::minutes(5);
        let prior = record.observe(snapshot(ip(11), Some("nas-2"), Some("Acme")), t1);
        assert_eq!(prior.ip, ip(10));
        assert_eq!(prior.last_seen_at, t0);

        let t2 = t1 + TimeDelta::minutes(5);
        record.observe(snapshot(ip(10), Some("nas"), Some("Acme")), t2);

        assert_eq!(record.ip_history, vec![ip(10), ip(11)]);
        assert_eq!(record.hostname_history, vec!["nas".to_string(), "nas-2".to_string()]);
        assert_eq!(record.vendor_history, vec!["Acme".to_string()]);
        assert_eq!(record.scan_count, 3);
        assert_eq!(record.last_seen_at, t2);
        assert_eq!(record.snapshots.latest().map(|s| s.snapshot.ip), Some(ip(10)));
    }

    #[test]
    fn snapshots_should_stay_capped() {
        let t0 = Utc::now();
        let key = IdentityKey::Stable("AA:BB:CC:DD:EE:FF".into());
        let mut record = DeviceRecord::first_seen(key, snapshot(ip(10), None, None), t0);
        for i in 1..=30 {
            record.observe(snapshot(ip(10), None, None), t0 + TimeDelta::minutes(i));
        }
        assert_eq!(record.snapshots.len(), SNAPSHOT_HISTORY_CAP);
        assert_eq!(record.scan_count, 31);
    }
}
