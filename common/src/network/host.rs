//! # Presence Models
//!
//! A [`HostDescriptor`] is what the inventory knows about a configured device.
//! A [`PresenceResult`] is what one probe decided about it.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProbeError;
use crate::network::mac;

/// A configured device, as handed to the presence detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDescriptor {
    pub name: String,
    #[serde(rename = "ip")]
    pub configured_ip: IpAddr,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

impl HostDescriptor {
    pub fn new(name: impl Into<String>, configured_ip: IpAddr) -> Self {
        Self {
            name: name.into(),
            configured_ip,
            mac: None,
            hostname: None,
        }
    }

    pub fn with_mac(mut self, mac: impl Into<String>) -> Self {
        self.mac = Some(mac.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// The hostname, ignoring blank values.
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }

    /// The MAC in canonical form, ignoring values that do not parse.
    pub fn canonical_mac(&self) -> Option<String> {
        self.mac.as_deref().and_then(mac::normalize)
    }

    pub fn cache_key(&self) -> HostKey {
        HostKey {
            configured_ip: self.configured_ip,
            mac: self.canonical_mac(),
            hostname: self.hostname().map(str::to_owned),
        }
    }
}

/// Identity under which presence results are cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey {
    pub configured_ip: IpAddr,
    pub mac: Option<String>,
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
    /// The probe chain itself broke down; nothing is known about the host.
    Unknown,
}

/// How the presence decision was reached.
///
/// Offline variants are kept apart so consumers can tell a host that is
/// confirmed silent from one whose address is simply unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    PingOriginalIp,
    HostnameResolution,
    HostnameNoResponse,
    MacLookupPing,
    MacFoundNoPing,
    MacNotInArp,
    NoFallbackMethod,
    Error,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::PingOriginalIp => "ping_original_ip",
            DetectionMethod::HostnameResolution => "hostname_resolution",
            DetectionMethod::HostnameNoResponse => "hostname_no_response",
            DetectionMethod::MacLookupPing => "mac_lookup_ping",
            DetectionMethod::MacFoundNoPing => "mac_found_no_ping",
            DetectionMethod::MacNotInArp => "mac_not_in_arp",
            DetectionMethod::NoFallbackMethod => "no_fallback_method",
            DetectionMethod::Error => "error",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStep {
    PingConfiguredIp,
    PingHostname,
    ReadArpTable,
    PingArpCandidate,
}

/// A step that failed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub step: ProbeStep,
    pub error: ProbeError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceResult {
    pub status: PresenceStatus,
    pub current_ip: IpAddr,
    pub resolved_ip: Option<IpAddr>,
    pub ip_changed: bool,
    pub method: DetectionMethod,
    pub observed_at: DateTime<Utc>,
    /// Steps that failed on the way to this decision, in chain order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ProbeFailure>,
}

impl PresenceResult {
    /// Starting point of a probe chain: offline at the configured address.
    pub fn offline(configured_ip: IpAddr, method: DetectionMethod) -> Self {
        Self {
            status: PresenceStatus::Offline,
            current_ip: configured_ip,
            resolved_ip: None,
            ip_changed: false,
            method,
            observed_at: Utc::now(),
            failures: Vec::new(),
        }
    }

    /// Result used when a host's probe chain could not run to completion.
    pub fn degraded(configured_ip: IpAddr) -> Self {
        Self {
            status: PresenceStatus::Unknown,
            ..Self::offline(configured_ip, DetectionMethod::Error)
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == PresenceStatus::Online
    }
}

/// A descriptor together with the presence decision made for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedHost {
    #[serde(flatten)]
    pub host: HostDescriptor,
    pub presence: PresenceResult,
}

impl EnrichedHost {
    pub fn new(host: HostDescriptor, presence: PresenceResult) -> Self {
        Self { host, presence }
    }

    /// The configured address, when the host was found somewhere else.
    pub fn previous_ip(&self) -> Option<IpAddr> {
        self.presence
            .ip_changed
            .then_some(self.host.configured_ip)
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
