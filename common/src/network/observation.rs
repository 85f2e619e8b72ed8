use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::ObservationError;
use crate::network::mac;

/// One device as reported by a scan, before reconciliation.
///
/// Field names follow what the scanners emit. Everything is optional on the
/// wire; an observation without an `ip` is rejected by [`Self::ip`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceObservation {
    #[serde(default)]
    pub ip: Option<IpAddr>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub os_detected: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub ping_success: bool,
    #[serde(default)]
    pub open_ports: Vec<u16>,
}

impl DeviceObservation {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip: Some(ip),
            ..Self::default()
        }
    }

    pub fn with_mac(mut self, mac: impl Into<String>) -> Self {
        self.mac_address = Some(mac.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn ip(&self) -> Result<IpAddr, ObservationError> {
        self.ip.ok_or(ObservationError::MissingIp)
    }

    pub fn canonical_mac(&self) -> Option<String> {
        self.mac_address.as_deref().and_then(mac::normalize)
    }

    pub fn hostname(&self) -> Option<&str> {
        non_blank(self.hostname.as_deref())
    }

    pub fn vendor(&self) -> Option<&str> {
        non_blank(self.vendor.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
