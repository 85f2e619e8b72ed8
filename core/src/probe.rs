//! The **port** through which lanwatch touches the network.
//!
//! Each method is one OS-level primitive with a single call and a typed failure
//! reason. The presence detector only ever talks to this trait, so the concrete
//! [`system`] adapter can be swapped for a scripted network in tests.
//!
//! Implementations should bound their own work, but callers do not rely on it:
//! the presence detector wraps every call in its own timeout.

use std::collections::HashMap;
use std::net::IpAddr;

use async_trait::async_trait;
use lanwatch_common::error::ProbeError;

pub mod system;

#[cfg(any(test, feature = "scripted"))]
pub mod scripted;

/// Canonical MAC (`AA:BB:CC:DD:EE:FF`) to the IP the local ARP table maps it to.
pub type ArpTable = HashMap<String, IpAddr>;

#[async_trait]
pub trait NetworkProber: Send + Sync {
    /// Sends one echo request to `ip`.
    async fn ping(&self, ip: IpAddr) -> Result<(), ProbeError>;

    /// Pings `hostname` and returns the address the resolver actually used.
    async fn ping_hostname(&self, hostname: &str) -> Result<IpAddr, ProbeError>;

    /// Reads the local ARP table.
    async fn read_arp_table(&self) -> Result<ArpTable, ProbeError>;
}
