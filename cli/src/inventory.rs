//! Loads the configured hosts from a JSON inventory file.

use std::fs;
use std::path::Path;

use anyhow::Context;
use lanwatch_common::network::host::HostDescriptor;
use tracing::warn;

pub fn load_hosts(path: &Path) -> anyhow::Result<Vec<HostDescriptor>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read host inventory {}", path.display()))?;
    let hosts: Vec<HostDescriptor> = serde_json::from_str(&raw)
        .with_context(|| format!("host inventory {} is not a JSON array of hosts", path.display()))?;

    for host in &hosts {
        if host.mac.is_some() && host.canonical_mac().is_none() {
            warn!(host = %host.name, mac = ?host.mac, "MAC does not parse, ARP fallback disabled");
        }
    }
    if hosts.is_empty() {
        warn!("host inventory {} is empty", path.display());
    }
    Ok(hosts)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
