//! An in-memory network for tests: which addresses answer, what names resolve
//! to, and what the ARP table says.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lanwatch_common::error::ProbeError;
use lanwatch_common::network::mac;

use super::{ArpTable, NetworkProber};

#[derive(Default)]
struct Script {
    reachable: HashSet<IpAddr>,
    hanging: HashSet<IpAddr>,
    hostnames: HashMap<String, IpAddr>,
    arp: ArpTable,
    arp_failure: Option<ProbeError>,
    pings: HashMap<IpAddr, usize>,
    arp_reads: usize,
}

#[derive(Default)]
pub struct ScriptedProber {
    script: Mutex<Script>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `ip` answers pings.
    pub fn reachable(&self, ip: IpAddr) -> &Self {
        self.script().reachable.insert(ip);
        self
    }

    /// `ip` stops answering pings.
    pub fn unreachable(&self, ip: IpAddr) -> &Self {
        self.script().reachable.remove(&ip);
        self
    }

    /// Pings to `ip` never complete.
    pub fn hangs(&self, ip: IpAddr) -> &Self {
        self.script().hanging.insert(ip);
        self
    }

    /// `hostname` resolves to `ip`; the hostname ping succeeds only if `ip` is reachable.
    pub fn resolves(&self, hostname: &str, ip: IpAddr) -> &Self {
        self.script().hostnames.insert(hostname.to_string(), ip);
        self
    }

    pub fn arp_entry(&self, raw_mac: &str, ip: IpAddr) -> &Self {
        if let Some(canonical) = mac::normalize(raw_mac) {
            self.script().arp.insert(canonical, ip);
        }
        self
    }

    pub fn fail_arp(&self, error: ProbeError) -> &Self {
        self.script().arp_failure = Some(error);
        self
    }

    pub fn ping_count(&self, ip: IpAddr) -> usize {
        self.script().pings.get(&ip).copied().unwrap_or(0)
    }

    pub fn total_pings(&self) -> usize {
        self.script().pings.values().sum()
    }

    pub fn arp_reads(&self) -> usize {
        self.script().arp_reads
    }

    fn answer(&self, ip: IpAddr) -> Option<Result<(), ProbeError>> {
        let mut script = self.script();
        *script.pings.entry(ip).or_default() += 1;
        if script.hanging.contains(&ip) {
            return None;
        }
        Some(if script.reachable.contains(&ip) {
            Ok(())
        } else {
            Err(ProbeError::NoResponse)
        })
    }
}

#[async_trait]
impl NetworkProber for ScriptedProber {
    async fn ping(&self, ip: IpAddr) -> Result<(), ProbeError> {
        match self.answer(ip) {
            Some(result) => result,
            None => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProbeError::NoResponse)
            }
        }
    }

    async fn ping_hostname(&self, hostname: &str) -> Result<IpAddr, ProbeError> {
        let resolved = self.script().hostnames.get(hostname).copied();
        let Some(ip) = resolved else {
            return Err(ProbeError::execution(format!("unknown host {hostname}")));
        };
        self.ping(ip).await.map(|()| ip)
    }

    async fn read_arp_table(&self) -> Result<ArpTable, ProbeError> {
        let mut script = self.script();
        script.arp_reads += 1;
        match &script.arp_failure {
            Some(err) => Err(err.clone()),
            None => Ok(script.arp.clone()),
        }
    }
}
