//! # Presence Detector
//!
//! Decides whether a configured host is online. A configured IP goes stale
//! whenever a DHCP lease moves, so the detector falls back, in this order, to:
//!
//! 1. pinging the configured IP,
//! 2. pinging the hostname and taking the address the resolver used,
//! 3. looking the MAC up in the local ARP table and pinging that address.
//!
//! The first success wins. The [`DetectionMethod`] in the result records which
//! step decided, or which step failed last.
//!
//! Two caches bound the cost: the ARP table is read at most once per ARP TTL,
//! and a finished result is reused for the result TTL.

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

use lanwatch_common::config::PresenceConfig;
use lanwatch_common::error::ProbeError;
use lanwatch_common::network::host::{
    DetectionMethod, EnrichedHost, HostDescriptor, HostKey, PresenceResult, PresenceStatus,
    ProbeFailure, ProbeStep,
};
use lanwatch_common::utils::ttl_cache::TtlCache;

use crate::probe::{ArpTable, NetworkProber};

/// Slack on top of the ping timeout before the detector gives up on a ping call.
const PING_GRACE: Duration = Duration::from_millis(500);

/// Snapshot of the detector's caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceStats {
    pub cached_results: usize,
    pub arp_cache_age: Option<Duration>,
    pub arp_entries: usize,
}

pub struct PresenceDetector {
    prober: Arc<dyn NetworkProber>,
    cfg: PresenceConfig,
    results: Mutex<TtlCache<HostKey, PresenceResult>>,
    arp: Mutex<TtlCache<(), ArpTable>>,
    limiter: Arc<Semaphore>,
}

impl PresenceDetector {
    pub fn new(prober: Arc<dyn NetworkProber>, cfg: PresenceConfig) -> Self {
        Self {
            results: Mutex::new(TtlCache::new(cfg.result_ttl)),
            arp: Mutex::new(TtlCache::new(cfg.arp_ttl)),
            limiter: Arc::new(Semaphore::new(cfg.max_concurrent_probes.max(1))),
            prober,
            cfg,
        }
    }

    /// Presence of one host, served from the result cache when fresh.
    pub async fn check_status(&self, host: &HostDescriptor) -> PresenceResult {
        let key = host.cache_key();
        if !self.cfg.no_cache {
            if let Some(hit) = self.results.lock().await.get(&key) {
                debug!(host = %host.name, method = %hit.method, "presence served from cache");
                return hit.clone();
            }
        }
        self.probe_and_cache(host, key).await
    }

    /// Probes the host even if a cached result exists, and refreshes the cache.
    pub async fn check_status_fresh(&self, host: &HostDescriptor) -> PresenceResult {
        self.probe_and_cache(host, host.cache_key()).await
    }

    /// Probes every host concurrently, at most `max_concurrent_probes` at a time.
    ///
    /// Results come back in input order. A host whose probe task dies gets a
    /// degraded result; the rest of the batch is unaffected.
    pub async fn check_status_batch(self: &Arc<Self>, hosts: &[HostDescriptor]) -> Vec<PresenceResult> {
        let mut handles = Vec::with_capacity(hosts.len());
        for host in hosts {
            let detector = Arc::clone(self);
            let host = host.clone();
            handles.push(tokio::spawn(async move {
                let Ok(_permit) = Arc::clone(&detector.limiter).acquire_owned().await else {
                    return PresenceResult::degraded(host.configured_ip);
                };
                detector.check_status(&host).await
            }));
        }

        let mut results = Vec::with_capacity(hosts.len());
        for (host, handle) in hosts.iter().zip(handles) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(host = %host.name, "presence probe aborted: {err}");
                    results.push(PresenceResult::degraded(host.configured_ip));
                }
            }
        }
        results
    }

    /// [`Self::check_status_batch`], paired with the descriptors.
    pub async fn enrich(self: &Arc<Self>, hosts: &[HostDescriptor]) -> Vec<EnrichedHost> {
        let results = self.check_status_batch(hosts).await;
        hosts
            .iter()
            .cloned()
            .zip(results)
            .map(|(host, presence)| EnrichedHost::new(host, presence))
            .collect()
    }

    /// Forgets the cached result for one host.
    pub async fn invalidate(&self, host: &HostDescriptor) {
        self.results.lock().await.remove(&host.cache_key());
    }

    /// Drops both the result cache and the ARP table cache.
    pub async fn clear_cache(&self) {
        self.results.lock().await.clear();
        self.arp.lock().await.clear();
        info!("presence caches cleared");
    }

    pub async fn stats(&self) -> PresenceStats {
        let mut results = self.results.lock().await;
        results.purge_expired();
        let arp = self.arp.lock().await;
        PresenceStats {
            cached_results: results.len(),
            arp_cache_age: arp.age(&()),
            arp_entries: arp.get(&()).map_or(0, |table| table.len()),
        }
    }

    async fn probe_and_cache(&self, host: &HostDescriptor, key: HostKey) -> PresenceResult {
        let result = self.probe_chain(host).await;
        if !self.cfg.no_cache {
            let mut results = self.results.lock().await;
            results.purge_expired();
            results.insert(key, result.clone());
        }
        result
    }

    async fn probe_chain(&self, host: &HostDescriptor) -> PresenceResult {
        let configured = host.configured_ip;
        let mut chain = Chain::new(configured);

        // 1. Configured address
        match self.ping(configured).await {
            Ok(()) => return chain.online(configured, DetectionMethod::PingOriginalIp),
            Err(err) => chain.failed(ProbeStep::PingConfiguredIp, err),
        }

        // 2. Hostname
        let hostname = host.hostname();
        if let Some(name) = hostname {
            match self.ping_hostname(name).await {
                Ok(resolved) => {
                    if resolved != configured {
                        info!(host = %host.name, hostname = name, from = %configured, to = %resolved, "host found via hostname");
                    }
                    let mut result = chain.online(resolved, DetectionMethod::HostnameResolution);
                    result.resolved_ip = Some(resolved);
                    return result;
                }
                Err(err) => {
                    chain.failed(ProbeStep::PingHostname, err);
                    chain.method = Some(DetectionMethod::HostnameNoResponse);
                }
            }
        }

        // 3. MAC through the ARP table
        if let Some(mac) = host.canonical_mac() {
            let candidate = match self.arp_lookup(&mac).await {
                Ok(candidate) => candidate,
                Err(err) => {
                    chain.failed(ProbeStep::ReadArpTable, err);
                    None
                }
            };
            match candidate.filter(|ip| *ip != configured) {
                Some(candidate) => match self.ping(candidate).await {
                    Ok(()) => {
                        info!(host = %host.name, %mac, from = %configured, to = %candidate, "host moved");
                        return chain.online(candidate, DetectionMethod::MacLookupPing);
                    }
                    Err(err) => {
                        chain.failed(ProbeStep::PingArpCandidate, err);
                        chain.method = Some(DetectionMethod::MacFoundNoPing);
                    }
                },
                // A hostname failure is the more specific reason; keep it.
                None if hostname.is_none() => chain.method = Some(DetectionMethod::MacNotInArp),
                None => {}
            }
        } else if host.mac.is_some() {
            debug!(host = %host.name, mac = ?host.mac, "ignoring unparseable MAC");
        }

        chain.offline()
    }

    async fn ping(&self, ip: IpAddr) -> Result<(), ProbeError> {
        bounded(self.cfg.ping_timeout + PING_GRACE, self.prober.ping(ip)).await
    }

    async fn ping_hostname(&self, hostname: &str) -> Result<IpAddr, ProbeError> {
        let limit = self.cfg.ping_timeout + PING_GRACE + self.cfg.helper_timeout;
        bounded(limit, self.prober.ping_hostname(hostname)).await
    }

    /// Looks `mac` up in the cached ARP table, reading it first if stale.
    ///
    /// The cache lock is held across the read so concurrent probes share one read.
    async fn arp_lookup(&self, mac: &str) -> Result<Option<IpAddr>, ProbeError> {
        let mut arp = self.arp.lock().await;
        if let Some(table) = arp.get(&()) {
            return Ok(table.get(mac).copied());
        }
        let table = bounded(self.cfg.helper_timeout, self.prober.read_arp_table()).await?;
        debug!(entries = table.len(), "ARP table refreshed");
        let found = table.get(mac).copied();
        arp.insert((), table);
        Ok(found)
    }
}

async fn bounded<T>(
    limit: Duration,
    probe: impl Future<Output = Result<T, ProbeError>>,
) -> Result<T, ProbeError> {
    match tokio::time::timeout(limit, probe).await {
        Ok(result) => result,
        Err(_elapsed) => Err(ProbeError::Timeout {
            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Accumulates the outcome of one probe chain.
struct Chain {
    configured: IpAddr,
    method: Option<DetectionMethod>,
    failures: Vec<ProbeFailure>,
}

impl Chain {
    fn new(configured: IpAddr) -> Self {
        Self {
            configured,
            method: None,
            failures: Vec::new(),
        }
    }

    fn failed(&mut self, step: ProbeStep, error: ProbeError) {
        debug!(target_ip = %self.configured, ?step, %error, "probe step failed");
        self.failures.push(ProbeFailure { step, error });
    }

    fn online(self, current_ip: IpAddr, method: DetectionMethod) -> PresenceResult {
        PresenceResult {
            status: PresenceStatus::Online,
            current_ip,
            resolved_ip: None,
            ip_changed: current_ip != self.configured,
            method,
            observed_at: Utc::now(),
            failures: self.failures,
        }
    }

    fn offline(self) -> PresenceResult {
        let method = self.method.unwrap_or(DetectionMethod::NoFallbackMethod);
        PresenceResult {
            failures: self.failures,
            ..PresenceResult::offline(self.configured, method)
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
