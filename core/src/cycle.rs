//! # Scan Cycle
//!
//! One pass of the monitoring loop:
//!
//! 1. **Probe** every configured host through the [`PresenceDetector`].
//! 2. **Enrich** the hosts found online with a vendor from the [`VendorRepository`].
//! 3. **Reconcile** them into the [`HistoryStore`].
//!
//! The cycle can be abandoned while probes are in flight. A cancelled cycle
//! never reaches the store, so the history only ever holds complete scans.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info};

use lanwatch_common::error::StoreError;
use lanwatch_common::history::event::ChangeSummary;
use lanwatch_common::network::host::{EnrichedHost, HostDescriptor};
use lanwatch_common::network::mac;
use lanwatch_common::network::observation::DeviceObservation;

use crate::history::HistoryStore;
use crate::presence::PresenceDetector;
use crate::vendors::VendorRepository;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("scan cycle cancelled before the history was updated")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("history update did not complete: {0}")]
    Worker(#[from] JoinError),
}

/// Outcome of a completed cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub hosts: Vec<EnrichedHost>,
    pub summary: ChangeSummary,
    pub duration: Duration,
}

impl CycleReport {
    pub fn online_count(&self) -> usize {
        self.hosts.iter().filter(|h| h.presence.is_online()).count()
    }
}

pub struct ScanCycle {
    detector: Arc<PresenceDetector>,
    store: Arc<HistoryStore>,
    vendor_repo: Box<dyn VendorRepository>,
}

impl ScanCycle {
    pub fn new(
        detector: Arc<PresenceDetector>,
        store: Arc<HistoryStore>,
        vendor_repo: Box<dyn VendorRepository>,
    ) -> Self {
        Self {
            detector,
            store,
            vendor_repo,
        }
    }

    pub fn detector(&self) -> &Arc<PresenceDetector> {
        &self.detector
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    /// Probes `hosts` and records the ones found online.
    ///
    /// Returns [`CycleError::Cancelled`] if `shutdown` resolves before every
    /// probe has returned.
    pub async fn run(
        &self,
        hosts: &[HostDescriptor],
        shutdown: impl Future<Output = ()>,
    ) -> Result<CycleReport, CycleError> {
        let started = Instant::now();

        let enriched = tokio::select! {
            biased;
            _ = shutdown => {
                info!("scan cycle cancelled");
                return Err(CycleError::Cancelled);
            }
            enriched = self.detector.enrich(hosts) => enriched,
        };

        let observations = self.observations(&enriched);
        debug!(probed = hosts.len(), online = observations.len(), "probes finished");

        let duration = started.elapsed();
        let summary = self.record(observations, duration).await?;
        Ok(CycleReport {
            hosts: enriched,
            summary,
            duration,
        })
    }

    /// Reconciles observations that came from elsewhere, such as an external scanner.
    pub async fn record(
        &self,
        mut observations: Vec<DeviceObservation>,
        scan_duration: Duration,
    ) -> Result<ChangeSummary, CycleError> {
        for obs in observations.iter_mut().filter(|o| o.vendor().is_none()) {
            obs.vendor = obs
                .mac_address
                .as_deref()
                .and_then(mac::parse_mac)
                .and_then(|m| self.vendor_repo.get_vendor(m));
        }

        let store = Arc::clone(&self.store);
        let secs = scan_duration.as_secs_f64();
        let summary = tokio::task::spawn_blocking(move || store.apply_scan(&observations, secs)).await??;

        if !summary.is_quiet() {
            info!(
                new = summary.new_devices,
                reconnected = summary.reconnections,
                disconnected = summary.disconnections,
                moved = summary.ip_changes,
                "network changed"
            );
        }
        Ok(summary)
    }

    /// Online hosts as observations at the address they were found on.
    fn observations(&self, hosts: &[EnrichedHost]) -> Vec<DeviceObservation> {
        hosts
            .iter()
            .filter(|h| h.presence.is_online())
            .map(|h| DeviceObservation {
                ip: Some(h.presence.current_ip),
                mac_address: h.host.canonical_mac(),
                hostname: h.host.hostname().map(str::to_owned),
                ping_success: true,
                ..DeviceObservation::default()
            })
            .collect()
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
    use crate::probe::NetworkProber;
    use crate::probe::scripted::ScriptedProber;
    use lanwatch_common::config::{HistoryConfig, PresenceConfig};
    use pnet::util::MacAddr;
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    const MAC: &str = "AA:BB:CC:DD:EE:FF";

    struct FixedVendor;

    impl VendorRepository for FixedVendor {
        fn get_vendor(&self, _mac: MacAddr) -> Option<String> {
            Some("Acme".to_string())
        }
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
    }

    fn cycle(net: &Arc<ScriptedProber>, dir: &TempDir) -> ScanCycle {
        let prober: Arc<dyn NetworkProber> = net.clone();
        let detector = Arc::new(PresenceDetector::new(prober, PresenceConfig::default()));
        let store = HistoryStore::open(HistoryConfig {
            data_dir: dir.path().to_path_buf(),
            ..HistoryConfig::default()
        })
        .unwrap();
        ScanCycle::new(detector, Arc::new(store), Box::new(FixedVendor))
    }

    #[tokio::test]
    async fn online_hosts_should_be_recorded_with_vendor() {
        let dir = TempDir::new().unwrap();
        let net = Arc::new(ScriptedProber::new());
        net.reachable(ip(10));
        let hosts = vec![
            HostDescriptor::new("nas", ip(10)).with_mac(MAC).with_hostname("nas.lan"),
            HostDescriptor::new("lamp", ip(11)),
        ];
        let cycle = cycle(&net, &dir);

        let report = cycle.run(&hosts, std::future::pending()).await.unwrap();

        assert_eq!(report.online_count(), 1);
        assert_eq!(report.summary.new_devices, 1);
        let record = cycle.store().device(MAC).unwrap();
        assert_eq!(record.current.vendor.as_deref(), Some("Acme"));
        assert_eq!(record.current.hostname.as_deref(), Some("nas.lan"));
        assert!(cycle.store().device("192.168.1.11").is_none());
    }

    #[tokio::test]
    async fn moved_host_should_be_recorded_at_new_address() {
        let dir = TempDir::new().unwrap();
        let net = Arc::new(ScriptedProber::new());
        net.reachable(ip(10));
        let host = HostDescriptor::new("tv", ip(10)).with_mac(MAC);
        let cycle = cycle(&net, &dir);
        cycle.run(std::slice::from_ref(&host), std::future::pending()).await.unwrap();

        net.unreachable(ip(10)).reachable(ip(40)).arp_entry(MAC, ip(40));
        cycle.detector().clear_cache().await;
        let report = cycle.run(std::slice::from_ref(&host), std::future::pending()).await.unwrap();

        assert_eq!(report.summary.ip_changes, 1);
        assert_eq!(report.hosts[0].previous_ip(), Some(ip(10)));
        assert_eq!(cycle.store().device(MAC).unwrap().ip_history, vec![ip(10), ip(40)]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_cycle_should_leave_history_untouched() {
        let dir = TempDir::new().unwrap();
        let net = Arc::new(ScriptedProber::new());
        net.hangs(ip(10));
        let cycle = cycle(&net, &dir);
        let hosts = vec![HostDescriptor::new("slow", ip(10))];

        let shutdown = tokio::time::sleep(Duration::from_millis(100));
        let err = cycle.run(&hosts, shutdown).await.unwrap_err();

        assert!(matches!(err, CycleError::Cancelled));
        assert_eq!(cycle.store().stats().total_scans, 0);
    }

    #[tokio::test]
    async fn record_should_keep_vendor_reported_by_scanner() {
        let dir = TempDir::new().unwrap();
        let net = Arc::new(ScriptedProber::new());
        let cycle = cycle(&net, &dir);
        let obs = vec![DeviceObservation::new(ip(5)).with_mac(MAC).with_vendor("Synology")];

        let summary = cycle.record(obs, Duration::from_secs(2)).await.unwrap();

        assert_eq!(summary.new_devices, 1);
        let record = cycle.store().device(MAC).unwrap();
        assert_eq!(record.current.vendor.as_deref(), Some("Synology"));
        assert_eq!(cycle.store().stats().last_scan.unwrap().duration_secs, 2.0);
    }
}
