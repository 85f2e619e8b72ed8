use std::future::pending;
use std::slice;
use std::time::Duration;

use lanwatch_common::config::{Config, PresenceConfig};
use lanwatch_common::network::host::{DetectionMethod, HostDescriptor, PresenceStatus};
use lanwatch_core::cycle::CycleError;

use crate::support::{Lab, NAS_MAC, ip};

fn uncached() -> Config {
    Config {
        presence: PresenceConfig {
            no_cache: true,
            ..PresenceConfig::default()
        },
        ..Config::default()
    }
}

#[tokio::test]
async fn dhcp_move_should_be_followed_through_arp() -> anyhow::Result<()> {
    let lab = Lab::with_config(uncached())?;
    let nas = HostDescriptor::new("nas", ip(10)).with_mac("aa-bb-cc-dd-ee-ff");
    lab.net.reachable(ip(10));

    let first = lab.cycle.run(slice::from_ref(&nas), pending()).await?;
    assert_eq!(first.summary.new_devices, 1);
    assert_eq!(first.hosts[0].presence.method, DetectionMethod::PingOriginalIp);

    // Lease renewed onto .57
    lab.net.unreachable(ip(10)).reachable(ip(57)).arp_entry(NAS_MAC, ip(57));
    let second = lab.cycle.run(slice::from_ref(&nas), pending()).await?;

    let presence = &second.hosts[0].presence;
    assert_eq!(presence.status, PresenceStatus::Online);
    assert_eq!(presence.method, DetectionMethod::MacLookupPing);
    assert_eq!(presence.current_ip, ip(57));
    assert_eq!(second.summary.ip_changes, 1);

    let record = lab.store().device("192.168.1.57").expect("indexed by new address");
    assert_eq!(record.ip_history, vec![ip(10), ip(57)]);
    Ok(())
}

#[tokio::test]
async fn hostname_fallback_should_feed_history() -> anyhow::Result<()> {
    let lab = Lab::with_config(uncached())?;
    let printer = HostDescriptor::new("printer", ip(20))
        .with_mac(NAS_MAC)
        .with_hostname("printer.lan");
    lab.net.reachable(ip(21)).resolves("printer.lan", ip(21));

    let report = lab.cycle.run(slice::from_ref(&printer), pending()).await?;

    assert_eq!(report.hosts[0].presence.method, DetectionMethod::HostnameResolution);
    assert_eq!(report.hosts[0].previous_ip(), Some(ip(20)));
    let record = lab.store().device(NAS_MAC).expect("device recorded");
    assert_eq!(record.current.ip, ip(21));
    assert_eq!(record.hostname_history, vec!["printer.lan".to_string()]);
    Ok(())
}

#[tokio::test]
async fn host_going_dark_should_disconnect_once() -> anyhow::Result<()> {
    let lab = Lab::with_config(uncached())?;
    let lamp = HostDescriptor::new("lamp", ip(30));
    lab.net.reachable(ip(30));
    lab.cycle.run(slice::from_ref(&lamp), pending()).await?;

    lab.net.unreachable(ip(30));
    let gone = lab.cycle.run(slice::from_ref(&lamp), pending()).await?;
    let still_gone = lab.cycle.run(slice::from_ref(&lamp), pending()).await?;

    assert_eq!(gone.hosts[0].presence.method, DetectionMethod::NoFallbackMethod);
    assert_eq!(gone.summary.disconnections, 1);
    assert!(still_gone.summary.is_quiet());
    assert!(!lab.store().device("no_mac_192.168.1.30").expect("kept").present);
    Ok(())
}

#[tokio::test]
async fn batch_should_keep_order_under_a_small_concurrency_limit() -> anyhow::Result<()> {
    let cfg = Config {
        presence: PresenceConfig {
            max_concurrent_probes: 2,
            ..PresenceConfig::default()
        },
        ..Config::default()
    };
    let lab = Lab::with_config(cfg)?;
    let hosts: Vec<HostDescriptor> = (1..=12)
        .map(|i| HostDescriptor::new(format!("h{i}"), ip(i)))
        .collect();
    for i in (2..=12).step_by(2) {
        lab.net.reachable(ip(i));
    }

    let report = lab.cycle.run(&hosts, pending()).await?;

    assert_eq!(report.hosts.len(), 12);
    for (i, host) in report.hosts.iter().enumerate() {
        assert_eq!(host.host.name, format!("h{}", i + 1));
        assert_eq!(host.presence.is_online(), (i + 1) % 2 == 0);
    }
    assert_eq!(report.summary.new_devices, 6);
    Ok(())
}

#[tokio::test]
async fn cached_results_should_spare_the_network() -> anyhow::Result<()> {
    let lab = Lab::new()?;
    let hosts = vec![
        HostDescriptor::new("a", ip(1)),
        HostDescriptor::new("b", ip(2)).with_mac(NAS_MAC),
    ];
    lab.net.reachable(ip(1));

    lab.cycle.run(&hosts, pending()).await?;
    let pings = lab.net.total_pings();
    lab.cycle.run(&hosts, pending()).await?;

    assert_eq!(lab.net.total_pings(), pings);
    assert_eq!(lab.net.arp_reads(), 1);
    assert_eq!(lab.store().stats().total_scans, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unresponsive_hosts_should_not_stall_the_cycle() -> anyhow::Result<()> {
    let lab = Lab::with_config(uncached())?;
    let hosts: Vec<HostDescriptor> = (1..=5)
        .map(|i| HostDescriptor::new(format!("h{i}"), ip(i)))
        .collect();
    lab.net.hangs(ip(1)).hangs(ip(2)).reachable(ip(3));

    let started = tokio::time::Instant::now();
    let enriched = lab.cycle.detector().enrich(&hosts).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(enriched[0].presence.status, PresenceStatus::Offline);
    assert!(enriched[2].presence.is_online());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_should_abandon_the_cycle_without_recording() -> anyhow::Result<()> {
    let lab = Lab::with_config(uncached())?;
    let hosts = vec![HostDescriptor::new("slow", ip(9)), HostDescriptor::new("fast", ip(8))];
    lab.net.hangs(ip(9)).reachable(ip(8));

    let result = lab
        .cycle
        .run(&hosts, tokio::time::sleep(Duration::from_millis(200)))
        .await;

    assert!(matches!(result, Err(CycleError::Cancelled)));
    assert!(!lab.store().stats().has_data);
    assert!(lab.store().device("no_mac_192.168.1.8").is_none());
    Ok(())
}
