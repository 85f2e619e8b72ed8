use std::collections::{BTreeMap, HashSet};
use std::net::IpAddr;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use lanwatch_common::config::HistoryConfig;
use lanwatch_common::history::document::HistoryDocument;
use lanwatch_common::history::event::{ChangeSummary, DeviceEvent, EventKind, ScanEvent};
use lanwatch_common::history::record::{DeviceRecord, DeviceSnapshot, IdentityKey};
use lanwatch_common::network::observation::DeviceObservation;

/// Folds one scan into `doc` and returns the tally of derived events.
///
/// Pure apart from logging: callers own loading and saving. Observations
/// without an address are skipped and counted in
/// [`ChangeSummary::skipped_observations`].
///
/// A device reported at several addresses in one batch is folded into its
/// record once, at the first of those addresses. Every address is still bound
/// to it in `identity_by_ip`.
pub fn reconcile(
    doc: &mut HistoryDocument,
    observations: &[DeviceObservation],
    scan_duration_secs: f64,
    now: DateTime<Utc>,
    cfg: &HistoryConfig,
) -> ChangeSummary {
    let mut summary = ChangeSummary::default();
    let mut events = Vec::new();
    let mut identity_by_ip = BTreeMap::new();
    let mut seen = HashSet::new();

    for obs in observations {
        let ip = match obs.ip() {
            Ok(ip) => ip,
            Err(err) => {
                warn!(mac = ?obs.mac_address, hostname = ?obs.hostname, "skipping observation: {err}");
                summary.skipped_observations += 1;
                continue;
            }
        };

        let identity = IdentityKey::for_observation(obs.canonical_mac(), ip);
        let key = identity.to_string();
        identity_by_ip.insert(ip, key.clone());
        if !seen.insert(key.clone()) {
            debug!(%key, %ip, "identity already observed in this scan");
            continue;
        }
        let snapshot = DeviceSnapshot::from_observation(obs, ip);

        match doc.devices_by_identity.get_mut(&key) {
            Some(record) => observe_known(record, &key, snapshot, now, cfg, &mut events),
            None => {
                let record = DeviceRecord::first_seen(identity, snapshot, now);
                events.push(event_for(&record, &key, EventKind::NewDevice, now));
                doc.devices_by_identity.insert(key, record);
            }
        }
    }

    for (key, record) in doc.devices_by_identity.iter_mut() {
        if seen.contains(key) || !record.present {
            continue;
        }
        record.present = false;
        let offline_for = elapsed_since(record.last_seen_at, now);
        if offline_for <= cfg.disconnection_horizon {
            let kind = EventKind::Disconnection {
                time_offline_secs: offline_for.num_seconds(),
            };
            events.push(event_for(record, key, kind, now));
        }
    }

    doc.identity_by_ip = identity_by_ip;
    let scan = ScanEvent {
        at: now,
        device_count: observations.len() - summary.skipped_observations,
        duration_secs: scan_duration_secs,
    };
    doc.scan_events.push(scan.clone());
    doc.last_scan = Some(scan);

    for event in events {
        summary.record(&event.kind);
        info!(kind = event.kind.label(), key = %event.key, ip = %event.ip, "{}", describe(&event));
        let log = match event.kind {
            EventKind::IpChange { .. } => &mut doc.ip_changes,
            EventKind::MacChange { .. } => &mut doc.mac_changes,
            _ => &mut doc.connection_events,
        };
        log.push(event);
    }

    doc.stats.total_scans += 1;
    doc.stats.unique_devices = doc.devices_by_identity.len();
    doc.stats.last_updated = Some(now);

    summary
}

fn observe_known(
    record: &mut DeviceRecord,
    key: &str,
    snapshot: DeviceSnapshot,
    now: DateTime<Utc>,
    cfg: &HistoryConfig,
    events: &mut Vec<DeviceEvent>,
) {
    let prior = record.observe(snapshot, now);

    if prior.ip != record.current.ip {
        let kind = EventKind::IpChange {
            old_ip: prior.ip,
            new_ip: record.current.ip,
        };
        let mut event = event_for(record, key, kind, now);
        event.hostname = event.hostname.or(prior.hostname);
        event.vendor = event.vendor.or(prior.vendor);
        events.push(event);
    }

    let offline_for = elapsed_since(prior.last_seen_at, now);
    if offline_for > cfg.reconnection_threshold {
        let kind = EventKind::Reconnection {
            time_offline_secs: offline_for.num_seconds(),
        };
        events.push(event_for(record, key, kind, now));
    }
}

/// Time since `then`, clamped at zero when the clock has stepped back.
fn elapsed_since(then: DateTime<Utc>, now: DateTime<Utc>) -> TimeDelta {
    (now - then).max(TimeDelta::zero())
}

fn event_for(record: &DeviceRecord, key: &str, kind: EventKind, at: DateTime<Utc>) -> DeviceEvent {
    DeviceEvent {
        kind,
        key: key.to_string(),
        mac: record.identity.mac().map(str::to_owned),
        ip: record.current.ip,
        hostname: record.current.hostname.clone(),
        vendor: record.current.vendor.clone(),
        at,
    }
}

fn describe(event: &DeviceEvent) -> String {
    let name = event
        .hostname
        .as_deref()
        .map_or_else(|| event.ip.to_string(), str::to_owned);
    match &event.kind {
        EventKind::NewDevice => format!("new device {name}"),
        EventKind::Reconnection { time_offline_secs } => {
            format!("{name} back after {}", offline_label(*time_offline_secs))
        }
        EventKind::Disconnection { .. } => format!("{name} disconnected"),
        EventKind::IpChange { old_ip, new_ip } => format!("{name} moved {old_ip} -> {new_ip}"),
        EventKind::MacChange { old_mac, new_mac } => format!("{name} changed MAC {old_mac} -> {new_mac}"),
    }
}

fn offline_label(secs: i64) -> String {
    match secs {
        s if s < 3600 => format!("{}min", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

/// Addresses the latest scan bound to `key`.
pub(super) fn addresses_of(doc: &HistoryDocument, key: &str) -> Vec<IpAddr> {
    doc.identity_by_ip
        .iter()
        .filter(|(_, bound)| bound.as_str() == key)
        .map(|(ip, _)| *ip)
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
