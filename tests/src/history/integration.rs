use std::sync::Arc;
use std::thread;

use chrono::TimeDelta;

use lanwatch_common::history::document::{HistoryDocument, CONNECTION_EVENTS_CAP, SCAN_EVENTS_CAP};
use lanwatch_common::history::event::{ChangeSummary, EventKind};
use lanwatch_common::network::observation::DeviceObservation;

use crate::support::{Lab, NAS_MAC, ip, t0};

fn nas_at(last: u8) -> DeviceObservation {
    DeviceObservation::new(ip(last))
        .with_mac(NAS_MAC)
        .with_hostname("nas")
}

#[test]
fn device_lifecycle_should_be_recorded_in_order() -> anyhow::Result<()> {
    let lab = Lab::new()?;
    let store = lab.store();

    // First sighting
    let summary = store.apply_scan_at(&[nas_at(10)], 1.0, t0())?;
    assert_eq!(
        summary,
        ChangeSummary {
            new_devices: 1,
            ..ChangeSummary::default()
        }
    );

    // DHCP moved it
    let summary = store.apply_scan_at(&[nas_at(11)], 1.0, t0() + TimeDelta::minutes(5))?;
    assert_eq!(summary.ip_changes, 1);
    assert_eq!(summary.total_events(), 1);

    // Gone for two cycles spanning more than an hour
    let summary = store.apply_scan_at(&[], 1.0, t0() + TimeDelta::minutes(15))?;
    assert_eq!(summary.disconnections, 1);
    let summary = store.apply_scan_at(&[], 1.0, t0() + TimeDelta::minutes(45))?;
    assert!(summary.is_quiet());

    // Back
    let summary = store.apply_scan_at(&[nas_at(11)], 1.0, t0() + TimeDelta::minutes(80))?;
    assert_eq!(summary.reconnections, 1);

    let record = lab.reopen()?.device(NAS_MAC).expect("device recorded");
    assert_eq!(record.ip_history, vec![ip(10), ip(11)]);
    assert_eq!(record.scan_count, 3);
    assert!(record.present);

    let events = store.recent_events(10);
    let kinds: Vec<&str> = events.connection_events.iter().map(|e| e.kind.label()).collect();
    assert_eq!(kinds, vec!["reconnection", "disconnection", "new device"]);
    match events.connection_events[0].kind {
        EventKind::Reconnection { time_offline_secs } => assert!(time_offline_secs > 3600),
        ref other => panic!("unexpected event {other:?}"),
    }
    Ok(())
}

#[test]
fn repeated_identical_scans_should_only_advance_counters() -> anyhow::Result<()> {
    let lab = Lab::new()?;
    let batch = [nas_at(10), DeviceObservation::new(ip(30))];
    lab.store().apply_scan_at(&batch, 1.0, t0())?;

    for minute in 1..=5 {
        let summary = lab
            .store()
            .apply_scan_at(&batch, 1.0, t0() + TimeDelta::minutes(minute))?;
        assert!(summary.is_quiet(), "scan {minute} produced {summary:?}");
    }

    let record = lab.store().device(NAS_MAC).expect("device recorded");
    assert_eq!(record.scan_count, 6);
    assert_eq!(record.last_seen_at, t0() + TimeDelta::minutes(5));
    Ok(())
}

#[test]
fn lookup_by_ip_should_only_see_the_latest_scan() -> anyhow::Result<()> {
    let lab = Lab::new()?;
    lab.store().apply_scan_at(&[nas_at(10)], 1.0, t0())?;
    assert!(lab.store().device("192.168.1.10").is_some());

    lab.store().apply_scan_at(&[nas_at(11)], 1.0, t0() + TimeDelta::minutes(1))?;

    assert!(lab.store().device("192.168.1.10").is_none());
    assert!(lab.store().device("192.168.1.11").is_some());
    assert!(lab.store().device("aa:bb:cc:dd:ee:ff").is_some());
    Ok(())
}

#[test]
fn logs_should_stay_bounded_over_many_scans() -> anyhow::Result<()> {
    let lab = Lab::new()?;
    // Each device joins and leaves, so every scan yields two connection events.
    for i in 0..80u8 {
        let at = t0() + TimeDelta::minutes(i64::from(i));
        lab.store().apply_scan_at(&[DeviceObservation::new(ip(i))], 0.2, at)?;
    }

    let doc = lab.store().history();
    assert_eq!(doc.scan_events.len(), SCAN_EVENTS_CAP);
    assert_eq!(doc.connection_events.len(), CONNECTION_EVENTS_CAP);
    assert_eq!(doc.stats.total_scans, 80);
    assert_eq!(doc.stats.unique_devices, 80);
    Ok(())
}

#[test]
fn corrupt_history_should_not_stop_a_scan() -> anyhow::Result<()> {
    let lab = Lab::new()?;
    lab.store().apply_scan_at(&[nas_at(10)], 1.0, t0())?;
    std::fs::write(lab.history_file(), b"\x00\x01 definitely not json")?;

    let summary = lab.store().apply_scan_at(&[nas_at(10)], 1.0, t0() + TimeDelta::minutes(1))?;

    assert_eq!(summary.new_devices, 1, "history restarts from empty");
    let raw = std::fs::read_to_string(lab.history_file())?;
    let doc: HistoryDocument = serde_json::from_str(&raw)?;
    assert_eq!(doc.stats.total_scans, 1);
    Ok(())
}

#[test]
fn concurrent_writers_should_be_serialized() -> anyhow::Result<()> {
    let lab = Lab::new()?;
    let store = Arc::clone(lab.cycle.store());

    let writers: Vec<_> = (0..8u8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let obs = [DeviceObservation::new(ip(100 + i))];
                store.apply_scan_at(&obs, 0.1, t0())
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer thread")?;
    }

    let doc = store.history();
    assert_eq!(doc.stats.total_scans, 8);
    assert_eq!(doc.scan_events.len(), 8);
    Ok(())
}

#[test]
fn readers_should_never_see_a_partial_document() -> anyhow::Result<()> {
    let lab = Lab::new()?;
    let store = Arc::clone(lab.cycle.store());
    let path = lab.history_file();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || -> anyhow::Result<()> {
            for i in 0..30u8 {
                let obs = [nas_at(10 + i % 3), DeviceObservation::new(ip(50 + i))];
                store.apply_scan_at(&obs, 0.1, t0() + TimeDelta::minutes(i64::from(i)))?;
            }
            Ok(())
        })
    };

    for _ in 0..200 {
        let raw = std::fs::read_to_string(&path)?;
        serde_json::from_str::<HistoryDocument>(&raw)?;
    }
    writer.join().expect("writer thread")?;
    Ok(())
}
