use anyhow::Context;

use lanwatch_common::config::Config;
use lanwatch_core::history::HistoryStore;

use crate::terminal::{format, print};

pub fn open_store(cfg: &Config) -> anyhow::Result<HistoryStore> {
    HistoryStore::open(cfg.history.clone())
        .with_context(|| format!("cannot open history in {}", cfg.history.data_dir.display()))
}

pub fn list(cfg: &Config, json: bool) -> anyhow::Result<()> {
    let devices = open_store(cfg)?.devices();
    if json {
        return print::json(&devices);
    }

    print::header("known devices", json);
    if devices.is_empty() {
        print::no_results("no devices recorded yet");
        return Ok(());
    }
    for (idx, device) in devices.iter().enumerate() {
        let name = device.current.hostname.as_deref().unwrap_or(&device.key);
        print::tree_head(idx, name);
        print::as_tree_one_level(format::summary_details(device));
        if idx + 1 != devices.len() {
            print::print("");
        }
    }
    let recent = devices.iter().filter(|d| d.is_recent).count();
    print::fat_separator();
    print::centerln(&format!("{} devices, {} seen recently", devices.len(), recent));
    Ok(())
}

pub fn show(mac_or_ip: &str, cfg: &Config, json: bool) -> anyhow::Result<()> {
    let Some(record) = open_store(cfg)?.device(mac_or_ip) else {
        anyhow::bail!("no device known as '{mac_or_ip}'");
    };
    if json {
        return print::json(&record);
    }

    print::header("device history", json);
    print::tree_head(0, &record.identity.to_string());
    print::as_tree_one_level(format::record_details(&record));
    if !record.snapshots.is_empty() {
        print::print("");
        print::print_status(format!("{} recent sightings", record.snapshots.len()));
        for sighting in record.snapshots.iter().take(5) {
            print::print_status(format!(
                "  {} at {}",
                format::timestamp(sighting.observed_at),
                sighting.snapshot.ip
            ));
        }
    }
    Ok(())
}
