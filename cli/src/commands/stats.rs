use colored::*;

use lanwatch_common::config::Config;

use crate::commands::devices::open_store;
use crate::terminal::{colors, format, print};

pub fn stats(cfg: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(cfg)?;
    let stats = store.stats();
    if json {
        return print::json(&stats);
    }

    print::header("history statistics", json);
    let mut details = vec![
        ("File".to_string(), store.path().display().to_string().normal()),
        ("Scans".to_string(), stats.total_scans.to_string().color(colors::ACCENT)),
        ("Devices".to_string(), stats.unique_devices.to_string().color(colors::ACCENT)),
        ("Events".to_string(), stats.recent_events_count.to_string().normal()),
    ];
    match &stats.last_scan {
        Some(scan) => {
            details.push(("Last scan".to_string(), format::timestamp(scan.at).normal()));
            details.push((
                "Found".to_string(),
                format!("{} devices in {:.2}s", scan.device_count, scan.duration_secs).normal(),
            ));
        }
        None => details.push(("Last scan".to_string(), "never".dimmed())),
    }
    print::as_tree_one_level(details);
    Ok(())
}
