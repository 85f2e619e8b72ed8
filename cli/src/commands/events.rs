use lanwatch_common::config::Config;
use lanwatch_common::history::event::DeviceEvent;

use crate::commands::devices::open_store;
use crate::terminal::{format, print};

pub fn events(limit: usize, cfg: &Config, json: bool) -> anyhow::Result<()> {
    let events = open_store(cfg)?.recent_events(limit);
    if json {
        return print::json(&events);
    }

    print::header("recent events", json);
    if events.is_empty() {
        print::no_results("no events recorded yet");
        return Ok(());
    }
    section("Connections", &events.connection_events);
    section("Address changes", &events.ip_changes);
    section("MAC changes", &events.mac_changes);
    Ok(())
}

fn section(title: &str, events: &[DeviceEvent]) {
    if events.is_empty() {
        return;
    }
    print::print_status(title);
    for event in events {
        print::print(&format!("  {}", format::event_line(event)));
    }
}
