use std::net::IpAddr;

use chrono::{DateTime, Local, Utc};
use colored::*;

use lanwatch_common::history::event::{DeviceEvent, EventKind};
use lanwatch_common::history::record::DeviceRecord;
use lanwatch_common::network::host::{EnrichedHost, PresenceStatus, ProbeStep};
use lanwatch_core::history::DeviceSummary;

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn ip_to_detail(ip: IpAddr) -> Detail {
    match ip {
        IpAddr::V4(v4) => ("IPv4".to_string(), v4.to_string().color(colors::IPV4_ADDR)),
        IpAddr::V6(v6) => ("IPv6".to_string(), v6.to_string().color(colors::IPV6_ADDR)),
    }
}

pub fn mac_to_detail(mac: Option<&str>) -> Option<Detail> {
    mac.map(|mac| ("MAC".to_string(), mac.color(colors::MAC_ADDR)))
}

pub fn text_detail(key: &str, value: Option<&str>) -> Option<Detail> {
    value.map(|value| (key.to_string(), value.normal()))
}

pub fn status(status: PresenceStatus) -> ColoredString {
    match status {
        PresenceStatus::Online => "online".color(colors::ONLINE).bold(),
        PresenceStatus::Offline => "offline".color(colors::OFFLINE).bold(),
        PresenceStatus::Unknown => "unknown".color(colors::UNKNOWN).bold(),
    }
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn step_label(step: ProbeStep) -> &'static str {
    match step {
        ProbeStep::PingConfiguredIp => "ping",
        ProbeStep::PingHostname => "hostname",
        ProbeStep::ReadArpTable => "arp table",
        ProbeStep::PingArpCandidate => "arp candidate",
    }
}

pub fn presence_details(host: &EnrichedHost) -> Vec<Detail> {
    let presence = &host.presence;
    let mut details: Vec<Detail> = vec![("Status".to_string(), status(presence.status))];
    details.push(ip_to_detail(presence.current_ip));
    if let Some(previous) = host.previous_ip() {
        details.push(("Moved from".to_string(), previous.to_string().color(colors::ACCENT)));
    }
    details.push(("Method".to_string(), presence.method.as_str().color(colors::SECONDARY)));
    details.extend(mac_to_detail(host.host.canonical_mac().as_deref()));
    details.extend(text_detail("Hostname", host.host.hostname()));
    for failure in &presence.failures {
        details.push((
            format!("Failed {}", step_label(failure.step)),
            failure.error.to_string().dimmed(),
        ));
    }
    details
}

pub fn summary_details(device: &DeviceSummary) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![ip_to_detail(device.current.ip)];
    details.extend(mac_to_detail(device.current.mac.as_deref()));
    details.extend(text_detail("Vendor", device.current.vendor.as_deref()));
    let seen = device.last_seen.to_string();
    let seen = if device.is_recent {
        seen.color(colors::ONLINE)
    } else {
        seen.normal()
    };
    details.push(("Last seen".to_string(), seen));
    details.push(("Scans".to_string(), device.scan_count.to_string().normal()));
    if device.ip_count > 1 {
        let ips: Vec<String> = device.all_ips.iter().map(IpAddr::to_string).collect();
        details.push(("Addresses".to_string(), ips.join(", ").color(colors::ACCENT)));
    }
    if device.hostname_count > 1 || device.vendor_count > 1 {
        details.push((
            "Renamed".to_string(),
            format!("{} hostnames, {} vendors", device.hostname_count, device.vendor_count).normal(),
        ));
    }
    details
}

pub fn record_details(record: &DeviceRecord) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![ip_to_detail(record.current.ip)];
    details.extend(mac_to_detail(record.identity.mac()));
    details.extend(text_detail("Hostname", record.current.hostname.as_deref()));
    details.extend(text_detail("Vendor", record.current.vendor.as_deref()));
    details.extend(text_detail("OS", record.current.os_guess.as_deref()));
    details.extend(text_detail("Type", record.current.device_type.as_deref()));
    if !record.current.open_ports.is_empty() {
        let ports: Vec<String> = record.current.open_ports.iter().map(u16::to_string).collect();
        details.push(("Ports".to_string(), ports.join(", ").normal()));
    }
    let state = if record.present { PresenceStatus::Online } else { PresenceStatus::Offline };
    details.push(("State".to_string(), status(state)));
    details.push(("First seen".to_string(), timestamp(record.first_seen_at).normal()));
    details.push(("Last seen".to_string(), timestamp(record.last_seen_at).normal()));
    details.push(("Scans".to_string(), record.scan_count.to_string().normal()));
    let ips: Vec<String> = record.ip_history.iter().map(IpAddr::to_string).collect();
    details.push(("IP history".to_string(), ips.join(", ").color(colors::IPV4_ADDR)));
    if !record.hostname_history.is_empty() {
        details.push(("Hostnames".to_string(), record.hostname_history.join(", ").normal()));
    }
    if !record.vendor_history.is_empty() {
        details.push(("Vendors".to_string(), record.vendor_history.join(", ").normal()));
    }
    details
}

pub fn event_line(event: &DeviceEvent) -> String {
    let who = event
        .hostname
        .clone()
        .unwrap_or_else(|| event.key.clone());
    let what = match &event.kind {
        EventKind::NewDevice => format!("{} at {}", "new device".green().bold(), event.ip),
        EventKind::Reconnection { time_offline_secs } => format!(
            "{} after {}",
            "reconnected".green(),
            duration_label(*time_offline_secs)
        ),
        EventKind::Disconnection { .. } => format!("{} from {}", "disconnected".red(), event.ip),
        EventKind::IpChange { old_ip, new_ip } => {
            format!("{} {} -> {}", "moved".yellow(), old_ip, new_ip)
        }
        EventKind::MacChange { old_mac, new_mac } => {
            format!("{} {} -> {}", "changed MAC".yellow(), old_mac, new_mac)
        }
    };
    format!(
        "{} {} {}",
        timestamp(event.at).color(colors::SEPARATOR),
        who.color(colors::PRIMARY),
        what
    )
}

pub fn duration_label(secs: i64) -> String {
    match secs.max(0) {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}min", s / 60),
        s if s < 86_400 => format!("{}h{:02}", s / 3600, (s % 3600) / 60),
        s => format!("{}d{}h", s / 86_400, (s % 86_400) / 3600),
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
