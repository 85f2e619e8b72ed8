use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use colored::*;
use lanwatch_common::config::Config;
use lanwatch_common::network::host::{EnrichedHost, HostDescriptor};
use lanwatch_core::presence::PresenceDetector;
use lanwatch_core::probe::NetworkProber;
use lanwatch_core::probe::system::SystemProber;

use crate::inventory;
use crate::terminal::{format, print, spinner::Spinner};

pub fn detector(cfg: &Config) -> Arc<PresenceDetector> {
    let prober: Arc<dyn NetworkProber> = Arc::new(SystemProber::new(&cfg.presence));
    Arc::new(PresenceDetector::new(prober, cfg.presence.clone()))
}

pub async fn check(hosts_file: &Path, cfg: &Config, json: bool) -> anyhow::Result<()> {
    let hosts = inventory::load_hosts(hosts_file)?;
    let detector = detector(cfg);

    let started = Instant::now();
    let spinner = Spinner::start(format!("Probing {} hosts...", hosts.len()), !json);
    let enriched = detector.enrich(&hosts).await;
    drop(spinner);

    if json {
        return print::json(&enriched);
    }
    print_hosts(&enriched);
    print::fat_separator();
    print_summary(&hosts, &enriched, started.elapsed().as_secs_f64());
    Ok(())
}

pub fn print_hosts(enriched: &[EnrichedHost]) {
    if enriched.is_empty() {
        print::no_results("no hosts to probe");
        return;
    }
    for (idx, host) in enriched.iter().enumerate() {
        print::tree_head(idx, &host.host.name);
        print::as_tree_one_level(format::presence_details(host));
        if idx + 1 != enriched.len() {
            print::print("");
        }
    }
}

fn print_summary(hosts: &[HostDescriptor], enriched: &[EnrichedHost], secs: f64) {
    let online = enriched.iter().filter(|h| h.presence.is_online()).count();
    let moved = enriched.iter().filter(|h| h.previous_ip().is_some()).count();
    let online: ColoredString = format!("{online}/{} online", hosts.len()).bold().green();
    let moved: ColoredString = format!("{moved} moved").bold().yellow();
    let total_time: ColoredString = format!("{secs:.2}s").bold().yellow();
    print::centerln(&format!("{online}, {moved} in {total_time}"));
}
