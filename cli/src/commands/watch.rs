use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::*;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use lanwatch_common::config::Config;
use lanwatch_common::history::event::ChangeSummary;
use lanwatch_core::cycle::{CycleError, CycleReport, ScanCycle};
use lanwatch_core::history::HistoryStore;
use lanwatch_core::vendors::MacOuiRepo;

use crate::commands::check;
use crate::inventory;
use crate::terminal::{print, spinner::Spinner};

/// Resolves once Ctrl-C has been pressed. Cloneable so every cycle can race it.
#[derive(Clone)]
struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    fn on_ctrl_c() -> Self {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    let _ = tx.send(true);
                }
                Err(err) => {
                    warn!("cannot listen for Ctrl-C: {err}");
                    // Keep the sender alive so waiters stay pending.
                    std::future::pending::<()>().await;
                }
            }
        });
        Self { rx }
    }

    fn requested(&self) -> bool {
        *self.rx.borrow()
    }

    async fn wait(mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub async fn watch(
    hosts_file: &Path,
    interval_secs: u64,
    once: bool,
    cfg: &Config,
    json: bool,
) -> anyhow::Result<()> {
    let hosts = inventory::load_hosts(hosts_file)?;
    let store = HistoryStore::open(cfg.history.clone())
        .with_context(|| format!("cannot open history in {}", cfg.history.data_dir.display()))?;
    let cycle = ScanCycle::new(check::detector(cfg), Arc::new(store), Box::new(MacOuiRepo));
    let interval = Duration::from_secs(interval_secs.max(1));
    let shutdown = Shutdown::on_ctrl_c();

    info!(hosts = hosts.len(), every = interval_secs, "watching");
    let mut cycles = 0u64;
    loop {
        let spinner = Spinner::start(format!("Scan cycle {}...", cycles + 1), !json);
        let outcome = cycle.run(&hosts, shutdown.clone().wait()).await;
        drop(spinner);

        match outcome {
            Ok(report) => {
                cycles += 1;
                report_cycle(&report, json)?;
            }
            Err(CycleError::Cancelled) => break,
            // A failed save leaves the previous history intact; the next cycle retries.
            Err(err) => error!("scan cycle failed: {err}"),
        }

        let stats = cycle.detector().stats().await;
        debug!(
            cached = stats.cached_results,
            arp_entries = stats.arp_entries,
            arp_age = ?stats.arp_cache_age,
            "presence caches"
        );

        if once || shutdown.requested() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.clone().wait() => break,
        }
    }

    if !json {
        print::fat_separator();
        print::centerln(&format!("{} completed cycles", cycles.to_string().bold().green()));
    }
    Ok(())
}

fn report_cycle(report: &CycleReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print::json(&serde_json::json!({
            "hosts": report.hosts,
            "summary": report.summary,
            "duration_secs": report.duration.as_secs_f64(),
        }));
    }
    print::print_status(format!(
        "{}/{} online in {:.2}s, {}",
        report.online_count(),
        report.hosts.len(),
        report.duration.as_secs_f64(),
        describe(&report.summary)
    ));
    Ok(())
}

fn describe(summary: &ChangeSummary) -> String {
    if summary.is_quiet() {
        return "no changes".dimmed().to_string();
    }
    let parts: Vec<String> = [
        (summary.new_devices, "new"),
        (summary.reconnections, "reconnected"),
        (summary.disconnections, "disconnected"),
        (summary.ip_changes, "moved"),
        (summary.mac_changes, "changed MAC"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, label)| format!("{} {label}", count.to_string().bold()))
    .collect();
    parts.join(", ")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
