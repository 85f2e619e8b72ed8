pub mod check;
pub mod devices;
pub mod events;
pub mod prune;
pub mod stats;
pub mod watch;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use lanwatch_common::config::{Config, HistoryConfig, PresenceConfig};

#[derive(Parser)]
#[command(name = "lanwatch")]
#[command(about = "Tracks which devices are on the LAN, across address changes.")]
pub struct CommandLine {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalOpts {
    /// Directory holding network_history.json
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// Maximum number of hosts probed at once
    #[arg(long, global = true, default_value_t = 32)]
    pub concurrency: usize,

    /// Ping timeout in milliseconds
    #[arg(long, global = true, default_value_t = 1000)]
    pub ping_timeout_ms: u64,

    /// Always probe, never reuse a recent presence result
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Print machine-readable JSON instead of trees
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalOpts {
    pub fn to_config(&self) -> Config {
        Config {
            presence: PresenceConfig {
                ping_timeout: Duration::from_millis(self.ping_timeout_ms.max(1)),
                max_concurrent_probes: self.concurrency.max(1),
                no_cache: self.no_cache,
                ..PresenceConfig::default()
            },
            history: HistoryConfig {
                data_dir: self.data_dir.clone(),
                ..HistoryConfig::default()
            },
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe every host in an inventory once
    #[command(alias = "c")]
    Check {
        /// JSON file with an array of {name, ip, mac?, hostname?}
        #[arg(long, default_value = "hosts.json")]
        hosts: PathBuf,
    },
    /// Probe repeatedly and record what changes, until Ctrl-C
    #[command(alias = "w")]
    Watch {
        #[arg(long, default_value = "hosts.json")]
        hosts: PathBuf,
        /// Seconds between scan cycles
        #[arg(long, default_value_t = 60)]
        interval: u64,
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// List every device in the history
    #[command(alias = "d")]
    Devices,
    /// Show one device's full history
    Device {
        /// MAC address, no_mac_<ip> key, or an IP seen in the latest scan
        mac_or_ip: String,
    },
    /// Show recent connection and address-change events
    #[command(alias = "e")]
    Events {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show history statistics
    Stats,
    /// Forget devices not seen for a number of days
    Prune {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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
