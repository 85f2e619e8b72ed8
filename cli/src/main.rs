mod commands;
mod inventory;
mod terminal;

use commands::{CommandLine, Commands, check, devices, events, prune, stats, watch};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.global.verbose);

    let cfg = commands.global.to_config();

    match commands.command {
        Commands::Check { hosts } => {
            print::header("checking presence", commands.global.json);
            check::check(&hosts, &cfg, commands.global.json).await
        }
        Commands::Watch {
            hosts,
            interval,
            once,
        } => {
            print::header("watching the network", commands.global.json);
            watch::watch(&hosts, interval, once, &cfg, commands.global.json).await
        }
        Commands::Devices => devices::list(&cfg, commands.global.json),
        Commands::Device { mac_or_ip } => devices::show(&mac_or_ip, &cfg, commands.global.json),
        Commands::Events { limit } => events::events(limit, &cfg, commands.global.json),
        Commands::Stats => stats::stats(&cfg, commands.global.json),
        Commands::Prune { days } => prune::prune(days, &cfg),
    }
}
