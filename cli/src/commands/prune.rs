use chrono::TimeDelta;
use colored::*;

use lanwatch_common::config::Config;

use crate::commands::devices::open_store;
use crate::terminal::print;

pub fn prune(days: u32, cfg: &Config) -> anyhow::Result<()> {
    let removed = open_store(cfg)?.prune_unseen(TimeDelta::days(days.into()))?;
    print::print_status(format!(
        "{} devices unseen for more than {days} days removed",
        removed.to_string().bold()
    ));
    Ok(())
}
