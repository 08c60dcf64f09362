//! Pantry command line
//!
//! Usage:
//!   pantry distribute  - Log product handed out today
//!   pantry remaining   - Record what is left at closing
//!   pantry ledger      - Show the distribution ledger
//!   pantry menu        - Show or rebuild the walk-in menu
//!   pantry products    - List a category's products (--remaining for closing)
//!   pantry donation | spoilage | menstrual | survey - Fill in a log
//!
//! Each invocation is its own process, so custom product names are only
//! remembered for as long as it runs. The end-of-day list still offers them
//! once they have been logged today, because it also reads today's ledger.

use anyhow::Result;
use clap::Parser;
use libpantry::config::Config;
use libpantry::Pantry;
use log::error;
use std::path::PathBuf;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "pantry")]
#[command(about = "Food pantry distribution ledger and intake logs")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "pantry.conf")]
    config: PathBuf,

    /// Write secret, required when one is configured
    #[arg(long, env = "PANTRY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: commands::Commands,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        error!("{:#}", err);
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    let pantry = Pantry::open(config)?;
    commands::run(&pantry, cli.token.as_deref(), cli.command)
}
