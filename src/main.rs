//! # datajanitor command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Load config (defaults if missing)
//!   ├─> Initialize logging (console + daily file)
//!   └─> Run the subcommand on a Tokio runtime
//! ```
//!
//! ```bash
//! datajanitor apply --input orders.csv --commands commands.json --zip versions.zip
//! datajanitor filter --input orders.csv --filter '{"amount": {"op": ">", "value": 100}}'
//! datajanitor ask --input orders.csv "orders over 100 from the north region"
//! ```

#![warn(clippy::all, rust_2018_idioms)]

mod cli;

use anyhow::Result;
use clap::Parser as _;
use datajanitor::{config, logging};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = config::load_app_config(cli.config.as_deref());

    // Keep the guard alive for the whole run so the log file is flushed on exit
    let _guard = match logging::init(&config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {e:#}");
            None
        }
    };

    tokio::runtime::Runtime::new()?.block_on(cli::run_command(cli.command, &config))
}
