//! RosterLens CLI — enrich league stats pages with roster attributes.
//!
//! Fetches a league stats page, joins its player rows against per-team
//! roster pages, and writes the page back out with Position and Grade
//! columns added.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
