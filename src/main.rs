use anyhow::Result;
use clap::Parser;

use openbuildings::cli::{Cli, Commands};
use openbuildings::commands::{extract, lookup};

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Extract(args) => extract::run(&cli, args),
        Commands::Lookup(args) => lookup::run(&cli, args),
    }
}
