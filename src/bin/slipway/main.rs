//! Slipway CLI - recipe-driven builder/installer for VTK

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("slipway=debug")
    } else {
        EnvFilter::new("slipway=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let color = if cli.no_color {
        slipway::util::shell::ColorChoice::Never
    } else {
        slipway::util::shell::ColorChoice::Auto
    };
    let shell = slipway::util::Shell::from_flags(cli.quiet, cli.verbose, color);

    // Execute command
    match cli.command {
        Commands::Install(args) => commands::install::execute(args, &shell),
        Commands::Resolve(args) => commands::resolve::execute(args, &shell),
        Commands::Probe(args) => commands::probe::execute(args, &shell),
        Commands::Test(args) => commands::test::execute(args, &shell),
        Commands::Patch(args) => commands::patch::execute(args, &shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
