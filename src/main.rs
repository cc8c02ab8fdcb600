//! Wavefile CLI
//!
//! Command-line front end for the wavefile library.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use wavefile::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!(
        "Wavefile v{} ({} engine)",
        env!("CARGO_PKG_VERSION"),
        wavefile::engine::engine().name()
    );

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Wavefile v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Info { path, json } => commands::info(&path, json)
            .with_context(|| format!("Failed to inspect {}", path.display())),
        Commands::Formats { kind, json } => {
            commands::formats(kind, json).context("Failed to list formats")
        }
        Commands::Copy {
            input,
            output,
            gain,
            block,
        } => commands::copy(&input, &output, gain, block)
            .with_context(|| format!("Failed to copy {}", input.display())),
        Commands::Synth {
            output,
            blocks,
            block,
            rate,
            format,
        } => commands::synth(&output, blocks, block, rate, format)
            .with_context(|| format!("Failed to write {}", output.display())),
    }
}
