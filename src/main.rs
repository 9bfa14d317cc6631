mod agents;
mod asset;
mod cli;
mod config;
mod error;
mod streams;
mod utils;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Register {
            artifact,
            class_name,
            kind,
            json,
        } => workflow::execute_register(&cli.path, &artifact, &class_name, kind, json),
        Commands::Locate { artifact } => workflow::execute_locate(&cli.path, &artifact),
        Commands::Kinds => workflow::execute_kinds(&cli.path),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}
