// Copyright (C) Microsoft Corporation. All rights reserved.

#![forbid(unsafe_code)]

//! Encrypt, decrypt and inspect ciphers from the command line.

mod crypt;
mod info;

use clap::ArgAction;
use clap::Parser;
use clap::Subcommand;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

/// Common trait implemented by all subcommands.
pub trait Command: Parser {
    /// Run the subcommand to completion.
    fn run(self) -> anyhow::Result<()>;
}

#[derive(Parser)]
#[command(name = "azcipher", version, about = "Symmetric cipher tool")]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). Ignored when RUST_LOG
    /// is set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Info(info::Info),
    Encrypt(crypt::Encrypt),
    Decrypt(crypt::Decrypt),
}

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let targets: Targets = match std::env::var("RUST_LOG") {
        Ok(var) => var.parse()?,
        Err(_) => {
            let level = match verbose {
                0 => LevelFilter::WARN,
                1 => LevelFilter::DEBUG,
                _ => LevelFilter::TRACE,
            };
            Targets::new()
                .with_default(LevelFilter::WARN)
                .with_target("azcipher", level)
                .with_target("azcipher_tool", level)
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::TRACE)
        .finish()
        .with(targets)
        .try_init()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Error: failed to set up logging: {e:#}");
    }

    if let Err(e) = try_main(cli.command) {
        tracing::error!("Error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn try_main(command: Commands) -> anyhow::Result<()> {
    azcipher::init();

    match command {
        Commands::Info(task) => task.run(),
        Commands::Encrypt(task) => task.run(),
        Commands::Decrypt(task) => task.run(),
    }
}
