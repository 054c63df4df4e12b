// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `boardlab`: inspect and drive the shared monitor bridge from a terminal.

mod color;
mod commands;
mod exit_error;
mod logging;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{bridge, monitor};
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "boardlab", version, long_version = LONG_VERSION, styles = color::styles())]
#[command(about = "Manage the shared board monitor bridge")]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Bridge port (overrides BOARDLAB_BRIDGE_PORT and bridge.toml)
    #[arg(long, global = true, value_name = "PORT")]
    bridge_port: Option<u16>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value_t)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect, start or stop the bridge process
    Bridge(bridge::BridgeArgs),
    /// Stream a port's monitor to stdout
    Monitor(monitor::MonitorArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _guard = match logging::init(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli).await {
        if let Some(exit) = e.downcast_ref::<ExitError>() {
            if !exit.message.is_empty() {
                eprintln!("{}", exit.message);
            }
            std::process::exit(exit.code);
        }
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = commands::load_config(cli.bridge_port)?;
    match cli.command {
        Command::Bridge(args) => bridge::bridge(args, config, cli.output).await,
        Command::Monitor(args) => monitor::monitor(args, config, cli.output).await,
    }
}
