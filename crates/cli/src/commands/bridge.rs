// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `boardlab bridge` subcommands

use boardlab_bridge::{BridgeConfig, BridgeServiceClient, HealthProbe};
use clap::{Args, Subcommand};
use serde::Serialize;

use super::{bridge_failure, cli_client_id};
use crate::color;
use crate::exit_error::{codes, ExitError};
use crate::output::{format_bridge_info, print_json, OutputFormat};

#[derive(Args)]
pub struct BridgeArgs {
    #[command(subcommand)]
    pub command: BridgeCommand,
}

#[derive(Subcommand)]
pub enum BridgeCommand {
    /// Probe the bridge port without starting anything
    Status,
    /// Find or start a compatible bridge and print its info
    Ensure,
    /// Stop the bridge answering on the bridge port
    Stop,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StopReport {
    stopped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
}

pub async fn bridge(args: BridgeArgs, config: BridgeConfig, format: OutputFormat) -> anyhow::Result<()> {
    let client = BridgeServiceClient::native(config, cli_client_id());
    let result = match args.command {
        BridgeCommand::Status => status(&client, format).await,
        BridgeCommand::Ensure => ensure(&client, format).await,
        BridgeCommand::Stop => stop(&client, format).await,
    };
    client.dispose().await;
    result
}

async fn status(client: &BridgeServiceClient, format: OutputFormat) -> anyhow::Result<()> {
    let port = client.config().preferred_port;
    match client.probe().await {
        HealthProbe::Healthy(info) => {
            match format {
                OutputFormat::Json => print_json(&info)?,
                OutputFormat::Text => println!("{}", color::good(&format_bridge_info(&info))),
            }
            Ok(())
        }
        HealthProbe::Unreachable(reason) => {
            tracing::debug!(port, %reason, "bridge unreachable");
            Err(ExitError::new(codes::NOT_RUNNING, format!("bridge not running on port {port}")).into())
        }
        HealthProbe::Unexpected(detail) => Err(ExitError::new(
            codes::PORT_OCCUPIED,
            format!("port {port} is occupied by another application: {detail}"),
        )
        .into()),
    }
}

async fn ensure(client: &BridgeServiceClient, format: OutputFormat) -> anyhow::Result<()> {
    let info = match client.get_bridge_info().await {
        Ok(info) => info,
        Err(err) => {
            let notice = client.occupancy_notice(&err);
            return Err(bridge_failure(err, notice));
        }
    };
    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Text => println!("{}", format_bridge_info(&info)),
    }
    Ok(())
}

async fn stop(client: &BridgeServiceClient, format: OutputFormat) -> anyhow::Result<()> {
    let pid = match client.shutdown_bridge().await {
        Ok(pid) => pid,
        Err(err) => {
            let notice = client.occupancy_notice(&err);
            return Err(bridge_failure(err, notice));
        }
    };
    match format {
        OutputFormat::Json => print_json(&StopReport { stopped: pid.is_some(), pid })?,
        OutputFormat::Text => match pid {
            Some(pid) => println!("stopped bridge pid {pid}"),
            None => println!("{}", color::context("no bridge running")),
        },
    }
    Ok(())
}
