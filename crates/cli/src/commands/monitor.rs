// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `boardlab monitor`: attach to a port's monitor and stream what happens.

use std::sync::Arc;

use boardlab_bridge::{BridgeConfig, BridgeServiceClient};
use boardlab_core::{Channel, ClientId, ClientNotification, PortIdentifier, SystemClock};
use boardlab_monitor::{
    spawn_event_pump, ChannelParticipant, ConnectRequest, HttpMonitorTransport, ManagerConfig,
    ManagerDeps, MonitorManager,
};
use clap::Args;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use super::{bridge_failure, cli_client_id};
use crate::color;
use crate::output::{format_notification, print_json, OutputFormat};

#[derive(Args)]
pub struct MonitorArgs {
    /// Port to monitor: an address (serial) or a `protocol://address` key.
    /// Defaults to the only detected port.
    #[arg(long, short = 'p', value_parser = parse_port)]
    pub port: Option<PortIdentifier>,

    /// Baud rate to open the monitor with
    #[arg(long, short = 'b')]
    pub baud: Option<String>,

    /// Attach without starting the monitor
    #[arg(long)]
    pub no_start: bool,

    /// Also print session trace events
    #[arg(long)]
    pub trace: bool,
}

/// Accept either a full port key or a bare serial address.
pub fn parse_port(value: &str) -> Result<PortIdentifier, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("port must not be empty".to_string());
    }
    if value.contains("://") {
        return PortIdentifier::from_key(value)
            .ok_or_else(|| format!("invalid port key '{value}', expected protocol://address"));
    }
    Ok(PortIdentifier::serial(value))
}

impl MonitorArgs {
    fn connect_request(&self) -> ConnectRequest {
        let mut request = ConnectRequest::new().auto_start(!self.no_start).channel(Channel::Monitor);
        if let Some(port) = &self.port {
            request = request.port(port.clone());
        }
        if let Some(baud) = &self.baud {
            request = request.baudrate(baud.clone());
        }
        if self.trace {
            request = request.channel(Channel::Trace);
        }
        request
    }
}

pub async fn monitor(args: MonitorArgs, config: BridgeConfig, format: OutputFormat) -> anyhow::Result<()> {
    let client_id = cli_client_id();
    let bridge = BridgeServiceClient::native(config, client_id.clone());
    let info = match bridge.get_bridge_info().await {
        Ok(info) => info,
        Err(err) => {
            let notice = bridge.occupancy_notice(&err);
            bridge.dispose().await;
            return Err(bridge_failure(err, notice));
        }
    };

    let manager_config = ManagerConfig::default();
    let transport = HttpMonitorTransport::new(bridge, manager_config.request_timeout());
    let manager =
        MonitorManager::new(manager_config, ManagerDeps::new(Arc::new(transport)), SystemClock);
    let cancel = CancellationToken::new();
    let pump = spawn_event_pump(info.ws_url.clone(), manager.clone(), cancel.clone());

    let client = ClientId::from_string(client_id);
    let (participant, mut rx) = ChannelParticipant::new();
    let result = stream(&manager, &client, participant, &mut rx, args.connect_request(), format).await;

    if let Err(e) = manager.handle_disconnect_monitor_client(&client).await {
        tracing::warn!(error = %e, "disconnect failed");
    }
    manager.dispose().await;
    cancel.cancel();
    if let Err(e) = pump.await {
        tracing::debug!(error = %e, "event pump task ended abnormally");
    }
    result
}

async fn stream(
    manager: &MonitorManager,
    client: &ClientId,
    participant: ChannelParticipant,
    rx: &mut UnboundedReceiver<ClientNotification>,
    request: ConnectRequest,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let snapshot =
        manager.handle_connect_monitor_client(client.clone(), Arc::new(participant), request).await?;
    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Text => match &snapshot.selection {
            Some(selection) => println!(
                "{} {}",
                color::header(&selection.port.to_string()),
                color::context(selection.baudrate.as_deref().unwrap_or("default baud")),
            ),
            None => println!("{}", color::context("no port selected; waiting for events")),
        },
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            notification = rx.recv() => {
                let Some(notification) = notification else { break };
                match format {
                    OutputFormat::Json => print_json(&notification)?,
                    OutputFormat::Text => {
                        if let Some(line) = format_notification(&notification) {
                            println!("{line}");
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
