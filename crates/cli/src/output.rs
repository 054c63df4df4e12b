// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use boardlab_bridge::ServiceReadyInfo;
use boardlab_core::{BridgeEvent, ClientNotification, SessionSnapshot};
use clap::ValueEnum;
use serde::Serialize;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print `value` as a single JSON line.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Text rendering of a healthy bridge: a summary line, then one indented
/// `key: value` line per known field.
pub fn format_bridge_info(info: &ServiceReadyInfo) -> String {
    let mut out = format!("bridge pid {} on {}", info.owner_pid, info.control_addr());
    let fields = [
        ("version", info.version.as_deref()),
        ("mode", info.mode.as_deref()),
        ("commit", info.commit.as_deref()),
        ("extension", info.extension_path.as_deref()),
        ("started", info.started_at.as_deref()),
        ("events", Some(info.ws_url.as_str())),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            out.push_str(&format!("\n  {key}: {value}"));
        }
    }
    out
}

fn format_session(session: &SessionSnapshot) -> String {
    let mut line = format!("{} {} (wants {})", session.port, session.status, session.desired);
    if let Some(baudrate) = &session.baudrate {
        line.push_str(&format!(" @ {baudrate}"));
    }
    if let Some(reason) = session.pause_reason {
        line.push_str(&format!(" paused: {reason}"));
    }
    if !session.detected {
        line.push_str(" [not detected]");
    }
    if let Some(error) = &session.last_error {
        line.push_str(&format!(" error: {}", error.message));
    }
    line
}

fn format_bridge_event(event: &BridgeEvent) -> String {
    match event {
        BridgeEvent::DetectedPortsChanged { ports } => {
            let names: Vec<String> = ports.iter().map(|p| p.port.to_string()).collect();
            if names.is_empty() {
                "detected ports: none".to_string()
            } else {
                format!("detected ports: {}", names.join(", "))
            }
        }
        BridgeEvent::MonitorSettingsChanged { settings } => {
            format!("monitor settings changed for {}", settings.protocol)
        }
        BridgeEvent::BaudrateChanged { port, baudrate } => format!("{port} baudrate {baudrate}"),
        BridgeEvent::MonitorPaused { port, reason } => match reason {
            Some(reason) => format!("{port} paused ({reason})"),
            None => format!("{port} paused"),
        },
        BridgeEvent::MonitorResumed { port } => format!("{port} resumed"),
        BridgeEvent::MonitorStarted { port, baudrate, .. } => match baudrate {
            Some(baudrate) => format!("{port} started @ {baudrate}"),
            None => format!("{port} started"),
        },
        BridgeEvent::MonitorStopped { port } => format!("{port} stopped"),
        BridgeEvent::MonitorError { port, error, .. } => format!("{port} error: {}", error.message),
    }
}

/// One line per notification. Session states are covered by the bridge
/// events and session lines, so physical and running lists are skipped.
pub fn format_notification(notification: &ClientNotification) -> Option<String> {
    match notification {
        ClientNotification::Bridge(event) => Some(format_bridge_event(event)),
        ClientNotification::SessionState(session) => Some(format_session(session)),
        ClientNotification::RuntimeState(change) => {
            Some(format!("{} {} -> {}", change.port, change.previous, change.current))
        }
        ClientNotification::Trace(trace) => Some(format!("trace {} {}", trace.kind, trace.port)),
        ClientNotification::Error { port: Some(port), message } => {
            Some(format!("{port} error: {message}"))
        }
        ClientNotification::Error { port: None, message } => Some(format!("error: {message}")),
        ClientNotification::PhysicalState(_) | ClientNotification::RunningMonitors(_) => None,
    }
}
