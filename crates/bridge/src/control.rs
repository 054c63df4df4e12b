// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge HTTP control surface: health, attach, detach, heartbeat, logging.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::HttpError;
use crate::http;

/// Identity and endpoints of a running bridge, as reported by its health
/// probe. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReadyInfo {
    pub owner_pid: u32,
    pub port: u16,
    pub http_base_url: String,
    pub ws_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl ServiceReadyInfo {
    /// Minimal info for a bridge on loopback `port`.
    pub fn local(owner_pid: u32, port: u16) -> Self {
        Self {
            owner_pid,
            port,
            http_base_url: format!("http://127.0.0.1:{port}"),
            ws_url: format!("ws://127.0.0.1:{port}/events"),
            started_at: None,
            version: None,
            mode: None,
            extension_path: None,
            commit: None,
            node_version: None,
            platform: None,
        }
    }

    boardlab_core::setters! {
        option {
            version: String,
            extension_path: String,
            mode: String,
        }
    }

    /// `host:port` for the raw HTTP client.
    pub fn control_addr(&self) -> String {
        control_addr(self.port)
    }
}

pub fn control_addr(port: u16) -> String {
    format!("127.0.0.1:{port}")
}

/// Payload of `POST /control/health`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub pid: u32,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub extension_path: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub node_version: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub ws_path: Option<String>,
}

impl HealthResponse {
    pub fn into_info(self, port: u16) -> ServiceReadyInfo {
        let mut info = ServiceReadyInfo::local(self.pid, port);
        if let Some(path) = self.ws_path {
            info.ws_url = format!("ws://127.0.0.1:{port}{path}");
        }
        info.started_at = self.started_at;
        info.version = self.version;
        info.mode = self.mode;
        info.extension_path = self.extension_path;
        info.commit = self.commit;
        info.node_version = self.node_version;
        info.platform = self.platform;
        info
    }
}

/// Result of probing the preferred port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthProbe {
    Healthy(ServiceReadyInfo),
    /// Nothing answered (refused, timed out).
    Unreachable(String),
    /// Something answered, but it is not the bridge.
    Unexpected(String),
}

/// Parse a health answer. Anything that does not look like the bridge is
/// reported as [`HealthProbe::Unexpected`].
pub fn parse_health(port: u16, result: Result<http::HttpResponse, HttpError>) -> HealthProbe {
    match result {
        Ok(response) => match serde_json::from_str::<HealthResponse>(&response.body) {
            Ok(health) if health.status == "ok" && health.pid > 0 => {
                HealthProbe::Healthy(health.into_info(port))
            }
            Ok(health) => HealthProbe::Unexpected(format!(
                "health status {:?} from pid {}",
                health.status, health.pid
            )),
            Err(e) => HealthProbe::Unexpected(format!("malformed health payload: {}", e)),
        },
        Err(e) if e.is_transport() => HealthProbe::Unreachable(e.to_string()),
        Err(e) => HealthProbe::Unexpected(e.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachResponse {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    Alive,
    /// The bridge no longer knows the token (404).
    TokenInvalid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingOptions {
    pub heartbeat: bool,
}

/// Control operations against a running bridge.
#[async_trait]
pub trait BridgeControl: Send + Sync + 'static {
    async fn health(&self, port: u16, timeout: Duration) -> HealthProbe;

    async fn attach(
        &self,
        info: &ServiceReadyInfo,
        client_id: &str,
    ) -> Result<AttachResponse, HttpError>;

    async fn detach(&self, info: &ServiceReadyInfo, token: &str) -> Result<(), HttpError>;

    async fn heartbeat(
        &self,
        info: &ServiceReadyInfo,
        token: &str,
    ) -> Result<HeartbeatOutcome, HttpError>;

    async fn update_logging(
        &self,
        info: &ServiceReadyInfo,
        options: &LoggingOptions,
    ) -> Result<(), HttpError>;
}

/// [`BridgeControl`] over loopback HTTP.
#[derive(Debug, Clone)]
pub struct HttpBridgeControl {
    request_timeout: Duration,
}

impl HttpBridgeControl {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl Default for HttpBridgeControl {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl BridgeControl for HttpBridgeControl {
    async fn health(&self, port: u16, timeout: Duration) -> HealthProbe {
        let result = http::post(&control_addr(port), "/control/health", "{}", timeout).await;
        parse_health(port, result)
    }

    async fn attach(
        &self,
        info: &ServiceReadyInfo,
        client_id: &str,
    ) -> Result<AttachResponse, HttpError> {
        let body = serde_json::json!({ "clientId": client_id }).to_string();
        let response =
            http::post(&info.control_addr(), "/control/attach", &body, self.request_timeout)
                .await?;
        serde_json::from_str(&response.body)
            .map_err(|e| HttpError::Malformed(format!("attach response: {}", e)))
    }

    async fn detach(&self, info: &ServiceReadyInfo, token: &str) -> Result<(), HttpError> {
        let body = serde_json::json!({ "token": token }).to_string();
        http::post(&info.control_addr(), "/control/detach", &body, self.request_timeout).await?;
        Ok(())
    }

    async fn heartbeat(
        &self,
        info: &ServiceReadyInfo,
        token: &str,
    ) -> Result<HeartbeatOutcome, HttpError> {
        let body = serde_json::json!({ "token": token }).to_string();
        match http::post(&info.control_addr(), "/control/heartbeat", &body, self.request_timeout)
            .await
        {
            Ok(_) => Ok(HeartbeatOutcome::Alive),
            Err(e) if e.status() == Some(404) => Ok(HeartbeatOutcome::TokenInvalid),
            Err(e) => Err(e),
        }
    }

    async fn update_logging(
        &self,
        info: &ServiceReadyInfo,
        options: &LoggingOptions,
    ) -> Result<(), HttpError> {
        let body = serde_json::to_string(options)
            .map_err(|e| HttpError::Malformed(format!("logging options: {}", e)))?;
        http::post(&info.control_addr(), "/control/logging", &body, self.request_timeout).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
