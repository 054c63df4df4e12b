// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 client for the bridge's loopback control surface.
//!
//! Reads responses using Content-Length framing, falling back to reading
//! until close when the header is absent.

use crate::error::HttpError;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Status and body of a successful (< 400) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub async fn get(addr: &str, path: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
    let request =
        format!("GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", path, addr);
    timed_request(addr, &request, timeout).await
}

pub async fn post(
    addr: &str,
    path: &str,
    body: &str,
    timeout: Duration,
) -> Result<HttpResponse, HttpError> {
    let request = format!(
        "POST {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        path,
        addr,
        body.len(),
        body
    );
    timed_request(addr, &request, timeout).await
}

/// Connect, send, and read under one timeout covering the whole exchange.
async fn timed_request(
    addr: &str,
    request: &str,
    timeout: Duration,
) -> Result<HttpResponse, HttpError> {
    tokio::time::timeout(timeout, send_request(addr, request))
        .await
        .map_err(|_| HttpError::Timeout(timeout.as_millis() as u64))?
}

async fn send_request(addr: &str, request: &str) -> Result<HttpResponse, HttpError> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| HttpError::Connect { addr: addr.to_string(), reason: e.to_string() })?;
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| HttpError::Io(format!("write failed: {}", e)))?;

    let mut reader = BufReader::new(&mut stream);
    read_http_response(&mut reader).await
}

/// Read and parse an HTTP/1.1 response from a buffered stream.
pub(crate) async fn read_http_response<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<HttpResponse, HttpError> {
    let mut status_line = String::new();
    reader
        .read_line(&mut status_line)
        .await
        .map_err(|e| HttpError::Io(format!("read status failed: {}", e)))?;

    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| HttpError::Malformed(format!("bad status line: {:?}", status_line.trim())))?;

    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .await
            .map_err(|e| HttpError::Io(format!("read header failed: {}", e)))?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
        let line_lower = line.to_ascii_lowercase();
        if let Some(val) = line_lower.strip_prefix("content-length:") {
            content_length = val.trim().parse().ok();
        }
    }

    let mut buf = Vec::new();
    match content_length {
        Some(0) => {}
        Some(len) => {
            buf.resize(len, 0);
            reader
                .read_exact(&mut buf)
                .await
                .map_err(|e| HttpError::Io(format!("read body failed: {}", e)))?;
        }
        None => {
            reader
                .read_to_end(&mut buf)
                .await
                .map_err(|e| HttpError::Io(format!("read body failed: {}", e)))?;
        }
    }
    let body = String::from_utf8_lossy(&buf).into_owned();

    if status >= 400 {
        return Err(HttpError::Status { status, body: body.trim().to_string() });
    }

    Ok(HttpResponse { status, body })
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
