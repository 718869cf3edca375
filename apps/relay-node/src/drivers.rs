//! # Host Drivers
//!
//! Stand-ins for the device peripherals so the relay runs on a desktop or
//! server.
//!
//! ```text
//! ┌──────────────────┬────────────────────────────────────────────────────┐
//! │ Trait            │ Host binding                                       │
//! ├──────────────────┼────────────────────────────────────────────────────┤
//! │ TagReader        │ LineTagReader: one hex UID per line (stdin/file)   │
//! │ Connectivity     │ TcpProbe: TCP connect to the endpoint host:port    │
//! │ Indicator        │ LogIndicator: color changes go to the log          │
//! └──────────────────┴────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use tagrelay_core::{Record, Rgb, TagUid};
use tagrelay_sync::config::{EndpointSettings, NetworkSettings};
use tagrelay_sync::{Connectivity, Indicator, TagReader};

// =============================================================================
// Line Tag Reader
// =============================================================================

/// Version reported for the host reader.
const HOST_FIRMWARE: u32 = 0x0001_0000;

type LineSource = Lines<BufReader<Box<dyn AsyncRead + Unpin + Send>>>;

/// Reads tag identifiers as hex lines from stdin (`-`) or a file.
pub struct LineTagReader {
    device: String,
    lines: Option<LineSource>,
}

impl LineTagReader {
    pub fn new(device: impl Into<String>) -> Self {
        LineTagReader {
            device: device.into(),
            lines: None,
        }
    }

    async fn open(&self) -> std::io::Result<LineSource> {
        let source: Box<dyn AsyncRead + Unpin + Send> = if self.device == "-" {
            Box::new(tokio::io::stdin())
        } else {
            Box::new(tokio::fs::File::open(&self.device).await?)
        };
        Ok(BufReader::new(source).lines())
    }
}

impl TagReader for LineTagReader {
    async fn firmware_version(&mut self) -> Option<u32> {
        match self.open().await {
            Ok(lines) => {
                self.lines = Some(lines);
                Some(HOST_FIRMWARE)
            }
            Err(e) => {
                warn!(device = %self.device, error = %e, "Cannot open tag source");
                None
            }
        }
    }

    async fn read_uid(&mut self, timeout: Duration) -> Option<TagUid> {
        let Some(lines) = self.lines.as_mut() else {
            tokio::time::sleep(timeout).await;
            return None;
        };

        match tokio::time::timeout(timeout, lines.next_line()).await {
            Err(_) => None,
            Ok(Ok(Some(line))) => parse_uid(&line),
            Ok(Ok(None)) => {
                info!(device = %self.device, "Tag source closed");
                self.lines = None;
                None
            }
            Ok(Err(e)) => {
                warn!(device = %self.device, error = %e, "Tag source read failed");
                None
            }
        }
    }
}

fn parse_uid(line: &str) -> Option<TagUid> {
    if line.trim().is_empty() {
        return None;
    }
    match line.parse::<Record>().and_then(|record| record.to_uid()) {
        Ok(uid) => Some(uid),
        Err(e) => {
            warn!(line = %line.trim(), error = %e, "Ignoring unreadable tag line");
            None
        }
    }
}

// =============================================================================
// TCP Probe
// =============================================================================

/// Treats the endpoint as reachable when a TCP connection to it succeeds.
///
/// A startup attempt waits at most the association retry delay; the
/// background monitor uses the request timeout.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
    connect_timeout: Duration,
    up: Arc<AtomicBool>,
}

impl TcpProbe {
    pub fn new(endpoint: &EndpointSettings, network: &NetworkSettings) -> anyhow::Result<Self> {
        let url = Url::parse(&endpoint.base_url).context("parsing endpoint URL")?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("endpoint URL has no host: {}", endpoint.base_url))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| anyhow!("endpoint URL has no port: {}", endpoint.base_url))?;

        let timeout = endpoint.request_timeout();
        let retry = Duration::from_millis(network.connect_retry_ms);
        let connect_timeout = if retry.is_zero() {
            timeout
        } else {
            timeout.min(retry)
        };

        Ok(TcpProbe {
            host,
            port,
            timeout,
            connect_timeout,
            up: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Re-probes every `every` in the background, updating the shared flag.
    pub fn spawn_monitor(&self, every: Duration) -> JoinHandle<()> {
        let probe = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(every).await;
                let up = probe.probe(probe.timeout).await;
                if probe.up.swap(up, Ordering::SeqCst) != up {
                    info!(host = %probe.host, port = probe.port, up, "Link state changed");
                }
            }
        })
    }

    async fn probe(&self, timeout: Duration) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(host = %self.host, port = self.port, error = %e, "Probe failed");
                false
            }
            Err(_) => {
                debug!(host = %self.host, port = self.port, "Probe timed out");
                false
            }
        }
    }
}

impl Connectivity for TcpProbe {
    fn is_connected(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }

    async fn connect(&mut self) -> bool {
        let up = self.probe(self.connect_timeout).await;
        self.up.store(up, Ordering::SeqCst);
        up
    }
}

// =============================================================================
// Log Indicator
// =============================================================================

/// Logs each color the status pixel would show.
#[derive(Debug, Default)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn render(&mut self, color: Rgb) {
        info!(color = %color, "Indicator");
    }
}
