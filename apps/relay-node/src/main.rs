//! # tagrelay Node Entry Point
//!
//! Runs the relay control loop against host stand-ins for the reader, the
//! network link and the status pixel.
//!
//! ## Usage
//! ```text
//! relay-node [--config <path>] [--init-config]
//!
//! echo 04A39F | relay-node                  # tags from stdin
//! TAGRELAY_QUEUE_DIR=/var/lib/tagrelay relay-node --config relay.toml
//! TAGRELAY_ENDPOINT_URL=https://xyz.example.co relay-node --init-config
//! ```
//!
//! ## Exit Status
//! - `0` after `--init-config` wrote the file
//! - `78` configuration problem (EX_CONFIG)
//! - `69` NFC transceiver not found (EX_UNAVAILABLE)
//! - `1` anything else
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load configuration (build-time values, relay.toml, environment)
//! 3. Open the queue store
//! 4. Build the delivery client and host drivers
//! 5. Run the control loop until a fatal error

mod drivers;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tagrelay_store::QueueStore;
use tagrelay_sync::{DeliveryClient, RelayConfig, RelayError, RelayLoop};

use crate::drivers::{LineTagReader, LogIndicator, TcpProbe};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

/// sysexits EX_CONFIG.
const EXIT_CONFIG: u8 = 78;

/// sysexits EX_UNAVAILABLE.
const EXIT_UNAVAILABLE: u8 = 69;

/// Maps a top-level error to the process exit status.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RelayError>() {
        Some(e) if e.is_config_error() => EXIT_CONFIG,
        Some(e) if e.is_fatal() => EXIT_UNAVAILABLE,
        _ => 1,
    }
}

async fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.init_config {
        return init_config(args.config);
    }

    let config = RelayConfig::load(args.config).context("loading relay configuration")?;
    let client = DeliveryClient::new(&config.endpoint).context("building delivery client")?;
    info!(
        endpoint = %client.url(),
        queue = ?config.queue.dir,
        reader = %config.reader.device,
        "Configuration loaded"
    );

    let store = QueueStore::open(&config.queue.dir).context("opening queue store")?;

    let link = TcpProbe::new(&config.endpoint, &config.network)?;
    let _monitor = link.spawn_monitor(Duration::from_secs(config.network.probe_interval_secs.max(1)));

    let reader = LineTagReader::new(config.reader.device.clone());
    let mut relay = RelayLoop::new(reader, link, client, store, LogIndicator, &config);

    relay.run().await.context("relay halted")
}

/// Writes defaults plus environment overrides to the config file. The
/// result is not validated, so it can be written before the endpoint is
/// known and edited afterwards.
fn init_config(path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = RelayConfig::default();
    config.apply_overrides(|key| std::env::var(key).ok());
    config.save(path).context("writing relay configuration")?;
    Ok(())
}

/// Command line.
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    init_config: bool,
}

/// Parses `[--config <path>] [--init-config]`.
fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => match args.next() {
                Some(path) => parsed.config = Some(PathBuf::from(path)),
                None => bail!("{arg} requires a path"),
            },
            "--init-config" => parsed.init_config = true,
            other => bail!(
                "unexpected argument: {other}\nusage: relay-node [--config <path>] [--init-config]"
            ),
        }
    }
    Ok(parsed)
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tagrelay=trace` - Also show every indicator update
/// - Default: INFO, DEBUG for tagrelay crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tagrelay=debug,reqwest=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
