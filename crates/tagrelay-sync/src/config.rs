//! # Relay Configuration
//!
//! Configuration management for the relay.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority, host builds)              │
//! │     TAGRELAY_ENDPOINT_URL=https://xyz.example.co                       │
//! │     TAGRELAY_QUEUE_DIR=/var/lib/tagrelay                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tagrelay/relay.toml (Linux)                              │
//! │     ~/Library/Application Support/com.tagrelay.relay/relay.toml        │
//! │                                                                         │
//! │  3. Build-time Values (baked in with option_env!)                      │
//! │     TAGRELAY_WIFI_SSID, TAGRELAY_WIFI_PASSWORD,                        │
//! │     TAGRELAY_ENDPOINT_URL, TAGRELAY_ENDPOINT_KEY                       │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # relay.toml
//! [network]
//! ssid = "shop-floor"
//! password = ""            # empty = open network
//!
//! [endpoint]
//! base_url = "https://xyz.example.co"
//! api_key = "anon-key"
//!
//! [queue]
//! dir = "/"
//!
//! [sync]
//! interval_secs = 30
//! pacing_ms = 200
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{RelayError, RelayResult};

// =============================================================================
// Build-time Values
// =============================================================================

const BUILD_WIFI_SSID: Option<&str> = option_env!("TAGRELAY_WIFI_SSID");
const BUILD_WIFI_PASSWORD: Option<&str> = option_env!("TAGRELAY_WIFI_PASSWORD");
const BUILD_ENDPOINT_URL: Option<&str> = option_env!("TAGRELAY_ENDPOINT_URL");
const BUILD_ENDPOINT_KEY: Option<&str> = option_env!("TAGRELAY_ENDPOINT_KEY");

/// REST path of the scans table, relative to the endpoint base URL.
pub const SCANS_PATH: &str = "/rest/v1/scans";

// =============================================================================
// Network Settings
// =============================================================================

/// Wireless network credentials and association behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Network name.
    #[serde(default = "default_ssid")]
    pub ssid: String,

    /// Network secret. Absent or empty means an open network.
    #[serde(default = "default_password")]
    pub password: Option<String>,

    /// Association attempts at startup before going offline.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Delay between association attempts (milliseconds).
    #[serde(default = "default_connect_retry")]
    pub connect_retry_ms: u64,

    /// How often the host link probe re-checks reachability (seconds).
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
}

fn default_ssid() -> String {
    BUILD_WIFI_SSID.unwrap_or_default().to_string()
}

fn default_password() -> Option<String> {
    BUILD_WIFI_PASSWORD
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

fn default_connect_attempts() -> u32 {
    120
}

fn default_connect_retry() -> u64 {
    500
}

fn default_probe_interval() -> u64 {
    5
}

impl NetworkSettings {
    /// True when no secret is configured.
    pub fn is_open(&self) -> bool {
        self.password.as_deref().map_or(true, str::is_empty)
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        NetworkSettings {
            ssid: default_ssid(),
            password: default_password(),
            connect_attempts: default_connect_attempts(),
            connect_retry_ms: default_connect_retry(),
            probe_interval_secs: default_probe_interval(),
        }
    }
}

// =============================================================================
// Endpoint Settings
// =============================================================================

/// Remote database endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSettings {
    /// Project base URL, e.g. `https://xyz.example.co`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Key sent as both `apikey` and bearer token.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    BUILD_ENDPOINT_URL.unwrap_or_default().to_string()
}

fn default_api_key() -> String {
    BUILD_ENDPOINT_KEY.unwrap_or_default().to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl EndpointSettings {
    /// Full URL records are POSTed to.
    pub fn scans_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), SCANS_PATH)
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        EndpointSettings {
            base_url: default_base_url(),
            api_key: default_api_key(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Queue Settings
// =============================================================================

/// Where the durable queue lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Directory holding `queue.txt` and `sending.txt`.
    #[serde(default = "default_queue_dir")]
    pub dir: PathBuf,
}

fn default_queue_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "tagrelay", "relay")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for QueueSettings {
    fn default() -> Self {
        QueueSettings {
            dir: default_queue_dir(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Drain scheduling and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Minimum time between drain attempts (seconds).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Delay between consecutive deliveries in one pass (milliseconds).
    #[serde(default = "default_pacing")]
    pub pacing_ms: u64,

    /// Grow the pacing delay across consecutive transport failures.
    #[serde(default)]
    pub pacing_backoff: bool,

    /// Upper bound for the grown pacing delay (milliseconds).
    #[serde(default = "default_max_pacing")]
    pub max_pacing_ms: u64,
}

fn default_interval() -> u64 {
    30
}

fn default_pacing() -> u64 {
    200
}

fn default_max_pacing() -> u64 {
    5_000
}

impl SyncSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn max_pacing(&self) -> Duration {
        Duration::from_millis(self.max_pacing_ms.max(self.pacing_ms))
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            interval_secs: default_interval(),
            pacing_ms: default_pacing(),
            pacing_backoff: false,
            max_pacing_ms: default_max_pacing(),
        }
    }
}

// =============================================================================
// Reader Settings
// =============================================================================

/// Tag reader polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderSettings {
    /// Tag source for host builds; `-` reads from stdin.
    #[serde(default = "default_reader_device")]
    pub device: String,

    /// Longest a single poll may block (milliseconds).
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_ms: u64,

    /// Window in which a repeat read of the same tag is ignored (milliseconds).
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

fn default_reader_device() -> String {
    "-".to_string()
}

fn default_poll_timeout() -> u64 {
    100
}

fn default_debounce() -> u64 {
    2_000
}

impl Default for ReaderSettings {
    fn default() -> Self {
        ReaderSettings {
            device: default_reader_device(),
            poll_timeout_ms: default_poll_timeout(),
            debounce_ms: default_debounce(),
        }
    }
}

// =============================================================================
// Indicator Settings
// =============================================================================

/// Status LED behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSettings {
    /// Global brightness, 0-255.
    #[serde(default = "default_brightness")]
    pub brightness: u8,

    /// How long success/error colors are held (milliseconds).
    #[serde(default = "default_flash")]
    pub flash_ms: u64,

    /// On and off time of each blink when the network cannot be joined
    /// (milliseconds).
    #[serde(default = "default_blink")]
    pub blink_ms: u64,
}

fn default_brightness() -> u8 {
    20
}

fn default_flash() -> u64 {
    500
}

fn default_blink() -> u64 {
    200
}

impl IndicatorSettings {
    pub fn flash(&self) -> Duration {
        Duration::from_millis(self.flash_ms)
    }

    pub fn blink(&self) -> Duration {
        Duration::from_millis(self.blink_ms)
    }
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        IndicatorSettings {
            brightness: default_brightness(),
            flash_ms: default_flash(),
            blink_ms: default_blink(),
        }
    }
}

// =============================================================================
// Main Relay Configuration
// =============================================================================

/// Complete relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub endpoint: EndpointSettings,

    #[serde(default)]
    pub queue: QueueSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub reader: ReaderSettings,

    #[serde(default)]
    pub indicator: IndicatorSettings,
}

impl RelayConfig {
    /// Loads configuration from file, environment, and build-time defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Defaults (including build-time values)
    /// 2. Config file (relay.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> RelayResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading relay config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> RelayResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| RelayError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RelayError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| RelayError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Relay config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> RelayResult<()> {
        let url = Url::parse(&self.endpoint.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RelayError::InvalidUrl(format!(
                "Endpoint URL must start with http:// or https://, got: {}",
                self.endpoint.base_url
            )));
        }

        if self.endpoint.api_key.is_empty() {
            return Err(RelayError::InvalidConfig(
                "endpoint.api_key must be set".into(),
            ));
        }

        if self.sync.interval_secs == 0 {
            return Err(RelayError::InvalidConfig(
                "sync.interval_secs must be greater than 0".into(),
            ));
        }

        if self.reader.poll_timeout_ms == 0 {
            return Err(RelayError::InvalidConfig(
                "reader.poll_timeout_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides from a key lookup (the process environment in
    /// production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ssid) = lookup("TAGRELAY_WIFI_SSID") {
            self.network.ssid = ssid;
        }

        if let Some(password) = lookup("TAGRELAY_WIFI_PASSWORD") {
            self.network.password = Some(password).filter(|p| !p.is_empty());
        }

        if let Some(url) = lookup("TAGRELAY_ENDPOINT_URL") {
            debug!(url = %url, "Overriding endpoint URL from environment");
            self.endpoint.base_url = url;
        }

        if let Some(key) = lookup("TAGRELAY_ENDPOINT_KEY") {
            self.endpoint.api_key = key;
        }

        if let Some(dir) = lookup("TAGRELAY_QUEUE_DIR") {
            debug!(dir = %dir, "Overriding queue directory from environment");
            self.queue.dir = PathBuf::from(dir);
        }

        if let Some(device) = lookup("TAGRELAY_READER_DEVICE") {
            self.reader.device = device;
        }

        if let Some(interval) = lookup("TAGRELAY_SYNC_INTERVAL_SECS") {
            match interval.parse::<u64>() {
                Ok(secs) => self.sync.interval_secs = secs,
                Err(_) => warn!(value = %interval, "Ignoring invalid TAGRELAY_SYNC_INTERVAL_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tagrelay", "relay")
            .map(|dirs| dirs.config_dir().join("relay.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.endpoint.base_url = "https://xyz.example.co".to_string();
        config.endpoint.api_key = "anon-key".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.sync.interval_secs, 30);
        assert_eq!(config.network.connect_attempts, 120);
        assert_eq!(config.network.connect_retry_ms, 500);
        assert_eq!(config.reader.poll_timeout_ms, 100);
        assert_eq!(config.indicator.brightness, 20);
        assert!(!config.sync.pacing_backoff);
    }

    #[test]
    fn test_scans_url() {
        let mut config = valid_config();
        assert_eq!(config.endpoint.scans_url(), "https://xyz.example.co/rest/v1/scans");

        config.endpoint.base_url = "https://xyz.example.co/".to_string();
        assert_eq!(config.endpoint.scans_url(), "https://xyz.example.co/rest/v1/scans");
    }

    #[test]
    fn test_config_validation() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.endpoint.base_url = "ftp://xyz.example.co".to_string();
        assert!(matches!(config.validate(), Err(RelayError::InvalidUrl(_))));

        config.endpoint.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(RelayError::InvalidUrl(_))));

        let mut config = valid_config();
        config.endpoint.api_key.clear();
        assert!(matches!(config.validate(), Err(RelayError::InvalidConfig(_))));

        let mut config = valid_config();
        config.sync.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_open_network() {
        let mut network = NetworkSettings::default();
        network.password = None;
        assert!(network.is_open());
        network.password = Some(String::new());
        assert!(network.is_open());
        network.password = Some("secret".to_string());
        assert!(!network.is_open());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TAGRELAY_ENDPOINT_URL", "http://10.0.0.2:54321"),
            ("TAGRELAY_QUEUE_DIR", "/tmp/relay"),
            ("TAGRELAY_WIFI_PASSWORD", ""),
            ("TAGRELAY_SYNC_INTERVAL_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = valid_config();
        config.network.password = Some("old".to_string());
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.endpoint.base_url, "http://10.0.0.2:54321");
        assert_eq!(config.queue.dir, PathBuf::from("/tmp/relay"));
        assert!(config.network.is_open());
        assert_eq!(config.sync.interval_secs, 30);
        assert_eq!(config.endpoint.api_key, "anon-key");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [endpoint]
            base_url = "https://xyz.example.co"
            api_key = "k"

            [sync]
            pacing_ms = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.pacing_ms, 50);
        assert_eq!(config.sync.interval_secs, 30);
        assert_eq!(config.indicator.flash_ms, 500);
        assert_eq!(config.indicator.blink_ms, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("relay.toml");

        let mut config = valid_config();
        config.sync.pacing_ms = 75;
        config.save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[endpoint]"));
        assert!(text.contains("[sync]"));

        let loaded: RelayConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded.sync.pacing_ms, 75);
        assert_eq!(loaded.endpoint.api_key, "anon-key");
    }
}
