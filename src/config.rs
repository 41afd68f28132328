//! Application-level configuration loading, including sync timings and backend locations.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::services::sync_engine::SyncSettings;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/scoreboard.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCOREBOARD_CONFIG_PATH";
/// Environment variable overriding the remote record store origin.
const REMOTE_URL_ENV: &str = "SCOREBOARD_REMOTE_URL";
/// Environment variable overriding the local fallback file.
const LOCAL_PATH_ENV: &str = "SCOREBOARD_LOCAL_PATH";
const PORT_ENV: &str = "PORT";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOCAL_PATH: &str = "data/match-state.json";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Origin of the record store when none is configured.
const DEFAULT_REMOTE_URL: &str = "http://localhost:3001";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    port: u16,
    remote_url: Option<String>,
    local_path: PathBuf,
    request_timeout: Duration,
    sync: SyncSettings,
}

impl AppConfig {
    /// Load the configuration from disk, then apply environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded scoreboard config");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                RawConfig::default()
            }
        };

        Self::from(raw).with_env_overrides(|key| env::var(key).ok())
    }

    /// Apply `PORT`, `SCOREBOARD_REMOTE_URL` and `SCOREBOARD_LOCAL_PATH`.
    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(PORT_ENV) {
            match value.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %value, "ignoring invalid PORT"),
            }
        }
        if let Some(url) = lookup(REMOTE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.remote_url = Some(url);
        }
        if let Some(path) = lookup(LOCAL_PATH_ENV).filter(|path| !path.is_empty()) {
            self.local_path = PathBuf::from(path);
        }
        self
    }

    /// Port the control surface binds to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Origin of the remote record store.
    ///
    /// The control surface does not serve `/gameState` itself, so without an
    /// explicit origin the record store is expected on its fixed local origin.
    pub fn remote_url(&self) -> String {
        match &self.remote_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => DEFAULT_REMOTE_URL.to_string(),
        }
    }

    /// Whether [`AppConfig::remote_url`] points back at this control surface.
    pub fn remote_targets_control_surface(&self) -> bool {
        let remote = self.remote_url();
        ["localhost", "127.0.0.1", "0.0.0.0"]
            .iter()
            .any(|host| remote == format!("http://{host}:{}", self.port))
    }

    /// File backing the local fallback.
    pub fn local_path(&self) -> &PathBuf {
        &self.local_path
    }

    /// Per-request timeout of the remote record store.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Engine timings.
    pub fn sync_settings(&self) -> SyncSettings {
        self.sync
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from(RawConfig::default())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    port: Option<u16>,
    remote_url: Option<String>,
    local_path: Option<PathBuf>,
    request_timeout_ms: Option<u64>,
    debounce_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    suppression_window_ms: Option<u64>,
    probe_interval_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = SyncSettings::default();
        let millis = |ms: Option<u64>, fallback: Duration| {
            ms.filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        Self {
            port: value.port.unwrap_or(DEFAULT_PORT),
            remote_url: value.remote_url.filter(|url| !url.trim().is_empty()),
            local_path: value
                .local_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_PATH)),
            request_timeout: millis(value.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT),
            sync: SyncSettings {
                debounce: millis(value.debounce_ms, defaults.debounce),
                poll_interval: millis(value.poll_interval_ms, defaults.poll_interval),
                suppression_window: millis(
                    value.suppression_window_ms,
                    defaults.suppression_window,
                ),
                probe_interval: millis(value.probe_interval_ms, defaults.probe_interval),
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
