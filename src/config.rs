use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;

use crate::engine::EngineConfig;
use crate::layout::GridParams;

// ---------------------------------------------------------------------------
// ConfigFile: deserialized from TOML (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub origin: Option<String>,
    pub cache_bust: Option<String>,
    /// Partition name → host serving it.
    pub hosts: BTreeMap<String, String>,
    pub grid: GridConfigFile,
    pub events: EventsConfigFile,
    pub http: HttpConfigFile,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct GridConfigFile {
    pub thumbnail_size: Option<u32>,
    pub thumbnail_margin: Option<u32>,
    pub look_behind_rows: Option<u32>,
    pub width_bucket: Option<u32>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct EventsConfigFile {
    pub debounce_ms: Option<u64>,
    pub focus_radius: Option<usize>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct HttpConfigFile {
    pub timeout_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Config: resolved (all fields concrete)
// ---------------------------------------------------------------------------

pub struct Config {
    pub origin: String,
    pub cache_bust: Option<String>,
    pub hosts: BTreeMap<String, String>,
    pub grid: GridParams,
    pub debounce: Duration,
    pub focus_radius: usize,
    pub http_timeout: Duration,
}

impl ConfigFile {
    /// Merge CLI values (overwrites non-None fields).
    pub fn merge_cli(&mut self, origin: Option<String>, cache_bust: Option<String>) {
        if let Some(ref v) = origin {
            debug!("config: CLI override origin={v}");
            self.origin = origin;
        }
        if let Some(ref v) = cache_bust {
            debug!("config: CLI override cache_bust={v}");
            self.cache_bust = cache_bust;
        }
    }

    /// Resolve to a Config by applying defaults to missing fields.
    pub fn resolve(self) -> Config {
        let defaults = GridParams::default();
        let config = Config {
            origin: self
                .origin
                .map(|o| o.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:8000".into()),
            cache_bust: self.cache_bust,
            hosts: self.hosts,
            grid: GridParams {
                thumbnail_size: self.grid.thumbnail_size.unwrap_or(defaults.thumbnail_size),
                thumbnail_margin: self
                    .grid
                    .thumbnail_margin
                    .unwrap_or(defaults.thumbnail_margin),
                look_behind_rows: self
                    .grid
                    .look_behind_rows
                    .unwrap_or(defaults.look_behind_rows),
                width_bucket: self.grid.width_bucket.unwrap_or(defaults.width_bucket).max(1),
            },
            debounce: Duration::from_millis(self.events.debounce_ms.unwrap_or(150)),
            focus_radius: self.events.focus_radius.unwrap_or(30),
            http_timeout: Duration::from_millis(self.http.timeout_ms.unwrap_or(10_000)),
        };
        info!(
            "config: resolved origin={}, hosts={}, cache_bust={}, thumbnail={}+{}px, \
             look_behind_rows={}, width_bucket={}, debounce={}ms, focus_radius={}, \
             http_timeout={}ms",
            config.origin,
            config.hosts.len(),
            config.cache_bust.as_deref().unwrap_or("<hourly>"),
            config.grid.thumbnail_size,
            config.grid.thumbnail_margin,
            config.grid.look_behind_rows,
            config.grid.width_bucket,
            config.debounce.as_millis(),
            config.focus_radius,
            config.http_timeout.as_millis(),
        );
        config
    }
}

impl Config {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            origin: self.origin.clone(),
            hosts: self.hosts.clone(),
            cache_bust: self.cache_bust.clone(),
            grid: self.grid,
            focus_radius: self.focus_radius,
        }
    }
}

/// Resolve the XDG config path for galleon.
fn config_path() -> Option<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(config_dir.join("galleon").join("config.toml"))
}

/// Load config file. Returns `ConfigFile::default()` if no file exists.
/// Returns an error if the file exists but cannot be parsed.
pub fn load_config() -> anyhow::Result<ConfigFile> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            info!("config: no HOME or XDG_CONFIG_HOME set, using defaults");
            return Ok(ConfigFile::default());
        }
    };
    debug!("config: looking for {}", path.display());
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!("config: loaded from {}", path.display());
            let cfg: ConfigFile = toml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("config: {} not found, using defaults", path.display());
            Ok(ConfigFile::default())
        }
        Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
    }
}
