use std::{net::SocketAddr, path::PathBuf, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_MOVIES_DIR: &str = "movies";
pub const DEFAULT_PLUG_URL: &str = "http://192.168.1.19/rpc/Switch.Set";
pub const DEFAULT_PLUG_TIMEOUT_SECS: u64 = 5;

/// Everything the server needs, resolved once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub movies_dir: PathBuf,
    pub plug_url: String,
    pub plug_timeout: Duration,
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any `TV_PANEL_*` lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("TV_PANEL_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidBind {
                value: bind_raw.clone(),
                source,
            })?;

        let plug_timeout = match get("TV_PANEL_PLUG_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|source| ConfigError::InvalidTimeout {
                        value: raw.clone(),
                        source,
                    })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_PLUG_TIMEOUT_SECS),
        };

        Ok(Config {
            bind,
            data_dir: get("TV_PANEL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            movies_dir: get("TV_PANEL_MOVIES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MOVIES_DIR)),
            plug_url: get("TV_PANEL_PLUG_URL").unwrap_or_else(|| DEFAULT_PLUG_URL.to_string()),
            plug_timeout,
            static_dir: get("TV_PANEL_STATIC_DIR").map(PathBuf::from),
        })
    }
}
