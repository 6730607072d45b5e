use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::config::AppConfig;
use crate::ops::timer::MAX_PRESET_MINUTES;

const CONFIG_FILE: &str = "stride.toml";

/// Error type for reading stride.toml
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Pick the data directory: explicit flag, then `STRIDE_DATA_DIR`, then
/// `$XDG_DATA_HOME/stride`, then `~/.local/share/stride`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = env_path("STRIDE_DATA_DIR") {
        return dir;
    }
    let data_home = env_path("XDG_DATA_HOME").unwrap_or_else(|| home_dir().join(".local").join("share"));
    data_home.join("stride")
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn home_dir() -> PathBuf {
    env_path("HOME").unwrap_or_else(|| PathBuf::from("/"))
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Read stride.toml from the data directory. A missing file means defaults.
pub fn read_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = config_path(data_dir);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => return Err(ConfigError::Read { path, source: e }),
    };
    let config: AppConfig = toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.clone(),
        source: e,
    })?;
    if let Some(bad) = config
        .timer
        .pomodoro_presets
        .iter()
        .find(|&&m| m == 0 || m > MAX_PRESET_MINUTES)
    {
        return Err(ConfigError::Invalid {
            path,
            message: format!(
                "pomodoro preset {} is outside 1..={} minutes",
                bad, MAX_PRESET_MINUTES
            ),
        });
    }
    tracing::debug!(path = %path.display(), "read config");
    Ok(config)
}
