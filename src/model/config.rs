use serde::{Deserialize, Serialize};

use super::document::Theme;

/// Configuration from stride.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub attachments: AttachmentConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Total bytes the key-value store may hold. `0` disables the ceiling.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            quota_bytes: default_quota_bytes(),
        }
    }
}

impl StorageConfig {
    pub fn quota(&self) -> Option<usize> {
        (self.quota_bytes > 0).then_some(self.quota_bytes)
    }
}

/// Same ceiling browsers commonly give local storage
fn default_quota_bytes() -> usize {
    5 * 1024 * 1024
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentConfig {
    /// Largest file accepted as an inline attachment
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        AttachmentConfig {
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    1024 * 1024
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Pomodoro presets in minutes; the first one is the default
    #[serde(default = "default_presets")]
    pub pomodoro_presets: Vec<u32>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        TimerConfig {
            pomodoro_presets: default_presets(),
        }
    }
}

fn default_presets() -> Vec<u32> {
    vec![25, 5, 15]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    /// Theme given to newly created documents
    #[serde(default)]
    pub theme: Theme,
}
