/**
 * ============================================================================
 * FOOTAGE CONFIG MODULE
 * ============================================================================
 *
 * PURPOSE: Configuration persistence for the footage pipeline
 *
 * FUNCTIONALITY:
 * - Load/save configuration as pretty JSON
 * - Defaults for every field when none exists
 * - Validation before a new configuration is accepted
 *
 * ============================================================================
 */

use crate::error::{FootageError, FootageResult};
use crate::recording::types::StartOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "footage_config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FootageConfig {
    // Endpoint receiving multipart footage uploads
    #[serde(default = "default_upload_endpoint")]
    pub upload_endpoint: String,

    // Recordings older than this are removed by the recorder (days)
    #[serde(default = "default_auto_cleanup_days")]
    pub auto_cleanup_days: u32,

    // Overlay controls hide after this much inactivity (ms)
    #[serde(default = "default_controls_hide_delay_ms")]
    pub controls_hide_delay_ms: u64,

    // Scroll bursts inside this window collapse into one recomputation (ms)
    #[serde(default = "default_scroll_debounce_ms")]
    pub scroll_debounce_ms: u64,

    // Error/success notices clear after this long (ms)
    #[serde(default = "default_notice_clear_ms")]
    pub notice_clear_ms: u64,

    // Activating a slot this close to its end rewinds it first (seconds)
    #[serde(default = "default_replay_threshold_secs")]
    pub replay_threshold_secs: f64,

    // Whole-request timeout for a single upload (seconds)
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,

    // Read size for streamed upload bodies (bytes)
    #[serde(default = "default_upload_chunk_bytes")]
    pub upload_chunk_bytes: usize,

    // Folder created under the public movies directory on export
    #[serde(default = "default_export_subdir")]
    pub export_subdir: String,

    // Feed starts muted
    #[serde(default = "default_start_muted")]
    pub start_muted: bool,
}

impl Default for FootageConfig {
    fn default() -> Self {
        Self {
            upload_endpoint: default_upload_endpoint(),
            auto_cleanup_days: default_auto_cleanup_days(),
            controls_hide_delay_ms: default_controls_hide_delay_ms(),
            scroll_debounce_ms: default_scroll_debounce_ms(),
            notice_clear_ms: default_notice_clear_ms(),
            replay_threshold_secs: default_replay_threshold_secs(),
            upload_timeout_secs: default_upload_timeout_secs(),
            upload_chunk_bytes: default_upload_chunk_bytes(),
            export_subdir: default_export_subdir(),
            start_muted: default_start_muted(),
        }
    }
}

fn default_upload_endpoint() -> String {
    "https://uploads.open-tournament.com".to_string()
}

fn default_auto_cleanup_days() -> u32 {
    7
}

fn default_controls_hide_delay_ms() -> u64 {
    3000
}

fn default_scroll_debounce_ms() -> u64 {
    100
}

fn default_notice_clear_ms() -> u64 {
    5000
}

fn default_replay_threshold_secs() -> f64 {
    0.5
}

fn default_upload_timeout_secs() -> u64 {
    300 // 5 minutes, footage files are large
}

fn default_upload_chunk_bytes() -> usize {
    64 * 1024
}

fn default_export_subdir() -> String {
    "MatchFootage".to_string()
}

fn default_start_muted() -> bool {
    true
}

impl FootageConfig {
    pub fn validate(&self) -> FootageResult<()> {
        if !(10..=1000).contains(&self.scroll_debounce_ms) {
            return Err(FootageError::InvalidConfig(
                "Scroll debounce must be between 10 and 1000 ms".to_string(),
            ));
        }

        if self.controls_hide_delay_ms < 500 {
            return Err(FootageError::InvalidConfig(
                "Controls hide delay must be at least 500 ms".to_string(),
            ));
        }

        if self.auto_cleanup_days == 0 {
            return Err(FootageError::InvalidConfig(
                "Auto cleanup must keep recordings for at least 1 day".to_string(),
            ));
        }

        if self.upload_chunk_bytes == 0 {
            return Err(FootageError::InvalidConfig(
                "Upload chunk size must be greater than zero".to_string(),
            ));
        }

        let endpoint = self.upload_endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(FootageError::InvalidConfig(format!(
                "Invalid upload endpoint '{}'. Must be an http(s) URL",
                self.upload_endpoint
            )));
        }

        Ok(())
    }

    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }

    pub fn controls_hide_delay(&self) -> Duration {
        Duration::from_millis(self.controls_hide_delay_ms)
    }

    pub fn notice_clear_delay(&self) -> Duration {
        Duration::from_millis(self.notice_clear_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    // Options for a capture, named after the match when there is one
    pub fn start_options(&self, match_id: Option<&str>) -> StartOptions {
        let options = match match_id {
            Some(id) => StartOptions::for_match(id),
            None => StartOptions::default(),
        };
        options.with_auto_cleanup_days(self.auto_cleanup_days)
    }
}

// Base directory for persisted state when the host does not supply one
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("match-footage")
}

// Get config file path
pub fn config_path(base_dir: &Path) -> PathBuf {
    base_dir.join(CONFIG_FILE_NAME)
}

// Load configuration from disk
pub fn load_config(path: &Path) -> FootageResult<FootageConfig> {
    if !path.exists() {
        log::info!("No footage config found, using defaults");
        return Ok(FootageConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        FootageError::StorageUnavailable(format!("Failed to read config: {}", e))
    })?;

    let config: FootageConfig = serde_json::from_str(&contents)
        .map_err(|e| FootageError::InvalidConfig(format!("Failed to parse config: {}", e)))?;

    log::info!("Loaded footage config from {:?}", path);
    Ok(config)
}

// Save configuration to disk
pub fn save_config(path: &Path, config: &FootageConfig) -> FootageResult<()> {
    config.validate()?;

    // Ensure directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            FootageError::StorageUnavailable(format!("Failed to create config dir: {}", e))
        })?;
    }

    let contents = serde_json::to_string_pretty(config)
        .map_err(|e| FootageError::InvalidConfig(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, contents).map_err(|e| {
        FootageError::StorageUnavailable(format!("Failed to write config: {}", e))
    })?;

    log::info!("Saved footage config to {:?}", path);
    Ok(())
}
