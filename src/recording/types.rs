/**
 * ============================================================================
 * RECORDING TYPES MODULE
 * ============================================================================
 *
 * PURPOSE: Data structures for captured match footage
 *
 * TYPES:
 * - Recording: One capture on device storage (path is the primary key)
 * - RecordingInfo: Detailed lookup result for a single path
 * - StartOptions: File name and retention for a new capture
 * - ExportResult: Public reference produced by a gallery export
 * - CleanupReport: Outcome of a retention sweep
 *
 * ============================================================================
 */

use chrono::{DateTime, Local, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// match_<id>_<unix millis>.mp4
static MATCH_FILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^match_(.+)_(\d+)\.mp4$").expect("valid match file regex"));

/// One capture on device storage
///
/// Recordings are immutable: deletion removes them, nothing edits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub name: String,

    // Unique storage identifier
    pub path: String,

    // Unix milliseconds
    pub created: i64,

    // Bytes
    pub size: u64,

    // Seconds, None until probed
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub duration: Option<f64>,
}

// The native listing reports 0 for "not probed yet"
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|d| *d > 0.0))
}

impl Recording {
    pub fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.created)
            .single()
            .unwrap_or_default()
    }

    // Match id embedded by StartOptions::for_match, if any
    pub fn match_id(&self) -> Option<&str> {
        MATCH_FILE_NAME
            .captures(&self.name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    pub fn display_size(&self) -> String {
        format_file_size(self.size)
    }

    pub fn display_duration(&self) -> String {
        format_duration(self.duration)
    }

    pub fn display_created(&self) -> String {
        self.created_at()
            .with_timezone(&Local)
            .format("%b %-d, %Y, %I:%M %p")
            .to_string()
    }
}

/// Detailed lookup for a single path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub created: i64,
    #[serde(default)]
    pub duration: Option<f64>,
    pub exists: bool,
}

/// Options for starting a capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOptions {
    pub file_name: String,

    // Recorder prunes captures older than this when it starts
    #[serde(default)]
    pub auto_cleanup_days: Option<u32>,
}

impl Default for StartOptions {
    fn default() -> Self {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        Self {
            file_name: format!("recording_{}.mp4", stamp),
            auto_cleanup_days: Some(7),
        }
    }
}

impl StartOptions {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            auto_cleanup_days: None,
        }
    }

    // Naming used when a match goes live
    pub fn for_match(match_id: &str) -> Self {
        Self {
            file_name: format!("match_{}_{}.mp4", match_id, Utc::now().timestamp_millis()),
            auto_cleanup_days: Some(7),
        }
    }

    pub fn with_auto_cleanup_days(mut self, days: u32) -> Self {
        self.auto_cleanup_days = Some(days);
        self
    }
}

/// Public reference to an exported recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub public_path: Option<String>,
}

impl ExportResult {
    // Prefer the uri, fall back to the filesystem path
    pub fn share_reference(&self) -> Option<&str> {
        self.uri.as_deref().or(self.public_path.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub deleted_count: usize,
    pub deleted_files: Vec<String>,
}

// =============================================================================
// Display Formatting
// =============================================================================

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

pub fn format_duration(seconds: Option<f64>) -> String {
    let seconds = match seconds {
        Some(s) if s > 0.0 => s,
        _ => return "0:00".to_string(),
    };

    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
