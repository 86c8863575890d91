/**
 * ============================================================================
 * NATIVE RECORDER INTERFACE MODULE
 * ============================================================================
 *
 * PURPOSE: Seams to the device-level recorder and its storage
 *
 * TRAITS:
 * - ScreenRecorder: overlay permission and capture start/stop
 * - NotificationPermissions: persistent notification permission
 * - RecordingStore: enumerate/delete/inspect/export/prune captures
 *
 * The recorder rejects calls with plain messages, so ScreenRecorder and
 * NotificationPermissions return Result<_, String>. RecordingStore reports
 * classified errors because callers must tell NotFound from
 * StorageUnavailable.
 *
 * ============================================================================
 */

use crate::error::FootageResult;
use crate::recording::types::{CleanupReport, ExportResult, Recording, RecordingInfo, StartOptions};
use async_trait::async_trait;

#[async_trait]
pub trait ScreenRecorder: Send + Sync {
    async fn check_overlay_permission(&self) -> Result<bool, String>;

    // Opens the OS prompt; resolves once the user responds
    async fn request_overlay_permission(&self) -> Result<(), String>;

    async fn start_recording(&self, options: &StartOptions) -> Result<(), String>;

    async fn stop_recording(&self) -> Result<(), String>;
}

#[async_trait]
pub trait NotificationPermissions: Send + Sync {
    async fn check_display(&self) -> Result<bool, String>;

    async fn request_display(&self) -> Result<bool, String>;
}

#[async_trait]
pub trait RecordingStore: Send + Sync {
    async fn list_recordings(&self) -> FootageResult<Vec<Recording>>;

    async fn delete_recording(&self, path: &str) -> FootageResult<()>;

    async fn recording_info(&self, path: &str) -> FootageResult<RecordingInfo>;

    async fn export_to_public_storage(&self, path: &str) -> FootageResult<ExportResult>;

    async fn cleanup_old_recordings(&self, days: u32) -> FootageResult<CleanupReport>;
}
