/**
 * ============================================================================
 * FOOTAGE REPOSITORY MODULE
 * ============================================================================
 *
 * PURPOSE: Single entry point for stored match footage
 *
 * RESPONSIBILITIES:
 * - List recordings newest-first and filter them by name
 * - Delete recordings, dropping their cached playback URI
 * - Resolve playback URIs through a per-path cache
 * - Export to public storage and upload to a remote endpoint
 * - Retention cleanup and per-path info lookups
 *
 * UPLOADS:
 * At most one active UploadTask per path. A second upload() of a path
 * whose task is still pending/running returns that same task. Finished
 * tasks are forgotten on the next upload().
 *
 * ============================================================================
 */

use crate::config::FootageConfig;
use crate::error::{FootageError, FootageResult};
use crate::footage::upload::{HttpUploadTransport, UploadRequest, UploadTask, UploadTransport};
use crate::footage::uri_cache::{FileUriResolver, PlaybackUriCache, UriResolver};
use crate::recording::native::RecordingStore;
use crate::recording::storage::LocalRecordingStore;
use crate::recording::types::{CleanupReport, ExportResult, Recording, RecordingInfo};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub struct FootageRepository {
    store: Arc<dyn RecordingStore>,
    resolver: Arc<dyn UriResolver>,
    transport: Arc<dyn UploadTransport>,
    uri_cache: PlaybackUriCache,
    uploads: Mutex<HashMap<String, UploadTask>>,
}

impl FootageRepository {
    pub fn new(
        store: Arc<dyn RecordingStore>,
        resolver: Arc<dyn UriResolver>,
        transport: Arc<dyn UploadTransport>,
    ) -> Self {
        Self {
            store,
            resolver,
            transport,
            uri_cache: PlaybackUriCache::new(),
            uploads: Mutex::new(HashMap::new()),
        }
    }

    // Directory store, file:// playback URIs and HTTP uploads
    pub fn local(
        recordings_dir: impl Into<PathBuf>,
        public_dir: impl Into<PathBuf>,
        config: &FootageConfig,
    ) -> FootageResult<Self> {
        config.validate()?;

        Ok(Self::new(
            Arc::new(LocalRecordingStore::from_config(recordings_dir, public_dir, config)),
            Arc::new(FileUriResolver),
            Arc::new(HttpUploadTransport::from_config(config)?),
        ))
    }

    // =========================================================================
    // Listing
    // =========================================================================

    pub async fn list(&self) -> FootageResult<Vec<Recording>> {
        let mut recordings = self.store.list_recordings().await.map_err(|e| {
            log::error!("Failed to list recordings: {}", e);
            e
        })?;

        sort_newest_first(&mut recordings);
        log::debug!("Listed {} recordings", recordings.len());
        Ok(recordings)
    }

    pub fn filter(recordings: &[Recording], query: &str) -> Vec<Recording> {
        filter_recordings(recordings, query)
    }

    pub async fn recording_info(&self, path: &str) -> FootageResult<RecordingInfo> {
        self.store.recording_info(path).await
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    pub async fn delete(&self, path: &str) -> FootageResult<()> {
        log::info!("Deleting recording {}", path);

        self.store.delete_recording(path).await.map_err(|e| {
            log::error!("Failed to delete {}: {}", path, e);
            e
        })?;

        self.uri_cache.evict(path);
        Ok(())
    }

    pub async fn cleanup_old(&self, days: u32) -> FootageResult<CleanupReport> {
        if days == 0 {
            return Err(FootageError::InvalidConfig(
                "Cleanup days must be at least 1".to_string(),
            ));
        }

        let report = self.store.cleanup_old_recordings(days).await?;
        for path in &report.deleted_files {
            self.uri_cache.evict(path);
        }

        log::info!(
            "Cleanup removed {} recordings older than {} days",
            report.deleted_count,
            days
        );
        Ok(report)
    }

    // =========================================================================
    // Playback & Sharing
    // =========================================================================

    pub fn resolve_playback_uri(&self, path: &str) -> String {
        self.uri_cache.resolve(path, self.resolver.as_ref())
    }

    pub fn cached_uri_count(&self) -> usize {
        self.uri_cache.len()
    }

    pub fn is_uri_cached(&self, path: &str) -> bool {
        self.uri_cache.contains(path)
    }

    pub async fn export_to_gallery(&self, path: &str) -> FootageResult<ExportResult> {
        log::info!("Exporting {} to public storage", path);

        let result = self.store.export_to_public_storage(path).await?;
        if result.share_reference().is_none() {
            return Err(FootageError::StorageUnavailable(
                "Export produced no public reference".to_string(),
            ));
        }
        Ok(result)
    }

    // =========================================================================
    // Upload
    // =========================================================================

    pub fn upload(&self, path: &str, endpoint: &str) -> FootageResult<UploadTask> {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(FootageError::InvalidConfig(format!(
                "Invalid upload endpoint: {}",
                endpoint
            )));
        }

        let mut uploads = self.uploads.lock().unwrap();
        uploads.retain(|_, task| task.is_active());
        if let Some(existing) = uploads.get(path) {
            if existing.is_active() {
                log::info!("Upload already in progress for {}", path);
                return Ok(existing.clone());
            }
        }

        let request = UploadRequest {
            path: PathBuf::from(path),
            file_name: file_name_of(path),
            endpoint: endpoint.to_string(),
        };

        let task = UploadTask::spawn(self.transport.clone(), request);
        uploads.insert(path.to_string(), task.clone());
        Ok(task)
    }

    // Tasks still tracked; finished ones are dropped on the next upload()
    pub fn tracked_uploads(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn active_upload(&self, path: &str) -> Option<UploadTask> {
        self.uploads
            .lock()
            .unwrap()
            .get(path)
            .filter(|t| t.is_active())
            .cloned()
    }
}

// =============================================================================
// Pure Helpers
// =============================================================================

// Newest first; path breaks ties so the order is total
fn sort_newest_first(recordings: &mut [Recording]) {
    recordings.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.path.cmp(&b.path)));
}

/// Case-insensitive substring match on `name`, sorted newest-first
pub fn filter_recordings(recordings: &[Recording], query: &str) -> Vec<Recording> {
    let needle = query.trim().to_lowercase();

    let mut matched: Vec<Recording> = recordings
        .iter()
        .filter(|r| needle.is_empty() || r.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    sort_newest_first(&mut matched);
    matched
}

fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}
