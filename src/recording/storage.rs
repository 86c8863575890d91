/**
 * ============================================================================
 * RECORDING STORAGE MODULE
 * ============================================================================
 *
 * PURPOSE: Directory-backed RecordingStore for captured footage
 *
 * FUNCTIONALITY:
 * - Enumerate captures (metadata sidecar first, directory scan fallback)
 * - Delete a capture and its sidecar entry
 * - Inspect a single capture
 * - Copy a capture into public storage
 * - Remove captures older than a retention period
 *
 * FILE STRUCTURE:
 * <recordings_dir>/
 * ├── match_42_1736956800000.mp4
 * ├── recording_20250115_183000.mp4
 * └── recordings_metadata.json   # [{path, created, duration}]
 *
 * <public_dir>/<export_subdir>/
 * └── match_42_1736956800000.mp4
 *
 * ============================================================================
 */

use crate::config::FootageConfig;
use crate::error::{FootageError, FootageResult};
use crate::recording::native::RecordingStore;
use crate::recording::types::{CleanupReport, ExportResult, Recording, RecordingInfo};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use walkdir::WalkDir;

const METADATA_FILE_NAME: &str = "recordings_metadata.json";

// Sidecar entry written when a capture finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub path: String,
    pub created: i64,
    #[serde(default)]
    pub duration: Option<f64>,
}

pub struct LocalRecordingStore {
    recordings_dir: PathBuf,
    public_dir: PathBuf,
    export_subdir: String,

    // Serializes sidecar read-modify-write cycles
    metadata_lock: Mutex<()>,
}

impl LocalRecordingStore {
    pub fn new(
        recordings_dir: impl Into<PathBuf>,
        public_dir: impl Into<PathBuf>,
        export_subdir: impl Into<String>,
    ) -> Self {
        Self {
            recordings_dir: recordings_dir.into(),
            public_dir: public_dir.into(),
            export_subdir: export_subdir.into(),
            metadata_lock: Mutex::new(()),
        }
    }

    pub fn from_config(
        recordings_dir: impl Into<PathBuf>,
        public_dir: impl Into<PathBuf>,
        config: &FootageConfig,
    ) -> Self {
        Self::new(recordings_dir, public_dir, config.export_subdir.clone())
    }

    pub fn recordings_dir(&self) -> &Path {
        &self.recordings_dir
    }

    fn metadata_path(&self) -> PathBuf {
        self.recordings_dir.join(METADATA_FILE_NAME)
    }

    // Record a finished capture in the sidecar
    pub fn register(&self, entry: MetadataEntry) -> FootageResult<()> {
        let _guard = self.metadata_lock.lock().unwrap();

        std::fs::create_dir_all(&self.recordings_dir).map_err(|e| {
            FootageError::StorageUnavailable(format!("Failed to create recordings directory: {}", e))
        })?;

        let mut entries = self.load_metadata();
        entries.retain(|e| e.path != entry.path);
        entries.push(entry);
        self.save_metadata(&entries)
    }

    fn load_metadata(&self) -> Vec<MetadataEntry> {
        let path = self.metadata_path();
        if !path.exists() {
            return Vec::new();
        }

        match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable recordings metadata {:?}: {}", path, e);
                Vec::new()
            }),
            Err(e) => {
                log::warn!("Failed to read recordings metadata {:?}: {}", path, e);
                Vec::new()
            }
        }
    }

    fn save_metadata(&self, entries: &[MetadataEntry]) -> FootageResult<()> {
        let path = self.metadata_path();
        let temp_path = path.with_extension("json.tmp");

        let contents = serde_json::to_string_pretty(entries).map_err(|e| {
            FootageError::StorageUnavailable(format!("Failed to serialize metadata: {}", e))
        })?;

        std::fs::write(&temp_path, contents).map_err(|e| {
            FootageError::StorageUnavailable(format!("Failed to write metadata: {}", e))
        })?;
        std::fs::rename(&temp_path, &path).map_err(|e| {
            FootageError::StorageUnavailable(format!("Failed to replace metadata: {}", e))
        })?;

        Ok(())
    }

    fn remove_from_metadata(&self, paths: &[String]) -> FootageResult<()> {
        let _guard = self.metadata_lock.lock().unwrap();

        let mut entries = self.load_metadata();
        let before = entries.len();
        entries.retain(|e| !paths.contains(&e.path));

        if entries.len() != before {
            self.save_metadata(&entries)?;
        }
        Ok(())
    }

    // All .mp4 files directly inside the recordings directory
    fn scan_video_files(&self) -> FootageResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.recordings_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            let entry = entry.map_err(|e| {
                FootageError::StorageUnavailable(format!("Failed to scan recordings: {}", e))
            })?;

            if entry.file_type().is_file() && is_video(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }

        Ok(files)
    }

    fn recording_from_file(&self, path: &Path, meta: Option<&MetadataEntry>) -> FootageResult<Recording> {
        let fs_meta = std::fs::metadata(path)?;
        let created = meta
            .map(|m| m.created)
            .unwrap_or_else(|| modified_millis(&fs_meta));

        Ok(Recording {
            name: file_name(path),
            path: path.to_string_lossy().to_string(),
            created,
            size: fs_meta.len(),
            duration: meta.and_then(|m| m.duration).filter(|d| *d > 0.0),
        })
    }
}

#[async_trait]
impl RecordingStore for LocalRecordingStore {
    async fn list_recordings(&self) -> FootageResult<Vec<Recording>> {
        if !self.recordings_dir.exists() {
            return Ok(Vec::new());
        }

        let metadata = {
            let _guard = self.metadata_lock.lock().unwrap();
            self.load_metadata()
        };

        let mut recordings = Vec::new();
        for entry in &metadata {
            let path = Path::new(&entry.path);
            if path.exists() {
                recordings.push(self.recording_from_file(path, Some(entry))?);
            }
        }

        // Fall back to scanning the directory
        if recordings.is_empty() {
            for path in self.scan_video_files()? {
                recordings.push(self.recording_from_file(&path, None)?);
            }
        }

        log::debug!("Listed {} recordings from {:?}", recordings.len(), self.recordings_dir);
        Ok(recordings)
    }

    async fn delete_recording(&self, path: &str) -> FootageResult<()> {
        let file = Path::new(path);
        if !file.is_file() {
            return Err(FootageError::NotFound(path.to_string()));
        }

        std::fs::remove_file(file).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FootageError::NotFound(path.to_string()),
            _ => FootageError::StorageUnavailable(format!("Failed to delete {}: {}", path, e)),
        })?;

        self.remove_from_metadata(&[path.to_string()])?;

        log::info!("Deleted recording {}", path);
        Ok(())
    }

    async fn recording_info(&self, path: &str) -> FootageResult<RecordingInfo> {
        let file = Path::new(path);
        if !file.is_file() {
            return Err(FootageError::NotFound(path.to_string()));
        }

        let meta = {
            let _guard = self.metadata_lock.lock().unwrap();
            self.load_metadata().into_iter().find(|m| m.path == path)
        };
        let fs_meta = std::fs::metadata(file)?;

        Ok(RecordingInfo {
            path: file.to_string_lossy().to_string(),
            name: file_name(file),
            size: fs_meta.len(),
            created: meta
                .as_ref()
                .map(|m| m.created)
                .unwrap_or_else(|| modified_millis(&fs_meta)),
            duration: meta.and_then(|m| m.duration).filter(|d| *d > 0.0),
            exists: true,
        })
    }

    async fn export_to_public_storage(&self, path: &str) -> FootageResult<ExportResult> {
        let source = Path::new(path);
        if !source.is_file() {
            return Err(FootageError::NotFound(path.to_string()));
        }

        let export_dir = self.public_dir.join(&self.export_subdir);
        tokio::fs::create_dir_all(&export_dir).await.map_err(|e| {
            FootageError::StorageUnavailable(format!("Failed to create export directory: {}", e))
        })?;

        let destination = export_dir.join(file_name(source));
        tokio::fs::copy(source, &destination).await.map_err(|e| {
            FootageError::StorageUnavailable(format!("Failed to export {}: {}", path, e))
        })?;

        let public_path = destination.to_string_lossy().to_string();
        log::info!("Exported recording {} to {}", path, public_path);

        Ok(ExportResult {
            uri: Some(format!("file://{}", public_path)),
            public_path: Some(public_path),
        })
    }

    async fn cleanup_old_recordings(&self, days: u32) -> FootageResult<CleanupReport> {
        if !self.recordings_dir.exists() {
            return Ok(CleanupReport::default());
        }

        let cutoff = Utc::now() - chrono::Duration::days(days as i64);
        let cutoff_millis = cutoff.timestamp_millis();

        let mut report = CleanupReport::default();
        let mut deleted_paths = Vec::new();

        for recording in self.list_recordings().await? {
            if recording.created >= cutoff_millis {
                continue;
            }

            if let Err(e) = std::fs::remove_file(&recording.path) {
                log::warn!("Failed to delete old recording {}: {}", recording.path, e);
            } else {
                report.deleted_count += 1;
                report.deleted_files.push(recording.path.clone());
                deleted_paths.push(recording.path);
            }
        }

        self.remove_from_metadata(&deleted_paths)?;

        if report.deleted_count > 0 {
            log::info!(
                "Cleaned up {} recordings older than {} days",
                report.deleted_count,
                days
            );
        }

        Ok(report)
    }
}

fn is_video(path: &Path) -> bool {
    path.extension().map(|ext| ext == "mp4").unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn modified_millis(meta: &std::fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> LocalRecordingStore {
        LocalRecordingStore::from_config(
            dir.path().join("recordings"),
            dir.path().join("public"),
            &FootageConfig::default(),
        )
    }

    fn write_video(store: &LocalRecordingStore, name: &str, bytes: usize) -> String {
        std::fs::create_dir_all(store.recordings_dir()).unwrap();
        let path = store.recordings_dir().join(name);
        std::fs::write(&path, vec![0u8; bytes]).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_missing_directory_lists_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.list_recordings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_fallback_without_metadata() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        write_video(&store, "a.mp4", 10);
        write_video(&store, "b.mp4", 20);
        std::fs::write(store.recordings_dir().join("notes.txt"), "x").unwrap();

        let mut names: Vec<String> = store
            .list_recordings()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        names.sort();

        assert_eq!(names, vec!["a.mp4", "b.mp4"]);
    }

    #[tokio::test]
    async fn test_metadata_supplies_created_and_duration() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = write_video(&store, "match_9_1000.mp4", 64);
        write_video(&store, "untracked.mp4", 8);

        store
            .register(MetadataEntry {
                path: path.clone(),
                created: 1_000,
                duration: Some(93.0),
            })
            .unwrap();

        // Sidecar entries win over the directory scan
        let recordings = store.list_recordings().await.unwrap();
        assert_eq!(recordings.len(), 1);
        assert_eq!(recordings[0].path, path);
        assert_eq!(recordings[0].created, 1_000);
        assert_eq!(recordings[0].duration, Some(93.0));
        assert_eq!(recordings[0].size, 64);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = write_video(&store, "a.mp4", 10);

        store.delete_recording(&path).await.unwrap();
        let err = store.delete_recording(&path).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_prunes_metadata() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = write_video(&store, "a.mp4", 10);
        store
            .register(MetadataEntry {
                path: path.clone(),
                created: 5,
                duration: None,
            })
            .unwrap();

        store.delete_recording(&path).await.unwrap();
        assert!(store.load_metadata().is_empty());
    }

    #[tokio::test]
    async fn test_export_copies_into_public_dir() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = write_video(&store, "a.mp4", 128);

        let result = store.export_to_public_storage(&path).await.unwrap();
        let public_path = result.public_path.clone().unwrap();

        assert!(public_path.ends_with("MatchFootage/a.mp4"));
        assert_eq!(std::fs::metadata(&public_path).unwrap().len(), 128);
        assert!(result.uri.unwrap().starts_with("file://"));
        // Source stays in place
        assert!(Path::new(&path).exists());
    }

    #[tokio::test]
    async fn test_info_and_export_of_missing_path() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(store.recording_info("/nope.mp4").await.unwrap_err().is_not_found());
        assert!(store
            .export_to_public_storage("/nope.mp4")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_old_recordings() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let old = write_video(&store, "old.mp4", 10);
        let fresh = write_video(&store, "fresh.mp4", 10);

        let ten_days_ago = (Utc::now() - chrono::Duration::days(10)).timestamp_millis();
        store
            .register(MetadataEntry { path: old.clone(), created: ten_days_ago, duration: None })
            .unwrap();
        store
            .register(MetadataEntry {
                path: fresh.clone(),
                created: Utc::now().timestamp_millis(),
                duration: None,
            })
            .unwrap();

        let report = store.cleanup_old_recordings(7).await.unwrap();

        assert_eq!(report.deleted_count, 1);
        assert_eq!(report.deleted_files, vec![old.clone()]);
        assert!(!Path::new(&old).exists());
        assert!(Path::new(&fresh).exists());
        assert_eq!(store.load_metadata().len(), 1);
    }
}
