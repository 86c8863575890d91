/**
 * ============================================================================
 * FOOTAGE SCREEN MODULE
 * ============================================================================
 *
 * PURPOSE: Glue between stored footage and the scrolling playback feed
 *
 * WIRING:
 * repository.list() -> FeedController -> (near window) -> PlaybackCoordinator
 *
 * - attach() spawns a driver that re-syncs playback on every feed change
 * - Interactions (scroll, next/previous, play/pause, mute) show controls
 * - Delete goes through request -> confirm; failures leave the list as is,
 *   and a successful delete always drops the recording from the feed
 * - Export/share/upload act on the current recording
 * - Errors and successes are posted as notices that clear themselves
 * - teardown() stops the driver, detaches upload observers and releases
 *   every media handle
 *
 * ============================================================================
 */

use crate::config::FootageConfig;
use crate::error::{FootageError, FootageResult};
use crate::feed::controller::FeedController;
use crate::feed::controls::ControlsVisibilityTimer;
use crate::feed::playback::{MediaEngine, PlayOutcome, PlaybackCoordinator, PlaybackError, SlotSource};
use crate::feed::timer::ScopedTimer;
use crate::footage::repository::FootageRepository;
use crate::footage::upload::{ObserverId, UploadStatus, UploadTask};
use crate::recording::types::{ExportResult, Recording};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const LOAD_FAILED: &str = "Failed to load recordings. Please check permissions.";

// =============================================================================
// Notices
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Error(String),
    Success(String),
}

/// Latest user-facing notice, cleared after a fixed delay
#[derive(Clone)]
pub struct NoticeBoard {
    current: Arc<watch::Sender<Option<Notice>>>,
    timer: Arc<ScopedTimer>,
    clear_after: Duration,
}

impl NoticeBoard {
    pub fn new(clear_after: Duration) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current: Arc::new(current),
            timer: Arc::new(ScopedTimer::new()),
            clear_after,
        }
    }

    pub fn post(&self, notice: Notice) {
        self.current.send_replace(Some(notice));

        let current = self.current.clone();
        self.timer.schedule(self.clear_after, move || {
            current.send_replace(None);
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.post(Notice::Error(message.into()));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.post(Notice::Success(message.into()));
    }

    pub fn clear(&self) {
        self.timer.cancel();
        self.current.send_replace(None);
    }

    pub fn current(&self) -> Option<Notice> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notice>> {
        self.current.subscribe()
    }
}

// =============================================================================
// Screen
// =============================================================================

pub struct FootageScreen {
    repository: Arc<FootageRepository>,
    feed: FeedController,
    playback: PlaybackCoordinator,
    controls: ControlsVisibilityTimer,
    notices: NoticeBoard,
    upload_endpoint: String,
    pending_delete: Mutex<Option<String>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    watched_uploads: Mutex<Vec<(UploadTask, ObserverId)>>,
}

impl FootageScreen {
    pub fn new(repository: Arc<FootageRepository>, engine: Arc<dyn MediaEngine>, config: &FootageConfig) -> Self {
        Self {
            repository,
            feed: FeedController::new(config.scroll_debounce()),
            playback: PlaybackCoordinator::new(engine, config.start_muted, config.replay_threshold_secs),
            controls: ControlsVisibilityTimer::new(config.controls_hide_delay()),
            notices: NoticeBoard::new(config.notice_clear_delay()),
            upload_endpoint: config.upload_endpoint.clone(),
            pending_delete: Mutex::new(None),
            driver: Mutex::new(None),
            watched_uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn feed(&self) -> &FeedController {
        &self.feed
    }

    pub fn playback(&self) -> &PlaybackCoordinator {
        &self.playback
    }

    pub fn controls(&self) -> &ControlsVisibilityTimer {
        &self.controls
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    // =========================================================================
    // Loading & Driving
    // =========================================================================

    pub async fn load(&self) -> FootageResult<usize> {
        match self.repository.list().await {
            Ok(recordings) => {
                let count = recordings.len();
                self.feed.set_recordings(recordings);
                log::info!("Loaded {} recordings into the feed", count);
                Ok(count)
            }
            Err(e) => {
                self.notices.error(LOAD_FAILED);
                Err(e)
            }
        }
    }

    /// Mount the current near window and activate the current slot
    pub async fn sync_playback(&self) -> Result<PlayOutcome, PlaybackError> {
        let current = self.feed.current_index();
        let sources: Vec<SlotSource> = self
            .feed
            .near_indices()
            .into_iter()
            .filter_map(|index| {
                self.feed.recording_at(index).map(|recording| SlotSource {
                    index,
                    uri: self.repository.resolve_playback_uri(&recording.path),
                    path: recording.path,
                })
            })
            .collect();

        self.playback.sync(current, sources).await
    }

    // Re-sync playback whenever the feed view changes
    pub fn attach(self: &Arc<Self>) {
        let mut feed_rx = self.feed.subscribe();
        let screen = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            loop {
                let Some(this) = screen.upgrade() else {
                    break;
                };
                if let Err(e) = this.sync_playback().await {
                    log::error!("Playback sync failed: {}", e);
                }
                drop(this);

                if feed_rx.changed().await.is_err() {
                    break;
                }
            }
        });

        if let Some(previous) = self.driver.lock().unwrap().replace(handle) {
            previous.abort();
        }
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    pub fn set_query(&self, query: &str) {
        self.feed.set_query(query);
    }

    pub fn tap(&self) {
        self.controls.show();
    }

    pub fn on_scroll(&self, scroll_offset: f64, slot_height: f64) {
        self.controls.show();
        self.feed.on_scroll(scroll_offset, slot_height);
    }

    pub fn next(&self) -> Option<usize> {
        self.controls.show();
        self.feed.next()
    }

    pub fn previous(&self) -> Option<usize> {
        self.controls.show();
        self.feed.previous()
    }

    pub async fn toggle_play_pause(&self) -> Result<(), PlaybackError> {
        self.controls.show();
        self.playback.toggle_play_pause().await
    }

    pub fn toggle_mute(&self) -> bool {
        self.controls.show();
        self.playback.toggle_mute()
    }

    pub async fn on_app_background(&self) -> usize {
        self.playback.on_app_background().await
    }

    // =========================================================================
    // Delete Confirmation
    // =========================================================================

    /// Arm deletion of the current recording; returns its path
    pub fn request_delete(&self) -> Option<String> {
        let path = self.feed.current().map(|r| r.path)?;
        *self.pending_delete.lock().unwrap() = Some(path.clone());
        Some(path)
    }

    pub fn pending_delete(&self) -> Option<String> {
        self.pending_delete.lock().unwrap().clone()
    }

    pub fn cancel_delete(&self) {
        self.pending_delete.lock().unwrap().take();
    }

    pub async fn confirm_delete(&self) -> FootageResult<()> {
        let path = self
            .pending_delete
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| FootageError::NotFound("No recording selected for deletion".to_string()))?;

        if let Err(e) = self.repository.delete(&path).await {
            self.notices.error(e.user_message());
            return Err(e);
        }

        // The file is gone; the feed must not keep offering it
        self.feed.remove(&path);
        match self.repository.list().await {
            Ok(recordings) => self.feed.set_recordings(recordings),
            Err(e) => log::warn!("Reload after deleting {} failed: {}", path, e),
        }

        self.notices.success("Recording deleted");
        Ok(())
    }

    // =========================================================================
    // Sharing
    // =========================================================================

    fn selected(&self) -> FootageResult<Recording> {
        self.feed
            .current()
            .ok_or_else(|| FootageError::NotFound("No recording selected".to_string()))
    }

    pub async fn export_selected(&self) -> FootageResult<ExportResult> {
        let recording = self.selected()?;
        match self.repository.export_to_gallery(&recording.path).await {
            Ok(result) => {
                self.notices.success("Video exported to gallery");
                Ok(result)
            }
            Err(e) => {
                self.notices.error(e.user_message());
                Err(e)
            }
        }
    }

    /// Export, then hand back the reference a share sheet should receive
    pub async fn share_selected(&self) -> FootageResult<String> {
        let recording = self.selected()?;
        let result = self.repository.export_to_gallery(&recording.path).await.map_err(|e| {
            self.notices.error(e.user_message());
            e
        })?;

        result
            .share_reference()
            .map(str::to_string)
            .ok_or_else(|| FootageError::StorageUnavailable("Export produced no public reference".to_string()))
    }

    pub fn upload_selected(&self, endpoint: Option<&str>) -> FootageResult<UploadTask> {
        let recording = self.selected()?;
        let endpoint = endpoint.unwrap_or(self.upload_endpoint.as_str());

        let task = self.repository.upload(&recording.path, endpoint).map_err(|e| {
            self.notices.error(e.user_message());
            e
        })?;

        let mut watched = self.watched_uploads.lock().unwrap();
        watched.retain(|(watched_task, observer)| {
            if watched_task.is_active() {
                true
            } else {
                watched_task.detach(*observer);
                false
            }
        });

        // Coalesced onto an upload this screen already watches
        if watched.iter().any(|(watched_task, _)| watched_task.id() == task.id()) {
            return Ok(task);
        }

        let notices = self.notices.clone();
        let observer = task.observe(move |snapshot| match snapshot.status {
            UploadStatus::Succeeded => notices.success("Upload complete"),
            UploadStatus::Failed => notices.error(
                snapshot
                    .error
                    .clone()
                    .unwrap_or_else(|| "Upload failed".to_string()),
            ),
            _ => {}
        });

        watched.push((task.clone(), observer));
        Ok(task)
    }

    pub fn watched_uploads(&self) -> usize {
        self.watched_uploads.lock().unwrap().len()
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    pub async fn teardown(&self) {
        if let Some(driver) = self.driver.lock().unwrap().take() {
            driver.abort();
        }

        let uploads: Vec<(UploadTask, ObserverId)> = self.watched_uploads.lock().unwrap().drain(..).collect();
        for (task, observer) in uploads {
            task.detach(observer);
            task.cancel();
        }

        self.feed.cancel_pending_scroll();
        self.controls.cancel();
        self.notices.clear();
        self.cancel_delete();
        self.playback.release_all().await;
        log::info!("Footage screen torn down");
    }
}
