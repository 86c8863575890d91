/**
 * ============================================================================
 * TEST DOUBLES
 * ============================================================================
 *
 * In-memory stand-ins for the device recorder, notification permission,
 * recording store, media engine and upload transport.
 *
 * ============================================================================
 */

use crate::error::{FootageError, FootageResult};
use crate::feed::playback::{
    ListenerId, MediaEngine, MediaHandle, PlaybackError, PlaybackEventKind, PlaybackListener,
};
use crate::footage::upload::{ProgressFn, UploadRequest, UploadTransport};
use crate::recording::native::{NotificationPermissions, RecordingStore, ScreenRecorder};
use crate::recording::types::{CleanupReport, ExportResult, Recording, RecordingInfo, StartOptions};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) fn recording(name: &str, created: i64) -> Recording {
    Recording {
        name: name.to_string(),
        path: format!("/footage/{}", name),
        created,
        size: 1024,
        duration: None,
    }
}

// =============================================================================
// Recorder
// =============================================================================

#[derive(Default)]
pub(crate) struct FakeRecorder {
    overlay_granted: AtomicBool,
    grant_on_request: AtomicBool,
    overlay_requests: AtomicUsize,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    active: AtomicUsize,
    start_failure: Mutex<Option<String>>,
    stop_failure: Mutex<Option<String>>,
}

impl FakeRecorder {
    pub(crate) fn granted() -> Self {
        Self::overlay(true, true)
    }

    pub(crate) fn overlay(initial_granted: bool, grant_on_request: bool) -> Self {
        let recorder = Self::default();
        recorder.overlay_granted.store(initial_granted, Ordering::SeqCst);
        recorder.grant_on_request.store(grant_on_request, Ordering::SeqCst);
        recorder
    }

    pub(crate) fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn overlay_requests(&self) -> usize {
        self.overlay_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_start(&self, message: &str) {
        *self.start_failure.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn fail_stop(&self, message: &str) {
        *self.stop_failure.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn clear_failures(&self) {
        self.start_failure.lock().unwrap().take();
        self.stop_failure.lock().unwrap().take();
    }
}

#[async_trait]
impl ScreenRecorder for FakeRecorder {
    async fn check_overlay_permission(&self) -> Result<bool, String> {
        Ok(self.overlay_granted.load(Ordering::SeqCst))
    }

    async fn request_overlay_permission(&self) -> Result<(), String> {
        self.overlay_requests.fetch_add(1, Ordering::SeqCst);
        if self.grant_on_request.load(Ordering::SeqCst) {
            self.overlay_granted.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn start_recording(&self, _options: &StartOptions) -> Result<(), String> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.start_failure.lock().unwrap().clone() {
            return Err(message);
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_recording(&self) -> Result<(), String> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.active.store(0, Ordering::SeqCst);
        match self.stop_failure.lock().unwrap().clone() {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }
}

pub(crate) struct FakeNotifications {
    granted: bool,
    checks: AtomicUsize,
    requests: AtomicUsize,
}

impl FakeNotifications {
    pub(crate) fn granted() -> Self {
        Self {
            granted: true,
            checks: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
        }
    }

    pub(crate) fn denied() -> Self {
        Self {
            granted: false,
            ..Self::granted()
        }
    }

    pub(crate) fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationPermissions for FakeNotifications {
    async fn check_display(&self) -> Result<bool, String> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.granted)
    }

    async fn request_display(&self) -> Result<bool, String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.granted)
    }
}

// =============================================================================
// Store
// =============================================================================

pub(crate) struct MemoryStore {
    recordings: Mutex<Vec<Recording>>,
    list_failure: Mutex<Option<String>>,
}

impl MemoryStore {
    pub(crate) fn new(recordings: Vec<Recording>) -> Self {
        Self {
            recordings: Mutex::new(recordings),
            list_failure: Mutex::new(None),
        }
    }

    pub(crate) fn fail_list(&self, message: &str) {
        *self.list_failure.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn len(&self) -> usize {
        self.recordings.lock().unwrap().len()
    }

    // File vanished behind the app's back
    pub(crate) fn remove_externally(&self, path: &str) {
        self.recordings.lock().unwrap().retain(|r| r.path != path);
    }

    fn find(&self, path: &str) -> FootageResult<Recording> {
        self.recordings
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.path == path)
            .cloned()
            .ok_or_else(|| FootageError::NotFound(format!("Recording not found: {}", path)))
    }
}

#[async_trait]
impl RecordingStore for MemoryStore {
    async fn list_recordings(&self) -> FootageResult<Vec<Recording>> {
        if let Some(message) = self.list_failure.lock().unwrap().clone() {
            return Err(FootageError::StorageUnavailable(message));
        }
        Ok(self.recordings.lock().unwrap().clone())
    }

    async fn delete_recording(&self, path: &str) -> FootageResult<()> {
        self.find(path)?;
        self.remove_externally(path);
        Ok(())
    }

    async fn recording_info(&self, path: &str) -> FootageResult<RecordingInfo> {
        let recording = self.find(path)?;
        Ok(RecordingInfo {
            path: recording.path,
            name: recording.name,
            size: recording.size,
            created: recording.created,
            duration: recording.duration,
            exists: true,
        })
    }

    async fn export_to_public_storage(&self, path: &str) -> FootageResult<ExportResult> {
        let recording = self.find(path)?;
        Ok(ExportResult {
            uri: Some(format!("file:///public/{}", recording.name)),
            public_path: Some(format!("/public/{}", recording.name)),
        })
    }

    async fn cleanup_old_recordings(&self, days: u32) -> FootageResult<CleanupReport> {
        let cutoff = chrono::Utc::now().timestamp_millis() - i64::from(days) * 24 * 60 * 60 * 1000;

        let mut recordings = self.recordings.lock().unwrap();
        let deleted_files: Vec<String> = recordings
            .iter()
            .filter(|r| r.created < cutoff)
            .map(|r| r.path.clone())
            .collect();
        recordings.retain(|r| r.created >= cutoff);

        Ok(CleanupReport {
            deleted_count: deleted_files.len(),
            deleted_files,
        })
    }
}

// =============================================================================
// Media
// =============================================================================

struct HandleState {
    paused: bool,
    position: f64,
    duration: Option<f64>,
    muted: bool,
    released: bool,
    silent: bool,
}

pub(crate) struct FakeMediaHandle {
    autoplay_blocked: Arc<AtomicBool>,
    state: Mutex<HandleState>,
    listeners: Mutex<Vec<(ListenerId, PlaybackEventKind, PlaybackListener)>>,
    next_listener: AtomicU64,
}

impl FakeMediaHandle {
    pub(crate) fn emit_play(&self) {
        self.state.lock().unwrap().paused = false;
        self.fire(PlaybackEventKind::Play);
    }

    pub(crate) fn emit_pause(&self) {
        self.state.lock().unwrap().paused = true;
        self.fire(PlaybackEventKind::Pause);
    }

    // Accept play/pause calls without delivering their events
    pub(crate) fn set_silent(&self, silent: bool) {
        self.state.lock().unwrap().silent = silent;
    }

    pub(crate) fn force_paused(&self, paused: bool) {
        self.state.lock().unwrap().paused = paused;
    }

    pub(crate) fn is_released(&self) -> bool {
        self.state.lock().unwrap().released
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    fn transition(&self, paused: bool) -> Result<(), PlaybackError> {
        let notify = {
            let mut state = self.state.lock().unwrap();
            if state.released {
                return Err(PlaybackError::Engine("handle released".to_string()));
            }
            let changed = state.paused != paused;
            state.paused = paused;
            changed && !state.silent
        };

        if notify {
            self.fire(if paused {
                PlaybackEventKind::Pause
            } else {
                PlaybackEventKind::Play
            });
        }
        Ok(())
    }

    fn fire(&self, kind: PlaybackEventKind) {
        let listeners: Vec<PlaybackListener> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, l)| l.clone())
            .collect();

        for listener in listeners {
            listener();
        }
    }
}

#[async_trait]
impl MediaHandle for FakeMediaHandle {
    async fn play(&self) -> Result<(), PlaybackError> {
        if self.autoplay_blocked.load(Ordering::SeqCst) {
            return Err(PlaybackError::AutoplayBlocked);
        }
        self.transition(false)
    }

    async fn pause(&self) -> Result<(), PlaybackError> {
        self.transition(true)
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn seek(&self, seconds: f64) {
        self.state.lock().unwrap().position = seconds;
    }

    fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().unwrap().duration
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    fn add_listener(&self, kind: PlaybackEventKind, listener: PlaybackListener) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().push((id, kind, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap();
        let before = listeners.len();
        listeners.retain(|(l, _, _)| *l != id);
        listeners.len() != before
    }

    fn release(&self) {
        self.state.lock().unwrap().released = true;
    }
}

#[derive(Default)]
pub(crate) struct FakeMediaEngine {
    duration: Option<f64>,
    autoplay_blocked: Arc<AtomicBool>,
    create_fails: AtomicBool,
    created: Mutex<Vec<(String, Arc<FakeMediaHandle>)>>,
}

impl FakeMediaEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_duration(seconds: f64) -> Self {
        Self {
            duration: Some(seconds),
            ..Self::default()
        }
    }

    pub(crate) fn block_autoplay(&self, blocked: bool) {
        self.autoplay_blocked.store(blocked, Ordering::SeqCst);
    }

    pub(crate) fn fail_create(&self, fail: bool) {
        self.create_fails.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn handles(&self) -> Vec<Arc<FakeMediaHandle>> {
        self.created.lock().unwrap().iter().map(|(_, h)| h.clone()).collect()
    }

    // Most recently created handle for `uri`
    pub(crate) fn handle_for(&self, uri: &str) -> Option<Arc<FakeMediaHandle>> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(u, _)| u == uri)
            .map(|(_, h)| h.clone())
    }

    pub(crate) fn live_handles(&self) -> usize {
        self.handles().iter().filter(|h| !h.is_released()).count()
    }
}

impl MediaEngine for FakeMediaEngine {
    fn create(&self, uri: &str) -> Result<Arc<dyn MediaHandle>, PlaybackError> {
        if self.create_fails.load(Ordering::SeqCst) {
            return Err(PlaybackError::Engine(format!("Cannot open {}", uri)));
        }

        let handle = Arc::new(FakeMediaHandle {
            autoplay_blocked: self.autoplay_blocked.clone(),
            state: Mutex::new(HandleState {
                paused: true,
                position: 0.0,
                duration: self.duration,
                muted: false,
                released: false,
                silent: false,
            }),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        });

        self.created.lock().unwrap().push((uri.to_string(), handle.clone()));
        Ok(handle)
    }
}

// =============================================================================
// Upload
// =============================================================================

/// Reports fixed progress percentages, then resolves with a fixed result
pub(crate) struct ScriptedTransport {
    steps: Vec<u8>,
    // None: never resolves after the last step
    result: Option<FootageResult<()>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<UploadRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: Vec<u8>, result: FootageResult<()>) -> Self {
        Self {
            steps,
            result: Some(result),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub(crate) fn ok() -> Self {
        Self::new(vec![50, 100], Ok(()))
    }

    pub(crate) fn stalled(steps: Vec<u8>) -> Self {
        Self {
            result: None,
            ..Self::new(steps, Ok(()))
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<UploadRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadTransport for ScriptedTransport {
    async fn send(&self, request: UploadRequest, progress: ProgressFn) -> FootageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);

        for step in &self.steps {
            progress(u64::from(*step), 100);
            tokio::task::yield_now().await;
        }

        match &self.result {
            Some(result) => result.clone(),
            None => std::future::pending().await,
        }
    }
}
