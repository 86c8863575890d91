/**
 * ============================================================================
 * FOOTAGE UPLOAD MODULE
 * ============================================================================
 *
 * PURPOSE: Cancellable, progress-reporting upload of a single recording
 *
 * TASK LIFECYCLE:
 * Pending -> Running -> Succeeded | Failed
 * - Progress (0-100) only moves forward while Running
 * - Failed keeps the last reached progress; retries start a new task
 * - Observers are detached explicitly; a detached observer never
 *   receives another callback, even from a concurrent update
 *
 * TRANSPORT:
 * POST <endpoint> as multipart/form-data
 *   file:     recording binary (video/mp4), streamed in chunks
 *   filename: recording file name
 * Any non-2xx response is an UploadFailed.
 *
 * ============================================================================
 */

use crate::config::FootageConfig;
use crate::error::{FootageError, FootageResult};
use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Succeeded | UploadStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSnapshot {
    pub progress: u8,
    pub status: UploadStatus,
    pub error: Option<String>,
}

impl Default for UploadSnapshot {
    fn default() -> Self {
        Self {
            progress: 0,
            status: UploadStatus::Pending,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub file_name: String,
    pub endpoint: String,
}

/// Transport progress callback: (bytes_sent, total_bytes)
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

pub type ObserverId = u64;

type Observer = Box<dyn Fn(&UploadSnapshot) + Send + Sync>;

#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn send(&self, request: UploadRequest, progress: ProgressFn) -> FootageResult<()>;
}

// =============================================================================
// Upload Task
// =============================================================================

#[derive(Clone)]
pub struct UploadTask {
    inner: Arc<TaskInner>,
}

struct TaskInner {
    id: Uuid,
    target_path: String,
    state: watch::Sender<UploadSnapshot>,
    observers: Mutex<HashMap<ObserverId, Observer>>,
    next_observer: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for UploadTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadTask")
            .field("id", &self.inner.id)
            .field("target_path", &self.inner.target_path)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl UploadTask {
    pub fn new(target_path: impl Into<String>) -> Self {
        let (state, _) = watch::channel(UploadSnapshot::default());
        Self {
            inner: Arc::new(TaskInner {
                id: Uuid::new_v4(),
                target_path: target_path.into(),
                state,
                observers: Mutex::new(HashMap::new()),
                next_observer: AtomicU64::new(1),
                worker: Mutex::new(None),
            }),
        }
    }

    // Create a task and run it on the current runtime
    pub fn spawn(transport: Arc<dyn UploadTransport>, request: UploadRequest) -> Self {
        let task = Self::new(request.path.to_string_lossy().to_string());
        task.start(transport, request);
        task
    }

    pub fn start(&self, transport: Arc<dyn UploadTransport>, request: UploadRequest) {
        let task = self.clone();
        let handle = tokio::spawn(async move {
            task.run(transport, request).await;
        });
        *self.inner.worker.lock().unwrap() = Some(handle);
    }

    async fn run(&self, transport: Arc<dyn UploadTransport>, request: UploadRequest) {
        log::info!("Uploading {} to {}", request.file_name, request.endpoint);
        self.mark_running();

        let reporter = self.clone();
        let progress: ProgressFn = Arc::new(move |sent, total| reporter.report_progress(sent, total));

        match transport.send(request, progress).await {
            Ok(()) => {
                log::info!("Upload succeeded for {}", self.inner.target_path);
                self.finish(Ok(()));
            }
            Err(e) => {
                log::error!("Upload failed for {}: {}", self.inner.target_path, e);
                self.finish(Err(e));
            }
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn target_path(&self) -> &str {
        &self.inner.target_path
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> UploadStatus {
        self.inner.state.borrow().status
    }

    pub fn progress(&self) -> u8 {
        self.inner.state.borrow().progress
    }

    pub fn is_active(&self) -> bool {
        !self.status().is_terminal()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadSnapshot> {
        self.inner.state.subscribe()
    }

    // Resolve once the task reaches Succeeded or Failed
    pub async fn wait(&self) -> UploadSnapshot {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| s.status.is_terminal()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Observers run with the observer table locked and must not call
    /// back into observe/detach on the same task.
    pub fn observe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&UploadSnapshot) + Send + Sync + 'static,
    {
        let id = self.inner.next_observer.fetch_add(1, Ordering::SeqCst);
        self.inner
            .observers
            .lock()
            .unwrap()
            .insert(id, Box::new(observer));
        id
    }

    pub fn detach(&self, id: ObserverId) -> bool {
        self.inner.observers.lock().unwrap().remove(&id).is_some()
    }

    // Owning view torn down
    pub fn detach_all(&self) {
        self.inner.observers.lock().unwrap().clear();
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().unwrap().len()
    }

    pub fn cancel(&self) {
        if let Some(handle) = self.inner.worker.lock().unwrap().take() {
            handle.abort();
        }

        if self.is_active() {
            log::info!("Upload cancelled for {}", self.inner.target_path);
            self.finish(Err(FootageError::UploadFailed("Upload cancelled".to_string())));
        }
    }

    fn mark_running(&self) {
        self.update(|s| {
            if s.status == UploadStatus::Pending {
                s.status = UploadStatus::Running;
                true
            } else {
                false
            }
        });
    }

    pub(crate) fn report_progress(&self, sent: u64, total: u64) {
        let percent = if total == 0 {
            100
        } else {
            (sent.saturating_mul(100) / total).min(100) as u8
        };

        self.update(|s| {
            if s.status == UploadStatus::Running && percent > s.progress {
                s.progress = percent;
                true
            } else {
                false
            }
        });
    }

    fn finish(&self, result: FootageResult<()>) {
        self.update(|s| {
            if s.status.is_terminal() {
                return false;
            }
            match &result {
                Ok(()) => {
                    s.status = UploadStatus::Succeeded;
                    s.progress = 100;
                }
                Err(e) => {
                    s.status = UploadStatus::Failed;
                    s.error = Some(e.to_string());
                }
            }
            true
        });
    }

    fn update<F>(&self, modify: F)
    where
        F: FnOnce(&mut UploadSnapshot) -> bool,
    {
        if !self.inner.state.send_if_modified(modify) {
            return;
        }

        // Held across the calls so a detach() that has returned is final
        let snapshot = self.snapshot();
        let observers = self.inner.observers.lock().unwrap();
        for observer in observers.values() {
            observer(&snapshot);
        }
    }
}

// =============================================================================
// HTTP Transport
// =============================================================================

pub struct HttpUploadTransport {
    client: Client,
    chunk_bytes: usize,
}

impl HttpUploadTransport {
    pub fn new(timeout: Duration, chunk_bytes: usize) -> FootageResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FootageError::UploadFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            chunk_bytes: chunk_bytes.max(1),
        })
    }

    pub fn from_config(config: &FootageConfig) -> FootageResult<Self> {
        Self::new(config.upload_timeout(), config.upload_chunk_bytes)
    }
}

// Read state threaded through the body stream
struct BodyState {
    file: tokio::fs::File,
    sent: u64,
    done: bool,
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn send(&self, request: UploadRequest, progress: ProgressFn) -> FootageResult<()> {
        let file = tokio::fs::File::open(&request.path).await?;
        let total = file.metadata().await?.len();
        progress(0, total);

        let chunk_bytes = self.chunk_bytes;
        let reporter = progress.clone();
        let body_stream = futures_util::stream::unfold(
            BodyState { file, sent: 0, done: false },
            move |mut state| {
                let reporter = reporter.clone();
                async move {
                    if state.done {
                        return None;
                    }

                    let mut buf = vec![0u8; chunk_bytes];
                    match state.file.read(&mut buf).await {
                        Ok(0) => None,
                        Ok(n) => {
                            buf.truncate(n);
                            state.sent += n as u64;
                            reporter(state.sent, total);
                            Some((Ok::<Vec<u8>, std::io::Error>(buf), state))
                        }
                        Err(e) => {
                            state.done = true;
                            Some((Err(e), state))
                        }
                    }
                }
            },
        );

        let part = multipart::Part::stream_with_length(reqwest::Body::wrap_stream(body_stream), total)
            .file_name(request.file_name.clone())
            .mime_str("video/mp4")
            .map_err(|e| FootageError::UploadFailed(format!("Invalid upload part: {}", e)))?;

        let form = multipart::Form::new()
            .text("filename", request.file_name.clone())
            .part("file", part);

        let response = self
            .client
            .post(&request.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| FootageError::UploadFailed(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        log::info!("Upload response status for {}: {}", request.file_name, status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FootageError::UploadFailed(format!(
                "Upload endpoint returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(())
    }
}
