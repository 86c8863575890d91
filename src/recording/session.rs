/**
 * ============================================================================
 * RECORDING SESSION MODULE
 * ============================================================================
 *
 * PURPOSE: Capture lifecycle against the native screen recorder
 *
 * RESPONSIBILITIES:
 * - Overlay permission check/request
 * - Start: overlay permission -> notification permission -> native start
 * - Stop: native stop, always returning to Idle
 * - Guard: at most one native session at a time
 *
 * STATE MACHINE:
 * Idle -> Starting -> Recording -> Stopping -> Idle
 * A failed start falls back to Idle. auto_start while Starting/Recording
 * is a no-op.
 *
 * ============================================================================
 */

use crate::error::{FootageError, FootageResult, Permission};
use crate::recording::native::{NotificationPermissions, ScreenRecorder};
use crate::recording::types::StartOptions;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Starting,
    Recording {
        file_name: String,
        started_at: DateTime<Utc>,
    },
    Stopping,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoStart {
    Started,
    AlreadyRecording,
}

pub struct RecordingSession {
    recorder: Arc<dyn ScreenRecorder>,
    notifications: Arc<dyn NotificationPermissions>,
    state: Mutex<SessionState>,
}

impl RecordingSession {
    pub fn new(
        recorder: Arc<dyn ScreenRecorder>,
        notifications: Arc<dyn NotificationPermissions>,
    ) -> Self {
        Self {
            recorder,
            notifications,
            state: Mutex::new(SessionState::Idle),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().unwrap().clone()
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().unwrap().is_recording()
    }

    // Query only, never prompts
    pub async fn check_permission(&self) -> FootageResult<bool> {
        self.recorder
            .check_overlay_permission()
            .await
            .map_err(|e| FootageError::RecorderFault(format!("Overlay permission check failed: {}", e)))
    }

    // Prompt the user, then re-query the real grant
    pub async fn request_permission(&self) -> FootageResult<bool> {
        self.recorder
            .request_overlay_permission()
            .await
            .map_err(|e| FootageError::RecorderFault(format!("Overlay permission request failed: {}", e)))?;

        self.check_permission().await
    }

    // Start a capture; refused while another session is live
    pub async fn start(&self, options: StartOptions) -> FootageResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            if !state.is_idle() {
                log::warn!("Refusing to start recording, session is {:?}", *state);
                return Err(FootageError::RecorderFault(
                    "A recording session is already active".to_string(),
                ));
            }
            *state = SessionState::Starting;
        }

        log::info!("Starting screen recording: {}", options.file_name);

        match self.start_inner(&options).await {
            Ok(()) => {
                *self.state.lock().unwrap() = SessionState::Recording {
                    file_name: options.file_name.clone(),
                    started_at: Utc::now(),
                };
                log::info!("Screen recording started: {}", options.file_name);
                Ok(())
            }
            Err(e) => {
                *self.state.lock().unwrap() = SessionState::Idle;
                log::error!("Failed to start recording: {}", e);
                Err(e)
            }
        }
    }

    async fn start_inner(&self, options: &StartOptions) -> FootageResult<()> {
        self.ensure_overlay_permission().await?;
        self.ensure_notification_permission().await?;

        self.recorder
            .start_recording(options)
            .await
            .map_err(|e| FootageError::RecorderFault(format!("Failed to start screen recording: {}", e)))
    }

    async fn ensure_overlay_permission(&self) -> FootageResult<()> {
        if self.check_permission().await? {
            return Ok(());
        }

        log::info!("Overlay permission missing, requesting");
        if self.request_permission().await? {
            Ok(())
        } else {
            Err(FootageError::permission_denied(Permission::Overlay))
        }
    }

    async fn ensure_notification_permission(&self) -> FootageResult<()> {
        let granted = self
            .notifications
            .check_display()
            .await
            .map_err(|e| FootageError::RecorderFault(format!("Notification permission check failed: {}", e)))?;
        if granted {
            return Ok(());
        }

        log::info!("Notification permission missing, requesting");
        let granted = self
            .notifications
            .request_display()
            .await
            .map_err(|e| FootageError::RecorderFault(format!("Notification permission request failed: {}", e)))?;

        if granted {
            Ok(())
        } else {
            Err(FootageError::permission_denied(Permission::Notification))
        }
    }

    // Start unless a session is already starting or running
    pub async fn auto_start(&self, options: StartOptions) -> FootageResult<AutoStart> {
        {
            let state = self.state.lock().unwrap();
            if matches!(*state, SessionState::Starting | SessionState::Recording { .. }) {
                log::info!("Auto-start ignored, session is {:?}", *state);
                return Ok(AutoStart::AlreadyRecording);
            }
        }

        self.start(options).await?;
        Ok(AutoStart::Started)
    }

    pub async fn stop(&self) -> FootageResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            if !state.is_recording() {
                return Err(FootageError::RecorderFault(
                    "No active recording session".to_string(),
                ));
            }
            *state = SessionState::Stopping;
        }

        log::info!("Stopping screen recording");
        let result = self.recorder.stop_recording().await;

        // The native service is torn down either way
        *self.state.lock().unwrap() = SessionState::Idle;

        result.map_err(|e| {
            log::error!("Failed to stop recording: {}", e);
            FootageError::RecorderFault(format!("Failed to stop screen recording: {}", e))
        })?;

        log::info!("Screen recording stopped");
        Ok(())
    }
}
