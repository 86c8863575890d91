/**
 * ============================================================================
 * PLAYBACK COORDINATOR MODULE
 * ============================================================================
 *
 * PURPOSE: Owns every live media handle of the feed's near window
 *
 * SLOT LIFECYCLE:
 * acquire: create handle -> apply mute preference -> register exactly one
 *          play listener and one pause listener
 * release: remove both listeners -> pause -> release handle -> drop
 *
 * STATE RULES:
 * - is_playing only ever changes inside play/pause listeners
 * - Each slot starts from its handle's real paused state
 * - toggle_play_pause() asks the handle whether it is paused; the
 *   cached flag is never consulted
 * - A rejected autoplay leaves is_playing false until a real play event
 *
 * Handles are cloned out of the state lock before any call into them:
 * media handles invoke listeners synchronously, and listeners lock the
 * same state.
 *
 * ============================================================================
 */

use crate::feed::arena::{SlotArena, SlotKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, Weak};
use thiserror::Error;
use tokio::sync::watch;

// =============================================================================
// Media Seam
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackEventKind {
    Play,
    Pause,
}

pub type ListenerId = u64;

pub type PlaybackListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    // Informational; the platform wants a user gesture first
    #[error("Autoplay was blocked by the platform")]
    AutoplayBlocked,

    #[error("Media engine error: {0}")]
    Engine(String),
}

#[async_trait]
pub trait MediaHandle: Send + Sync {
    async fn play(&self) -> Result<(), PlaybackError>;

    async fn pause(&self) -> Result<(), PlaybackError>;

    fn is_paused(&self) -> bool;

    fn seek(&self, seconds: f64);

    fn position(&self) -> f64;

    // None until metadata is loaded
    fn duration(&self) -> Option<f64>;

    fn set_muted(&self, muted: bool);

    fn is_muted(&self) -> bool;

    fn add_listener(&self, kind: PlaybackEventKind, listener: PlaybackListener) -> ListenerId;

    fn remove_listener(&self, id: ListenerId) -> bool;

    // Free decoder resources; the handle is unusable afterwards
    fn release(&self);
}

pub trait MediaEngine: Send + Sync {
    fn create(&self, uri: &str) -> Result<Arc<dyn MediaHandle>, PlaybackError>;
}

// =============================================================================
// Types
// =============================================================================

/// A near-window position to mount
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSource {
    pub index: usize,
    pub path: String,
    pub uri: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub active_index: Option<usize>,
    pub is_playing: bool,
    pub is_muted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    // Play requested on a newly activated slot
    Playing,
    AutoplayBlocked,
    // Active slot did not change
    Unchanged,
    // Nothing to activate
    Idle,
}

struct MountedSlot {
    path: String,
    handle: Arc<dyn MediaHandle>,
    listeners: [ListenerId; 2],
    is_playing: bool,
}

struct CoordinatorState {
    arena: SlotArena<MountedSlot>,
    active: Option<usize>,
    // (index, path) that last received a play request
    activated: Option<(usize, String)>,
    muted: bool,
}

type StatusSender = watch::Sender<PlaybackStatus>;

// =============================================================================
// Coordinator
// =============================================================================

pub struct PlaybackCoordinator {
    engine: Arc<dyn MediaEngine>,
    state: Arc<Mutex<CoordinatorState>>,
    status: Arc<StatusSender>,
    sync_guard: tokio::sync::Mutex<()>,
    replay_threshold: f64,
}

impl PlaybackCoordinator {
    pub fn new(engine: Arc<dyn MediaEngine>, start_muted: bool, replay_threshold_secs: f64) -> Self {
        let (status, _) = watch::channel(PlaybackStatus {
            active_index: None,
            is_playing: false,
            is_muted: start_muted,
        });

        Self {
            engine,
            state: Arc::new(Mutex::new(CoordinatorState {
                arena: SlotArena::new(),
                active: None,
                activated: None,
                muted: start_muted,
            })),
            status: Arc::new(status),
            sync_guard: tokio::sync::Mutex::new(()),
            replay_threshold: replay_threshold_secs,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status.subscribe()
    }

    pub fn mounted_indices(&self) -> Vec<usize> {
        self.state.lock().unwrap().arena.indices()
    }

    pub fn is_slot_playing(&self, index: usize) -> Option<bool> {
        self.state
            .lock()
            .unwrap()
            .arena
            .get(index)
            .map(|slot| slot.is_playing)
    }

    pub fn muted_preference(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    // =========================================================================
    // Window Sync
    // =========================================================================

    /// Mount exactly the near window of `current` and activate it
    ///
    /// Sources outside |index - current| <= 1 are ignored. Slots whose
    /// index left the window, or whose recording changed, are released
    /// first. Non-active slots are paused and rewound. The active slot
    /// is played only when it differs from the last activated one.
    pub async fn sync(&self, current: Option<usize>, sources: Vec<SlotSource>) -> Result<PlayOutcome, PlaybackError> {
        let _guard = self.sync_guard.lock().await;

        let wanted: Vec<SlotSource> = match current {
            Some(current) => sources
                .into_iter()
                .filter(|s| s.index.abs_diff(current) <= 1)
                .collect(),
            None => Vec::new(),
        };

        // Release stale slots
        let released: Vec<(usize, MountedSlot)> = {
            let mut state = self.state.lock().unwrap();
            let stale: Vec<usize> = state
                .arena
                .iter()
                .filter(|(index, slot)| !wanted.iter().any(|s| s.index == *index && s.path == slot.path))
                .map(|(index, _)| index)
                .collect();

            stale
                .into_iter()
                .filter_map(|index| state.arena.release(index).map(|slot| (index, slot)))
                .collect()
        };

        for (index, slot) in released {
            teardown_slot(index, slot).await;
        }

        // Acquire missing slots
        let mut active_error = None;
        for source in &wanted {
            if self.state.lock().unwrap().arena.contains(source.index) {
                continue;
            }

            match self.mount(source) {
                Ok(()) => {}
                Err(e) => {
                    log::error!("Failed to mount slot {} ({}): {}", source.index, source.path, e);
                    if Some(source.index) == current {
                        active_error = Some(e);
                    }
                }
            }
        }

        // Switch the active slot
        let (others, active) = {
            let mut state = self.state.lock().unwrap();
            state.active = current;

            let others: Vec<Arc<dyn MediaHandle>> = state
                .arena
                .iter()
                .filter(|(index, _)| Some(*index) != current)
                .map(|(_, slot)| slot.handle.clone())
                .collect();

            let active = current.and_then(|index| {
                state
                    .arena
                    .get(index)
                    .map(|slot| (index, slot.path.clone(), slot.handle.clone(), slot.is_playing))
            });

            (others, active)
        };

        for handle in others {
            if !handle.is_paused() {
                if let Err(e) = handle.pause().await {
                    log::warn!("Failed to pause inactive slot: {}", e);
                }
            }
            handle.seek(0.0);
        }

        let Some((index, path, handle, is_playing)) = active else {
            self.state.lock().unwrap().activated = None;
            self.publish(current, false, self.muted_preference());
            return match active_error {
                Some(e) => Err(e),
                None => Ok(PlayOutcome::Idle),
            };
        };

        self.publish(Some(index), is_playing, handle.is_muted());

        let changed = {
            let mut state = self.state.lock().unwrap();
            let activation = Some((index, path.clone()));
            if state.activated == activation {
                false
            } else {
                state.activated = activation;
                true
            }
        };

        if !changed {
            return Ok(PlayOutcome::Unchanged);
        }

        // Replay from the start when parked at the end
        if let Some(duration) = handle.duration() {
            if handle.position() >= duration - self.replay_threshold {
                handle.seek(0.0);
            }
        }

        log::debug!("Activating slot {} ({})", index, path);
        match handle.play().await {
            Ok(()) => Ok(PlayOutcome::Playing),
            Err(PlaybackError::AutoplayBlocked) => {
                log::info!("Autoplay blocked for slot {}, waiting for user play", index);
                Ok(PlayOutcome::AutoplayBlocked)
            }
            Err(e) => Err(e),
        }
    }

    fn mount(&self, source: &SlotSource) -> Result<(), PlaybackError> {
        let handle = self.engine.create(&source.uri)?;

        let mut state = self.state.lock().unwrap();
        handle.set_muted(state.muted);

        let key = state.arena.acquire_with(source.index, |key| {
            let on_play = handle.add_listener(
                PlaybackEventKind::Play,
                event_listener(&self.state, &self.status, key, true),
            );
            let on_pause = handle.add_listener(
                PlaybackEventKind::Pause,
                event_listener(&self.state, &self.status, key, false),
            );

            MountedSlot {
                path: source.path.clone(),
                handle: handle.clone(),
                listeners: [on_play, on_pause],
                is_playing: !handle.is_paused(),
            }
        });

        match key {
            Some(_) => {
                log::debug!("Mounted slot {} ({})", source.index, source.path);
                Ok(())
            }
            None => {
                drop(state);
                handle.release();
                Err(PlaybackError::Engine(format!(
                    "No free slot for index {}",
                    source.index
                )))
            }
        }
    }

    // =========================================================================
    // User Actions
    // =========================================================================

    pub async fn toggle_play_pause(&self) -> Result<(), PlaybackError> {
        let Some(handle) = self.active_handle() else {
            return Ok(());
        };

        if handle.is_paused() {
            handle.play().await
        } else {
            handle.pause().await
        }
    }

    /// Flip mute on the active handle; returns the handle's resulting state
    pub fn toggle_mute(&self) -> bool {
        let (active, handles, preference) = {
            let state = self.state.lock().unwrap();
            let active = state
                .active
                .and_then(|index| state.arena.get(index))
                .map(|slot| slot.handle.clone());
            let handles: Vec<Arc<dyn MediaHandle>> =
                state.arena.iter().map(|(_, slot)| slot.handle.clone()).collect();
            (active, handles, state.muted)
        };

        let muted = match &active {
            Some(handle) => {
                handle.set_muted(!handle.is_muted());
                handle.is_muted()
            }
            None => !preference,
        };

        for handle in handles {
            handle.set_muted(muted);
        }

        self.state.lock().unwrap().muted = muted;
        self.status.send_if_modified(|s| {
            if s.is_muted == muted {
                false
            } else {
                s.is_muted = muted;
                true
            }
        });
        muted
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Pause every playing handle; returns how many were paused
    pub async fn on_app_background(&self) -> usize {
        let handles: Vec<Arc<dyn MediaHandle>> = {
            let state = self.state.lock().unwrap();
            state.arena.iter().map(|(_, slot)| slot.handle.clone()).collect()
        };

        let mut paused = 0;
        for handle in handles {
            if handle.is_paused() {
                continue;
            }
            match handle.pause().await {
                Ok(()) => paused += 1,
                Err(e) => log::warn!("Failed to pause on background: {}", e),
            }
        }

        log::info!("App backgrounded, paused {} handles", paused);
        paused
    }

    pub async fn release_all(&self) {
        let _guard = self.sync_guard.lock().await;

        let drained = {
            let mut state = self.state.lock().unwrap();
            state.active = None;
            state.activated = None;
            state.arena.drain()
        };

        for (index, slot) in drained {
            teardown_slot(index, slot).await;
        }

        self.publish(None, false, self.muted_preference());
    }

    fn active_handle(&self) -> Option<Arc<dyn MediaHandle>> {
        let state = self.state.lock().unwrap();
        state
            .active
            .and_then(|index| state.arena.get(index))
            .map(|slot| slot.handle.clone())
    }

    fn publish(&self, active_index: Option<usize>, is_playing: bool, is_muted: bool) {
        let next = PlaybackStatus {
            active_index,
            is_playing,
            is_muted,
        };
        self.status.send_if_modified(|s| {
            if *s == next {
                false
            } else {
                *s = next;
                true
            }
        });
    }
}

// Detach before anything else touches the handle
async fn teardown_slot(index: usize, slot: MountedSlot) {
    for id in slot.listeners {
        slot.handle.remove_listener(id);
    }

    if !slot.handle.is_paused() {
        if let Err(e) = slot.handle.pause().await {
            log::warn!("Failed to pause slot {} on release: {}", index, e);
        }
    }

    slot.handle.release();
    log::debug!("Released slot {} ({})", index, slot.path);
}

fn event_listener(
    state: &Arc<Mutex<CoordinatorState>>,
    status: &Arc<StatusSender>,
    key: SlotKey,
    playing: bool,
) -> PlaybackListener {
    let state: Weak<Mutex<CoordinatorState>> = Arc::downgrade(state);
    let status: Weak<StatusSender> = Arc::downgrade(status);

    Arc::new(move || {
        let (Some(state), Some(status)) = (state.upgrade(), status.upgrade()) else {
            return;
        };

        let mut state = state.lock().unwrap();
        let active = state.active;
        let Some((index, slot)) = state.arena.get_by_key_mut(key) else {
            return;
        };

        slot.is_playing = playing;
        if Some(index) == active {
            status.send_if_modified(|s| {
                if s.is_playing == playing {
                    false
                } else {
                    s.is_playing = playing;
                    true
                }
            });
        }
    })
}
