/**
 * ============================================================================
 * FEED CONTROLLER MODULE
 * ============================================================================
 *
 * PURPOSE: Ordered, searchable, scroll-driven feed of recordings
 *
 * STATE:
 * - ordered recordings: pure function of (all recordings, query)
 * - current index: clamped into range; reset to 0 when it would fall
 *   past the end of a shrunken list
 *
 * SCROLL HANDLING:
 * Scroll offsets are debounced. A burst of events inside the debounce
 * window produces one index recomputation from the last offset, and a
 * view update only when that index differs from the current one.
 *
 * NEAR WINDOW:
 * Index i is near iff |i - current| <= 1. Only near slots may hold
 * live media.
 *
 * ============================================================================
 */

use crate::feed::timer::ScopedTimer;
use crate::footage::repository::filter_recordings;
use crate::recording::types::Recording;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Observable summary of the feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedView {
    // None while the feed is empty
    pub current_index: Option<usize>,
    pub len: usize,
    // Bumped whenever the ordered list is recomputed
    pub revision: u64,
}

#[derive(Debug, Default)]
struct FeedState {
    all: Vec<Recording>,
    ordered: Vec<Recording>,
    query: String,
    current_index: usize,
    revision: u64,
    scroll_recomputations: u64,
}

impl FeedState {
    fn recompute(&mut self) {
        self.ordered = filter_recordings(&self.all, &self.query);
        if self.current_index >= self.ordered.len() {
            self.current_index = 0;
        }
        self.revision += 1;
    }

    fn current(&self) -> Option<usize> {
        if self.ordered.is_empty() {
            None
        } else {
            Some(self.current_index)
        }
    }

    fn view(&self) -> FeedView {
        FeedView {
            current_index: self.current(),
            len: self.ordered.len(),
            revision: self.revision,
        }
    }
}

fn publish(state: &FeedState, view: &watch::Sender<FeedView>) {
    let next = state.view();
    view.send_if_modified(|v| {
        if *v == next {
            false
        } else {
            *v = next;
            true
        }
    });
}

/// round(offset / slot_height) clamped to [0, len - 1]; None when len is 0
pub fn map_scroll_position_to_index(scroll_offset: f64, slot_height: f64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }

    let raw = scroll_offset / slot_height;
    if !raw.is_finite() || raw <= 0.0 {
        return Some(0);
    }

    Some((raw.round() as usize).min(len - 1))
}

pub struct FeedController {
    state: Arc<Mutex<FeedState>>,
    view: Arc<watch::Sender<FeedView>>,
    scroll_timer: ScopedTimer,
    debounce: Duration,
}

impl FeedController {
    pub fn new(debounce: Duration) -> Self {
        let (view, _) = watch::channel(FeedView::default());
        Self {
            state: Arc::new(Mutex::new(FeedState::default())),
            view: Arc::new(view),
            scroll_timer: ScopedTimer::new(),
            debounce,
        }
    }

    // =========================================================================
    // Source Data
    // =========================================================================

    pub fn set_recordings(&self, recordings: Vec<Recording>) {
        let mut state = self.state.lock().unwrap();
        state.all = recordings;
        state.recompute();
        log::debug!(
            "Feed holds {} of {} recordings",
            state.ordered.len(),
            state.all.len()
        );
        publish(&state, &self.view);
    }

    pub fn set_query(&self, query: &str) {
        let mut state = self.state.lock().unwrap();
        if state.query == query {
            return;
        }
        state.query = query.to_string();
        state.recompute();
        publish(&state, &self.view);
    }

    // Drop one recording without waiting for a reload
    pub fn remove(&self, path: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let before = state.all.len();
        state.all.retain(|r| r.path != path);
        if state.all.len() == before {
            return false;
        }
        state.recompute();
        publish(&state, &self.view);
        true
    }

    pub fn query(&self) -> String {
        self.state.lock().unwrap().query.clone()
    }

    pub fn recordings(&self) -> Vec<Recording> {
        self.state.lock().unwrap().ordered.clone()
    }

    pub fn recording_at(&self, index: usize) -> Option<Recording> {
        self.state.lock().unwrap().ordered.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Position
    // =========================================================================

    pub fn current_index(&self) -> Option<usize> {
        self.state.lock().unwrap().current()
    }

    pub fn current(&self) -> Option<Recording> {
        let state = self.state.lock().unwrap();
        state.current().and_then(|i| state.ordered.get(i).cloned())
    }

    pub fn map_scroll_position_to_index(&self, scroll_offset: f64, slot_height: f64) -> Option<usize> {
        map_scroll_position_to_index(scroll_offset, slot_height, self.len())
    }

    pub fn on_scroll(&self, scroll_offset: f64, slot_height: f64) {
        let state = self.state.clone();
        let view = self.view.clone();

        self.scroll_timer.schedule(self.debounce, move || {
            let mut state = state.lock().unwrap();
            state.scroll_recomputations += 1;

            let len = state.ordered.len();
            if let Some(index) = map_scroll_position_to_index(scroll_offset, slot_height, len) {
                if index != state.current_index {
                    log::debug!("Scroll moved feed to index {}", index);
                    state.current_index = index;
                    publish(&state, &view);
                }
            }
        });
    }

    pub fn set_index(&self, index: usize) -> Option<usize> {
        let mut state = self.state.lock().unwrap();
        let len = state.ordered.len();
        if len == 0 {
            return None;
        }
        state.current_index = index.min(len - 1);
        publish(&state, &self.view);
        state.current()
    }

    pub fn next(&self) -> Option<usize> {
        let mut state = self.state.lock().unwrap();
        let len = state.ordered.len();
        if len == 0 {
            return None;
        }
        state.current_index = (state.current_index + 1) % len;
        publish(&state, &self.view);
        state.current()
    }

    pub fn previous(&self) -> Option<usize> {
        let mut state = self.state.lock().unwrap();
        let len = state.ordered.len();
        if len == 0 {
            return None;
        }
        state.current_index = if state.current_index == 0 {
            len - 1
        } else {
            state.current_index - 1
        };
        publish(&state, &self.view);
        state.current()
    }

    // =========================================================================
    // Near Window
    // =========================================================================

    pub fn near_indices(&self) -> Vec<usize> {
        let state = self.state.lock().unwrap();
        match state.current() {
            Some(current) => {
                let last = state.ordered.len() - 1;
                (current.saturating_sub(1)..=(current + 1).min(last)).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn is_near(&self, index: usize) -> bool {
        match self.current_index() {
            Some(current) => index.abs_diff(current) <= 1 && index < self.len(),
            None => false,
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn view(&self) -> FeedView {
        *self.view.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedView> {
        self.view.subscribe()
    }

    pub fn scroll_recomputations(&self) -> u64 {
        self.state.lock().unwrap().scroll_recomputations
    }

    pub fn cancel_pending_scroll(&self) -> bool {
        self.scroll_timer.cancel()
    }
}
