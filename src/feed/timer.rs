/**
 * ============================================================================
 * SCOPED TIMER MODULE
 * ============================================================================
 *
 * PURPOSE: One-shot delayed action with a single owner
 *
 * RULES:
 * - At most one pending action per timer
 * - schedule() cancels the outstanding action before arming a new one
 * - Dropping the timer cancels whatever is pending
 * - Actions run on the Tokio runtime the timer was created on, so a
 *   timer built inside a runtime can be armed from any thread. A timer
 *   created and armed with no runtime at all drops the action.
 *
 * ============================================================================
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub struct ScopedTimer {
    runtime: Option<Handle>,
    pending: Mutex<Option<JoinHandle<()>>>,
    // Bumped on every schedule/cancel; a woken task fires only if still current
    generation: Arc<AtomicU64>,
}

impl Default for ScopedTimer {
    fn default() -> Self {
        Self {
            runtime: Handle::try_current().ok(),
            pending: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl ScopedTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock().unwrap();
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let armed = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            log::warn!("No async runtime available; scheduled action dropped");
            return;
        };

        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) == armed {
                action();
            }
        }));
    }

    // Returns true if an action was still waiting
    pub fn cancel(&self) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);

        match self.pending.lock().unwrap().take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
