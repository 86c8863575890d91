/**
 * ============================================================================
 * CONTROLS VISIBILITY MODULE
 * ============================================================================
 *
 * PURPOSE: Auto-hiding overlay controls for the footage feed
 *
 * show() makes the controls visible and restarts the hide countdown.
 * Every interaction calls show() again; the previous countdown is
 * cancelled first, so an older countdown can never hide the controls
 * after a newer interaction.
 *
 * ============================================================================
 */

use crate::feed::timer::ScopedTimer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct ControlsVisibilityTimer {
    visible: Arc<watch::Sender<bool>>,
    timer: ScopedTimer,
    hide_delay: Duration,
}

impl ControlsVisibilityTimer {
    pub fn new(hide_delay: Duration) -> Self {
        let (visible, _) = watch::channel(false);
        Self {
            visible: Arc::new(visible),
            timer: ScopedTimer::new(),
            hide_delay,
        }
    }

    pub fn show(&self) {
        self.visible.send_replace(true);

        let visible = self.visible.clone();
        self.timer.schedule(self.hide_delay, move || {
            visible.send_replace(false);
        });
    }

    pub fn hide(&self) {
        self.timer.cancel();
        self.visible.send_replace(false);
    }

    // Stop the countdown, leaving visibility as is
    pub fn cancel(&self) {
        self.timer.cancel();
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    pub fn is_counting_down(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_hides_after_delay() {
        let controls = ControlsVisibilityTimer::new(Duration::from_secs(3));
        assert!(!controls.is_visible());

        controls.show();
        assert!(controls.is_visible());

        sleep(Duration::from_millis(2900)).await;
        assert!(controls.is_visible());

        sleep(Duration::from_millis(200)).await;
        assert!(!controls.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interaction_restarts_countdown() {
        let controls = ControlsVisibilityTimer::new(Duration::from_secs(3));

        controls.show();
        sleep(Duration::from_secs(2)).await;
        controls.show();

        // First countdown would have fired at 3s
        sleep(Duration::from_millis(1500)).await;
        assert!(controls.is_visible());

        sleep(Duration::from_millis(1600)).await;
        assert!(!controls.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hide_cancels_countdown() {
        let controls = ControlsVisibilityTimer::new(Duration::from_secs(3));
        controls.show();
        controls.hide();

        assert!(!controls.is_visible());
        assert!(!controls.is_counting_down());

        let mut rx = controls.subscribe();
        controls.show();
        assert!(*rx.borrow_and_update());
    }
}
