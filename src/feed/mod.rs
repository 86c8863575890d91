/**
 * ============================================================================
 * FEED MODULE
 * ============================================================================
 * 
 * PURPOSE: Vertical, one-recording-per-screen playback feed
 * 
 * SUBMODULES:
 * - arena: Fixed-capacity slot table for the near window
 * - controller: Ordered/filtered list, debounced scroll, wrap-around navigation
 * - controls: Auto-hiding overlay controls
 * - playback: Media handle ownership and play/pause/mute state
 * - screen: Wiring of repository, feed, playback, controls and notices
 * - timer: Single-owner one-shot timer
 * 
 * ARCHITECTURE:
 * 1. FeedController publishes a FeedView on every index or list change
 * 2. FootageScreen resolves URIs for the near window (current +/- 1)
 * 3. PlaybackCoordinator mounts exactly those slots and plays the current one
 * 4. Play/pause events from each handle drive the displayed state
 * 
 * ============================================================================
 */

pub mod arena;
pub mod controller;
pub mod controls;
pub mod playback;
pub mod screen;
pub mod timer;
