/**
 * ============================================================================
 * RECORDING MODULE
 * ============================================================================
 * 
 * PURPOSE: Capture of match footage through the device screen recorder
 * 
 * SUBMODULES:
 * - native: Traits for the device recorder, notification permission and store
 * - session: Capture lifecycle state machine with a single-session guard
 * - storage: Directory-backed recording store with a metadata sidecar
 * - types: Data structures and display formatting
 * 
 * ARCHITECTURE:
 * 1. RecordingSession checks overlay permission, then notification permission
 * 2. Only then is the native recorder asked to start
 * 3. The recorder writes one MP4 per session into the store's directory
 * 4. The store enumerates, exports and prunes finished captures
 * 
 * OUTPUT FORMAT:
 * - recording_YYYYMMDD_HHMMSS.mp4 or match_<id>_<millis>.mp4
 * - recordings_metadata.json: [{path, created, duration}] sidecar
 * 
 * ============================================================================
 */

pub mod native;
pub mod session;
pub mod storage;
pub mod types;
