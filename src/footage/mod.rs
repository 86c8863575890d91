/**
 * ============================================================================
 * FOOTAGE MODULE
 * ============================================================================
 * 
 * PURPOSE: Access to stored footage for the feed, sharing and uploads
 * 
 * SUBMODULES:
 * - repository: List/filter/delete/export/upload facade over the store
 * - upload: UploadTask lifecycle and the multipart HTTP transport
 * - uri_cache: Path -> playback URI memoization with explicit eviction
 * 
 * ============================================================================
 */

pub mod repository;
pub mod upload;
pub mod uri_cache;
