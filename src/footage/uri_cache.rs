/**
 * ============================================================================
 * PLAYBACK URI CACHE MODULE
 * ============================================================================
 *
 * PURPOSE: Memoize storage-path -> playable-URI conversions
 *
 * BEHAVIOR:
 * - Populated lazily on first resolve of a path
 * - Entries live exactly as long as the recording they describe:
 *   eviction happens through delete/cleanup, never on lookup
 *
 * ============================================================================
 */

use std::collections::HashMap;
use std::sync::Mutex;

/// Platform conversion from a storage path to something a player can load
pub trait UriResolver: Send + Sync {
    fn convert(&self, path: &str) -> String;
}

/// Resolver producing `file://` URLs
#[derive(Debug, Clone, Default)]
pub struct FileUriResolver;

impl UriResolver for FileUriResolver {
    fn convert(&self, path: &str) -> String {
        if path.starts_with("file://") {
            path.to_string()
        } else {
            format!("file://{}", path)
        }
    }
}

/// Resolver serving files through a local asset server prefix
#[derive(Debug, Clone)]
pub struct PrefixUriResolver {
    prefix: String,
}

impl PrefixUriResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl UriResolver for PrefixUriResolver {
    fn convert(&self, path: &str) -> String {
        format!("{}{}", self.prefix.trim_end_matches('/'), path)
    }
}

#[derive(Default)]
pub struct PlaybackUriCache {
    entries: Mutex<HashMap<String, String>>,
}

impl PlaybackUriCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, path: &str, resolver: &dyn UriResolver) -> String {
        let mut entries = self.entries.lock().unwrap();
        entries
            .entry(path.to_string())
            .or_insert_with(|| resolver.convert(path))
            .clone()
    }

    pub fn evict(&self, path: &str) -> bool {
        self.entries.lock().unwrap().remove(path).is_some()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.lock().unwrap().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
