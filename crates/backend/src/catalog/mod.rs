//! Catalog cache fed by an externally generated product feed.
//!
//! The app holds exactly one parsed catalog in memory. A regeneration run
//! (at startup and monthly thereafter) invokes the external generator,
//! parses the feed file it wrote, and swaps the whole snapshot in
//! atomically. Readers take a cheap `Arc` snapshot; a failed run never
//! touches the previous snapshot.

mod feed;
mod generator;
pub mod schedule;

use std::sync::{Arc, RwLock};

use larkspur_core::Catalog;
use thiserror::Error;

pub use feed::parse_catalog;
pub use generator::{CatalogRefresher, FeedBuilder, ScriptFeedBuilder};

/// Errors that can occur while regenerating the catalog.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The generator subprocess exited with a nonzero status.
    #[error("feed generator failed with exit code {code:?}: {stderr}")]
    GeneratorFailed {
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard error output.
        stderr: String,
    },

    /// The generator subprocess exceeded its timeout.
    #[error("feed generator timed out after {0:?}")]
    GeneratorTimeout(std::time::Duration),

    /// Reading the feed file or spawning the generator failed.
    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The feed parsed but the expected top-level structure is missing,
    /// or the document is not well-formed.
    #[error("invalid feed format: {0}")]
    InvalidFormat(String),
}

/// The process-wide catalog cache.
///
/// A single-slot container: empty until the first successful regeneration,
/// then replaced wholesale by each subsequent one. Concurrent readers
/// always observe a complete snapshot (old or new, never mixed).
#[derive(Clone)]
pub struct CatalogCache {
    inner: Arc<RwLock<Option<Arc<Catalog>>>>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Take a snapshot of the current catalog, if one has been published.
    #[must_use]
    pub fn get(&self) -> Option<Arc<Catalog>> {
        self.inner.read().map(|guard| guard.clone()).unwrap_or(None)
    }

    /// Check whether a catalog has been published.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Publish a new snapshot, replacing any previous one.
    pub fn replace(&self, catalog: Catalog) {
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(Arc::new(catalog)),
            Err(_) => tracing::error!("catalog cache lock poisoned; keeping previous snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_until_replaced() {
        let cache = CatalogCache::new();
        assert!(!cache.is_ready());
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_replace_publishes_snapshot() {
        let cache = CatalogCache::new();
        cache.replace(Catalog::new(vec![json!({"id": "1"})], Vec::new()));

        assert!(cache.is_ready());
        let snapshot = cache.get().expect("published");
        assert_eq!(snapshot.categories.len(), 1);
    }

    #[test]
    fn test_replace_swaps_whole_snapshot() {
        let cache = CatalogCache::new();
        cache.replace(Catalog::new(vec![json!({"id": "1"})], Vec::new()));
        let old = cache.get().expect("first snapshot");

        cache.replace(Catalog::new(Vec::new(), vec![json!({"id": "42"})]));
        let new = cache.get().expect("second snapshot");

        // The old snapshot is untouched; readers holding it still see it.
        assert_eq!(old.categories.len(), 1);
        assert!(old.offers.is_empty());
        assert!(new.categories.is_empty());
        assert_eq!(new.offers.len(), 1);
    }
}
