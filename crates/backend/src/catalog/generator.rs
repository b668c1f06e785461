//! Feed generation: external builder subprocess + cache refresh.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{CatalogCache, FeedError, feed};
use crate::config::FeedConfig;

/// Capability to (re)build the feed file.
///
/// The production implementation launches an external script; tests swap in
/// fakes that write fixture files or fail on demand.
#[async_trait]
pub trait FeedBuilder: Send + Sync {
    /// Produce a fresh feed file at the configured output path.
    async fn build(&self) -> Result<(), FeedError>;
}

/// Runs the external generator script as a subprocess.
///
/// Stdout and stderr are captured for logging only; the feed itself is read
/// from the file the script writes.
pub struct ScriptFeedBuilder {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ScriptFeedBuilder {
    /// Create a builder from a whitespace-separated command line.
    #[must_use]
    pub fn new(command_line: &str, timeout: Duration) -> Self {
        let mut parts = command_line.split_whitespace().map(String::from);
        Self {
            program: parts.next().unwrap_or_default(),
            args: parts.collect(),
            timeout,
        }
    }
}

#[async_trait]
impl FeedBuilder for ScriptFeedBuilder {
    async fn build(&self) -> Result<(), FeedError> {
        tracing::info!(program = %self.program, "running feed generator");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&self.args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| FeedError::GeneratorTimeout(self.timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::info!(output = %stdout.trim(), "feed generator stdout");
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::warn!(output = %stderr.trim(), "feed generator stderr");
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(FeedError::GeneratorFailed {
                code: output.status.code(),
                stderr: stderr.into_owned(),
            })
        }
    }
}

/// Rebuilds the feed and publishes the parsed result to the cache.
pub struct CatalogRefresher {
    builder: Arc<dyn FeedBuilder>,
    feed_path: PathBuf,
    cache: CatalogCache,
}

impl CatalogRefresher {
    /// Create a refresher with an explicit builder (tests use fakes).
    #[must_use]
    pub fn new(builder: Arc<dyn FeedBuilder>, feed_path: PathBuf, cache: CatalogCache) -> Self {
        Self {
            builder,
            feed_path,
            cache,
        }
    }

    /// Create a refresher running the configured generator command.
    #[must_use]
    pub fn from_config(config: &FeedConfig, cache: CatalogCache) -> Self {
        let builder = ScriptFeedBuilder::new(&config.generator_command, config.generator_timeout);
        Self::new(Arc::new(builder), config.output_path.clone(), cache)
    }

    /// Run the generator, parse the feed it wrote, and swap the snapshot in.
    ///
    /// On any failure the previously published snapshot stays untouched.
    ///
    /// # Errors
    ///
    /// Returns the underlying `FeedError`; callers decide whether it is
    /// fatal (startup) or merely logged (scheduled refresh).
    pub async fn regenerate(&self) -> Result<(), FeedError> {
        self.builder.build().await?;

        let xml = tokio::fs::read_to_string(&self.feed_path).await?;
        let catalog = feed::parse_catalog(&xml)?;

        tracing::info!(
            categories = catalog.categories.len(),
            offers = catalog.offers.len(),
            "catalog cache updated"
        );
        self.cache.replace(catalog);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::Path;

    const FEED: &str = "<yml_catalog><shop>\
        <categories><category id='1'>Software</category></categories>\
        <offers><offer id='101'><price>4800</price></offer></offers>\
    </shop></yml_catalog>";

    /// Writes fixed feed content, or fails without touching the file.
    struct FixtureBuilder {
        path: PathBuf,
        content: Option<&'static str>,
    }

    #[async_trait]
    impl FeedBuilder for FixtureBuilder {
        async fn build(&self) -> Result<(), FeedError> {
            match self.content {
                Some(content) => {
                    tokio::fs::write(&self.path, content).await?;
                    Ok(())
                }
                None => Err(FeedError::GeneratorFailed {
                    code: Some(1),
                    stderr: "boom".to_string(),
                }),
            }
        }
    }

    fn refresher(dir: &Path, content: Option<&'static str>, cache: CatalogCache) -> CatalogRefresher {
        let path = dir.join("price_feed.yml");
        CatalogRefresher::new(
            Arc::new(FixtureBuilder {
                path: path.clone(),
                content,
            }),
            path,
            cache,
        )
    }

    #[tokio::test]
    async fn test_successful_run_publishes_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CatalogCache::new();

        refresher(dir.path(), Some(FEED), cache.clone())
            .regenerate()
            .await
            .unwrap();

        let snapshot = cache.get().unwrap();
        assert_eq!(snapshot.categories.len(), 1);
        assert_eq!(snapshot.offers.len(), 1);
    }

    #[tokio::test]
    async fn test_identical_input_yields_identical_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CatalogCache::new();
        let refresher = refresher(dir.path(), Some(FEED), cache.clone());

        refresher.regenerate().await.unwrap();
        let first = cache.get().unwrap();
        refresher.regenerate().await.unwrap();
        let second = cache.get().unwrap();

        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn test_failed_generator_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CatalogCache::new();

        refresher(dir.path(), Some(FEED), cache.clone())
            .regenerate()
            .await
            .unwrap();

        let result = refresher(dir.path(), None, cache.clone()).regenerate().await;
        assert!(matches!(
            result,
            Err(FeedError::GeneratorFailed { code: Some(1), .. })
        ));

        // The earlier snapshot is still served.
        assert_eq!(cache.get().unwrap().offers.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_feed_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CatalogCache::new();

        refresher(dir.path(), Some(FEED), cache.clone())
            .regenerate()
            .await
            .unwrap();

        let result = refresher(dir.path(), Some("<not_a_catalog/>"), cache.clone())
            .regenerate()
            .await;
        assert!(matches!(result, Err(FeedError::InvalidFormat(_))));
        assert_eq!(cache.get().unwrap().offers.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_feed_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CatalogCache::new();

        // Builder "succeeds" without writing anything.
        struct NoopBuilder;
        #[async_trait]
        impl FeedBuilder for NoopBuilder {
            async fn build(&self) -> Result<(), FeedError> {
                Ok(())
            }
        }

        let refresher = CatalogRefresher::new(
            Arc::new(NoopBuilder),
            dir.path().join("price_feed.yml"),
            cache.clone(),
        );
        let result = refresher.regenerate().await;
        assert!(matches!(result, Err(FeedError::Io(_))));
        assert!(!cache.is_ready());
    }
}
