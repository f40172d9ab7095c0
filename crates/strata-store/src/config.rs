//! Store configuration, resolved once at orchestrator construction.

use std::env;
use std::path::PathBuf;

use crate::error::{StoreError, StoreResult};

/// Environment fallback for the cache tier URL.
pub const CACHE_URL_ENV: &str = "STRATA_CACHE_URL";
/// Environment fallback for the durable tier URL.
pub const DURABLE_URL_ENV: &str = "STRATA_DURABLE_URL";
/// Environment fallback for the local fallback table path.
pub const FALLBACK_PATH_ENV: &str = "STRATA_FALLBACK_PATH";

/// Connection targets and namespaces for a [`TieredStore`].
///
/// A missing cache URL is legal and simply means the cache tier is
/// unavailable for the session. A missing durable URL is a
/// configuration error: the store cannot be constructed without it.
///
/// [`TieredStore`]: crate::TieredStore
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Cache tier URL (e.g. `redis://host:6379`), if configured.
    pub cache_url: Option<String>,
    /// Durable tier URL (e.g. `mongodb://host:27017`). Required.
    pub durable_url: String,
    /// Durable tier database name.
    pub database: String,
    /// Durable tier collection name.
    pub collection: String,
    /// Path of the local fallback table.
    pub fallback_path: PathBuf,
}

impl StoreConfig {
    /// Resolve a configuration from explicit parameters with
    /// environment fallback.
    ///
    /// Resolution order per URL: explicit parameter, else environment,
    /// else — for the durable tier only — a configuration error.
    pub fn resolve(
        cache_url: Option<String>,
        durable_url: Option<String>,
    ) -> StoreResult<Self> {
        let cache_url = cache_url.or_else(|| env::var(CACHE_URL_ENV).ok());
        let durable_url = durable_url
            .or_else(|| env::var(DURABLE_URL_ENV).ok())
            .ok_or_else(|| {
                StoreError::Config(format!(
                    "durable tier URL is required: pass it explicitly or set {DURABLE_URL_ENV}"
                ))
            })?;
        let fallback_path = env::var(FALLBACK_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("strata-anchors.db"));
        Ok(Self {
            cache_url,
            durable_url,
            database: "strata".to_string(),
            collection: "anchors".to_string(),
            fallback_path,
        })
    }

    /// Override the durable database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Override the durable collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Override the fallback table path.
    pub fn with_fallback_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback_path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_urls_win() {
        let config = StoreConfig::resolve(
            Some("redis://explicit:6379".into()),
            Some("mongodb://explicit:27017".into()),
        )
        .unwrap();
        assert_eq!(config.cache_url.as_deref(), Some("redis://explicit:6379"));
        assert_eq!(config.durable_url, "mongodb://explicit:27017");
        assert_eq!(config.database, "strata");
        assert_eq!(config.collection, "anchors");
    }

    #[test]
    fn missing_cache_url_is_legal() {
        let config =
            StoreConfig::resolve(None, Some("mongodb://localhost:27017".into())).unwrap();
        if env::var(CACHE_URL_ENV).is_err() {
            assert!(config.cache_url.is_none());
        }
        assert_eq!(config.durable_url, "mongodb://localhost:27017");
    }

    #[test]
    fn missing_durable_url_fails_construction() {
        if env::var(DURABLE_URL_ENV).is_ok() {
            // Environment provides it; nothing to assert here.
            return;
        }
        let err = StoreConfig::resolve(None, None).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn builders_override_namespaces() {
        let config = StoreConfig::resolve(None, Some("mongodb://h:27017".into()))
            .unwrap()
            .with_database("graphs")
            .with_collection("nodes")
            .with_fallback_path("/tmp/strata-test.db");
        assert_eq!(config.database, "graphs");
        assert_eq!(config.collection, "nodes");
        assert_eq!(config.fallback_path, PathBuf::from("/tmp/strata-test.db"));
    }
}
