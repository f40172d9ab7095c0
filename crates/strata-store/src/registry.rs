//! Shared tier-client registry.
//!
//! Tier clients (the Redis client, the MongoDB client) are safe to share
//! and are pooled here, keyed by (tier kind, normalized URL). Two store
//! instances constructed against the same URL intentionally share one
//! underlying client. Teardown is explicit via [`ClientRegistry::close_all`]
//! rather than implicit process-lifetime globals.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::StoreResult;

#[derive(Default)]
struct Clients {
    cache: HashMap<String, Arc<redis::Client>>,
    durable: HashMap<String, Arc<mongodb::sync::Client>>,
}

/// Reference-counted registry of shared tier clients.
///
/// Cloning the registry clones the handle, not the pool.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<Mutex<Clients>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or open the cache client for `url`.
    pub fn cache_client(&self, url: &str) -> StoreResult<Arc<redis::Client>> {
        let key = normalize(url);
        let mut clients = self.inner.lock().expect("lock poisoned");
        if let Some(client) = clients.cache.get(&key) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(redis::Client::open(key.as_str())?);
        debug!(url = %key, "cache client opened");
        clients.cache.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Get or open the durable client for `url`.
    pub fn durable_client(&self, url: &str) -> StoreResult<Arc<mongodb::sync::Client>> {
        let key = normalize(url);
        let mut clients = self.inner.lock().expect("lock poisoned");
        if let Some(client) = clients.durable.get(&key) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(mongodb::sync::Client::with_uri_str(&key)?);
        debug!(url = %key, "durable client opened");
        clients.durable.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Drop every pooled client. Connections close once the last store
    /// holding a handle releases it.
    pub fn close_all(&self) {
        let mut clients = self.inner.lock().expect("lock poisoned");
        let count = clients.cache.len() + clients.durable.len();
        clients.cache.clear();
        clients.durable.clear();
        debug!(count, "registry clients released");
    }

    /// Number of pooled clients.
    pub fn len(&self) -> usize {
        let clients = self.inner.lock().expect("lock poisoned");
        clients.cache.len() + clients.durable.len()
    }

    /// Returns `true` if no clients are pooled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("clients", &self.len())
            .finish()
    }
}

/// Normalize a connection URL for use as a pool key.
fn normalize(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Client construction never dials; these run without live servers.

    #[test]
    fn same_url_shares_one_client() {
        let registry = ClientRegistry::new();
        let a = registry.cache_client("redis://localhost:6379").unwrap();
        let b = registry.cache_client("redis://localhost:6379").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn urls_are_normalized() {
        let registry = ClientRegistry::new();
        let a = registry.cache_client("redis://localhost:6379").unwrap();
        let b = registry.cache_client("redis://localhost:6379/").unwrap();
        let c = registry.cache_client("  redis://localhost:6379 ").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn kinds_are_pooled_separately() {
        let registry = ClientRegistry::new();
        registry.cache_client("redis://localhost:6379").unwrap();
        registry
            .durable_client("mongodb://localhost:27017")
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn close_all_empties_the_pool() {
        let registry = ClientRegistry::new();
        registry.cache_client("redis://localhost:6379").unwrap();
        assert!(!registry.is_empty());
        registry.close_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn clones_share_the_pool() {
        let registry = ClientRegistry::new();
        let other = registry.clone();
        registry.cache_client("redis://localhost:6379").unwrap();
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn invalid_url_is_an_error() {
        let registry = ClientRegistry::new();
        assert!(registry.cache_client("not a url").is_err());
        assert!(registry.is_empty());
    }
}
