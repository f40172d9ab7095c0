//! The shared cache tier, backed by Redis.
//!
//! Blobs are stored under `anchor:<uuid>` keys. The client handle is
//! shared across store instances (see [`ClientRegistry`]); a connection
//! is taken per operation, every call a blocking round-trip.
//!
//! [`ClientRegistry`]: crate::ClientRegistry

use std::sync::Arc;

use redis::Commands;
use tracing::debug;

use strata_codec::{cache_key, decode, encode};
use strata_types::{Anchor, AnchorId};

use crate::error::StoreResult;
use crate::traits::{TierKind, TierStore};

/// Redis-backed key-value tier.
pub struct CacheTier {
    client: Arc<redis::Client>,
}

impl CacheTier {
    /// Wrap a shared Redis client.
    pub fn new(client: Arc<redis::Client>) -> Self {
        Self { client }
    }

    fn connection(&self) -> StoreResult<redis::Connection> {
        Ok(self.client.get_connection()?)
    }
}

impl TierStore for CacheTier {
    fn kind(&self) -> TierKind {
        TierKind::Cache
    }

    /// `PING` round-trip. Any failure, including a refused connection,
    /// reports unavailable instead of propagating.
    fn probe(&self) -> bool {
        let ok = match self.client.get_connection() {
            Ok(mut conn) => redis::cmd("PING").query::<String>(&mut conn).is_ok(),
            Err(_) => false,
        };
        debug!(available = ok, "cache tier probed");
        ok
    }

    fn find_by_id(&self, id: AnchorId) -> StoreResult<Option<Anchor>> {
        let mut conn = self.connection()?;
        let blob: Option<Vec<u8>> = conn.get(cache_key(id))?;
        match blob {
            Some(blob) => Ok(Some(decode(&blob)?)),
            None => Ok(None),
        }
    }

    fn set(&self, anchor: &Anchor) -> StoreResult<()> {
        let blob = encode(anchor)?;
        let mut conn = self.connection()?;
        conn.set::<_, _, ()>(cache_key(anchor.id), blob)?;
        Ok(())
    }

    fn remove(&self, id: AnchorId) -> StoreResult<()> {
        let mut conn = self.connection()?;
        // DEL of a missing key is a no-op success.
        conn.del::<_, ()>(cache_key(id))?;
        Ok(())
    }

    /// All writes go out as one pipeline round-trip.
    fn commit_batch(&self, anchors: &[Anchor]) -> StoreResult<()> {
        if anchors.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        for anchor in anchors {
            pipe.set(cache_key(anchor.id), encode(anchor)?).ignore();
        }
        let mut conn = self.connection()?;
        pipe.query::<()>(&mut conn)?;
        debug!(count = anchors.len(), "cache tier batch committed");
        Ok(())
    }
}

impl std::fmt::Debug for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheTier").finish_non_exhaustive()
    }
}
