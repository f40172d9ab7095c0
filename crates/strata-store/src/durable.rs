//! The shared durable tier, backed by a MongoDB document collection.
//!
//! Documents are keyed by the anchor identifier's canonical string form
//! (`_id`) with the encoded blob under the `data` field. Writes are
//! upserts, so repeated commits of the same anchor converge on one
//! document. Database and collection names are fixed per deployment.

use std::sync::Arc;

use bson::{doc, Document};
use mongodb::options::ReplaceOptions;
use mongodb::sync::{Client, Collection};
use tracing::debug;

use strata_codec::{decode, document, DATA_FIELD};
use strata_types::{Anchor, AnchorId};

use crate::error::{StoreError, StoreResult};
use crate::traits::{TierKind, TierStore};

/// MongoDB-backed document tier.
pub struct DurableTier {
    client: Arc<Client>,
    url: String,
    database: String,
    collection: String,
}

impl DurableTier {
    /// Wrap a shared MongoDB client.
    ///
    /// The URL is retained for the availability probe, which opens its
    /// own throwaway connection rather than touching the shared client.
    pub fn new(
        client: Arc<Client>,
        url: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            database: database.into(),
            collection: collection.into(),
        }
    }

    fn anchors(&self) -> Collection<Document> {
        self.client
            .database(&self.database)
            .collection(&self.collection)
    }

    fn key(id: AnchorId) -> Document {
        doc! { "_id": id.to_string() }
    }
}

impl TierStore for DurableTier {
    fn kind(&self) -> TierKind {
        TierKind::Durable
    }

    /// Administrative `ping` through a throwaway client built from the
    /// URL; the client is dropped after the probe so no connection
    /// leaks. Any failure reports unavailable instead of propagating.
    fn probe(&self) -> bool {
        let ok = match Client::with_uri_str(&self.url) {
            Ok(probe_client) => probe_client
                .database("admin")
                .run_command(doc! { "ping": 1 }, None)
                .is_ok(),
            Err(_) => false,
        };
        debug!(available = ok, "durable tier probed");
        ok
    }

    fn find_by_id(&self, id: AnchorId) -> StoreResult<Option<Anchor>> {
        match self.anchors().find_one(Self::key(id), None)? {
            None => Ok(None),
            Some(found) => {
                let blob = found.get_binary_generic(DATA_FIELD).map_err(|e| {
                    StoreError::CorruptDocument {
                        id,
                        reason: e.to_string(),
                    }
                })?;
                Ok(Some(decode(blob)?))
            }
        }
    }

    fn set(&self, anchor: &Anchor) -> StoreResult<()> {
        let replacement = document(anchor)?;
        let options = ReplaceOptions::builder().upsert(true).build();
        self.anchors()
            .replace_one(Self::key(anchor.id), replacement, options)?;
        Ok(())
    }

    fn remove(&self, id: AnchorId) -> StoreResult<()> {
        // delete_one of a missing document is a no-op success.
        self.anchors().delete_one(Self::key(id), None)?;
        Ok(())
    }

    /// All upserts ride in a single `update` command, one round-trip.
    fn commit_batch(&self, anchors: &[Anchor]) -> StoreResult<()> {
        if anchors.is_empty() {
            return Ok(());
        }
        let mut updates = Vec::with_capacity(anchors.len());
        for anchor in anchors {
            updates.push(doc! {
                "q": Self::key(anchor.id),
                "u": document(anchor)?,
                "upsert": true,
            });
        }
        self.client.database(&self.database).run_command(
            doc! { "update": self.collection.as_str(), "updates": updates },
            None,
        )?;
        debug!(count = anchors.len(), "durable tier batch committed");
        Ok(())
    }
}

impl std::fmt::Debug for DurableTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableTier")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keep server selection short so the unreachable-probe test fails
    // fast instead of waiting out the driver default.
    const UNREACHABLE: &str =
        "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200";

    #[test]
    fn probe_of_unreachable_server_is_false_not_error() {
        let client = Client::with_uri_str(UNREACHABLE).unwrap();
        let tier = DurableTier::new(Arc::new(client), UNREACHABLE, "strata", "anchors");
        assert!(!tier.probe());
        assert_eq!(tier.kind(), TierKind::Durable);
    }
}
