//! The local fallback tier: a single-process, file-backed blob table.
//!
//! Engaged only when neither shared tier is reachable for the session.
//! The whole table is bincode-serialized and rewritten atomically
//! (temp file + rename) on every mutation, so a crash never leaves a
//! half-written table behind.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use strata_codec::{cache_key, decode, encode};
use strata_types::{Anchor, AnchorId};

use crate::error::{StoreError, StoreResult};
use crate::traits::{TierKind, TierStore};

/// File-backed key-to-blob table.
pub struct FallbackStore {
    path: PathBuf,
    table: RwLock<HashMap<String, Vec<u8>>>,
}

impl FallbackStore {
    /// Open the table at `path`, creating an empty one if the file does
    /// not exist yet.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let table = if path.exists() {
            let bytes = fs::read(&path)?;
            if bytes.is_empty() {
                HashMap::new()
            } else {
                bincode::deserialize(&bytes)
                    .map_err(|e| StoreError::Fallback(format!("unreadable table: {e}")))?
            }
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), entries = table.len(), "fallback store opened");
        Ok(Self {
            path,
            table: RwLock::new(table),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.table.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the table holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.table.read().expect("lock poisoned").is_empty()
    }

    /// Flush the table to disk and release the store. Safe to call more
    /// than once; a second close is just another flush.
    pub fn close(&self) -> StoreResult<()> {
        let table = self.table.read().expect("lock poisoned");
        self.flush(&table)
    }

    fn flush(&self, table: &HashMap<String, Vec<u8>>) -> StoreResult<()> {
        let bytes = bincode::serialize(table)
            .map_err(|e| StoreError::Fallback(format!("unwritable table: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TierStore for FallbackStore {
    fn kind(&self) -> TierKind {
        TierKind::Local
    }

    /// The local file is always reachable once opened.
    fn probe(&self) -> bool {
        true
    }

    fn find_by_id(&self, id: AnchorId) -> StoreResult<Option<Anchor>> {
        let table = self.table.read().expect("lock poisoned");
        match table.get(&cache_key(id)) {
            Some(blob) => Ok(Some(decode(blob)?)),
            None => Ok(None),
        }
    }

    fn set(&self, anchor: &Anchor) -> StoreResult<()> {
        let blob = encode(anchor)?;
        let mut table = self.table.write().expect("lock poisoned");
        table.insert(cache_key(anchor.id), blob);
        self.flush(&table)
    }

    fn remove(&self, id: AnchorId) -> StoreResult<()> {
        let mut table = self.table.write().expect("lock poisoned");
        if table.remove(&cache_key(id)).is_some() {
            return self.flush(&table);
        }
        // Unknown id: no-op success, nothing to rewrite.
        Ok(())
    }

    /// Inserts the whole batch under one table rewrite.
    fn commit_batch(&self, anchors: &[Anchor]) -> StoreResult<()> {
        if anchors.is_empty() {
            return Ok(());
        }
        let mut table = self.table.write().expect("lock poisoned");
        for anchor in anchors {
            table.insert(cache_key(anchor.id), encode(anchor)?);
        }
        self.flush(&table)
    }
}

impl std::fmt::Debug for FallbackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackStore")
            .field("path", &self.path)
            .field("entries", &self.len())
            .finish()
    }
}
