//! The [`TieredStore`] orchestrator.
//!
//! Composes the working set, the shared cache and durable tiers, and
//! the local fallback store into one get/set/delete/commit surface.
//! Availability of the shared tiers is decided exactly once, at
//! construction; the flags hold for the store's lifetime. A tier that
//! dies mid-session surfaces as an error from the failing operation —
//! there is no re-probing and no retry.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use strata_types::{Anchor, AnchorId};

use crate::cache::CacheTier;
use crate::config::StoreConfig;
use crate::durable::DurableTier;
use crate::error::{StoreError, StoreResult};
use crate::fallback::FallbackStore;
use crate::registry::ClientRegistry;
use crate::traits::TierStore;
use crate::working_set::WorkingSet;

/// Tiered anchor store for one unit of work.
///
/// Single-writer: the working set and garbage set are not internally
/// synchronized, so one instance serves one session. Tier clients are
/// shared across instances through the [`ClientRegistry`].
pub struct TieredStore {
    mem: WorkingSet,
    cache: Option<Arc<dyn TierStore>>,
    durable: Option<Arc<dyn TierStore>>,
    cache_available: bool,
    durable_available: bool,
    fallback_path: PathBuf,
    fallback: Option<FallbackStore>,
    closed: bool,
}

impl TieredStore {
    /// Build a store from resolved configuration, pooling clients in
    /// `registry`.
    ///
    /// A cache client that cannot even be constructed (bad URL) is
    /// treated exactly like a failed probe: the tier is unavailable,
    /// construction still succeeds. The same holds for the durable
    /// client — only an *absent* durable URL fails, and that is
    /// [`StoreConfig::resolve`]'s job.
    pub fn open(config: StoreConfig, registry: &ClientRegistry) -> Self {
        let cache: Option<Arc<dyn TierStore>> = match &config.cache_url {
            Some(url) => match registry.cache_client(url) {
                Ok(client) => Some(Arc::new(CacheTier::new(client))),
                Err(e) => {
                    warn!(error = %e, "cache client unavailable");
                    None
                }
            },
            None => None,
        };
        let durable: Option<Arc<dyn TierStore>> =
            match registry.durable_client(&config.durable_url) {
                Ok(client) => Some(Arc::new(DurableTier::new(
                    client,
                    config.durable_url.clone(),
                    config.database.clone(),
                    config.collection.clone(),
                ))),
                Err(e) => {
                    warn!(error = %e, "durable client unavailable");
                    None
                }
            };
        Self::with_tiers(cache, durable, config.fallback_path)
    }

    /// Build a store over explicit tier handles.
    ///
    /// This is the injection seam: tests pass fakes, `open` passes the
    /// real Redis/MongoDB tiers. Each present tier is probed exactly
    /// once, here.
    pub fn with_tiers(
        cache: Option<Arc<dyn TierStore>>,
        durable: Option<Arc<dyn TierStore>>,
        fallback_path: impl Into<PathBuf>,
    ) -> Self {
        let cache_available = cache.as_deref().is_some_and(|tier| tier.probe());
        let durable_available = durable.as_deref().is_some_and(|tier| tier.probe());
        debug!(cache_available, durable_available, "tier availability decided");
        if !cache_available && !durable_available {
            debug!("no shared tier reachable, local fallback engaged for this session");
        }
        Self {
            mem: WorkingSet::new(),
            cache,
            durable,
            cache_available,
            durable_available,
            fallback_path: fallback_path.into(),
            fallback: None,
            closed: false,
        }
    }

    /// Whether the cache tier answered its construction-time probe.
    pub fn cache_available(&self) -> bool {
        self.cache_available
    }

    /// Whether the durable tier answered its construction-time probe.
    pub fn durable_available(&self) -> bool {
        self.durable_available
    }

    /// Whether this session runs against the local fallback store.
    pub fn uses_fallback(&self) -> bool {
        !self.cache_available && !self.durable_available
    }

    /// The in-process working set.
    pub fn working_set(&self) -> &WorkingSet {
        &self.mem
    }

    /// Read path: working set, then cache, then durable, then local
    /// fallback, stopping at the first hit.
    ///
    /// Any hit below the working set is backfilled into it, so repeat
    /// lookups in the same session stay in-process. A durable hit is
    /// not written back into the cache tier; the entry reaches the
    /// cache at the next commit. Garbage-marked identifiers are never
    /// returned and cause no tier I/O.
    pub fn find_by_id(&mut self, id: AnchorId) -> StoreResult<Option<Anchor>> {
        self.ensure_open()?;
        if self.mem.is_garbage(id) {
            return Ok(None);
        }
        if let Some(anchor) = self.mem.find_by_id(id) {
            return Ok(Some(anchor.clone()));
        }
        if self.cache_available {
            if let Some(tier) = &self.cache {
                if let Some(anchor) = tier.find_by_id(id)? {
                    self.mem.set(anchor.clone());
                    return Ok(Some(anchor));
                }
            }
        }
        if self.durable_available {
            if let Some(tier) = &self.durable {
                if let Some(anchor) = tier.find_by_id(id)? {
                    self.mem.set(anchor.clone());
                    return Ok(Some(anchor));
                }
            }
        }
        if self.uses_fallback() {
            if let Some(anchor) = self.fallback()?.find_by_id(id)? {
                self.mem.set(anchor.clone());
                return Ok(Some(anchor));
            }
        }
        Ok(None)
    }

    /// Write path: the anchor lands in the working set only, visible to
    /// every subsequent `find_by_id` in this session. No tier I/O
    /// happens until commit.
    pub fn set(&mut self, anchor: Anchor) -> StoreResult<()> {
        self.ensure_open()?;
        self.mem.set(anchor);
        Ok(())
    }

    /// Mark an identifier for deletion. The physical purge happens at
    /// commit; until then the identifier is invisible to reads.
    pub fn remove(&mut self, id: AnchorId) -> StoreResult<()> {
        self.ensure_open()?;
        self.mem.remove(id);
        Ok(())
    }

    /// Immediately purge an anchor from the working set and from every
    /// tier in use this session.
    pub fn delete(&mut self, anchor: &Anchor) -> StoreResult<()> {
        self.ensure_open()?;
        self.delete_by_id(anchor.id)
    }

    /// [`delete`](Self::delete) by identifier. Unknown identifiers are
    /// a no-op success on every tier.
    pub fn delete_by_id(&mut self, id: AnchorId) -> StoreResult<()> {
        self.ensure_open()?;
        self.mem.remove(id);
        if self.cache_available {
            if let Some(tier) = &self.cache {
                tier.remove(id)?;
            }
        }
        if self.durable_available {
            if let Some(tier) = &self.durable {
                tier.remove(id)?;
            }
        }
        if self.uses_fallback() {
            self.fallback()?.remove(id)?;
        }
        Ok(())
    }

    /// Commit a single anchor.
    ///
    /// Deletion wins over write: a garbage-marked anchor is purged from
    /// every tier and its mark cleared instead of being written.
    pub fn commit_anchor(&mut self, anchor: &Anchor) -> StoreResult<()> {
        self.ensure_open()?;
        if self.mem.is_garbage(anchor.id) {
            self.delete_by_id(anchor.id)?;
            self.mem.clear_garbage(anchor.id);
            return Ok(());
        }
        if self.cache_available {
            if let Some(tier) = &self.cache {
                tier.set(anchor)?;
            }
        }
        if self.durable_available {
            if let Some(tier) = &self.durable {
                tier.set(anchor)?;
            }
        }
        if self.uses_fallback() {
            self.fallback()?.set(anchor)?;
        }
        Ok(())
    }

    /// Commit everything: purge the garbage set first, then sync the
    /// remaining working set in one batch per available tier.
    ///
    /// Garbage goes first so a stale write for a concurrently-deleted
    /// anchor can never land after its deletion.
    pub fn commit(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        for id in self.mem.garbage_ids() {
            self.delete_by_id(id)?;
            self.mem.clear_garbage(id);
        }
        let anchors: Vec<Anchor> = self.mem.anchors().cloned().collect();
        debug!(count = anchors.len(), "committing working set");
        self.sync(&anchors)
    }

    /// Bulk-write a collection of anchors: one batch call per available
    /// shared tier (both, independently), else one on the fallback.
    /// Zero anchors is a valid, empty sync.
    pub fn sync(&mut self, anchors: &[Anchor]) -> StoreResult<()> {
        self.ensure_open()?;
        if self.cache_available {
            if let Some(tier) = &self.cache {
                tier.commit_batch(anchors)?;
            }
        }
        if self.durable_available {
            if let Some(tier) = &self.durable {
                tier.commit_batch(anchors)?;
            }
        }
        if self.uses_fallback() {
            // An empty sync on a never-touched fallback session must not
            // create the backing file.
            if anchors.is_empty() && self.fallback.is_none() {
                return Ok(());
            }
            self.fallback()?.commit_batch(anchors)?;
        }
        Ok(())
    }

    /// Drain and shut down: full commit, clear the working set, flush
    /// and close the fallback store if it was opened, release tier
    /// handles. A second close is a no-op.
    pub fn close(&mut self) -> StoreResult<()> {
        if self.closed {
            return Ok(());
        }
        self.commit()?;
        self.mem.clear();
        if let Some(fallback) = self.fallback.take() {
            fallback.close()?;
        }
        // Shared clients close once the registry and all stores drop them.
        self.cache = None;
        self.durable = None;
        self.closed = true;
        debug!("tiered store closed");
        Ok(())
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// The fallback store, opened lazily on first need.
    fn fallback(&mut self) -> StoreResult<&FallbackStore> {
        let fallback = match self.fallback.take() {
            Some(open) => open,
            None => FallbackStore::open(&self.fallback_path)?,
        };
        Ok(self.fallback.insert(fallback))
    }
}

impl std::fmt::Debug for TieredStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredStore")
            .field("working_set", &self.mem.len())
            .field("cache_available", &self.cache_available)
            .field("durable_available", &self.durable_available)
            .field("uses_fallback", &self.uses_fallback())
            .field("closed", &self.closed)
            .finish()
    }
}
