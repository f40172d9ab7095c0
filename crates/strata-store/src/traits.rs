//! The [`TierStore`] trait defining the per-tier storage contract.
//!
//! Every backend in the cascade — Redis cache, MongoDB document store,
//! local fallback table — implements this trait. The orchestrator
//! composes backends through it and tests substitute fakes at the same
//! seam.

use std::fmt;

use strata_types::{Anchor, AnchorId};

use crate::error::StoreResult;

/// Which tier a backend occupies in the cascade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TierKind {
    /// Shared key-value cache (fast, best-effort).
    Cache,
    /// Shared document store (slow, durable).
    Durable,
    /// Local file-backed fallback.
    Local,
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Durable => write!(f, "durable"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// One storage tier.
///
/// Implementations must satisfy these invariants:
/// - `probe` never errors: every connection-level failure is caught and
///   reported as `false`.
/// - `find_by_id` returns `Ok(None)` on a miss; decode failures and
///   transport failures are errors, never silent misses.
/// - `set` is an upsert keyed by the anchor identifier: repeated writes
///   of the same anchor converge instead of duplicating.
/// - `remove` of an unknown identifier is a no-op success.
/// - `commit_batch` accepts zero anchors without error and issues one
///   backend round-trip where the protocol allows it.
pub trait TierStore: Send + Sync {
    /// The tier this backend occupies.
    fn kind(&self) -> TierKind;

    /// Availability check. Catches all failures; never errors.
    fn probe(&self) -> bool;

    /// Look up an anchor by identifier.
    fn find_by_id(&self, id: AnchorId) -> StoreResult<Option<Anchor>>;

    /// Write (upsert) a single anchor.
    fn set(&self, anchor: &Anchor) -> StoreResult<()>;

    /// Delete an anchor by identifier. Unknown ids are a no-op success.
    fn remove(&self, id: AnchorId) -> StoreResult<()>;

    /// Write a batch of anchors in one backend round-trip.
    fn commit_batch(&self, anchors: &[Anchor]) -> StoreResult<()>;
}
