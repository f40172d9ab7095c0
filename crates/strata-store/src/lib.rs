//! Tiered anchor persistence for Strata.
//!
//! A [`TieredStore`] spans four storage tiers of increasing durability
//! and decreasing speed:
//!
//! 1. [`WorkingSet`] — the in-process anchors of the current session
//! 2. [`CacheTier`] — a shared Redis key-value cache
//! 3. [`DurableTier`] — a shared MongoDB document store
//! 4. [`FallbackStore`] — a local file-backed table, engaged only when
//!    neither shared tier is reachable for the session
//!
//! Availability of the shared tiers is probed once at construction and
//! cached for the store's lifetime. Reads cascade tier by tier and
//! backfill the working set; writes land in the working set and reach
//! the shared tiers at commit time; deletes are garbage-collected ahead
//! of the commit sync so a stale write can never resurrect a deleted
//! anchor.
//!
//! # Design Rules
//!
//! 1. A probe failure degrades to the next tier; it is never an error.
//! 2. A tier failure *after* a successful probe propagates loudly —
//!    no retries, no re-probing, no silent data loss.
//! 3. One store instance serves one unit of work, single-writer;
//!    tier clients are shared across instances via [`ClientRegistry`].
//! 4. A failed commit is never reported as success.

pub mod cache;
pub mod config;
pub mod durable;
pub mod error;
pub mod fallback;
pub mod registry;
pub mod tiered;
pub mod traits;
pub mod working_set;

pub use cache::CacheTier;
pub use config::StoreConfig;
pub use durable::DurableTier;
pub use error::{StoreError, StoreResult};
pub use fallback::FallbackStore;
pub use registry::ClientRegistry;
pub use tiered::TieredStore;
pub use traits::{TierKind, TierStore};
pub use working_set::WorkingSet;
