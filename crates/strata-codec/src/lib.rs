//! Wire codec for Strata anchors.
//!
//! Anchors wrap payload graphs that may contain cycles, so the codec
//! never serializes recursively. [`encode`] flattens the graph into a
//! reference table: nodes are emitted in first-visit order and every
//! repeat reference becomes a back-pointer index into that table.
//! [`decode`] rebuilds the arena and validates every reference.
//!
//! Two tier-facing renderings exist:
//!
//! - [`encode`]/[`decode`] — the binary blob form, stored by key-value
//!   tiers under [`cache_key`]
//! - [`document`] — the structured form for the document tier:
//!   `{ "_id": "<uuid>", "data": Binary(<blob>) }`

pub mod document;
pub mod error;
pub mod wire;

pub use document::{document, DATA_FIELD};
pub use error::{CodecError, CodecResult};
pub use wire::{cache_key, decode, encode};
