//! Foundation types for the Strata tiered anchor store.
//!
//! This crate provides the identity and payload-graph types used by every
//! other Strata crate.
//!
//! # Key Types
//!
//! - [`AnchorId`] — 128-bit stable identifier for an anchor
//! - [`Anchor`] — the unit of storage: id, persistence flag, payload graph
//! - [`PayloadGraph`] — arena-based object graph that may contain cycles
//! - [`Value`] — field values, including intra-graph and cross-anchor refs

pub mod anchor;
pub mod error;
pub mod payload;

pub use anchor::{Anchor, AnchorId};
pub use error::TypeError;
pub use payload::{NodeIx, PayloadGraph, PayloadNode, Value};
