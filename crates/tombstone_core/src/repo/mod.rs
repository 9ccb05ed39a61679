//! Repository layer for tombstone-managed record types.
//!
//! # Responsibility
//! - Expose the per-type persistence surface: create/save/get, query
//!   views, the two delete strategies and recovery.
//! - Isolate SQL details from callers.
//!
//! # Invariants
//! - Construction refuses connections whose schema cannot support the
//!   configuration.
//! - Delete and recover failures propagate unchanged; nothing is retried
//!   or swallowed.

pub mod tombstone_repo;
