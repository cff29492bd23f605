//! Public facade crate for `jdp`.
//!
//! This crate intentionally contains no IO or backend-specific logic.
//! It re-exports the backend-agnostic types, traits and the definition text
//! pipeline from `jdp-core`.

pub use jdp_core::*;
