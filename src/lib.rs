//! Cypress dedupe - collapses duplicate places in geocoding result pages.
//!
//! This library provides the deduplication engine and the shared types used
//! by the `dedupe` CLI and the `dedupe-server` HTTP binary.

pub mod api;
pub mod dedupe;
pub mod models;
pub mod request;

pub use dedupe::{DedupeConfig, DedupeStats, Deduplicator, Merged};
pub use models::{Layer, PlaceRecord};
pub use request::{DedupeMode, RequestContext};
