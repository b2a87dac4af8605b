//! Core data models for deduplication.

pub mod layer;
pub mod place;

pub use layer::{Layer, UnknownLayer};
pub use place::{AddressParts, CenterPoint, NameValue, ParentId, PlaceRecord};
