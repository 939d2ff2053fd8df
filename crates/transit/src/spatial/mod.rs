//! Spatial indexing and query utilities.

pub mod index;
pub mod queries;

pub use queries::{distance, distance_to_segment};
