//! Route providers.

pub mod catalog;

pub use catalog::RouteCatalog;
