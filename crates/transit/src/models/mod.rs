//! Transit data models, types, and traits.

pub mod route;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use route::{Route, Waypoint};
pub use traits::{RouteProvider, WaypointRef};
pub use types::{BusStatus, Direction, Occupancy, OccupancyLevel, Result, TransitError};
