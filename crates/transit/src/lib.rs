//! # bustrack-transit
//!
//! Static route data for the bus tracking engine.
//!
//! ## Features
//!
//! - **Immutable catalog**: Routes are validated once at load and never change
//! - **Spatial queries**: R-tree indexing of waypoints and route segments
//! - **Opaque coordinates**: Distances are planar in catalog units, so the same
//!   catalog works with `[lat, lon]` or `[lon, lat]` data
//!
//! ## Example
//!
//! ```
//! use bustrack_transit::prelude::*;
//! use geo::Point;
//!
//! let route = Route::new(
//!     RouteIdentifier::new("RT001"),
//!     "City Center ↔ Airport",
//!     Some("2563EB".into()),
//!     vec![
//!         Waypoint::new("City Center", Point::new(12.0022, 8.5920)),
//!         Waypoint::new("Airport Terminal", Point::new(12.0422, 8.5240)),
//!     ],
//! )
//! .unwrap();
//!
//! let catalog = RouteCatalog::new(vec![route]).unwrap();
//!
//! let nearby = catalog.routes_near(Point::new(12.0030, 8.5910), 0.01);
//! assert_eq!(nearby.len(), 1);
//! assert_eq!(nearby[0].display_name(), "City Center ↔ Airport");
//! ```

pub mod identifiers;
pub mod models;
pub mod provider;
pub mod spatial;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::{route::*, traits::*};
    pub use crate::models::types::{BusStatus, Direction, Occupancy, OccupancyLevel, TransitError};
    pub use crate::provider::catalog::RouteCatalog;
}

pub use prelude::*;
