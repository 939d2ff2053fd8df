//! Provider trait for route data.
//!
//! The simulator and the tracking layer only see routes through this trait.
//! Implementations can be in-memory, database-backed, or remote.

use std::sync::Arc;

use geo::Point;

use crate::identifiers::*;
use crate::models::route::{Route, Waypoint};

/// A waypoint together with the route it belongs to
#[derive(Clone, Debug)]
pub struct WaypointRef {
    pub route: Arc<Route>,
    pub index: usize,
}

impl WaypointRef {
    pub fn waypoint(&self) -> &Waypoint {
        &self.route.waypoints()[self.index]
    }
}

/// Read-only source of routes, fixed after construction
pub trait RouteProvider: Send + Sync {
    // ---- Lookups ----
    fn get_route(&self, id: &RouteIdentifier) -> Option<Arc<Route>>;

    // ---- Collections ----

    /// All routes in load order
    fn all_routes(&self) -> Vec<Arc<Route>>;

    // ---- Spatial queries ----

    /// Routes passing within `radius` of `point`, in catalog units
    fn routes_near(&self, point: Point, radius: f64) -> Vec<Arc<Route>>;

    /// The `n` waypoints closest to `point`, nearest first
    fn nearest_waypoints(&self, point: Point, n: usize) -> Vec<WaypointRef>;
}
