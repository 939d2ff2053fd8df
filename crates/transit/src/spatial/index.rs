//! R-tree nodes for spatial indexing.
//!
//! Wraps waypoints and route segments with geometric data for spatial queries.
//! All distances are planar in catalog units; the catalog does not know which
//! axis is latitude, so no geodesic correction is applied.

use std::sync::Arc;

use geo::{Line, Point};
use rstar::{PointDistance, RTreeObject, AABB};

use crate::models::route::Route;
use crate::models::traits::WaypointRef;
use crate::spatial::queries::distance_to_segment;

// ============================================================================
// Waypoint Spatial Node
// ============================================================================

#[derive(Clone)]
pub struct WaypointNode {
    pub waypoint: WaypointRef,
    point: [f64; 2],
}

impl WaypointNode {
    pub fn new(route: Arc<Route>, index: usize) -> Self {
        let position = route.waypoints()[index].position;
        Self {
            waypoint: WaypointRef { route, index },
            point: [position.x(), position.y()],
        }
    }
}

impl RTreeObject for WaypointNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for WaypointNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ============================================================================
// Route Segment Spatial Node
// ============================================================================

#[derive(Clone)]
pub struct RouteSegmentNode {
    pub route: Arc<Route>,
    pub segment: Line,
    aabb: AABB<[f64; 2]>,
}

impl RouteSegmentNode {
    pub fn new(segment: Line, route: Arc<Route>) -> Self {
        let start = [segment.start.x, segment.start.y];
        let end = [segment.end.x, segment.end.y];

        Self {
            route,
            segment,
            aabb: AABB::from_corners(start, end),
        }
    }
}

impl RTreeObject for RouteSegmentNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

impl PointDistance for RouteSegmentNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let d = distance_to_segment(Point::new(point[0], point[1]), self.segment);
        d * d
    }
}
