//! In-memory route catalog.
//!
//! Stores every route in memory with spatial indices for fast queries. The
//! catalog is built once and never mutated afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use geo::Point;
use rstar::RTree;

use crate::identifiers::*;
use crate::models::{route::Route, traits::*, types::*};
use crate::spatial::index::{RouteSegmentNode, WaypointNode};

/// Immutable set of routes with spatial indexing
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone)]
pub struct RouteCatalog {
    routes: Vec<Arc<Route>>,
    route_map: HashMap<RouteIdentifier, Arc<Route>>,

    // Spatial indices
    waypoint_tree: Arc<RTree<WaypointNode>>,
    segment_tree: Arc<RTree<RouteSegmentNode>>,
}

impl RouteCatalog {
    /// Build a catalog from validated routes, rejecting duplicate route ids
    pub fn new(routes: Vec<Route>) -> Result<Self> {
        let routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();

        let mut route_map = HashMap::with_capacity(routes.len());
        for route in &routes {
            if route_map.insert(route.id().clone(), route.clone()).is_some() {
                return Err(TransitError::InvalidRouteDefinition {
                    route: route.id().clone(),
                    reason: "route id defined more than once".into(),
                });
            }
        }

        let waypoint_tree = RTree::bulk_load(
            routes
                .iter()
                .flat_map(|route| (0..route.len()).map(|i| WaypointNode::new(route.clone(), i)))
                .collect(),
        );

        let segment_tree = RTree::bulk_load(
            routes
                .iter()
                .flat_map(|route| {
                    route
                        .geometry()
                        .lines()
                        .map(|segment| RouteSegmentNode::new(segment, route.clone()))
                        .collect::<Vec<_>>()
                })
                .collect(),
        );

        Ok(Self {
            routes,
            route_map,
            waypoint_tree: Arc::new(waypoint_tree),
            segment_tree: Arc::new(segment_tree),
        })
    }

    /// Look up a route, failing with `RouteNotFound`
    pub fn route(&self, id: &RouteIdentifier) -> Result<Arc<Route>> {
        self.get_route(id)
            .ok_or_else(|| TransitError::RouteNotFound(id.clone()))
    }

    pub fn list_routes(&self) -> &[Arc<Route>] {
        &self.routes
    }
}

impl RouteProvider for RouteCatalog {
    fn get_route(&self, id: &RouteIdentifier) -> Option<Arc<Route>> {
        self.route_map.get(id).cloned()
    }

    fn all_routes(&self) -> Vec<Arc<Route>> {
        self.routes.clone()
    }

    fn routes_near(&self, point: Point, radius: f64) -> Vec<Arc<Route>> {
        if radius < 0.0 || !radius.is_finite() {
            return Vec::new();
        }

        let mut seen = std::collections::HashSet::new();
        self.segment_tree
            .locate_within_distance([point.x(), point.y()], radius * radius)
            .filter(|node| seen.insert(node.route.id().clone()))
            .map(|node| node.route.clone())
            .collect()
    }

    fn nearest_waypoints(&self, point: Point, n: usize) -> Vec<WaypointRef> {
        self.waypoint_tree
            .nearest_neighbor_iter(&[point.x(), point.y()])
            .take(n)
            .map(|node| node.waypoint.clone())
            .collect()
    }
}
