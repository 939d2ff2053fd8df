use std::sync::Arc;

use bustrack_transit::{BusIdentifier, BusStatus, Direction, Occupancy, Route, RouteIdentifier};
use chrono::{DateTime, Utc};
use geo::Point;
use tracing::debug;

/// Live state of one bus. Only the simulator mutates these; everyone else sees
/// copies inside a [`FleetSnapshot`](crate::fleet::FleetSnapshot).
#[derive(Clone, Debug, PartialEq)]
pub struct Bus {
    pub id: BusIdentifier,
    pub route_id: RouteIdentifier,
    pub position: Point,
    /// last waypoint the bus reached
    pub waypoint_index: usize,
    pub direction: Direction,
    pub occupancy: Occupancy,
    pub driver_name: Arc<str>,
    pub status: BusStatus,
    pub current_location: Arc<str>,
    pub last_update: DateTime<Utc>,
}

/// Everything needed to put a bus on the road.
#[derive(Clone, Debug)]
pub struct BusSpec {
    pub id: BusIdentifier,
    pub route_id: RouteIdentifier,
    pub start_index: usize,
    pub direction: Direction,
    pub occupancy: Occupancy,
    pub driver_name: Arc<str>,
    pub status: BusStatus,
}

impl Bus {
    /// Places a bus on the waypoint `spec.start_index` of `route`.
    ///
    /// Returns `None` if the start index is outside the route. A bus starting on
    /// a terminal always faces into the route, so it ping-pongs instead of
    /// jumping straight to the opposite end.
    pub fn place(spec: BusSpec, route: &Route, now: DateTime<Utc>) -> Option<Self> {
        let waypoint = route.waypoint(spec.start_index)?;

        let direction = if spec.start_index == 0 {
            Direction::Forward
        } else if spec.start_index + 1 == route.len() {
            Direction::Backward
        } else {
            spec.direction
        };
        if direction != spec.direction {
            debug!(
                bus = %spec.id,
                route = %spec.route_id,
                requested = ?spec.direction,
                direction = ?direction,
                "bus starts on a terminal, facing into the route"
            );
        }

        Some(Self {
            id: spec.id,
            route_id: spec.route_id,
            position: waypoint.position,
            waypoint_index: spec.start_index,
            direction,
            occupancy: spec.occupancy,
            driver_name: spec.driver_name,
            status: spec.status,
            current_location: waypoint.name.clone(),
            last_update: now,
        })
    }
}
