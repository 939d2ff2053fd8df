//! Waypoint-to-waypoint interpolation for a single bus.
//!
//! Each tick moves a bus by `speed` times the vector of the segment it is on.
//! Arrival is decided by absolute distance to the target waypoint, so the number
//! of ticks per segment is roughly `1 / speed` regardless of segment length.
//! `speed` and `arrival_threshold` are coupled: a threshold smaller than the
//! leftover of the last step would never be hit, so a step that reaches or
//! passes the target also counts as an arrival.

use std::sync::Arc;

use bustrack_transit::{BusIdentifier, Route, RouteIdentifier, spatial::distance};
use chrono::{DateTime, Utc};

use crate::fleet::bus::Bus;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    /// fraction of the current segment covered per tick
    pub speed: f64,
    /// distance to the target at which a bus snaps onto it
    pub arrival_threshold: f64,
}

/// A bus reaching a waypoint during a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Arrival {
    pub bus_id: BusIdentifier,
    pub route_id: RouteIdentifier,
    pub waypoint_index: usize,
    pub waypoint_name: Arc<str>,
    /// the bus turned around at a terminal
    pub direction_flipped: bool,
    pub at: DateTime<Utc>,
}

/// Why a bus could not be advanced. The bus keeps its previous state.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BusFault {
    #[error("bus {bus} references unknown route {route}")]
    UnknownRoute {
        bus: BusIdentifier,
        route: RouteIdentifier,
    },

    #[error("bus {bus} is at waypoint {index} but its route has {len} waypoints")]
    WaypointOutOfRange {
        bus: BusIdentifier,
        index: usize,
        len: usize,
    },

    #[error("bus {bus} would move to a non-finite position")]
    NonFinitePosition { bus: BusIdentifier },
}

impl BusFault {
    pub fn bus_id(&self) -> &BusIdentifier {
        match self {
            Self::UnknownRoute { bus, .. }
            | Self::WaypointOutOfRange { bus, .. }
            | Self::NonFinitePosition { bus } => bus,
        }
    }
}

impl Motion {
    /// Index of the waypoint `bus` is driving towards.
    pub fn target_index(bus: &Bus, route: &Route) -> Result<usize, BusFault> {
        if bus.waypoint_index >= route.len() {
            return Err(BusFault::WaypointOutOfRange {
                bus: bus.id.clone(),
                index: bus.waypoint_index,
                len: route.len(),
            });
        }

        Ok(route.target_index(bus.waypoint_index, bus.direction))
    }

    /// Computes the next state of `bus` without touching it.
    pub fn advance(
        &self,
        bus: &Bus,
        route: &Route,
        now: DateTime<Utc>,
    ) -> Result<(Bus, Option<Arrival>), BusFault> {
        let target_index = Self::target_index(bus, route)?;
        let waypoints = route.waypoints();
        let current = waypoints[bus.waypoint_index].position;
        let target = &waypoints[target_index];

        let step = (target.position - current) * self.speed;
        let position = bus.position + step;

        if !position.x().is_finite() || !position.y().is_finite() {
            return Err(BusFault::NonFinitePosition {
                bus: bus.id.clone(),
            });
        }

        let mut next = bus.clone();
        next.last_update = now;

        let passed = (target.position - position).dot(step) <= 0.0;
        if !passed && distance(position, target.position) > self.arrival_threshold {
            next.position = position;
            return Ok((next, None));
        }

        // arrived: snap onto the waypoint, turn around at either end
        let direction_flipped = route.is_terminal(target_index);
        next.position = target.position;
        next.waypoint_index = target_index;
        next.current_location = target.name.clone();
        if direction_flipped {
            next.direction = next.direction.flipped();
        }

        let arrival = Arrival {
            bus_id: bus.id.clone(),
            route_id: bus.route_id.clone(),
            waypoint_index: target_index,
            waypoint_name: target.name.clone(),
            direction_flipped,
            at: now,
        };

        Ok((next, Some(arrival)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bustrack_transit::{BusStatus, Direction, Occupancy, Waypoint};
    use geo::Point;

    use crate::fleet::bus::BusSpec;

    fn abc() -> Route {
        Route::new(
            RouteIdentifier::new("R"),
            "R",
            None,
            vec![
                Waypoint::new("A", Point::new(0.0, 0.0)),
                Waypoint::new("B", Point::new(1.0, 0.0)),
                Waypoint::new("C", Point::new(2.0, 0.0)),
            ],
        )
        .unwrap()
    }

    fn bus_on(route: &Route) -> Bus {
        let spec = BusSpec {
            id: BusIdentifier::new("BUS001"),
            route_id: route.id().clone(),
            start_index: 0,
            direction: Direction::Forward,
            occupancy: Occupancy::new(0, 40).unwrap(),
            driver_name: "Ahmed Kano".into(),
            status: BusStatus::OnTime,
        };
        Bus::place(spec, route, Utc::now()).unwrap()
    }

    #[test]
    fn half_segment_then_arrival() {
        let route = abc();
        let motion = Motion {
            speed: 0.5,
            arrival_threshold: 0.1,
        };
        let now = Utc::now();

        let (bus, arrival) = motion.advance(&bus_on(&route), &route, now).unwrap();
        assert_relative_eq!(bus.position.x(), 0.5);
        assert_eq!(bus.waypoint_index, 0);
        assert!(arrival.is_none());

        let (bus, arrival) = motion.advance(&bus, &route, now).unwrap();
        assert_eq!(bus.position, Point::new(1.0, 0.0));
        assert_eq!(bus.waypoint_index, 1);
        assert_eq!(&*bus.current_location, "B");
        assert_eq!(bus.direction, Direction::Forward);
        assert!(!arrival.unwrap().direction_flipped);
    }

    #[test]
    fn uneven_step_does_not_overshoot_forever() {
        // 0.3 never lands within 0.01 of 1.0: 0.3, 0.6, 0.9, 1.2
        let route = abc();
        let motion = Motion {
            speed: 0.3,
            arrival_threshold: 0.01,
        };
        let mut bus = bus_on(&route);

        let mut ticks = 0;
        while bus.waypoint_index == 0 {
            bus = motion.advance(&bus, &route, Utc::now()).unwrap().0;
            ticks += 1;
            assert!(ticks < 10, "bus never arrived");
        }

        assert_eq!(ticks, 4);
        assert_eq!(bus.position, Point::new(1.0, 0.0));
    }

    #[test]
    fn flips_on_terminal_arrival() {
        let route = abc();
        let motion = Motion {
            speed: 1.0,
            arrival_threshold: 0.0,
        };
        let now = Utc::now();

        let (bus, _) = motion.advance(&bus_on(&route), &route, now).unwrap();
        let (bus, arrival) = motion.advance(&bus, &route, now).unwrap();

        assert_eq!(bus.waypoint_index, 2);
        assert_eq!(bus.direction, Direction::Backward);
        assert!(arrival.unwrap().direction_flipped);
    }

    #[test]
    fn out_of_range_index_is_a_fault() {
        let route = abc();
        let mut bus = bus_on(&route);
        bus.waypoint_index = 7;

        let motion = Motion {
            speed: 0.5,
            arrival_threshold: 0.1,
        };
        let fault = motion.advance(&bus, &route, Utc::now()).unwrap_err();
        assert!(matches!(fault, BusFault::WaypointOutOfRange { index: 7, len: 3, .. }));
        assert_eq!(fault.bus_id().as_str(), "BUS001");
    }

    #[test]
    fn non_finite_position_is_a_fault() {
        let route = abc();
        let mut bus = bus_on(&route);
        bus.position = Point::new(f64::INFINITY, 0.0);

        let motion = Motion {
            speed: 0.5,
            arrival_threshold: 0.1,
        };
        assert!(matches!(
            motion.advance(&bus, &route, Utc::now()),
            Err(BusFault::NonFinitePosition { .. })
        ));
    }
}
