use std::{sync::Arc, time::Duration};

use bustrack_transit::{
    BusStatus, OccupancyLevel, RouteIdentifier, RouteProvider, spatial::distance,
};
use itertools::Itertools;

use crate::fleet::{Bus, FleetSnapshot, Motion};

/// A bus as shown to a viewer.
#[derive(Clone, Debug, PartialEq)]
pub struct BusView {
    pub bus: Bus,
    pub route_name: Option<Arc<str>>,
    pub next_stop: Option<Arc<str>>,
    pub occupancy_level: OccupancyLevel,
    /// time until the next stop at the configured tick rate
    pub eta: Option<Duration>,
}

impl BusView {
    pub(crate) fn render(
        bus: &Bus,
        routes: &dyn RouteProvider,
        motion: &Motion,
        tick_interval: Duration,
    ) -> Self {
        let route = routes.get_route(&bus.route_id);

        let upcoming = route.as_ref().and_then(|route| {
            let current = route.waypoint(bus.waypoint_index)?;
            let target = route.waypoint(route.target_index(bus.waypoint_index, bus.direction))?;

            let per_tick = distance(current.position, target.position) * motion.speed;
            let remaining = distance(bus.position, target.position);
            let ticks = (remaining / per_tick).ceil();
            let eta = Duration::try_from_secs_f64(tick_interval.as_secs_f64() * ticks).ok();

            Some((target.name.clone(), eta))
        });

        Self {
            bus: bus.clone(),
            route_name: route.map(|r| Arc::from(r.display_name())),
            next_stop: upcoming.as_ref().map(|(name, _)| name.clone()),
            occupancy_level: bus.occupancy.level(),
            eta: upcoming.and_then(|(_, eta)| eta),
        }
    }
}

/// Load and punctuality of one route.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteSummary {
    pub route_id: RouteIdentifier,
    pub route_name: Arc<str>,
    pub active_buses: usize,
    pub total_capacity: u64,
    pub current_occupancy: u64,
    pub delayed_buses: usize,
}

impl RouteSummary {
    pub fn load_ratio(&self) -> f64 {
        if self.total_capacity == 0 {
            return 0.0;
        }
        self.current_occupancy as f64 / self.total_capacity as f64
    }
}

/// Fleet-wide dashboard figures.
#[derive(Clone, Debug, PartialEq)]
pub struct FleetSummary {
    pub version: u64,
    /// in catalog order, including routes without buses
    pub routes: Vec<RouteSummary>,
    pub active_buses: usize,
    /// 1.0 for an empty fleet
    pub on_time_ratio: f64,
}

impl FleetSummary {
    pub(crate) fn collect(snapshot: &FleetSnapshot, routes: &dyn RouteProvider) -> Self {
        let by_route = snapshot
            .buses()
            .iter()
            .into_group_map_by(|bus| bus.route_id.clone());

        let routes = routes
            .all_routes()
            .into_iter()
            .map(|route| {
                let buses = by_route.get(route.id()).map(Vec::as_slice).unwrap_or_default();
                RouteSummary {
                    route_id: route.id().clone(),
                    route_name: Arc::from(route.display_name()),
                    active_buses: buses.len(),
                    total_capacity: buses
                        .iter()
                        .map(|b| u64::from(b.occupancy.capacity()))
                        .sum(),
                    current_occupancy: buses
                        .iter()
                        .map(|b| u64::from(b.occupancy.occupied()))
                        .sum(),
                    delayed_buses: buses
                        .iter()
                        .filter(|b| b.status == BusStatus::Delayed)
                        .count(),
                }
            })
            .collect();

        let active_buses = snapshot.len();
        let on_time = snapshot
            .buses()
            .iter()
            .filter(|b| b.status == BusStatus::OnTime)
            .count();

        Self {
            version: snapshot.version(),
            routes,
            active_buses,
            on_time_ratio: if active_buses == 0 {
                1.0
            } else {
                on_time as f64 / active_buses as f64
            },
        }
    }
}
