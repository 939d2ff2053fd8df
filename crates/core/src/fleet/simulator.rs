use std::sync::Arc;

use bustrack_transit::{BusIdentifier, BusStatus, RouteIdentifier, RouteProvider};
use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::{ConfigError, SimulationConfig},
    fleet::{
        bus::{Bus, BusSpec},
        motion::{Arrival, BusFault, Motion},
        snapshot::FleetSnapshot,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("bus not found: {0}")]
    BusNotFound(BusIdentifier),

    #[error("bus {0} is already in the fleet")]
    DuplicateBus(BusIdentifier),

    #[error("route not found: {0}")]
    RouteNotFound(RouteIdentifier),

    #[error("bus {bus} cannot start at waypoint {index} of route {route}")]
    InvalidStart {
        bus: BusIdentifier,
        route: RouteIdentifier,
        index: usize,
    },

    #[error("the ticker has stopped")]
    TickerStopped,
}

/// Changes to the fleet other than movement, applied between ticks.
#[derive(Clone, Debug)]
pub enum FleetCommand {
    AddBus(BusSpec),
    RemoveBus(BusIdentifier),
    SetStatus(BusIdentifier, BusStatus),
}

/// Outcome of one tick.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    /// version of the snapshot published by this tick
    pub version: u64,
    pub arrivals: Vec<Arrival>,
    /// buses left untouched this tick
    pub faults: Vec<BusFault>,
}

/// Sole owner of live bus state.
///
/// Buses move only inside [`tick`](Self::tick). Readers get immutable
/// [`FleetSnapshot`]s, either from [`snapshot`](Self::snapshot) or through a
/// [`subscribe`](Self::subscribe)d feed that receives every published change.
pub struct FleetSimulator {
    routes: Arc<dyn RouteProvider>,
    motion: Motion,
    occupancy_drift: bool,
    rng: StdRng,

    buses: Vec<Bus>,
    version: u64,
    last_tick: Option<DateTime<Utc>>,
    feed: watch::Sender<Arc<FleetSnapshot>>,
}

impl FleetSimulator {
    pub fn new(
        routes: Arc<dyn RouteProvider>,
        config: &SimulationConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (feed, _) = watch::channel(Arc::new(FleetSnapshot::default()));

        Ok(Self {
            routes,
            motion: config.motion(),
            occupancy_drift: config.occupancy_drift,
            rng,
            buses: Vec::new(),
            version: 0,
            last_tick: None,
            feed,
        })
    }

    pub fn routes(&self) -> &Arc<dyn RouteProvider> {
        &self.routes
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<FleetSnapshot> {
        self.feed.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<FleetSnapshot>> {
        self.feed.subscribe()
    }

    pub fn get_bus(&self, id: &BusIdentifier) -> Result<Bus, FleetError> {
        self.buses
            .iter()
            .find(|bus| &bus.id == id)
            .cloned()
            .ok_or_else(|| FleetError::BusNotFound(id.clone()))
    }

    pub fn add_bus(&mut self, spec: BusSpec, now: DateTime<Utc>) -> Result<(), FleetError> {
        if self.buses.iter().any(|bus| bus.id == spec.id) {
            return Err(FleetError::DuplicateBus(spec.id));
        }

        let route = self
            .routes
            .get_route(&spec.route_id)
            .ok_or_else(|| FleetError::RouteNotFound(spec.route_id.clone()))?;

        let (id, route_id, index) = (spec.id.clone(), spec.route_id.clone(), spec.start_index);
        let bus = Bus::place(spec, &route, now).ok_or_else(|| FleetError::InvalidStart {
            bus: id.clone(),
            route: route_id.clone(),
            index,
        })?;

        info!(bus = %id, route = %route_id, at = %bus.current_location, "bus added to fleet");
        self.buses.push(bus);
        self.publish();
        Ok(())
    }

    pub fn remove_bus(&mut self, id: &BusIdentifier) -> Result<Bus, FleetError> {
        let index = self
            .buses
            .iter()
            .position(|bus| &bus.id == id)
            .ok_or_else(|| FleetError::BusNotFound(id.clone()))?;

        let bus = self.buses.remove(index);
        info!(bus = %id, "bus removed from fleet");
        self.publish();
        Ok(bus)
    }

    pub fn set_status(&mut self, id: &BusIdentifier, status: BusStatus) -> Result<(), FleetError> {
        let bus = self
            .buses
            .iter_mut()
            .find(|bus| &bus.id == id)
            .ok_or_else(|| FleetError::BusNotFound(id.clone()))?;

        if bus.status != status {
            info!(bus = %id, %status, "bus status changed");
            bus.status = status;
            self.publish();
        }
        Ok(())
    }

    pub fn apply(&mut self, command: FleetCommand, now: DateTime<Utc>) -> Result<(), FleetError> {
        match command {
            FleetCommand::AddBus(spec) => self.add_bus(spec, now),
            FleetCommand::RemoveBus(id) => self.remove_bus(&id).map(|_| ()),
            FleetCommand::SetStatus(id, status) => self.set_status(&id, status),
        }
    }

    /// Advances every bus one step and publishes the result.
    ///
    /// Buses are independent: a bus that cannot be advanced keeps its state for
    /// this tick, is reported in [`TickReport::faults`] and does not stop the
    /// others.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        for bus in &mut self.buses {
            let stepped = match self.routes.get_route(&bus.route_id) {
                Some(route) => self.motion.advance(bus, &route, now),
                None => Err(BusFault::UnknownRoute {
                    bus: bus.id.clone(),
                    route: bus.route_id.clone(),
                }),
            };

            match stepped {
                Ok((mut next, arrival)) => {
                    if self.occupancy_drift {
                        next.occupancy = next.occupancy.adjust(self.rng.random_range(-1..=1));
                    }
                    if let Some(arrival) = arrival {
                        debug!(
                            bus = %arrival.bus_id,
                            waypoint = %arrival.waypoint_name,
                            flipped = arrival.direction_flipped,
                            "bus arrived"
                        );
                        report.arrivals.push(arrival);
                    }
                    *bus = next;
                }
                Err(fault) => {
                    warn!(%fault, "skipping bus for this tick");
                    report.faults.push(fault);
                }
            }
        }

        self.last_tick = Some(now);
        report.version = self.publish();
        report
    }

    fn publish(&mut self) -> u64 {
        self.version += 1;
        self.feed.send_replace(Arc::new(FleetSnapshot::new(
            self.version,
            self.last_tick,
            self.buses.clone(),
        )));
        self.version
    }
}
