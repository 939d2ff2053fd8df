//! Per-viewer tracking sessions.
//!
//! A session is opened with a credential, keeps the granted [`Capability`] for
//! its whole life and reads fleet snapshots from the simulator's feed. Closing
//! or dropping a session only drops its feed receiver; the simulator and other
//! sessions are unaffected.

use std::{sync::Arc, time::Duration};

use bustrack_transit::{BusIdentifier, RouteIdentifier, RouteProvider};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    access::{AccessError, AccessGate, Capability, Credential},
    config::SimulationConfig,
    fleet::{Bus, FleetSnapshot, Motion},
};

pub mod view;

pub use view::{BusView, FleetSummary, RouteSummary};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("bus not found: {0}")]
    NotFound(BusIdentifier),
}

/// Opens sessions against one simulator's snapshot feed.
#[derive(Clone)]
pub struct TrackingService {
    gate: AccessGate,
    routes: Arc<dyn RouteProvider>,
    feed: watch::Receiver<Arc<FleetSnapshot>>,
    motion: Motion,
    tick_interval: Duration,
}

impl TrackingService {
    pub fn new(
        gate: AccessGate,
        routes: Arc<dyn RouteProvider>,
        feed: watch::Receiver<Arc<FleetSnapshot>>,
        config: &SimulationConfig,
    ) -> Self {
        Self {
            gate,
            routes,
            feed,
            motion: config.motion(),
            tick_interval: config.tick_interval(),
        }
    }

    pub fn open(&self, credential: &Credential) -> Result<TrackingSession, AccessError> {
        let mut feed = self.feed.clone();
        let snapshot = feed.borrow_and_update().clone();
        let capability = self.gate.validate(credential, &snapshot)?;

        Ok(TrackingSession {
            capability,
            last_snapshot_version: snapshot.version(),
            feed,
            routes: self.routes.clone(),
            motion: self.motion,
            tick_interval: self.tick_interval,
        })
    }
}

pub struct TrackingSession {
    capability: Capability,
    last_snapshot_version: u64,
    feed: watch::Receiver<Arc<FleetSnapshot>>,
    routes: Arc<dyn RouteProvider>,
    motion: Motion,
    tick_interval: Duration,
}

impl TrackingSession {
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Version of the last snapshot handed out by [`next_update`](Self::next_update),
    /// or the one current when the session opened.
    pub fn last_snapshot_version(&self) -> u64 {
        self.last_snapshot_version
    }

    /// Buses this session may see, from the latest snapshot.
    ///
    /// A ticket holder whose bus has left the fleet gets an empty list.
    pub fn view(&self) -> Vec<BusView> {
        let snapshot = self.feed.borrow().clone();
        self.render(&snapshot)
    }

    /// [`view`](Self::view) restricted to one route.
    pub fn view_route(&self, route: &RouteIdentifier) -> Vec<BusView> {
        self.view()
            .into_iter()
            .filter(|view| &view.bus.route_id == route)
            .collect()
    }

    /// Picks a bus to follow. Ticket holders may only pick their own.
    pub fn select_bus(&self, id: &BusIdentifier) -> Result<Bus, SessionError> {
        if !self.capability.permits(id) {
            return Err(SessionError::Forbidden(format!("session may not track bus {id}")));
        }

        self.feed
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// Dashboard figures for the whole fleet. Admin sessions only.
    pub fn route_summaries(&self) -> Result<FleetSummary, SessionError> {
        match self.capability {
            Capability::AllBuses => {
                let snapshot = self.feed.borrow().clone();
                Ok(FleetSummary::collect(&snapshot, self.routes.as_ref()))
            }
            Capability::SingleBus(_) => Err(SessionError::Forbidden(
                "fleet summaries require admin access".into(),
            )),
        }
    }

    /// Waits for a snapshot newer than the last one seen.
    ///
    /// Returns `None` once the simulator has gone away.
    pub async fn next_update(&mut self) -> Option<Vec<BusView>> {
        self.feed.changed().await.ok()?;

        let snapshot = self.feed.borrow_and_update().clone();
        self.last_snapshot_version = snapshot.version();
        Some(self.render(&snapshot))
    }

    /// Ends the session. The simulator is not touched.
    pub fn close(self) {
        debug!(capability = ?self.capability, "tracking session closed");
    }

    fn render(&self, snapshot: &FleetSnapshot) -> Vec<BusView> {
        let visible: Vec<&Bus> = match &self.capability {
            Capability::AllBuses => snapshot.buses().iter().collect(),
            Capability::SingleBus(id) => {
                let own: Vec<&Bus> = snapshot.get(id).into_iter().collect();
                if own.is_empty() {
                    warn!(
                        bus = %id,
                        version = snapshot.version(),
                        "tracked bus is no longer in the fleet"
                    );
                }
                own
            }
        };

        visible
            .into_iter()
            .map(|bus| BusView::render(bus, self.routes.as_ref(), &self.motion, self.tick_interval))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bustrack_transit::{
        BusStatus, Direction, Occupancy, OccupancyLevel, Route, RouteCatalog, Waypoint,
    };
    use chrono::Utc;
    use geo::Point;

    use crate::{
        access::StaticTicketRegistry,
        fleet::{BusSpec, FleetSimulator},
    };

    fn catalog() -> Arc<RouteCatalog> {
        let route = |id: &str, name: &str, y: f64| {
            Route::new(
                RouteIdentifier::new(id),
                name,
                None,
                vec![
                    Waypoint::new("A", Point::new(0.0, y)),
                    Waypoint::new("B", Point::new(1.0, y)),
                    Waypoint::new("C", Point::new(2.0, y)),
                ],
            )
            .unwrap()
        };
        Arc::new(
            RouteCatalog::new(vec![
                route("RT001", "City Center ↔ Airport", 0.0),
                route("RT002", "University ↔ Shopping District", 5.0),
                route("RT003", "Hospital ↔ Business Park", 10.0),
            ])
            .unwrap(),
        )
    }

    fn spec(id: &str, route: &str, occupied: u32, status: BusStatus) -> BusSpec {
        BusSpec {
            id: BusIdentifier::new(id),
            route_id: RouteIdentifier::new(route),
            start_index: 0,
            direction: Direction::Forward,
            occupancy: Occupancy::new(occupied, 40).unwrap(),
            driver_name: "Ahmed Kano".into(),
            status,
        }
    }

    fn setup() -> (FleetSimulator, TrackingService) {
        let config = SimulationConfig {
            speed: 0.25,
            arrival_threshold: 0.01,
            tick_interval_ms: 1000,
            rng_seed: Some(1),
            ..SimulationConfig::default()
        };
        let catalog = catalog();
        let mut sim = FleetSimulator::new(catalog.clone(), &config).unwrap();
        let now = Utc::now();
        sim.add_bus(spec("BUS001", "RT001", 28, BusStatus::OnTime), now).unwrap();
        sim.add_bus(spec("BUS002", "RT002", 15, BusStatus::OnTime), now).unwrap();
        sim.add_bus(spec("BUS003", "RT001", 36, BusStatus::Delayed), now).unwrap();

        let tickets: StaticTicketRegistry = [("TCK001", "BUS001"), ("TCK002", "BUS002")]
            .into_iter()
            .map(|(t, b)| (t.into(), b.into()))
            .collect();
        let gate = AccessGate::new(&config.admin_code, Arc::new(tickets));
        let service = TrackingService::new(gate, catalog, sim.subscribe(), &config);

        (sim, service)
    }

    fn ids(views: &[BusView]) -> Vec<&str> {
        views.iter().map(|v| v.bus.id.as_str()).collect()
    }

    #[test]
    fn admin_sees_whole_fleet() {
        let (_sim, service) = setup();
        let session = service.open(&"ADMIN123".into()).unwrap();

        assert!(session.capability().is_admin());
        assert_eq!(session.view().len(), 3);
    }

    #[test]
    fn ticket_holder_sees_only_own_bus() {
        let (mut sim, service) = setup();
        let session = service.open(&"TCK002".into()).unwrap();

        for _ in 0..10 {
            assert_eq!(ids(&session.view()), ["BUS002"]);
            sim.tick(Utc::now());
        }
    }

    #[test]
    fn unknown_credential() {
        let (_sim, service) = setup();
        assert_eq!(
            service.open(&"nope".into()).err(),
            Some(AccessError::CredentialNotRecognized)
        );
    }

    #[test]
    fn view_is_stable_between_ticks() {
        let (mut sim, service) = setup();
        let session = service.open(&"admin123".into()).unwrap();
        sim.tick(Utc::now());

        assert_eq!(session.view(), session.view());
    }

    #[test]
    fn view_details() {
        let (_sim, service) = setup();
        let session = service.open(&"TCK001".into()).unwrap();
        let view = &session.view()[0];

        assert_eq!(view.route_name.as_deref(), Some("City Center ↔ Airport"));
        assert_eq!(view.next_stop.as_deref(), Some("B"));
        assert_eq!(view.occupancy_level, OccupancyLevel::Moderate);
        // a full segment at 0.25 per tick, one tick per second
        assert_eq!(view.eta, Some(Duration::from_secs(4)));
    }

    #[test]
    fn removed_bus_yields_empty_view() {
        let (mut sim, service) = setup();
        let session = service.open(&"TCK001".into()).unwrap();

        sim.remove_bus(&BusIdentifier::new("BUS001")).unwrap();
        assert!(session.view().is_empty());
        assert_eq!(
            session.select_bus(&BusIdentifier::new("BUS001")),
            Err(SessionError::NotFound(BusIdentifier::new("BUS001")))
        );
    }

    #[test]
    fn ticket_holder_cannot_select_other_bus() {
        let (_sim, service) = setup();
        let session = service.open(&"TCK001".into()).unwrap();

        assert!(session.select_bus(&BusIdentifier::new("BUS001")).is_ok());
        assert!(matches!(
            session.select_bus(&BusIdentifier::new("BUS002")),
            Err(SessionError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_can_select_any_bus() {
        let (_sim, service) = setup();
        let session = service.open(&"admin123".into()).unwrap();

        let bus = session.select_bus(&BusIdentifier::new("BUS003")).unwrap();
        assert_eq!(bus.status, BusStatus::Delayed);
        assert!(matches!(
            session.select_bus(&BusIdentifier::new("BUS999")),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn route_filter() {
        let (_sim, service) = setup();
        let admin = service.open(&"admin123".into()).unwrap();
        assert_eq!(ids(&admin.view_route(&RouteIdentifier::new("RT001"))), ["BUS001", "BUS003"]);
        assert!(admin.view_route(&RouteIdentifier::new("RT003")).is_empty());

        let rider = service.open(&"TCK001".into()).unwrap();
        assert!(rider.view_route(&RouteIdentifier::new("RT002")).is_empty());
    }

    #[test]
    fn summaries_for_admin_only() {
        let (_sim, service) = setup();

        let rider = service.open(&"TCK001".into()).unwrap();
        assert!(matches!(rider.route_summaries(), Err(SessionError::Forbidden(_))));

        let admin = service.open(&"admin123".into()).unwrap();
        let summary = admin.route_summaries().unwrap();

        assert_eq!(summary.active_buses, 3);
        approx::assert_relative_eq!(summary.on_time_ratio, 2.0 / 3.0);

        let rt001 = &summary.routes[0];
        assert_eq!(rt001.active_buses, 2);
        assert_eq!(rt001.total_capacity, 80);
        assert_eq!(rt001.current_occupancy, 64);
        assert_eq!(rt001.delayed_buses, 1);
        approx::assert_relative_eq!(rt001.load_ratio(), 0.8);

        assert_eq!(summary.routes[2].active_buses, 0);
    }

    #[test]
    fn summaries_hold_totals_beyond_u32() {
        let config = SimulationConfig::default();
        let catalog = catalog();
        let mut sim = FleetSimulator::new(catalog.clone(), &config).unwrap();
        for id in ["BUS001", "BUS002"] {
            let spec = BusSpec {
                occupancy: Occupancy::new(2_000_000_000, 3_000_000_000).unwrap(),
                ..spec(id, "RT001", 0, BusStatus::OnTime)
            };
            sim.add_bus(spec, Utc::now()).unwrap();
        }

        let gate = AccessGate::new(&config.admin_code, Arc::new(StaticTicketRegistry::new()));
        let service = TrackingService::new(gate, catalog, sim.subscribe(), &config);
        let admin = service.open(&"admin123".into()).unwrap();
        let summary = admin.route_summaries().unwrap();

        let rt001 = &summary.routes[0];
        assert_eq!(rt001.total_capacity, 6_000_000_000);
        assert_eq!(rt001.current_occupancy, 4_000_000_000);
        approx::assert_relative_eq!(rt001.load_ratio(), 2.0 / 3.0);
    }

    #[test]
    fn closing_a_session_leaves_others_running() {
        let (mut sim, service) = setup();
        let first = service.open(&"TCK001".into()).unwrap();
        let second = service.open(&"admin123".into()).unwrap();

        first.close();
        sim.tick(Utc::now());

        assert_eq!(second.view().len(), 3);
        assert_eq!(sim.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn next_update_follows_ticks() {
        let (mut sim, service) = setup();
        let mut session = service.open(&"TCK001".into()).unwrap();
        let opened_at = session.last_snapshot_version();

        sim.tick(Utc::now());
        let views = session.next_update().await.unwrap();

        assert_eq!(ids(&views), ["BUS001"]);
        assert_eq!(session.last_snapshot_version(), opened_at + 1);
        approx::assert_relative_eq!(views[0].bus.position.x(), 0.25);
    }

    #[tokio::test]
    async fn next_update_ends_with_simulator() {
        let (sim, service) = setup();
        let mut session = service.open(&"admin123".into()).unwrap();

        drop(sim);
        assert!(session.next_update().await.is_none());
    }
}
