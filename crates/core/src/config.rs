//! Simulation settings and JSON network definitions.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use bustrack_transit::{
    BusIdentifier, BusStatus, Direction, Occupancy, Route, RouteCatalog, RouteIdentifier,
    TicketIdentifier, TransitError, Waypoint,
};
use chrono::{DateTime, Utc};
use geo::Point;
use serde::Deserialize;

use crate::{
    access::{AccessGate, StaticTicketRegistry},
    fleet::{BusSpec, FleetError, FleetSimulator},
    session::TrackingService,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed network definition: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid simulation setting: {0}")]
    Invalid(String),

    #[error(transparent)]
    Transit(#[from] TransitError),

    #[error(transparent)]
    Fleet(#[from] FleetError),
}

/// Tuning for the simulator and the access gate.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    pub tick_interval_ms: u64,
    /// fraction of a segment covered per tick, in `(0, 1]`
    pub speed: f64,
    pub arrival_threshold: f64,
    pub admin_code: String,
    pub occupancy_drift: bool,
    pub rng_seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2000,
            speed: 0.1,
            arrival_threshold: 0.0005,
            admin_code: "admin123".into(),
            occupancy_drift: false,
            rng_seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tickIntervalMs must be positive".into()));
        }
        if !(self.speed > 0.0 && self.speed <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "speed must be in (0, 1], got {}",
                self.speed
            )));
        }
        if !self.arrival_threshold.is_finite() || self.arrival_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "arrivalThreshold must be a non-negative number, got {}",
                self.arrival_threshold
            )));
        }
        if self.admin_code.trim().is_empty() {
            return Err(ConfigError::Invalid("adminCode must not be blank".into()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn motion(&self) -> crate::fleet::Motion {
        crate::fleet::Motion {
            speed: self.speed,
            arrival_threshold: self.arrival_threshold,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointConfig {
    pub name: String,
    /// both axes in catalog order
    pub position: [f64; 2],
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub color_tag: Option<String>,
    pub waypoints: Vec<WaypointConfig>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusConfig {
    pub id: String,
    pub route_id: String,
    #[serde(default)]
    pub start_index: usize,
    #[serde(default)]
    pub direction: Direction,
    pub occupied: u32,
    pub capacity: u32,
    pub driver_name: String,
    #[serde(default)]
    pub status: BusStatus,
}

/// A complete network: routes, the initial fleet and issued tickets.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub buses: Vec<BusConfig>,
    /// ticket id -> bus id
    #[serde(default)]
    pub tickets: BTreeMap<String, String>,
}

/// Everything built from a [`NetworkConfig`], ready to run.
pub struct Network {
    pub config: SimulationConfig,
    pub catalog: Arc<RouteCatalog>,
    pub simulator: FleetSimulator,
    pub gate: AccessGate,
}

impl Network {
    /// A tracking service fed by this network's simulator.
    pub fn tracking_service(&self) -> TrackingService {
        TrackingService::new(
            self.gate.clone(),
            self.catalog.clone(),
            self.simulator.subscribe(),
            &self.config,
        )
    }
}

impl NetworkConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn build_catalog(&self) -> Result<RouteCatalog, ConfigError> {
        let routes = self
            .routes
            .iter()
            .map(|route| {
                Route::new(
                    RouteIdentifier::new(&route.id),
                    route.display_name.as_str(),
                    route.color_tag.as_deref().map(Arc::from),
                    route
                        .waypoints
                        .iter()
                        .map(|w| {
                            Waypoint::new(w.name.as_str(), Point::new(w.position[0], w.position[1]))
                        })
                        .collect(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RouteCatalog::new(routes)?)
    }

    pub fn bus_specs(&self) -> Result<Vec<BusSpec>, ConfigError> {
        self.buses
            .iter()
            .map(|bus| -> Result<BusSpec, ConfigError> {
                Ok(BusSpec {
                    id: BusIdentifier::new(&bus.id),
                    route_id: RouteIdentifier::new(&bus.route_id),
                    start_index: bus.start_index,
                    direction: bus.direction,
                    occupancy: Occupancy::new(bus.occupied, bus.capacity)?,
                    driver_name: bus.driver_name.as_str().into(),
                    status: bus.status,
                })
            })
            .collect()
    }

    pub fn ticket_registry(&self) -> StaticTicketRegistry {
        let mut registry = StaticTicketRegistry::new();
        for (ticket, bus) in &self.tickets {
            registry.insert(TicketIdentifier::new(ticket), BusIdentifier::new(bus));
        }
        registry
    }

    pub fn build(&self, now: DateTime<Utc>) -> Result<Network, ConfigError> {
        self.simulation.validate()?;

        let catalog = Arc::new(self.build_catalog()?);
        let mut simulator = FleetSimulator::new(catalog.clone(), &self.simulation)?;
        for spec in self.bus_specs()? {
            simulator.add_bus(spec, now)?;
        }

        let gate = AccessGate::new(&self.simulation.admin_code, Arc::new(self.ticket_registry()));

        Ok(Network {
            config: self.simulation.clone(),
            catalog,
            simulator,
            gate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "simulation": { "speed": 0.5, "arrivalThreshold": 0.1, "tickIntervalMs": 500 },
        "routes": [
            {
                "id": "R",
                "displayName": "A ↔ C",
                "colorTag": "FF0000",
                "waypoints": [
                    { "name": "A", "position": [0.0, 0.0] },
                    { "name": "B", "position": [1.0, 0.0] },
                    { "name": "C", "position": [2.0, 0.0] }
                ]
            }
        ],
        "buses": [
            { "id": "BUS001", "routeId": "R", "occupied": 3, "capacity": 10, "driverName": "Ibrahim Musa", "status": "Delayed" }
        ],
        "tickets": { "TCK001": "BUS001" }
    }"#;

    #[test]
    fn defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(2));
        assert_eq!(config.admin_code, "admin123");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_settings() {
        let bad = [
            SimulationConfig {
                speed: 0.0,
                ..Default::default()
            },
            SimulationConfig {
                speed: 1.5,
                ..Default::default()
            },
            SimulationConfig {
                speed: f64::NAN,
                ..Default::default()
            },
            SimulationConfig {
                arrival_threshold: -1.0,
                ..Default::default()
            },
            SimulationConfig {
                tick_interval_ms: 0,
                ..Default::default()
            },
            SimulationConfig {
                admin_code: "  ".into(),
                ..Default::default()
            },
        ];

        for config in bad {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "{config:?}");
        }
    }

    #[test]
    fn builds_network_from_json() {
        let network = NetworkConfig::from_json(SMALL).unwrap().build(Utc::now()).unwrap();

        assert_eq!(network.config.tick_interval(), Duration::from_millis(500));
        assert_eq!(network.config.admin_code, "admin123");
        assert_eq!(network.catalog.list_routes()[0].color_tag(), Some("FF0000"));

        let bus = network.simulator.get_bus(&BusIdentifier::new("BUS001")).unwrap();
        assert_eq!(bus.status, BusStatus::Delayed);
        assert_eq!(bus.direction, Direction::Forward);
        assert_eq!(&*bus.current_location, "A");
    }

    #[test]
    fn ticket_registry_from_json() {
        use crate::access::TicketRegistry;

        let json = SMALL.replace(
            r#"{ "TCK001": "BUS001" }"#,
            r#"{ "TCK001": "BUS001", "TCK002": "BUS001" }"#,
        );
        let registry = NetworkConfig::from_json(&json).unwrap().ticket_registry();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.bus_for(&TicketIdentifier::new("TCK002")),
            Some(BusIdentifier::new("BUS001"))
        );
        assert_eq!(registry.bus_for(&TicketIdentifier::new("tck001")), None);
    }

    #[test]
    fn short_route_fails_the_load() {
        let json = r#"{ "routes": [ { "id": "R", "displayName": "R", "waypoints": [ { "name": "A", "position": [0, 0] } ] } ] }"#;
        let result = NetworkConfig::from_json(json).unwrap().build(Utc::now());
        assert!(matches!(
            result,
            Err(ConfigError::Transit(TransitError::InvalidRouteDefinition { .. }))
        ));
    }

    #[test]
    fn overfull_bus_fails_the_load() {
        let json = SMALL.replace("\"occupied\": 3", "\"occupied\": 30");
        let result = NetworkConfig::from_json(&json).unwrap().build(Utc::now());
        assert!(matches!(result, Err(ConfigError::Transit(TransitError::InvalidData(_)))));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(NetworkConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file() {
        let result = NetworkConfig::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
