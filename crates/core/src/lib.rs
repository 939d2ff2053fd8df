//! Live bus tracking engine: route catalog, fleet simulation and gated viewer
//! sessions.

pub mod access;
pub mod config;
pub mod demo;
pub mod fleet;
pub mod session;
pub mod ticker;

// Re-export transit from the transit crate
pub use bustrack_transit as transit;

pub use access::{
    AccessError, AccessGate, Capability, Credential, StaticTicketRegistry, TicketRegistry,
};
pub use config::{ConfigError, Network, NetworkConfig, SimulationConfig};
pub use fleet::{Bus, BusSpec, FleetCommand, FleetError, FleetSimulator, FleetSnapshot, TickReport};
pub use session::{
    BusView, FleetSummary, RouteSummary, SessionError, TrackingService, TrackingSession,
};
pub use ticker::Ticker;
