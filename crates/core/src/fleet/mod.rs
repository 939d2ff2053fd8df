pub mod bus;
pub mod motion;
pub mod simulator;
pub mod snapshot;

pub use bus::{Bus, BusSpec};
pub use motion::{Arrival, BusFault, Motion};
pub use simulator::{FleetCommand, FleetError, FleetSimulator, TickReport};
pub use snapshot::FleetSnapshot;
