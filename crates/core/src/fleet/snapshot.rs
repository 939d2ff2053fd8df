use bustrack_transit::BusIdentifier;
use chrono::{DateTime, Utc};

use crate::fleet::bus::Bus;

/// Immutable copy of the whole fleet, published after every change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FleetSnapshot {
    version: u64,
    taken_at: Option<DateTime<Utc>>,
    buses: Vec<Bus>,
}

impl FleetSnapshot {
    pub(crate) fn new(version: u64, taken_at: Option<DateTime<Utc>>, buses: Vec<Bus>) -> Self {
        Self {
            version,
            taken_at,
            buses,
        }
    }

    /// Increases by one with every published change; 0 is the empty fleet
    /// before anything was published.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Timestamp of the tick that produced this snapshot, if any tick ran yet.
    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.taken_at
    }

    /// Buses in fleet order.
    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn get(&self, id: &BusIdentifier) -> Option<&Bus> {
        self.buses.iter().find(|bus| &bus.id == id)
    }

    pub fn contains(&self, id: &BusIdentifier) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }
}
