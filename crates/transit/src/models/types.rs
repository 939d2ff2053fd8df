//! Core data types and enums for bus transit data.

use std::fmt;

use crate::identifiers::*;

// ============================================================================
// Enums
// ============================================================================

/// Travel direction along a route's waypoint sequence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Towards increasing waypoint indices
    #[default]
    Forward,
    /// Towards decreasing waypoint indices
    Backward,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// Punctuality reported for a bus
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BusStatus {
    #[default]
    OnTime,
    Delayed,
}

impl BusStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::OnTime => "On Time",
            Self::Delayed => "Delayed",
        }
    }
}

impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse load classification used by passenger-facing views
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OccupancyLevel {
    /// Under half full
    Low,
    /// Under 80% full
    Moderate,
    High,
}

// ============================================================================
// Data Structures
// ============================================================================

/// Passenger load of a bus.
///
/// Always satisfies `occupied <= capacity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Occupancy {
    occupied: u32,
    capacity: u32,
}

impl Occupancy {
    pub fn new(occupied: u32, capacity: u32) -> Result<Self> {
        if occupied > capacity {
            return Err(TransitError::InvalidData(format!(
                "occupancy {} exceeds capacity {}",
                occupied, capacity
            )));
        }

        Ok(Self { occupied, capacity })
    }

    pub fn occupied(&self) -> u32 {
        self.occupied
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Apply a change in passenger count, clamped to `[0, capacity]`
    pub fn adjust(&self, delta: i64) -> Self {
        let occupied = (self.occupied as i64 + delta).clamp(0, self.capacity as i64) as u32;
        Self { occupied, ..*self }
    }

    /// Fraction of seats in use; an empty-capacity bus counts as full
    pub fn ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        self.occupied as f64 / self.capacity as f64
    }

    pub fn level(&self) -> OccupancyLevel {
        let percentage = self.ratio() * 100.0;
        if percentage < 50.0 {
            OccupancyLevel::Low
        } else if percentage < 80.0 {
            OccupancyLevel::Moderate
        } else {
            OccupancyLevel::High
        }
    }
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.occupied, self.capacity)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Route not found: {0}")]
    RouteNotFound(RouteIdentifier),

    #[error("Invalid route definition for {route}: {reason}")]
    InvalidRouteDefinition {
        route: RouteIdentifier,
        reason: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, TransitError>;
