//! Routes and their waypoints.
//!
//! Positions are `geo::Point`s in catalog units. Which axis carries latitude is
//! fixed once per catalog by whoever loads it and is never interpreted here.

use std::sync::Arc;

use geo::{LineString, Point};

use crate::identifiers::RouteIdentifier;
use crate::models::types::*;

/// A named stop on a route
#[derive(Clone, Debug, PartialEq)]
pub struct Waypoint {
    pub name: Arc<str>,
    pub position: Point,
}

impl Waypoint {
    pub fn new(name: impl Into<Arc<str>>, position: Point) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// An immutable, ordered sequence of at least two waypoints
#[derive(Clone, Debug)]
pub struct Route {
    id: RouteIdentifier,
    display_name: Arc<str>,
    color_tag: Option<Arc<str>>,
    waypoints: Vec<Waypoint>,
}

impl Route {
    /// Build a route, rejecting fewer than two waypoints, non-finite positions
    /// and consecutive waypoints at the same position.
    pub fn new(
        id: RouteIdentifier,
        display_name: impl Into<Arc<str>>,
        color_tag: Option<Arc<str>>,
        waypoints: Vec<Waypoint>,
    ) -> Result<Self> {
        let invalid = |reason: String| TransitError::InvalidRouteDefinition {
            route: id.clone(),
            reason,
        };

        if waypoints.len() < 2 {
            return Err(invalid(format!(
                "expected at least 2 waypoints, got {}",
                waypoints.len()
            )));
        }

        if let Some(bad) = waypoints
            .iter()
            .find(|w| !w.position.x().is_finite() || !w.position.y().is_finite())
        {
            return Err(invalid(format!("waypoint {:?} has a non-finite position", bad.name)));
        }

        if let Some(pair) = waypoints
            .windows(2)
            .find(|pair| pair[0].position == pair[1].position)
        {
            return Err(invalid(format!(
                "degenerate segment between {:?} and {:?}",
                pair[0].name, pair[1].name
            )));
        }

        Ok(Self {
            id,
            display_name: display_name.into(),
            color_tag,
            waypoints,
        })
    }

    pub fn id(&self) -> &RouteIdentifier {
        &self.id
    }

    /// Display name (e.g., "City Center ↔ Airport")
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Optional color tag for display (e.g., "FF0000")
    pub fn color_tag(&self) -> Option<&str> {
        self.color_tag.as_deref()
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn waypoint(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false; routes hold at least two waypoints
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// First or last waypoint, where a bus turns around
    pub fn is_terminal(&self, index: usize) -> bool {
        index == 0 || index + 1 == self.waypoints.len()
    }

    /// Index of the waypoint a bus at `index` heading in `direction` drives to next.
    ///
    /// Going forward from the last index wraps to 0 and going backward from 0
    /// wraps to the last index; buses never sit at a terminal with an outward
    /// direction because they turn around on arrival there.
    pub fn target_index(&self, index: usize, direction: Direction) -> usize {
        let n = self.waypoints.len();
        match direction {
            Direction::Forward => (index + 1) % n,
            Direction::Backward => {
                if index == 0 {
                    n - 1
                } else {
                    index - 1
                }
            }
        }
    }

    /// Physical path of the route through its waypoints
    pub fn geometry(&self) -> LineString {
        self.waypoints.iter().map(|w| w.position.0).collect()
    }
}
