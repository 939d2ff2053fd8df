//! Planar distance helpers shared by the spatial index and the simulator.

use geo::{EuclideanDistance, Line, Point};

/// Straight-line distance between two points in catalog units
pub fn distance(p1: Point, p2: Point) -> f64 {
    p1.euclidean_distance(&p2)
}

/// Distance from a point to the closest point of a segment
pub fn distance_to_segment(point: Point, segment: Line) -> f64 {
    point.euclidean_distance(&segment)
}
