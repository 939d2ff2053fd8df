use anyhow::{Context, Result};
use bustrack_core::{
    transit::{OccupancyLevel, Route},
    BusView, FleetSummary,
};
use serde_json::{json, Value};
use std::io::Write;

fn level_label(level: OccupancyLevel) -> &'static str {
    match level {
        OccupancyLevel::Low => "low",
        OccupancyLevel::Moderate => "moderate",
        OccupancyLevel::High => "high",
    }
}

/// Convert a bus view to a JSON object
pub fn bus_json(view: &BusView) -> Value {
    let bus = &view.bus;
    json!({
        "id": bus.id.as_str(),
        "route": bus.route_id.as_str(),
        "routeName": view.route_name.as_deref(),
        "position": [bus.position.x(), bus.position.y()],
        "currentLocation": &*bus.current_location,
        "nextStop": view.next_stop.as_deref(),
        "etaSeconds": view.eta.map(|eta| eta.as_secs_f64()),
        "direction": format!("{:?}", bus.direction),
        "status": bus.status.label(),
        "occupied": bus.occupancy.occupied(),
        "capacity": bus.occupancy.capacity(),
        "occupancy": level_label(view.occupancy_level),
        "driver": &*bus.driver_name,
        "lastUpdate": bus.last_update.to_rfc3339(),
    })
}

/// One line of the viewer feed
pub fn frame_json(version: u64, views: &[BusView]) -> Value {
    json!({
        "version": version,
        "buses": views.iter().map(bus_json).collect::<Vec<_>>(),
    })
}

pub fn route_json(route: &Route) -> Value {
    json!({
        "id": route.id().as_str(),
        "name": route.display_name(),
        "color": route.color_tag(),
        "waypoints": route
            .waypoints()
            .iter()
            .map(|w| json!({ "name": &*w.name, "position": [w.position.x(), w.position.y()] }))
            .collect::<Vec<_>>(),
    })
}

pub fn summary_json(summary: &FleetSummary) -> Value {
    json!({
        "version": summary.version,
        "activeBuses": summary.active_buses,
        "onTimeRatio": summary.on_time_ratio,
        "routes": summary
            .routes
            .iter()
            .map(|r| json!({
                "id": r.route_id.as_str(),
                "name": &*r.route_name,
                "activeBuses": r.active_buses,
                "totalCapacity": r.total_capacity,
                "currentOccupancy": r.current_occupancy,
                "loadRatio": r.load_ratio(),
                "delayedBuses": r.delayed_buses,
            }))
            .collect::<Vec<_>>(),
    })
}

/// Write a value as a single JSON line
pub fn write_line(out: &mut impl Write, value: &Value) -> Result<()> {
    serde_json::to_writer(&mut *out, value).context("Failed to serialize output")?;
    writeln!(out).context("Failed to write output")?;
    Ok(())
}
