//! Navigation for the terminal front end

use std::sync::Arc;
use trip_details_lib::{Trip, TripDetailsRouter, Waypoint};

/// Builds [`WaypointEditor`]s for the trip on screen
pub struct TerminalRouter {
    trip: Arc<Trip>,
}

impl TerminalRouter {
    pub fn new(trip: Arc<Trip>) -> Self {
        Self { trip }
    }
}

impl TripDetailsRouter for TerminalRouter {
    type Destination = WaypointEditor;

    fn make_waypoint_view(&self, offset: usize, waypoint: &Waypoint) -> WaypointEditor {
        tracing::debug!("Opening editor for waypoint #{} {:?}", offset, waypoint.name);
        WaypointEditor {
            trip: Arc::clone(&self.trip),
            offset,
        }
    }
}

/// Edits one waypoint in place.
///
/// Edits do not notify anyone; dismissing the cell that produced the editor
/// pushes them through the pipeline.
pub struct WaypointEditor {
    trip: Arc<Trip>,
    offset: usize,
}

impl WaypointEditor {
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns false when the waypoint no longer exists
    pub fn rename(&self, name: &str) -> bool {
        let name = name.trim().to_string();
        self.trip.edit_waypoint(self.offset, |waypoint| waypoint.name = name)
    }

    pub fn relocate(&self, latitude: f64, longitude: f64) -> bool {
        self.trip.edit_waypoint(self.offset, |waypoint| {
            waypoint.location = geo::Point::new(longitude, latitude);
        })
    }
}
