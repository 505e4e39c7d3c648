//! Contracts for the collaborators the details screen talks to
//!
//! - [`MapDataProvider`]: computes distance and directions for an ordered
//!   list of waypoints, asynchronously.
//! - [`DataModel`]: persists trips.

use crate::measurement::Length;
use crate::waypoint::Waypoint;
use async_trait::async_trait;
use geo::LineString;
use std::time::Duration;

/// One segment of directions, between two consecutive waypoints
#[derive(Clone, Debug, PartialEq)]
pub struct RouteLeg {
    pub source: Waypoint,
    pub destination: Waypoint,
    pub distance: Length,
    pub expected_travel_time: Duration,
    /// Path to draw on a map (x = longitude, y = latitude)
    pub path: LineString<f64>,
}

/// Reasons a provider may fail to produce directions
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectionsError {
    #[error("No route from {from:?} to {to:?}")]
    NoRoute { from: String, to: String },

    #[error("Waypoint {name:?} has an invalid coordinate")]
    InvalidCoordinate { name: String },

    #[error("Directions unavailable: {0}")]
    Unavailable(String),
}

/// Distance and routing service
#[async_trait]
pub trait MapDataProvider: Send + Sync {
    /// Total travel distance in meters over the ordered waypoints.
    ///
    /// Never fails: implementations fall back to a defined value (usually 0)
    /// when they cannot compute a real one.
    async fn total_distance(&self, waypoints: &[Waypoint]) -> f64;

    /// Directions between each pair of consecutive waypoints
    async fn directions(&self, waypoints: &[Waypoint]) -> Result<Vec<RouteLeg>, DirectionsError>;
}

/// Persistence collaborator.
///
/// `save` has no return value: failures are handled (logged, retried, ...)
/// by the implementation.
pub trait DataModel: Send + Sync {
    fn save(&self);
}
