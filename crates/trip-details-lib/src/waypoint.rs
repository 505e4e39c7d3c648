//! Waypoints: named points along a trip

use geo::Point;

/// Name given to waypoints created from the "Add" action
pub const PLACEHOLDER_NAME: &str = "New Stop";

/// Location used for a new waypoint when the trip has none yet (latitude, longitude)
pub const DEFAULT_LOCATION: (f64, f64) = (37.331676, -122.030189);

/// A named geographic point.
///
/// Waypoints have no identity of their own: a waypoint is "the n-th stop of
/// a trip".
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    pub name: String,
    /// WGS84 position, x = longitude, y = latitude
    pub location: Point<f64>,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            location: Point::new(longitude, latitude),
        }
    }

    /// A "New Stop" placed at `location`
    pub fn placeholder(location: Point<f64>) -> Self {
        Self {
            name: PLACEHOLDER_NAME.to_string(),
            location,
        }
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.location.y()
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.location.x()
    }

    /// Whether the coordinate is a finite position on the globe
    pub fn has_valid_location(&self) -> bool {
        let (lat, lon) = (self.latitude(), self.longitude());
        lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0
    }
}

impl Default for Waypoint {
    fn default() -> Self {
        let (lat, lon) = DEFAULT_LOCATION;
        Self::new(PLACEHOLDER_NAME, lat, lon)
    }
}
