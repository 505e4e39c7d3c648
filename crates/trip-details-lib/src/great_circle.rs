//! Offline map data provider
//!
//! Treats every leg as the great-circle arc between consecutive waypoints.
//! Distances use the Haversine formula; directions carry the arc sampled as
//! a polyline and a travel time derived from a configured average speed.

use crate::measurement::Length;
use crate::services::{DirectionsError, MapDataProvider, RouteLeg};
use crate::waypoint::Waypoint;
use async_trait::async_trait;
use geo::{Coord, LineString};
use std::time::Duration;

/// Earth's radius in meters
const EARTH_RADIUS_M: f64 = 6371000.0;

/// Configuration for [`GreatCircleProvider`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GreatCircleConfig {
    /// Speed used to estimate travel time, in meters per second.
    /// Default: 13.9 (about 50 km/h)
    pub average_speed_mps: f64,
    /// Number of straight segments each leg's path is split into.
    /// Default: 16
    pub path_samples: usize,
}

impl Default for GreatCircleConfig {
    fn default() -> Self {
        Self {
            average_speed_mps: 13.9,
            path_samples: 16,
        }
    }
}

/// [`MapDataProvider`] that needs no network
#[derive(Debug, Clone, Default)]
pub struct GreatCircleProvider {
    config: GreatCircleConfig,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl GreatCircleProvider {
    pub fn new(config: GreatCircleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GreatCircleConfig {
        &self.config
    }

    /// Sum of leg lengths in meters. Legs touching an invalid coordinate are
    /// skipped.
    pub fn distance_meters(&self, waypoints: &[Waypoint]) -> f64 {
        waypoints
            .windows(2)
            .filter_map(|pair| {
                let (a, b) = (&pair[0], &pair[1]);
                if a.has_valid_location() && b.has_valid_location() {
                    Some(haversine_distance(a, b))
                } else {
                    tracing::warn!(
                        "Skipping leg {:?} -> {:?}: invalid coordinate",
                        a.name,
                        b.name
                    );
                    None
                }
            })
            .sum()
    }

    /// Build one leg per consecutive pair
    pub fn legs(&self, waypoints: &[Waypoint]) -> Result<Vec<RouteLeg>, DirectionsError> {
        if let Some(invalid) = waypoints.iter().find(|w| !w.has_valid_location()) {
            return Err(DirectionsError::InvalidCoordinate {
                name: invalid.name.clone(),
            });
        }

        waypoints
            .windows(2)
            .map(|pair| self.leg(&pair[0], &pair[1]))
            .collect()
    }

    fn leg(&self, source: &Waypoint, destination: &Waypoint) -> Result<RouteLeg, DirectionsError> {
        let meters = haversine_distance(source, destination);
        if meters <= f64::EPSILON {
            return Err(DirectionsError::NoRoute {
                from: source.name.clone(),
                to: destination.name.clone(),
            });
        }

        let expected_travel_time = self.travel_time(meters);

        Ok(RouteLeg {
            source: source.clone(),
            destination: destination.clone(),
            distance: Length::from_meters(meters),
            expected_travel_time,
            path: great_circle_path(source, destination, self.config.path_samples.max(1)),
        })
    }

    /// Time to cover `meters` at the configured speed. Unusable speeds give
    /// zero; a quotient too large for a `Duration` saturates.
    fn travel_time(&self, meters: f64) -> Duration {
        let speed = self.config.average_speed_mps;
        if !(speed.is_finite() && speed > 0.0) {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(meters / speed).unwrap_or(Duration::MAX)
    }
}

#[async_trait]
impl MapDataProvider for GreatCircleProvider {
    async fn total_distance(&self, waypoints: &[Waypoint]) -> f64 {
        self.distance_meters(waypoints)
    }

    async fn directions(&self, waypoints: &[Waypoint]) -> Result<Vec<RouteLeg>, DirectionsError> {
        self.legs(waypoints)
    }
}

/// Calculate the Haversine distance between two waypoints in meters
#[inline]
pub fn haversine_distance(p1: &Waypoint, p2: &Waypoint) -> f64 {
    let lat1 = p1.latitude().to_radians();
    let lat2 = p2.latitude().to_radians();
    let delta_lat = (p2.latitude() - p1.latitude()).to_radians();
    let delta_lon = (p2.longitude() - p1.longitude()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Sample the great-circle arc between two waypoints into `segments` pieces
fn great_circle_path(from: &Waypoint, to: &Waypoint, segments: usize) -> LineString<f64> {
    let (lat1, lon1) = (from.latitude().to_radians(), from.longitude().to_radians());
    let (lat2, lon2) = (to.latitude().to_radians(), to.longitude().to_radians());
    let angle = haversine_distance(from, to) / EARTH_RADIUS_M;
    let sin_angle = angle.sin();

    if sin_angle.abs() < 1e-12 {
        // Coincident or antipodal: no unique arc, fall back to the chord
        return LineString::from(vec![
            Coord {
                x: from.longitude(),
                y: from.latitude(),
            },
            Coord {
                x: to.longitude(),
                y: to.latitude(),
            },
        ]);
    }

    let coords = (0..=segments)
        .map(|i| {
            let f = i as f64 / segments as f64;
            let a = ((1.0 - f) * angle).sin() / sin_angle;
            let b = (f * angle).sin() / sin_angle;
            let x = a * lat1.cos() * lon1.cos() + b * lat2.cos() * lon2.cos();
            let y = a * lat1.cos() * lon1.sin() + b * lat2.cos() * lon2.sin();
            let z = a * lat1.sin() + b * lat2.sin();
            Coord {
                x: y.atan2(x).to_degrees(),
                y: z.atan2((x * x + y * y).sqrt()).to_degrees(),
            }
        })
        .collect::<Vec<_>>();

    LineString::from(coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london_paris() -> Vec<Waypoint> {
        vec![
            Waypoint::new("London", 51.5074, -0.1278),
            Waypoint::new("Paris", 48.8566, 2.3522),
        ]
    }

    #[test]
    fn test_london_paris_distance() {
        let provider = GreatCircleProvider::default();
        let meters = provider.distance_meters(&london_paris());
        // Roughly 343 km as the crow flies
        assert!(meters > 340_000.0 && meters < 346_000.0, "{meters}");
    }

    #[test]
    fn test_distance_of_short_sequences_is_zero() {
        let provider = GreatCircleProvider::default();
        assert_eq!(provider.distance_meters(&[]), 0.0);
        assert_eq!(provider.distance_meters(&london_paris()[..1]), 0.0);
    }

    #[test]
    fn test_invalid_leg_is_skipped_for_distance() {
        let provider = GreatCircleProvider::default();
        let mut waypoints = london_paris();
        waypoints.push(Waypoint::new("Nowhere", 123.0, 0.0));
        let with_invalid = provider.distance_meters(&waypoints);
        let without = provider.distance_meters(&london_paris());
        assert!((with_invalid - without).abs() < 1e-6);
    }

    #[test]
    fn test_legs_follow_waypoints() {
        let provider = GreatCircleProvider::new(GreatCircleConfig {
            average_speed_mps: 100.0,
            path_samples: 4,
        });
        assert_eq!(provider.config().path_samples, 4);
        let mut waypoints = london_paris();
        waypoints.push(Waypoint::new("Brussels", 50.8503, 4.3517));

        let legs = provider.legs(&waypoints).unwrap();

        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].source.name, "London");
        assert_eq!(legs[1].destination.name, "Brussels");
        assert_eq!(legs[0].path.0.len(), 5);
        let secs = legs[0].expected_travel_time.as_secs_f64();
        assert!((secs - legs[0].distance.meters() / 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_path_endpoints_match_waypoints() {
        let waypoints = london_paris();
        let path = great_circle_path(&waypoints[0], &waypoints[1], 8);
        let first = path.0.first().unwrap();
        let last = path.0.last().unwrap();
        assert!((first.y - 51.5074).abs() < 1e-9 && (first.x + 0.1278).abs() < 1e-9);
        assert!((last.y - 48.8566).abs() < 1e-9 && (last.x - 2.3522).abs() < 1e-9);
    }

    #[test]
    fn test_coincident_waypoints_have_no_route() {
        let provider = GreatCircleProvider::default();
        let mut waypoints = london_paris();
        waypoints.push(Waypoint::placeholder(waypoints[1].location));

        let err = provider.legs(&waypoints).unwrap_err();
        assert!(matches!(err, DirectionsError::NoRoute { .. }));
    }

    #[test]
    fn test_invalid_coordinate_fails_directions() {
        let provider = GreatCircleProvider::default();
        let waypoints = vec![
            Waypoint::new("A", 0.0, 0.0),
            Waypoint::new("B", 0.0, 200.0),
        ];
        assert_eq!(
            provider.legs(&waypoints),
            Err(DirectionsError::InvalidCoordinate { name: "B".into() })
        );
    }

    #[test]
    fn test_tiny_speed_saturates_travel_time() {
        let provider = GreatCircleProvider::new(GreatCircleConfig {
            average_speed_mps: 1e-300,
            path_samples: 2,
        });
        let legs = provider.legs(&london_paris()).unwrap();
        assert_eq!(legs[0].expected_travel_time, Duration::MAX);
    }

    #[test]
    fn test_unusable_speed_gives_zero_travel_time() {
        for speed in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let provider = GreatCircleProvider::new(GreatCircleConfig {
                average_speed_mps: speed,
                path_samples: 2,
            });
            let legs = provider.legs(&london_paris()).unwrap();
            assert_eq!(legs[0].expected_travel_time, Duration::ZERO, "{speed}");
        }
    }

    #[tokio::test]
    async fn test_provider_trait_delegates() {
        let provider: &dyn MapDataProvider = &GreatCircleProvider::default();
        let waypoints = london_paris();
        let meters = provider.total_distance(&waypoints).await;
        let legs = provider.directions(&waypoints).await.unwrap();
        assert_eq!(legs.len(), 1);
        assert!((legs[0].distance.meters() - meters).abs() < 1e-6);
    }
}
