//! Turn a GPX file into a trip.
//!
//! Explicit `<wpt>` entries are preferred. Files without them fall back to
//! route points and finally to track points, so a recorded track still opens
//! as a (possibly long) list of stops.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;
use trip_details_lib::{Trip, Waypoint};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GPX parse error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("GPX file contains no waypoints, routes or tracks")]
    NoWaypoints,
}

/// Read the GPX file at `path` into a new trip
pub fn import_gpx(path: &Path) -> Result<Trip, ImportError> {
    let file = File::open(path)?;
    let fallback_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Imported Trip".to_string());
    let trip = read_trip(BufReader::new(file), &fallback_name)?;
    tracing::info!(
        "Imported {} waypoint(s) from {:?} as {:?}",
        trip.waypoints().len(),
        path,
        trip.name()
    );
    Ok(trip)
}

pub fn read_trip<R: Read>(reader: R, fallback_name: &str) -> Result<Trip, ImportError> {
    let gpx = gpx::read(reader)?;
    trip_from_gpx(&gpx, fallback_name)
}

pub fn trip_from_gpx(gpx: &gpx::Gpx, fallback_name: &str) -> Result<Trip, ImportError> {
    let points: Vec<&gpx::Waypoint> = if !gpx.waypoints.is_empty() {
        gpx.waypoints.iter().collect()
    } else if gpx.routes.iter().any(|route| !route.points.is_empty()) {
        gpx.routes.iter().flat_map(|route| &route.points).collect()
    } else {
        gpx.tracks
            .iter()
            .flat_map(|track| &track.segments)
            .flat_map(|segment| &segment.points)
            .collect()
    };

    if points.is_empty() {
        return Err(ImportError::NoWaypoints);
    }

    let waypoints = points
        .into_iter()
        .enumerate()
        .map(|(i, point)| {
            let location = point.point();
            let name = point
                .name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| format!("Stop {}", i + 1));
            Waypoint::new(name, location.y(), location.x())
        })
        .collect();

    let name = gpx
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.name.clone())
        .or_else(|| gpx.routes.iter().find_map(|route| route.name.clone()))
        .or_else(|| gpx.tracks.iter().find_map(|track| track.name.clone()))
        .unwrap_or_else(|| fallback_name.to_string());

    Ok(Trip::new(name, waypoints))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAYPOINTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <metadata><name>Coast Run</name></metadata>
  <wpt lat="37.8199" lon="-122.4783"><name>Bridge</name></wpt>
  <wpt lat="37.4636" lon="-122.4286"></wpt>
</gpx>"#;

    const TRACK_ONLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <trkseg>
      <trkpt lat="10.0" lon="20.0"></trkpt>
      <trkpt lat="10.5" lon="20.5"></trkpt>
      <trkpt lat="11.0" lon="21.0"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    const EMPTY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"></gpx>"#;

    #[test]
    fn test_waypoints_are_imported_in_order() {
        let trip = read_trip(WAYPOINTS.as_bytes(), "fallback").unwrap();
        assert_eq!(trip.name(), "Coast Run");

        let waypoints = trip.waypoints();
        assert_eq!(waypoints.len(), 2);
        assert_eq!(waypoints[0].name, "Bridge");
        assert!((waypoints[0].latitude() - 37.8199).abs() < 1e-9);
        assert!((waypoints[0].longitude() + 122.4783).abs() < 1e-9);
        assert_eq!(waypoints[1].name, "Stop 2");
    }

    #[test]
    fn test_track_points_are_the_last_resort() {
        let trip = read_trip(TRACK_ONLY.as_bytes(), "morning-ride").unwrap();
        assert_eq!(trip.name(), "morning-ride");
        let names: Vec<_> = trip.waypoints().into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["Stop 1", "Stop 2", "Stop 3"]);
    }

    #[test]
    fn test_empty_file_is_rejected() {
        assert!(matches!(
            read_trip(EMPTY.as_bytes(), "x"),
            Err(ImportError::NoWaypoints)
        ));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(matches!(
            read_trip("not xml".as_bytes(), "x"),
            Err(ImportError::Gpx(_))
        ));
    }
}
