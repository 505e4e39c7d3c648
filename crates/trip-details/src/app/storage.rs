//! Trip store backed by a single JSON file.
//!
//! The file holds every trip the user has planned. It is read once when the
//! store is opened and rewritten in full on each save. Writes go to a sibling
//! temporary file first and are then renamed over the store, so a crash mid
//! write leaves the previous contents intact.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use trip_details_lib::{DataModel, Trip, TripRecord, Waypoint};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on trip store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed trip store: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk layout
#[derive(Serialize, Deserialize, Default)]
struct StoreFile {
    #[serde(default)]
    trips: Vec<TripRecord>,
}

/// [`DataModel`] that keeps all trips in memory and persists them as JSON
pub struct FileDataModel {
    path: PathBuf,
    trips: Mutex<Vec<Arc<Trip>>>,
}

impl FileDataModel {
    /// Per-user location of the store:
    /// - On Windows: %APPDATA%/TripDetails/trips.json
    /// - Else: $HOME/.config/trip-details/trips.json
    pub fn default_store_path() -> PathBuf {
        if cfg!(windows)
            && let Ok(appdata) = std::env::var("APPDATA")
        {
            return Path::new(&appdata).join("TripDetails").join("trips.json");
        }

        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home)
                .join(".config")
                .join("trip-details")
                .join("trips.json");
        }

        Path::new(".").join("trip-details-trips.json")
    }

    /// Load the store at `path` (or the default location). A missing or
    /// empty file starts from the sample trips.
    pub fn open(path: Option<PathBuf>) -> Result<Self, StoreError> {
        let path = path.unwrap_or_else(Self::default_store_path);

        let records = match fs::read_to_string(&path) {
            Ok(contents) if !contents.trim().is_empty() => {
                serde_json::from_str::<StoreFile>(&contents)?.trips
            }
            Ok(_) => sample_trips(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No trip store at {:?}, starting from samples", path);
                sample_trips()
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Loaded {} trip(s) from {:?}", records.len(), path);
        let trips = records
            .into_iter()
            .map(|record| Arc::new(Trip::from_record(record)))
            .collect();

        Ok(Self {
            path,
            trips: Mutex::new(trips),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn trips(&self) -> Vec<Arc<Trip>> {
        self.lock().clone()
    }

    pub fn trip(&self, index: usize) -> Option<Arc<Trip>> {
        self.lock().get(index).cloned()
    }

    /// Append a trip, returning its position
    pub fn add_trip(&self, trip: Trip) -> usize {
        let mut trips = self.lock();
        trips.push(Arc::new(trip));
        trips.len() - 1
    }

    /// Write every trip to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        let file = StoreFile {
            trips: self.lock().iter().map(|trip| trip.record()).collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!("Wrote {} trip(s) to {:?}", file.trips.len(), self.path);
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<Trip>>> {
        self.trips.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DataModel for FileDataModel {
    fn save(&self) {
        if let Err(e) = self.flush() {
            tracing::error!("Failed to save trips to {:?}: {}", self.path, e);
        }
    }
}

fn sample_trips() -> Vec<TripRecord> {
    vec![TripRecord {
        name: "Bay Area Loop".to_string(),
        waypoints: vec![
            Waypoint::new("Apple Park", 37.334_9, -122.009),
            Waypoint::new("Golden Gate Bridge", 37.819_9, -122.478_3),
            Waypoint::new("Half Moon Bay", 37.463_6, -122.428_6),
        ],
    }]
}
