//! Trip Details - terminal application
//!
//! Wires the trip details pipeline from `trip_details_lib` to a JSON trip
//! store, GPX import and a line-based terminal view.

pub mod app;
pub mod logging;

pub use app::TripDetailsApp;
pub use app::settings::Settings;

use app::gpx_import::ImportError;
use app::storage::StoreError;
use thiserror::Error;
use trip_details_lib::PlannerError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to import GPX: {0}")]
    Import(#[from] ImportError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No trip #{index} in the store ({count} trip(s) available)")]
    NoSuchTrip { index: usize, count: usize },
}

/// Open the configured trip and run the interactive screen on stdin/stdout
pub async fn run(settings: Settings) -> Result<(), AppError> {
    let mut app = TripDetailsApp::new(&settings)?;
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    app.run(input, tokio::io::stdout()).await
}
