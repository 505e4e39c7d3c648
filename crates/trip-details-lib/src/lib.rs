//! Trip Details Library - Reactive state for a trip planning screen
//!
//! This library turns a trip's editable waypoint list into the derived values
//! a details screen shows: total travel distance and directions between
//! consecutive stops. Distance and routing are delegated to a
//! [`MapDataProvider`]; persistence to a [`DataModel`].
//!
//! # Architecture
//!
//! - **[`Observable`]**: shared value with explicit [`Subscription`] handles,
//!   grouped per component in a [`DisposeBag`]
//! - **[`Trip`]** / **[`Waypoint`]**: the model being edited
//! - **[`TripDetailsInteractor`]**: derivation pipeline and trip mutations
//! - **[`TripDetailsPresenter`]**: display formatting and user intents
//! - **[`GreatCircleProvider`]**: offline provider using great-circle legs
//!
//! # Data flow
//!
//! Trip → interactor (mirror, request distance/directions) → presenter
//! (format) → view. User actions go view → presenter → interactor → trip and
//! come back around through the trip's observables.

mod great_circle;
mod interactor;
mod measurement;
mod observable;
mod presenter;
mod services;
mod trip;
mod waypoint;

// Public API exports
pub use great_circle::{GreatCircleConfig, GreatCircleProvider, haversine_distance};
pub use interactor::{DerivedUpdate, TripDetailsInteractor, WaypointRefresher};
pub use measurement::{Length, LengthFormatter, UnitSystem};
pub use observable::{DisposeBag, Observable, Subscription};
pub use presenter::{
    CALCULATING_LABEL, NameBinding, TripDetailsPresenter, TripDetailsRouter, WaypointCell,
    format_distance_label,
};
pub use services::{DataModel, DirectionsError, MapDataProvider, RouteLeg};
#[cfg(feature = "serde")]
pub use trip::TripRecord;
pub use trip::{Trip, move_offsets, remove_offsets};
pub use waypoint::{DEFAULT_LOCATION, PLACEHOLDER_NAME, Waypoint};

/// Error types for the trip details library
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("No tokio runtime to run map data requests on: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
