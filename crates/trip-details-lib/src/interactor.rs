//! Trip details interactor
//!
//! Owns the derivation pipeline from a trip's waypoints to the total distance
//! and directions shown on the details screen, and mediates every trip
//! mutation made from that screen.
//!
//! # Pipeline
//!
//! Each emission of [`Trip::waypoints_publisher`] (including the interactor's
//! own writes, which come back through the same observable):
//!
//! 1. is mirrored into [`TripDetailsInteractor::waypoints_publisher`] right away;
//! 2. is tagged with a new, increasing generation number;
//! 3. starts one distance request and one directions request on the tokio
//!    runtime.
//!
//! Completed requests are queued and only applied when the owner calls
//! [`process_completed`](TripDetailsInteractor::process_completed),
//! [`next_update`](TripDetailsInteractor::next_update) or
//! [`settle`](TripDetailsInteractor::settle), so derived state is written from
//! the owner's control flow only. A completion tagged with an older generation
//! than the one already applied is discarded. Failed directions are published
//! as an empty list.

use crate::measurement::Length;
use crate::observable::{DisposeBag, Observable};
use crate::services::{DataModel, DirectionsError, MapDataProvider, RouteLeg};
use crate::trip::Trip;
use crate::waypoint::Waypoint;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A finished provider request, waiting to be applied
#[derive(Debug)]
enum Completion {
    Distance {
        generation: u64,
        meters: f64,
    },
    Directions {
        generation: u64,
        result: Result<Vec<RouteLeg>, DirectionsError>,
    },
}

/// What applying one completion did to the derived state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedUpdate {
    Distance,
    Directions,
    /// Superseded by a newer result and dropped
    Discarded,
}

/// Spawned provider requests that have not been reaped yet
#[derive(Clone, Default)]
struct InFlight {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, handle: JoinHandle<()>) {
        let mut handles = self.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    fn take(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut *self.lock())
    }

    fn abort_all(&self) {
        for handle in self.take() {
            handle.abort();
        }
    }
}

/// State captured by the trip subscription
struct Pipeline {
    mirror: Observable<Vec<Waypoint>>,
    provider: Arc<dyn MapDataProvider>,
    runtime: Handle,
    completions: mpsc::UnboundedSender<Completion>,
    issued: Arc<AtomicU64>,
    in_flight: InFlight,
}

impl Pipeline {
    fn derive(&self, waypoints: &[Waypoint]) {
        #[cfg(feature = "profiling")]
        profiling::scope!("interactor::derive");

        self.mirror.set(waypoints.to_vec());
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        if waypoints.len() < 2 {
            tracing::debug!(generation, "Fewer than two waypoints, nothing to route");
            // Send errors only mean the interactor is gone
            let _ = self.completions.send(Completion::Distance {
                generation,
                meters: 0.0,
            });
            let _ = self.completions.send(Completion::Directions {
                generation,
                result: Ok(Vec::new()),
            });
            return;
        }

        tracing::debug!(
            generation,
            waypoints = waypoints.len(),
            "Requesting distance and directions"
        );
        let waypoints: Arc<[Waypoint]> = waypoints.into();

        let distance = {
            let provider = Arc::clone(&self.provider);
            let completions = self.completions.clone();
            let waypoints = Arc::clone(&waypoints);
            self.runtime.spawn(async move {
                let meters = provider.total_distance(&waypoints).await;
                let _ = completions.send(Completion::Distance { generation, meters });
            })
        };
        self.in_flight.push(distance);

        let directions = {
            let provider = Arc::clone(&self.provider);
            let completions = self.completions.clone();
            self.runtime.spawn(async move {
                let result = provider.directions(&waypoints).await;
                let _ = completions.send(Completion::Directions { generation, result });
            })
        };
        self.in_flight.push(directions);
    }
}

/// Re-publishes a trip's waypoints so in-place edits reach the pipeline
#[derive(Clone, Debug)]
pub struct WaypointRefresher {
    waypoints: Observable<Vec<Waypoint>>,
}

impl WaypointRefresher {
    pub fn refresh(&self) {
        self.waypoints.notify();
    }
}

/// Business logic of the trip details screen
pub struct TripDetailsInteractor {
    trip: Arc<Trip>,
    model: Arc<dyn DataModel>,

    waypoints: Observable<Vec<Waypoint>>,
    /// `None` until the first distance result is applied
    total_distance: Observable<Option<Length>>,
    directions: Observable<Vec<RouteLeg>>,

    completions: mpsc::UnboundedReceiver<Completion>,
    issued: Arc<AtomicU64>,
    applied_distance: u64,
    applied_directions: u64,
    in_flight: InFlight,
    subscriptions: DisposeBag,
    disposed: bool,
}

impl TripDetailsInteractor {
    /// Wire the pipeline to `trip` and run a first derivation.
    ///
    /// Must be called from within a tokio runtime, which is where provider
    /// requests are spawned.
    pub fn new(
        trip: Arc<Trip>,
        model: Arc<dyn DataModel>,
        map_info_provider: Arc<dyn MapDataProvider>,
    ) -> crate::Result<Self> {
        let runtime = Handle::try_current()?;
        let (sender, completions) = mpsc::unbounded_channel();
        let waypoints = Observable::new(Vec::new());
        let issued = Arc::new(AtomicU64::new(0));
        let in_flight = InFlight::default();

        let pipeline = Pipeline {
            mirror: waypoints.clone(),
            provider: map_info_provider,
            runtime,
            completions: sender,
            issued: Arc::clone(&issued),
            in_flight: in_flight.clone(),
        };

        let mut subscriptions = DisposeBag::new();
        trip.waypoints_publisher()
            .subscribe(move |waypoints| pipeline.derive(waypoints))
            .store_in(&mut subscriptions);

        Ok(Self {
            trip,
            model,
            waypoints,
            total_distance: Observable::new(None),
            directions: Observable::new(Vec::new()),
            completions,
            issued,
            applied_distance: 0,
            applied_directions: 0,
            in_flight,
            subscriptions,
            disposed: false,
        })
    }

    /// The trip this screen edits
    pub fn trip(&self) -> &Arc<Trip> {
        &self.trip
    }

    // --- Trip name ---

    pub fn trip_name(&self) -> String {
        self.trip.name()
    }

    pub fn trip_name_publisher(&self) -> &Observable<String> {
        self.trip.name_publisher()
    }

    /// Write the name straight to the trip, unvalidated
    pub fn set_trip_name(&self, name: impl Into<String>) {
        self.trip.set_name(name);
    }

    pub fn save(&self) {
        tracing::info!("Saving trip {:?}", self.trip.name());
        self.model.save();
    }

    // --- Waypoint mutations ---

    pub fn add_waypoint(&self) {
        self.trip.add_waypoint();
    }

    pub fn move_waypoint(&self, from_offsets: &[usize], to_offset: usize) {
        self.trip.move_waypoints(from_offsets, to_offset);
    }

    pub fn delete_waypoint(&self, at_offsets: &[usize]) {
        self.trip.remove_waypoints(at_offsets);
    }

    /// Push the current waypoints through the pipeline again, even if they
    /// did not change
    pub fn update_waypoints(&self) {
        self.trip.refresh_waypoints();
    }

    /// Handle that performs [`update_waypoints`](Self::update_waypoints)
    /// without borrowing the interactor
    pub fn waypoint_refresher(&self) -> WaypointRefresher {
        WaypointRefresher {
            waypoints: self.trip.waypoints_publisher().clone(),
        }
    }

    // --- Derived state ---

    pub fn waypoints(&self) -> Vec<Waypoint> {
        self.waypoints.get()
    }

    pub fn waypoints_publisher(&self) -> &Observable<Vec<Waypoint>> {
        &self.waypoints
    }

    /// Latest applied total distance, zero before the first result
    pub fn total_distance(&self) -> Length {
        self.total_distance.get().unwrap_or_default()
    }

    pub fn total_distance_publisher(&self) -> &Observable<Option<Length>> {
        &self.total_distance
    }

    pub fn directions(&self) -> Vec<RouteLeg> {
        self.directions.get()
    }

    pub fn directions_publisher(&self) -> &Observable<Vec<RouteLeg>> {
        &self.directions
    }

    /// Whether results for the latest waypoint sequence are still missing
    pub fn is_calculating(&self) -> bool {
        let latest = self.issued.load(Ordering::SeqCst);
        self.applied_distance < latest || self.applied_directions < latest
    }

    // --- Applying completions ---

    /// Apply every completion that has already arrived, without waiting.
    /// Returns how many were taken off the queue.
    pub fn process_completed(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        let mut count = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.apply(completion);
            count += 1;
        }
        count
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns `None` once the interactor has been disposed.
    pub async fn next_update(&mut self) -> Option<DerivedUpdate> {
        if self.disposed {
            return None;
        }
        let completion = self.completions.recv().await?;
        Some(self.apply(completion))
    }

    /// Wait until every request issued so far has finished, then apply all
    /// results.
    pub async fn settle(&mut self) {
        if self.disposed {
            return;
        }
        for handle in self.in_flight.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Map data request did not complete: {}", e);
            }
        }
        self.process_completed();
    }

    fn apply(&mut self, completion: Completion) -> DerivedUpdate {
        match completion {
            Completion::Distance { generation, meters } => {
                if generation < self.applied_distance {
                    tracing::debug!(
                        generation,
                        applied = self.applied_distance,
                        "Discarding stale distance"
                    );
                    return DerivedUpdate::Discarded;
                }
                self.applied_distance = generation;
                self.total_distance.set(Some(Length::from_meters(meters)));
                DerivedUpdate::Distance
            }
            Completion::Directions { generation, result } => {
                if generation < self.applied_directions {
                    tracing::debug!(
                        generation,
                        applied = self.applied_directions,
                        "Discarding stale directions"
                    );
                    return DerivedUpdate::Discarded;
                }
                self.applied_directions = generation;
                let legs = result.unwrap_or_else(|e| {
                    tracing::warn!(generation, "Directions failed, showing none: {}", e);
                    Vec::new()
                });
                self.directions.set(legs);
                DerivedUpdate::Directions
            }
        }
    }

    // --- Teardown ---

    /// Detach from the trip and cancel outstanding requests. Nothing is
    /// applied to the derived state afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.subscriptions.dispose();
        self.in_flight.abort_all();
        self.completions.close();
        while self.completions.try_recv().is_ok() {}
        tracing::debug!("Trip details interactor disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for TripDetailsInteractor {
    fn drop(&mut self) {
        self.dispose();
    }
}
