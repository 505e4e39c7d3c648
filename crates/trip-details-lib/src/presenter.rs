//! Trip details presenter
//!
//! Projects interactor state into display-ready values and forwards user
//! intents back to the interactor. The presenter owns its interactor; tearing
//! the presenter down tears both down.

use crate::interactor::{DerivedUpdate, TripDetailsInteractor, WaypointRefresher};
use crate::measurement::{Length, LengthFormatter};
use crate::observable::{DisposeBag, Observable};
use crate::services::RouteLeg;
use crate::waypoint::Waypoint;

/// Shown until the first distance result arrives
pub const CALCULATING_LABEL: &str = "Calculating...";

/// Builds navigation destinations for the details screen
pub trait TripDetailsRouter {
    /// Whatever the UI uses as a screen for editing one waypoint
    type Destination;

    /// Waypoints are identified by position, so the editor gets both the
    /// offset in the trip and the waypoint found there
    fn make_waypoint_view(&self, offset: usize, waypoint: &Waypoint) -> Self::Destination;
}

/// Read/write accessor pair for the editable trip name
#[derive(Clone, Debug)]
pub struct NameBinding {
    name: Observable<String>,
}

impl NameBinding {
    pub fn get(&self) -> String {
        self.name.get()
    }

    /// Same effect as `TripDetailsInteractor::set_trip_name`
    pub fn set(&self, name: impl Into<String>) {
        self.name.set(name.into());
    }
}

/// One entry of the waypoint list: a title and where selecting it leads
#[derive(Debug)]
pub struct WaypointCell<D> {
    pub title: String,
    pub destination: D,
    on_dismiss: WaypointRefresher,
}

impl<D> WaypointCell<D> {
    /// The user navigated back from the destination: push any in-place edits
    /// through the pipeline. Hands the destination back.
    pub fn dismiss(self) -> D {
        self.on_dismiss.refresh();
        self.destination
    }
}

/// Format the distance label for a (possibly not yet known) total
pub fn format_distance_label(formatter: &LengthFormatter, distance: Option<Length>) -> String {
    match distance {
        Some(length) => format!("Total Distance: {}", formatter.format(length)),
        None => CALCULATING_LABEL.to_string(),
    }
}

pub struct TripDetailsPresenter<R: TripDetailsRouter> {
    interactor: TripDetailsInteractor,
    router: R,
    formatter: LengthFormatter,

    trip_name: Observable<String>,
    distance_label: Observable<String>,
    waypoints: Observable<Vec<Waypoint>>,

    subscriptions: DisposeBag,
}

impl<R: TripDetailsRouter> TripDetailsPresenter<R> {
    pub fn new(interactor: TripDetailsInteractor, router: R) -> Self {
        Self::with_formatter(interactor, router, LengthFormatter::default())
    }

    pub fn with_formatter(
        interactor: TripDetailsInteractor,
        router: R,
        formatter: LengthFormatter,
    ) -> Self {
        let trip_name = Observable::new(String::new());
        let distance_label = Observable::new(CALCULATING_LABEL.to_string());
        let waypoints = Observable::new(Vec::new());
        let mut subscriptions = DisposeBag::new();

        let target = trip_name.clone();
        interactor
            .trip_name_publisher()
            .subscribe(move |name| target.set(name.clone()))
            .store_in(&mut subscriptions);

        let target = distance_label.clone();
        interactor
            .total_distance_publisher()
            .subscribe(move |distance| target.set(format_distance_label(&formatter, *distance)))
            .store_in(&mut subscriptions);

        let target = waypoints.clone();
        interactor
            .waypoints_publisher()
            .subscribe(move |list| target.set(list.clone()))
            .store_in(&mut subscriptions);

        Self {
            interactor,
            router,
            formatter,
            trip_name,
            distance_label,
            waypoints,
            subscriptions,
        }
    }

    pub fn interactor(&self) -> &TripDetailsInteractor {
        &self.interactor
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn formatter(&self) -> &LengthFormatter {
        &self.formatter
    }

    // --- Display state ---

    pub fn name_binding(&self) -> NameBinding {
        NameBinding {
            name: self.interactor.trip_name_publisher().clone(),
        }
    }

    pub fn trip_name(&self) -> String {
        self.trip_name.get()
    }

    pub fn trip_name_publisher(&self) -> &Observable<String> {
        &self.trip_name
    }

    pub fn distance_label(&self) -> String {
        self.distance_label.get()
    }

    pub fn distance_label_publisher(&self) -> &Observable<String> {
        &self.distance_label
    }

    pub fn waypoints(&self) -> Vec<Waypoint> {
        self.waypoints.get()
    }

    pub fn waypoints_publisher(&self) -> &Observable<Vec<Waypoint>> {
        &self.waypoints
    }

    /// Legs to draw on the map
    pub fn directions(&self) -> Vec<RouteLeg> {
        self.interactor.directions()
    }

    // --- User intents ---

    pub fn save(&self) {
        self.interactor.save();
    }

    pub fn add_waypoint(&self) {
        self.interactor.add_waypoint();
    }

    pub fn did_move_waypoint(&self, from_offsets: &[usize], to_offset: usize) {
        self.interactor.move_waypoint(from_offsets, to_offset);
    }

    pub fn did_delete_waypoint(&self, at_offsets: &[usize]) {
        self.interactor.delete_waypoint(at_offsets);
    }

    /// List entry for the waypoint at `offset`, leading to the router's
    /// editor for it
    pub fn cell(&self, offset: usize, waypoint: &Waypoint) -> WaypointCell<R::Destination> {
        WaypointCell {
            title: waypoint.name.clone(),
            destination: self.router.make_waypoint_view(offset, waypoint),
            on_dismiss: self.interactor.waypoint_refresher(),
        }
    }

    // --- Driving the pipeline ---

    pub fn process_completed(&mut self) -> usize {
        self.interactor.process_completed()
    }

    pub async fn next_update(&mut self) -> Option<DerivedUpdate> {
        self.interactor.next_update().await
    }

    pub async fn settle(&mut self) {
        self.interactor.settle().await;
    }

    /// Release every subscription held by this screen and stop derivation
    pub fn dispose(&mut self) {
        self.subscriptions.dispose();
        self.interactor.dispose();
    }
}

impl<R: TripDetailsRouter> Drop for TripDetailsPresenter<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactor::tests::{CountingModel, StubProvider, abc_trip};
    use crate::measurement::UnitSystem;
    use crate::trip::Trip;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Records which waypoints were opened
    #[derive(Default)]
    struct RecordingRouter {
        opened: AtomicUsize,
    }

    impl TripDetailsRouter for RecordingRouter {
        type Destination = String;

        fn make_waypoint_view(&self, offset: usize, waypoint: &Waypoint) -> String {
            self.opened.fetch_add(1, Ordering::SeqCst);
            format!("editor for #{} {}", offset, waypoint.name)
        }
    }

    fn presenter_for(
        trip: Arc<Trip>,
        provider: Arc<StubProvider>,
    ) -> TripDetailsPresenter<RecordingRouter> {
        let interactor =
            TripDetailsInteractor::new(trip, Arc::new(CountingModel::default()), provider)
                .unwrap();
        TripDetailsPresenter::new(interactor, RecordingRouter::default())
    }

    #[tokio::test]
    async fn test_distance_label_starts_calculating() {
        let mut presenter = presenter_for(abc_trip(), Arc::new(StubProvider::new(1500.0)));
        assert_eq!(presenter.distance_label(), CALCULATING_LABEL);

        presenter.settle().await;

        assert_eq!(presenter.distance_label(), "Total Distance: 3.00 km");
    }

    #[tokio::test]
    async fn test_distance_label_uses_formatter_units() {
        let interactor = TripDetailsInteractor::new(
            abc_trip(),
            Arc::new(CountingModel::default()),
            Arc::new(StubProvider::new(1609.344)),
        )
        .unwrap();
        let mut presenter = TripDetailsPresenter::with_formatter(
            interactor,
            RecordingRouter::default(),
            LengthFormatter::new(UnitSystem::Imperial),
        );

        presenter.settle().await;

        assert_eq!(presenter.distance_label(), "Total Distance: 2.00 mi");
    }

    #[tokio::test]
    async fn test_name_binding_round_trip() {
        let trip = abc_trip();
        let presenter = presenter_for(trip.clone(), Arc::new(StubProvider::new(1.0)));
        let binding = presenter.name_binding();
        assert_eq!(binding.get(), "Road Trip");

        binding.set("Beach Trip");

        assert_eq!(presenter.trip_name(), "Beach Trip");
        assert_eq!(presenter.interactor().trip_name(), "Beach Trip");
        assert_eq!(trip.name(), "Beach Trip");
    }

    #[tokio::test]
    async fn test_set_trip_name_reaches_presenter() {
        let presenter = presenter_for(abc_trip(), Arc::new(StubProvider::new(1.0)));
        presenter.interactor().set_trip_name("Beach Trip");
        assert_eq!(presenter.trip_name(), "Beach Trip");
    }

    #[tokio::test]
    async fn test_intents_are_forwarded() {
        let trip = abc_trip();
        let presenter = presenter_for(trip.clone(), Arc::new(StubProvider::new(1.0)));

        presenter.did_move_waypoint(&[0], 2);
        let names: Vec<String> = presenter.waypoints().into_iter().map(|w| w.name).collect();
        assert_eq!(names, ["B", "C", "A"]);

        presenter.did_delete_waypoint(&[1]);
        assert_eq!(presenter.waypoints().len(), 2);

        presenter.add_waypoint();
        assert_eq!(presenter.waypoints(), trip.waypoints());
        assert_eq!(presenter.waypoints().len(), 3);
    }

    #[tokio::test]
    async fn test_save_goes_to_model() {
        let model = Arc::new(CountingModel::default());
        let interactor = TripDetailsInteractor::new(
            abc_trip(),
            model.clone(),
            Arc::new(StubProvider::new(1.0)),
        )
        .unwrap();
        let presenter = TripDetailsPresenter::new(interactor, RecordingRouter::default());

        presenter.save();

        assert_eq!(model.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cell_dismiss_rederives_edits() {
        let trip = abc_trip();
        let provider = Arc::new(StubProvider::new(10.0));
        let mut presenter = presenter_for(trip.clone(), provider.clone());
        presenter.settle().await;
        let calls_before = provider.distance_calls.load(Ordering::SeqCst);

        let first = presenter.waypoints()[0].clone();
        let cell = presenter.cell(0, &first);
        assert_eq!(cell.title, "A");
        assert_eq!(cell.destination, "editor for #0 A");
        assert_eq!(presenter.router().opened.load(Ordering::SeqCst), 1);

        trip.edit_waypoint(0, |w| w.name = "Harbor".into());
        assert_eq!(presenter.waypoints()[0].name, "A");

        let destination = cell.dismiss();
        assert_eq!(destination, "editor for #0 A");
        assert_eq!(presenter.waypoints()[0].name, "Harbor");

        presenter.settle().await;
        assert_eq!(
            provider.distance_calls.load(Ordering::SeqCst),
            calls_before + 1
        );
    }

    #[tokio::test]
    async fn test_directions_failure_is_not_surfaced() {
        let provider = Arc::new(StubProvider::new(5.0));
        provider
            .fail_directions
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let mut presenter = presenter_for(abc_trip(), provider);

        presenter.settle().await;

        assert!(presenter.directions().is_empty());
        assert_eq!(presenter.distance_label(), "Total Distance: 10 m");
    }

    #[tokio::test]
    async fn test_dispose_releases_everything() {
        let trip = abc_trip();
        let mut presenter = presenter_for(trip.clone(), Arc::new(StubProvider::new(1.0)));

        presenter.dispose();
        trip.set_name("After teardown");
        trip.add_waypoint();

        assert_eq!(trip.name_publisher().subscriber_count(), 0);
        assert_eq!(trip.waypoints_publisher().subscriber_count(), 0);
        assert_eq!(presenter.trip_name(), "Road Trip");
        assert_eq!(presenter.waypoints().len(), 3);
        assert_eq!(presenter.next_update().await, None);
    }

    #[test]
    fn test_format_distance_label() {
        let formatter = LengthFormatter::default();
        assert_eq!(format_distance_label(&formatter, None), CALCULATING_LABEL);
        assert_eq!(
            format_distance_label(&formatter, Some(Length::from_meters(420.0))),
            "Total Distance: 420 m"
        );
    }
}
