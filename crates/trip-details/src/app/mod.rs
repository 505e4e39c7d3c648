//! Terminal front end for the trip details screen.
//!
//! Reads one command per line while derivation results arrive in the
//! background. Both sources are awaited together and every event is handled
//! on this one task, so the presenter is only ever touched from here.

pub mod gpx_import;
pub mod router;
pub mod settings;
pub mod storage;
pub mod view;

use crate::AppError;
use router::TerminalRouter;
use settings::Settings;
use std::sync::Arc;
use storage::FileDataModel;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use trip_details_lib::{
    DataModel, DerivedUpdate, GreatCircleProvider, MapDataProvider, TripDetailsInteractor,
    TripDetailsPresenter,
};
use view::{Command, HELP};

/// Whether the loop keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

enum Event {
    Line(std::io::Result<Option<String>>),
    Update(Option<DerivedUpdate>),
}

pub struct TripDetailsApp {
    store: Arc<FileDataModel>,
    presenter: TripDetailsPresenter<TerminalRouter>,
}

impl TripDetailsApp {
    /// Open the store, optionally import a GPX file, and wire up the screen
    /// for the selected trip. Must run inside a tokio runtime.
    pub fn new(settings: &Settings) -> Result<Self, AppError> {
        let store = Arc::new(FileDataModel::open(settings.store.clone())?);
        tracing::info!("Using trip store {:?}", store.path());

        let index = match &settings.gpx {
            Some(path) => {
                let trip = gpx_import::import_gpx(path)?;
                let index = store.add_trip(trip);
                store.save();
                index
            }
            None => settings.trip,
        };

        let provider = GreatCircleProvider::new(settings.provider_config());
        tracing::info!(
            "Estimating travel times at {:.1} m/s",
            provider.config().average_speed_mps
        );
        Self::with_provider(store, index, Arc::new(provider), settings)
    }

    pub fn with_provider(
        store: Arc<FileDataModel>,
        index: usize,
        provider: Arc<dyn MapDataProvider>,
        settings: &Settings,
    ) -> Result<Self, AppError> {
        let trip = store.trip(index).ok_or_else(|| AppError::NoSuchTrip {
            index,
            count: store.trips().len(),
        })?;
        tracing::info!("Opening trip #{} {:?}", index, trip.name());

        let model: Arc<dyn DataModel> = store.clone();
        let interactor = TripDetailsInteractor::new(trip, model, provider)?;
        let router = TerminalRouter::new(Arc::clone(interactor.trip()));
        let presenter =
            TripDetailsPresenter::with_formatter(interactor, router, settings.formatter());

        Ok(Self { store, presenter })
    }

    pub fn store(&self) -> &Arc<FileDataModel> {
        &self.store
    }

    pub fn presenter(&self) -> &TripDetailsPresenter<TerminalRouter> {
        &self.presenter
    }

    /// Run the command loop until `quit` or end of input
    pub async fn run<I, O>(&mut self, input: I, mut output: O) -> Result<(), AppError>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        self.presenter.process_completed();
        write_out(&mut output, &view::render(&self.presenter)).await?;

        loop {
            let event = tokio::select! {
                line = lines.next_line() => Event::Line(line),
                update = self.presenter.next_update() => Event::Update(update),
            };

            match event {
                Event::Line(Ok(Some(line))) => {
                    let text = match line.parse::<Command>() {
                        Ok(command) => {
                            let (flow, text) = self.execute(command);
                            if flow == Flow::Quit {
                                break;
                            }
                            text
                        }
                        Err(e) => format!("{}\n", e),
                    };
                    write_out(&mut output, &text).await?;
                }
                Event::Line(Ok(None)) => {
                    // End of input: show the final state before leaving
                    self.presenter.settle().await;
                    write_out(&mut output, &view::render(&self.presenter)).await?;
                    break;
                }
                Event::Line(Err(e)) => return Err(e.into()),
                Event::Update(Some(update)) => {
                    if let Some(text) = self.describe(update) {
                        write_out(&mut output, &text).await?;
                    }
                }
                Event::Update(None) => break,
            }
        }

        self.presenter.dispose();
        Ok(())
    }

    /// Apply one command, returning what to print
    fn execute(&self, command: Command) -> (Flow, String) {
        tracing::debug!(?command, "Executing");
        let text = match command {
            Command::Show => view::render(&self.presenter),
            Command::Rename(name) => {
                self.presenter.name_binding().set(name);
                format!("Trip renamed to {:?}\n", self.presenter.trip_name())
            }
            Command::Add => {
                self.presenter.add_waypoint();
                self.stops_changed()
            }
            Command::Move { from, to } => {
                self.presenter.did_move_waypoint(&from, to);
                self.stops_changed()
            }
            Command::Delete(at) => {
                self.presenter.did_delete_waypoint(&at);
                self.stops_changed()
            }
            Command::EditName { offset, name } => {
                self.edit(offset, |editor| editor.rename(&name))
            }
            Command::EditLocation {
                offset,
                latitude,
                longitude,
            } => self.edit(offset, |editor| editor.relocate(latitude, longitude)),
            Command::Save => {
                self.presenter.save();
                format!("Saved to {}\n", self.store.path().display())
            }
            Command::Help => format!("{}\n", HELP),
            Command::Quit => return (Flow::Quit, String::new()),
        };
        (Flow::Continue, text)
    }

    /// Open the editor for one stop, apply `change`, and navigate back
    fn edit(&self, offset: usize, change: impl FnOnce(&router::WaypointEditor) -> bool) -> String {
        let waypoints = self.presenter.waypoints();
        let Some(waypoint) = waypoints.get(offset) else {
            return format!("There is no stop {}\n", offset + 1);
        };

        let cell = self.presenter.cell(offset, waypoint);
        let changed = change(&cell.destination);
        cell.dismiss();

        if changed {
            self.stops_changed()
        } else {
            format!("There is no stop {}\n", offset + 1)
        }
    }

    fn stops_changed(&self) -> String {
        let mut text = String::new();
        for (offset, waypoint) in self.presenter.waypoints().iter().enumerate() {
            text.push_str(&format!("  {:>2}. {}\n", offset + 1, waypoint.name));
        }
        if self.presenter.interactor().is_calculating() {
            text.push_str("Updating route...\n");
        }
        text
    }

    fn describe(&self, update: DerivedUpdate) -> Option<String> {
        match update {
            DerivedUpdate::Distance => Some(format!("{}\n", self.presenter.distance_label())),
            DerivedUpdate::Directions => {
                let legs = self.presenter.directions().len();
                let waypoints = self.presenter.waypoints_publisher().with(|list| list.len());
                (legs == 0 && waypoints >= 2).then(|| "No directions available\n".to_string())
            }
            DerivedUpdate::Discarded => None,
        }
    }
}

async fn write_out<O: AsyncWrite + Unpin>(output: &mut O, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}
