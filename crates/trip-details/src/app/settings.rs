use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use trip_details_lib::{GreatCircleConfig, LengthFormatter, UnitSystem};

/// Units requested on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Units {
    /// Follow the region of the `LANG` environment variable
    Auto,
    Metric,
    Imperial,
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Trip Details - plan a trip's stops and see its distance and directions
pub struct Settings {
    /// JSON file holding all trips (default: a file in the per-user config directory)
    #[clap(short, long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Position of the trip to open in the store
    #[clap(short, long, default_value = "0")]
    pub trip: usize,

    /// Import the waypoints of a GPX file as a new trip and open it
    #[clap(short, long, value_name = "FILE")]
    pub gpx: Option<PathBuf>,

    /// Units used to display distances
    #[clap(short, long, value_enum, default_value = "auto")]
    pub units: Units,

    /// Average travel speed for time estimates, in km/h
    #[clap(long, default_value = "50.0", value_parser = parse_speed)]
    pub speed_kmh: f64,

    /// Straight segments per leg when sampling route paths
    #[clap(long, default_value = "16")]
    pub path_samples: usize,
}

impl Settings {
    /// Parse from the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn unit_system(&self) -> UnitSystem {
        match self.units {
            Units::Metric => UnitSystem::Metric,
            Units::Imperial => UnitSystem::Imperial,
            Units::Auto => get_env::<String>("LANG")
                .map(|lang| UnitSystem::from_locale(&lang))
                .unwrap_or_default(),
        }
    }

    pub fn formatter(&self) -> LengthFormatter {
        LengthFormatter::new(self.unit_system())
    }

    pub fn provider_config(&self) -> GreatCircleConfig {
        GreatCircleConfig {
            average_speed_mps: self.speed_kmh / 3.6,
            path_samples: self.path_samples,
        }
    }
}

/// Accepts finite speeds within a plausible travel range
fn parse_speed(text: &str) -> Result<f64, String> {
    const MIN_KMH: f64 = 0.01;
    const MAX_KMH: f64 = 30_000.0;

    let speed: f64 = text.parse().map_err(|e| format!("{e}"))?;
    if (MIN_KMH..=MAX_KMH).contains(&speed) {
        Ok(speed)
    } else {
        Err(format!("speed must be between {MIN_KMH} and {MAX_KMH} km/h"))
    }
}

/// Generic function to get environment variable, parsing it to the desired type.
pub fn get_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
