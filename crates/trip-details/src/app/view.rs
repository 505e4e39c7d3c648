//! Text rendering of the details screen and parsing of user commands.
//!
//! Users count waypoints from 1; everything past [`Command::from_str`] uses
//! 0-based offsets.

use geo::{BoundingRect, MultiLineString, MultiPoint, Rect};
use std::fmt::Write as _;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use trip_details_lib::{RouteLeg, TripDetailsPresenter, TripDetailsRouter, Waypoint};

pub const HELP: &str = "\
Commands:
  show                       redraw the trip
  name <text>                rename the trip
  add                        append a new stop
  move <i[,j..]> <to>        move stops so they start at position <to>
  delete <i[,j..]>           remove stops
  edit <i> name <text>       rename a stop
  edit <i> at <lat> <lon>    move a stop to a new coordinate
  save                       write all trips to the store
  help                       show this list
  quit                       leave (also Ctrl-D)";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Rename(String),
    Add,
    Move { from: Vec<usize>, to: usize },
    Delete(Vec<usize>),
    EditName { offset: usize, name: String },
    EditLocation { offset: usize, latitude: f64, longitude: f64 },
    Save,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Unknown command {0:?}, try 'help'")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Not a stop number: {0:?} (stops are numbered from 1)")]
    BadIndex(String),

    #[error("Not a number: {0:?}")]
    BadNumber(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" | "show" | "ls" => Ok(Command::Show),
            "name" if !rest.is_empty() => Ok(Command::Rename(rest.to_string())),
            "name" => Err(CommandError::Usage("name <text>")),
            "add" => Ok(Command::Add),
            "move" | "mv" => {
                let mut args = rest.split_whitespace();
                match (args.next(), args.next(), args.next()) {
                    (Some(from), Some(to), None) => Ok(Command::Move {
                        from: parse_offsets(from)?,
                        to: parse_offset(to)?,
                    }),
                    _ => Err(CommandError::Usage("move <i[,j..]> <to>")),
                }
            }
            "delete" | "del" | "rm" if !rest.is_empty() => {
                Ok(Command::Delete(parse_offsets(rest)?))
            }
            "delete" | "del" | "rm" => Err(CommandError::Usage("delete <i[,j..]>")),
            "edit" => parse_edit(rest),
            "save" => Ok(Command::Save),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(word.to_string())),
        }
    }
}

fn parse_edit(rest: &str) -> Result<Command, CommandError> {
    const USAGE: &str = "edit <i> name <text> | edit <i> at <lat> <lon>";

    let mut parts = rest.splitn(3, char::is_whitespace);
    let (Some(index), Some(field)) = (parts.next(), parts.next()) else {
        return Err(CommandError::Usage(USAGE));
    };
    let offset = parse_offset(index)?;
    let value = parts.next().unwrap_or("").trim();

    match field {
        "name" if !value.is_empty() => Ok(Command::EditName {
            offset,
            name: value.to_string(),
        }),
        "at" => {
            let mut coords = value.split_whitespace();
            match (coords.next(), coords.next(), coords.next()) {
                (Some(lat), Some(lon), None) => Ok(Command::EditLocation {
                    offset,
                    latitude: parse_number(lat)?,
                    longitude: parse_number(lon)?,
                }),
                _ => Err(CommandError::Usage(USAGE)),
            }
        }
        _ => Err(CommandError::Usage(USAGE)),
    }
}

/// "2" -> 1
fn parse_offset(text: &str) -> Result<usize, CommandError> {
    match text.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(CommandError::BadIndex(text.to_string())),
    }
}

/// "1,3" -> [0, 2]
fn parse_offsets(text: &str) -> Result<Vec<usize>, CommandError> {
    text.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_offset)
        .collect()
}

fn parse_number(text: &str) -> Result<f64, CommandError> {
    text.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| CommandError::BadNumber(text.to_string()))
}

/// Draw the whole screen
pub fn render<R: TripDetailsRouter>(presenter: &TripDetailsPresenter<R>) -> String {
    let waypoints = presenter.waypoints();
    let directions = presenter.directions();
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "== {} ==", presenter.trip_name());
    let _ = writeln!(out, "{}", map_line(&waypoints, &directions));
    let _ = writeln!(out, "{}", presenter.distance_label());

    if waypoints.is_empty() {
        let _ = writeln!(out, "No stops yet. Use 'add' to create one.");
    } else {
        let _ = writeln!(out, "Stops:");
        for (offset, waypoint) in waypoints.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {:>2}. {} ({:.5}, {:.5})",
                offset + 1,
                waypoint.name,
                waypoint.latitude(),
                waypoint.longitude()
            );
        }
    }

    if !directions.is_empty() {
        let _ = writeln!(out, "Directions:");
        for leg in &directions {
            let _ = writeln!(
                out,
                "  {} -> {}: {}, {}",
                leg.source.name,
                leg.destination.name,
                presenter.formatter().format(leg.distance),
                format_duration(leg.expected_travel_time)
            );
        }
    }

    out
}

/// One-line stand-in for the map: what it would frame
fn map_line(waypoints: &[Waypoint], directions: &[RouteLeg]) -> String {
    match map_bounds(waypoints, directions) {
        Some(rect) => format!(
            "Map: {} leg(s) within ({:.4}, {:.4}) .. ({:.4}, {:.4})",
            directions.len(),
            rect.min().y,
            rect.min().x,
            rect.max().y,
            rect.max().x
        ),
        None => "Map: nothing to show".to_string(),
    }
}

/// Region covering the drawn route, or the stops when no route is known
pub fn map_bounds(waypoints: &[Waypoint], directions: &[RouteLeg]) -> Option<Rect<f64>> {
    if !directions.is_empty() {
        let paths = MultiLineString::new(directions.iter().map(|leg| leg.path.clone()).collect());
        if let Some(rect) = paths.bounding_rect() {
            return Some(rect);
        }
    }

    let points: MultiPoint<f64> = waypoints
        .iter()
        .filter(|waypoint| waypoint.has_valid_location())
        .map(|waypoint| waypoint.location)
        .collect();
    points.bounding_rect()
}

/// "45 s", "12 min", "3 h 05 min"
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{} s", secs)
    } else if secs < 3600 {
        format!("{} min", secs / 60)
    } else {
        format!("{} h {:02} min", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;
    use trip_details_lib::Length;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("".parse::<Command>(), Ok(Command::Show));
        assert_eq!("  add ".parse::<Command>(), Ok(Command::Add));
        assert_eq!("SAVE".parse::<Command>(), Ok(Command::Save));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
        assert_eq!(
            "name  Summer Holiday ".parse::<Command>(),
            Ok(Command::Rename("Summer Holiday".into()))
        );
    }

    #[test]
    fn test_indices_are_one_based() {
        assert_eq!(
            "move 1,3 2".parse::<Command>(),
            Ok(Command::Move {
                from: vec![0, 2],
                to: 1
            })
        );
        assert_eq!("delete 2".parse::<Command>(), Ok(Command::Delete(vec![1])));
        assert_eq!(
            "delete 0".parse::<Command>(),
            Err(CommandError::BadIndex("0".into()))
        );
    }

    #[test]
    fn test_parse_edit() {
        assert_eq!(
            "edit 2 name Grand Canyon".parse::<Command>(),
            Ok(Command::EditName {
                offset: 1,
                name: "Grand Canyon".into()
            })
        );
        assert_eq!(
            "edit 1 at 36.1 -112.1".parse::<Command>(),
            Ok(Command::EditLocation {
                offset: 0,
                latitude: 36.1,
                longitude: -112.1
            })
        );
        assert_eq!(
            "edit 1 at north 3".parse::<Command>(),
            Err(CommandError::BadNumber("north".into()))
        );
        assert!(matches!(
            "edit 1 color red".parse::<Command>(),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "fly".parse::<Command>(),
            Err(CommandError::Unknown("fly".into()))
        );
        assert!(matches!("name".parse::<Command>(), Err(CommandError::Usage(_))));
        assert!(matches!("move 1".parse::<Command>(), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(45)), "45 s");
        assert_eq!(format_duration(Duration::from_secs(12 * 60 + 30)), "12 min");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 5 * 60)), "3 h 05 min");
    }

    #[test]
    fn test_bounds_prefer_route_paths() {
        let a = Waypoint::new("A", 0.0, 0.0);
        let b = Waypoint::new("B", 1.0, 1.0);
        let leg = RouteLeg {
            source: a.clone(),
            destination: b.clone(),
            distance: Length::from_meters(1.0),
            expected_travel_time: Duration::ZERO,
            path: LineString::from(vec![(0.0, 0.0), (2.0, -1.0), (1.0, 1.0)]),
        };
        let waypoints = vec![a, b];

        let from_path = map_bounds(&waypoints, std::slice::from_ref(&leg)).unwrap();
        assert_eq!(from_path.min().y, -1.0);
        assert_eq!(from_path.max().x, 2.0);

        let from_stops = map_bounds(&waypoints, &[]).unwrap();
        assert_eq!(from_stops.min().y, 0.0);
        assert_eq!(from_stops.max().x, 1.0);

        assert!(map_bounds(&[], &[]).is_none());
    }
}
