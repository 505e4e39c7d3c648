//! Trip model
//!
//! A [`Trip`] owns a name and an ordered waypoint sequence, both exposed as
//! [`Observable`]s. Every mutation emits, including writes that leave the
//! value unchanged.

use crate::observable::Observable;
use crate::waypoint::Waypoint;

/// Aggregate root: a named, ordered list of waypoints
#[derive(Debug)]
pub struct Trip {
    name: Observable<String>,
    waypoints: Observable<Vec<Waypoint>>,
}

impl Trip {
    pub fn new(name: impl Into<String>, waypoints: Vec<Waypoint>) -> Self {
        Self {
            name: Observable::new(name.into()),
            waypoints: Observable::new(waypoints),
        }
    }

    pub fn name(&self) -> String {
        self.name.get()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.name.set(name.into());
    }

    /// The observable behind [`Trip::name`]
    pub fn name_publisher(&self) -> &Observable<String> {
        &self.name
    }

    pub fn waypoints(&self) -> Vec<Waypoint> {
        self.waypoints.get()
    }

    pub fn set_waypoints(&self, waypoints: Vec<Waypoint>) {
        self.waypoints.set(waypoints);
    }

    /// The observable behind [`Trip::waypoints`]
    pub fn waypoints_publisher(&self) -> &Observable<Vec<Waypoint>> {
        &self.waypoints
    }

    /// Append a "New Stop" at the last waypoint's location (or the default
    /// location for an empty trip)
    pub fn add_waypoint(&self) {
        self.waypoints.update(|waypoints| {
            let waypoint = match waypoints.last() {
                Some(last) => Waypoint::placeholder(last.location),
                None => Waypoint::default(),
            };
            waypoints.push(waypoint);
        });
    }

    /// Move the waypoints at `from` so they start at `to` (see [`move_offsets`])
    pub fn move_waypoints(&self, from: &[usize], to: usize) {
        self.waypoints.update(|waypoints| move_offsets(waypoints, from, to));
    }

    /// Remove the waypoints at the given offsets
    pub fn remove_waypoints(&self, at: &[usize]) {
        self.waypoints.update(|waypoints| remove_offsets(waypoints, at));
    }

    /// Edit a single waypoint in place without notifying observers.
    ///
    /// Returns false when `index` is out of range. Call
    /// [`Trip::refresh_waypoints`] to publish the edit. `edit` works on a
    /// copy, so it may read the trip.
    pub fn edit_waypoint(&self, index: usize, edit: impl FnOnce(&mut Waypoint)) -> bool {
        let Some(mut waypoint) = self.waypoints.with(|waypoints| waypoints.get(index).cloned())
        else {
            return false;
        };
        edit(&mut waypoint);
        self.waypoints
            .modify_silently(|waypoints| match waypoints.get_mut(index) {
                Some(slot) => {
                    *slot = waypoint;
                    true
                }
                None => false,
            })
    }

    /// Re-publish the waypoint sequence as is
    pub fn refresh_waypoints(&self) {
        self.waypoints.notify();
    }
}

/// Normalize an index set: sorted, deduplicated, within `len`
fn index_set(offsets: &[usize], len: usize) -> Vec<usize> {
    let mut offsets: Vec<usize> = offsets.iter().copied().filter(|&i| i < len).collect();
    offsets.sort_unstable();
    offsets.dedup();
    offsets
}

/// Splice-and-reinsert move.
///
/// The items at `from` are removed (keeping their relative order) and
/// reinserted as one block at `to`, where `to` indexes the list *after*
/// removal and is clamped to its end. `[A, B, C]` moved from `[0]` to `2`
/// becomes `[B, C, A]`.
pub fn move_offsets<T>(items: &mut Vec<T>, from: &[usize], to: usize) {
    let offsets = index_set(from, items.len());
    if offsets.is_empty() {
        return;
    }

    let mut moved: Vec<T> = offsets.iter().rev().map(|&i| items.remove(i)).collect();
    moved.reverse();

    let at = to.min(items.len());
    items.splice(at..at, moved);
}

/// Remove the items at `at`; out-of-range offsets are ignored
pub fn remove_offsets<T>(items: &mut Vec<T>, at: &[usize]) {
    for i in index_set(at, items.len()).into_iter().rev() {
        items.remove(i);
    }
}

/// Serializable snapshot of a trip
#[cfg(feature = "serde")]
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TripRecord {
    pub name: String,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

#[cfg(feature = "serde")]
impl Trip {
    pub fn from_record(record: TripRecord) -> Self {
        Self::new(record.name, record.waypoints)
    }

    pub fn record(&self) -> TripRecord {
        TripRecord {
            name: self.name(),
            waypoints: self.waypoints(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn names(trip: &Trip) -> Vec<String> {
        trip.waypoints().into_iter().map(|w| w.name).collect()
    }

    fn abc() -> Trip {
        Trip::new(
            "Test",
            vec![
                Waypoint::new("A", 1.0, 1.0),
                Waypoint::new("B", 2.0, 2.0),
                Waypoint::new("C", 3.0, 3.0),
            ],
        )
    }

    #[test]
    fn test_move_first_to_end() {
        let trip = abc();
        trip.move_waypoints(&[0], 2);
        assert_eq!(names(&trip), ["B", "C", "A"]);
    }

    #[test]
    fn test_move_last_to_front() {
        let trip = abc();
        trip.move_waypoints(&[2], 0);
        assert_eq!(names(&trip), ["C", "A", "B"]);
    }

    #[test]
    fn test_move_several_keeps_relative_order() {
        let mut items = vec!['a', 'b', 'c', 'd', 'e'];
        move_offsets(&mut items, &[3, 0, 3], 1);
        assert_eq!(items, ['b', 'a', 'd', 'c', 'e']);
    }

    #[test]
    fn test_move_clamps_destination() {
        let mut items = vec![1, 2, 3];
        move_offsets(&mut items, &[0], 99);
        assert_eq!(items, [2, 3, 1]);
    }

    #[test]
    fn test_delete_middle() {
        let trip = abc();
        trip.remove_waypoints(&[1]);
        assert_eq!(names(&trip), ["A", "C"]);
    }

    #[test]
    fn test_delete_ignores_out_of_range() {
        let mut items = vec![1, 2, 3];
        remove_offsets(&mut items, &[2, 7, 0]);
        assert_eq!(items, [2]);
    }

    #[test]
    fn test_add_waypoint_copies_last_location() {
        let trip = abc();
        trip.add_waypoint();
        let waypoints = trip.waypoints();
        assert_eq!(waypoints.len(), 4);
        assert_eq!(waypoints[3].name, crate::waypoint::PLACEHOLDER_NAME);
        assert_eq!(waypoints[3].location, waypoints[2].location);
    }

    #[test]
    fn test_add_waypoint_to_empty_trip() {
        let trip = Trip::new("Empty", Vec::new());
        trip.add_waypoint();
        assert_eq!(trip.waypoints(), vec![Waypoint::default()]);
    }

    #[test]
    fn test_edit_is_silent_until_refresh() {
        let trip = abc();
        let emissions = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&emissions);
        let _sub = trip
            .waypoints_publisher()
            .subscribe(move |_| *counter.lock().unwrap() += 1);

        assert!(trip.edit_waypoint(1, |w| w.name = "Bee".into()));
        assert!(!trip.edit_waypoint(5, |w| w.name = "nope".into()));
        assert_eq!(*emissions.lock().unwrap(), 1);

        trip.refresh_waypoints();
        assert_eq!(*emissions.lock().unwrap(), 2);
        assert_eq!(names(&trip), ["A", "Bee", "C"]);
    }

    #[test]
    fn test_edit_may_read_the_trip() {
        let trip = abc();
        let edited = trip.edit_waypoint(0, |w| {
            let last = trip.waypoints().last().cloned().unwrap();
            w.name = format!("{} too", last.name);
            w.location = last.location;
        });

        assert!(edited);
        assert_eq!(names(&trip), ["C too", "B", "C"]);
        assert_eq!(trip.waypoints()[0].location, trip.waypoints()[2].location);
    }

    #[test]
    fn test_rename_notifies() {
        let trip = abc();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = trip
            .name_publisher()
            .subscribe(move |name| sink.lock().unwrap().push(name.clone()));

        trip.set_name("Beach Trip");

        assert_eq!(*seen.lock().unwrap(), ["Test", "Beach Trip"]);
    }
}
