//! Spatial map of discovered locations and pathfinding over them.
//!
//! The map stores one edge per `(location, direction)` pair, including
//! attempts that failed to move (blocked exits). Blocked edges count as
//! explored for the unexplored-direction query but are never traversed by
//! the pathfinder.

use crate::direction::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from spatial map operations.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("unrecognized direction token: {0:?}")]
    MalformedDirection(String),
}

/// The recorded outcome of attempting a direction from a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exit {
    /// Movement succeeded and led to the named location.
    Open(String),
    /// Movement was attempted and produced no location change.
    Blocked,
}

impl Exit {
    /// The destination, if this exit leads anywhere.
    pub fn destination(&self) -> Option<&str> {
        match self {
            Exit::Open(to) => Some(to),
            Exit::Blocked => None,
        }
    }
}

/// A single discovered transition, used for persistence snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: String,
    pub direction: Direction,
    pub exit: Exit,
}

/// Map of discovered location transitions.
///
/// Exits per location live in a `BTreeMap` keyed by `Direction`, so
/// iteration is always in canonical direction order; breadth-first search
/// inherits its deterministic tie-breaking from that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialMap {
    edges: HashMap<String, BTreeMap<Direction, Exit>>,
}

impl SpatialMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed transition.
    ///
    /// If `to == from` the move is recorded as blocked (a direction was
    /// attempted and nothing changed). A repeat observation for the same
    /// `(from, direction)` pair overwrites the stored edge: the latest
    /// observation wins. Returns `true` when the stored edge changed.
    pub fn record_transition(
        &mut self,
        from: &str,
        direction: &str,
        to: &str,
    ) -> Result<bool, MapError> {
        let direction = Direction::parse(direction)?;
        Ok(self.record_normalized(from, direction, to))
    }

    /// `record_transition` for an already-normalized direction.
    pub fn record_normalized(&mut self, from: &str, direction: Direction, to: &str) -> bool {
        let exit = if to == from {
            Exit::Blocked
        } else {
            Exit::Open(to.to_string())
        };

        let exits = self.edges.entry(from.to_string()).or_default();
        let changed = exits.get(&direction) != Some(&exit);
        if changed {
            match &exit {
                Exit::Open(dest) => info!(from, %direction, to = dest.as_str(), "new transition"),
                Exit::Blocked => info!(from, %direction, "blocked exit"),
            }
            exits.insert(direction, exit);
        } else {
            debug!(from, %direction, "known transition");
        }
        changed
    }

    /// Candidate directions with no stored edge from `location`.
    ///
    /// A blocked edge counts as explored: we know what lies that way
    /// (nothing), so it is never re-proposed.
    pub fn unexplored_directions(&self, location: &str, candidates: &[Direction]) -> Vec<Direction> {
        match self.edges.get(location) {
            Some(exits) => candidates
                .iter()
                .copied()
                .filter(|d| !exits.contains_key(d))
                .collect(),
            None => candidates.to_vec(),
        }
    }

    /// Unexplored directions from `location` over the full direction set.
    pub fn unexplored_from(&self, location: &str) -> Vec<Direction> {
        self.unexplored_directions(location, &Direction::ALL)
    }

    /// Known exits from a location, in canonical direction order.
    pub fn exits_from(&self, location: &str) -> Vec<(Direction, Exit)> {
        self.edges
            .get(location)
            .map(|exits| exits.iter().map(|(d, e)| (*d, e.clone())).collect())
            .unwrap_or_default()
    }

    /// Number of locations with at least one recorded edge.
    pub fn location_count(&self) -> usize {
        self.edges.len()
    }

    /// Shortest sequence of directions from `from` to `to`.
    ///
    /// Breadth-first search over open edges only; blocked edges are never
    /// traversed. Returns `Some(vec![])` when already there, `None` when
    /// either endpoint is unknown or unreachable. Among equal-length paths
    /// the canonical direction order decides, because neighbors are expanded
    /// in that order.
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<Direction>> {
        if from == to {
            return Some(Vec::new());
        }
        self.edges.get(from)?;

        let mut queue = VecDeque::from([from.to_string()]);
        // location -> (direction taken to reach it, predecessor)
        let mut parent: HashMap<String, (Direction, String)> = HashMap::new();

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = Vec::new();
                let mut node = to;
                while let Some((direction, prev)) = parent.get(node) {
                    path.push(*direction);
                    node = prev;
                }
                path.reverse();
                return Some(path);
            }

            let Some(exits) = self.edges.get(&current) else {
                continue;
            };
            for (direction, exit) in exits {
                let Exit::Open(neighbor) = exit else {
                    continue;
                };
                if neighbor != from && !parent.contains_key(neighbor) {
                    parent.insert(neighbor.clone(), (*direction, current.clone()));
                    queue.push_back(neighbor.clone());
                }
            }
        }

        None
    }

    /// Path rendered as comma-joined full direction names.
    pub fn path_string(&self, from: &str, to: &str) -> Option<String> {
        self.shortest_path(from, to)
            .map(|path| path.iter().map(Direction::name).collect::<Vec<_>>().join(", "))
    }

    /// Path rendered as comma-joined abbreviations.
    pub fn abbreviated_path(&self, from: &str, to: &str) -> Option<String> {
        self.shortest_path(from, to).map(|path| {
            path.iter()
                .map(Direction::abbreviation)
                .collect::<Vec<_>>()
                .join(", ")
        })
    }

    /// The first direction to take toward a destination, if a path exists.
    pub fn next_step(&self, from: &str, to: &str) -> Option<Direction> {
        self.shortest_path(from, to)?.first().copied()
    }

    /// All stored edges as flat records, for persistence.
    pub fn edge_records(&self) -> Vec<EdgeRecord> {
        let mut records: Vec<EdgeRecord> = self
            .edges
            .iter()
            .flat_map(|(from, exits)| {
                exits.iter().map(|(direction, exit)| EdgeRecord {
                    from: from.clone(),
                    direction: *direction,
                    exit: exit.clone(),
                })
            })
            .collect();
        records.sort_by(|a, b| (&a.from, a.direction).cmp(&(&b.from, b.direction)));
        records
    }

    /// Rebuild a map from flat records.
    pub fn from_records(records: Vec<EdgeRecord>) -> Self {
        let mut map = Self::new();
        for record in records {
            map.edges
                .entry(record.from)
                .or_default()
                .insert(record.direction, record.exit);
        }
        map
    }

    /// A compact text summary of the known map, for reasoner context.
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut locations: Vec<_> = self.edges.keys().collect();
        locations.sort();
        for location in locations {
            let exits: Vec<String> = self.edges[location]
                .iter()
                .map(|(d, e)| match e {
                    Exit::Open(to) => format!("{d} -> {to}"),
                    Exit::Blocked => format!("{d} -> (blocked)"),
                })
                .collect();
            lines.push(format!("{location}: {}", exits.join(", ")));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(edges: &[(&str, &str, &str)]) -> SpatialMap {
        let mut map = SpatialMap::new();
        for (from, dir, to) in edges {
            map.record_transition(from, dir, to).unwrap();
        }
        map
    }

    #[test]
    fn blocked_when_location_unchanged() {
        let mut map = SpatialMap::new();
        map.record_transition("Forest", "north", "Forest").unwrap();
        assert_eq!(
            map.exits_from("Forest"),
            vec![(Direction::North, Exit::Blocked)]
        );
    }

    #[test]
    fn latest_observation_wins() {
        let mut map = SpatialMap::new();
        map.record_transition("Cellar", "E", "Cellar").unwrap();
        map.record_transition("Cellar", "EAST", "Gallery").unwrap();
        assert_eq!(
            map.exits_from("Cellar"),
            vec![(Direction::East, Exit::Open("Gallery".into()))]
        );
    }

    #[test]
    fn record_is_idempotent() {
        let mut map = SpatialMap::new();
        assert!(map.record_transition("A", "N", "B").unwrap());
        assert!(!map.record_transition("A", "N", "B").unwrap());
        assert_eq!(map.exits_from("A").len(), 1);
    }

    #[test]
    fn malformed_direction_is_an_error_not_a_crash() {
        let mut map = SpatialMap::new();
        assert!(map.record_transition("A", "sideways", "B").is_err());
        assert_eq!(map.location_count(), 0);
    }

    #[test]
    fn unexplored_excludes_blocked_and_open_edges() {
        let map = map_with(&[("Clearing", "N", "Forest"), ("Clearing", "E", "Clearing")]);
        let unexplored = map.unexplored_directions("Clearing", &Direction::CARDINALS);
        assert_eq!(unexplored, vec![Direction::South, Direction::West]);
    }

    #[test]
    fn unexplored_from_unknown_location_is_everything() {
        let map = SpatialMap::new();
        assert_eq!(map.unexplored_from("Nowhere").len(), Direction::ALL.len());
    }

    #[test]
    fn shortest_path_same_location_is_empty() {
        let map = map_with(&[("A", "N", "B")]);
        assert_eq!(map.shortest_path("A", "A"), Some(vec![]));
    }

    #[test]
    fn shortest_path_unknown_or_unreachable_is_none() {
        let map = map_with(&[("A", "N", "B")]);
        assert_eq!(map.shortest_path("X", "A"), None);
        assert_eq!(map.shortest_path("B", "A"), None);
    }

    #[test]
    fn shortest_path_never_traverses_blocked() {
        let map = map_with(&[("A", "N", "A"), ("A", "E", "B"), ("B", "N", "C")]);
        assert_eq!(
            map.shortest_path("A", "C"),
            Some(vec![Direction::East, Direction::North])
        );
    }

    #[test]
    fn cycle_takes_direct_edge_over_long_way_round() {
        // A <-> B <-> C <-> A, plus the direct A -> C edge.
        let map = map_with(&[
            ("A", "N", "B"),
            ("B", "S", "A"),
            ("B", "E", "C"),
            ("C", "W", "B"),
            ("C", "U", "A"),
            ("A", "D", "C"),
        ]);
        assert_eq!(map.shortest_path("A", "C"), Some(vec![Direction::Down]));
    }

    #[test]
    fn equal_length_ties_broken_by_canonical_order() {
        // Two length-2 routes to D; the one starting NORTH wins because
        // NORTH precedes EAST in canonical order.
        let map = map_with(&[
            ("A", "E", "C"),
            ("A", "N", "B"),
            ("B", "E", "D"),
            ("C", "N", "D"),
        ]);
        assert_eq!(
            map.shortest_path("A", "D"),
            Some(vec![Direction::North, Direction::East])
        );
    }

    #[test]
    fn path_rendering_helpers() {
        let map = map_with(&[("A", "NORTHEAST", "B"), ("B", "UP", "C")]);
        assert_eq!(map.path_string("A", "C").unwrap(), "NORTHEAST, UP");
        assert_eq!(map.abbreviated_path("A", "C").unwrap(), "NE, U");
        assert_eq!(map.next_step("A", "C"), Some(Direction::Northeast));
        assert_eq!(map.next_step("A", "A"), None);
    }

    #[test]
    fn edge_records_round_trip() {
        let map = map_with(&[("A", "N", "B"), ("B", "S", "A"), ("B", "E", "B")]);
        let restored = SpatialMap::from_records(map.edge_records());
        assert_eq!(restored.edge_records(), map.edge_records());
        assert_eq!(restored.shortest_path("A", "B"), Some(vec![Direction::North]));
    }

    #[test]
    fn self_referencing_dead_end_terminates() {
        let map = map_with(&[("Maze", "N", "Maze2"), ("Maze2", "S", "Maze2")]);
        // Maze2's south "exit" went nowhere and is stored blocked; the
        // search must still terminate without revisiting it.
        assert_eq!(map.shortest_path("Maze", "Exit"), None);
    }
}
