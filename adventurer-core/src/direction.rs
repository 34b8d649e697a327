//! Movement direction vocabulary.
//!
//! All public map entry points normalize direction tokens through this
//! module: parsing is case-insensitive, accepts abbreviations, and rejects
//! unknown tokens with an error rather than panicking. The enum's declaration
//! order is the canonical enumeration order used for deterministic
//! tie-breaking in pathfinding.

use crate::map::MapError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized movement direction.
///
/// Declaration order is canonical: cardinals, then diagonals, then vertical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
    Up,
    Down,
}

impl Direction {
    /// Every direction, in canonical order.
    pub const ALL: [Direction; 10] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Northeast,
        Direction::Northwest,
        Direction::Southeast,
        Direction::Southwest,
        Direction::Up,
        Direction::Down,
    ];

    /// The four cardinal directions, in canonical order.
    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// The four diagonal directions, in canonical order.
    pub const DIAGONALS: [Direction; 4] = [
        Direction::Northeast,
        Direction::Northwest,
        Direction::Southeast,
        Direction::Southwest,
    ];

    /// The vertical directions.
    pub const VERTICALS: [Direction; 2] = [Direction::Up, Direction::Down];

    /// Parse a direction token (case-insensitive, abbreviations accepted).
    ///
    /// Unrecognized tokens produce `MapError::MalformedDirection`.
    pub fn parse(token: &str) -> Result<Self, MapError> {
        let normalized = token.trim().to_uppercase();
        match normalized.as_str() {
            "NORTH" | "N" => Ok(Direction::North),
            "SOUTH" | "S" => Ok(Direction::South),
            "EAST" | "E" => Ok(Direction::East),
            "WEST" | "W" => Ok(Direction::West),
            "NORTHEAST" | "NE" => Ok(Direction::Northeast),
            "NORTHWEST" | "NW" => Ok(Direction::Northwest),
            "SOUTHEAST" | "SE" => Ok(Direction::Southeast),
            "SOUTHWEST" | "SW" => Ok(Direction::Southwest),
            "UP" | "U" => Ok(Direction::Up),
            "DOWN" | "D" => Ok(Direction::Down),
            _ => Err(MapError::MalformedDirection(token.trim().to_string())),
        }
    }

    /// Full upper-case name (e.g. "NORTHEAST").
    pub fn name(&self) -> &'static str {
        match self {
            Direction::North => "NORTH",
            Direction::South => "SOUTH",
            Direction::East => "EAST",
            Direction::West => "WEST",
            Direction::Northeast => "NORTHEAST",
            Direction::Northwest => "NORTHWEST",
            Direction::Southeast => "SOUTHEAST",
            Direction::Southwest => "SOUTHWEST",
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        }
    }

    /// Abbreviated name (e.g. "NE").
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
            Direction::Northeast => "NE",
            Direction::Northwest => "NW",
            Direction::Southeast => "SE",
            Direction::Southwest => "SW",
            Direction::Up => "U",
            Direction::Down => "D",
        }
    }

    /// Extract a movement direction from a raw command.
    ///
    /// Recognizes a bare direction token ("N", "northeast") and the
    /// "GO/MOVE/WALK <direction>" forms. Returns `None` for non-movement
    /// commands; this is a detection helper, so it never errors.
    pub fn from_command(command: &str) -> Option<Self> {
        let upper = command.trim().to_uppercase();
        let mut tokens = upper.split_whitespace();

        let first = tokens.next()?;
        match first {
            "GO" | "MOVE" | "WALK" => tokens.find_map(|t| Direction::parse(t).ok()),
            _ => {
                // Only a lone token counts as a bare movement command.
                if tokens.next().is_some() {
                    None
                } else {
                    Direction::parse(first).ok()
                }
            }
        }
    }

    /// Directions named in a piece of description text, in canonical order.
    ///
    /// Matches full names on word boundaries so "SOUTHEAST" does not also
    /// register as "SOUTH" and "EAST".
    pub fn mentioned_in(text: &str) -> Vec<Self> {
        let upper = text.to_uppercase();
        Direction::ALL
            .iter()
            .copied()
            .filter(|d| contains_word(&upper, d.name()))
            .collect()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Word-boundary containment check on upper-cased text.
fn contains_word(haystack: &str, needle: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let begin = start + pos;
        let end = begin + needle.len();
        let before_ok = begin == 0
            || !haystack[..begin]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphabetic());
        let after_ok = end == haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic());
        if before_ok && after_ok {
            return true;
        }
        start = end;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_names_and_abbreviations() {
        assert_eq!(Direction::parse("north").unwrap(), Direction::North);
        assert_eq!(Direction::parse(" NE ").unwrap(), Direction::Northeast);
        assert_eq!(Direction::parse("u").unwrap(), Direction::Up);
        assert_eq!(Direction::parse("D").unwrap(), Direction::Down);
    }

    #[test]
    fn parse_rejects_unknown_tokens() {
        let err = Direction::parse("sideways").unwrap_err();
        assert!(matches!(err, MapError::MalformedDirection(_)));
    }

    #[test]
    fn canonical_ordering_follows_declaration() {
        assert!(Direction::North < Direction::South);
        assert!(Direction::West < Direction::Northeast);
        assert!(Direction::Southwest < Direction::Up);
    }

    #[test]
    fn from_command_bare_and_prefixed() {
        assert_eq!(Direction::from_command("n"), Some(Direction::North));
        assert_eq!(Direction::from_command("GO NORTH"), Some(Direction::North));
        assert_eq!(
            Direction::from_command("walk southeast"),
            Some(Direction::Southeast)
        );
        assert_eq!(Direction::from_command("MOVE se"), Some(Direction::Southeast));
        assert_eq!(Direction::from_command("open mailbox"), None);
        assert_eq!(Direction::from_command("take lamp"), None);
    }

    #[test]
    fn mentioned_in_respects_word_boundaries() {
        let text = "A path leads southeast. The forest continues to the west.";
        let mentioned = Direction::mentioned_in(text);
        assert_eq!(mentioned, vec![Direction::West, Direction::Southeast]);
    }

    #[test]
    fn mentioned_in_empty_for_plain_text() {
        assert!(Direction::mentioned_in("You see a small mailbox.").is_empty());
    }
}
