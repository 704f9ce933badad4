//! Commands and the small vocabulary types they carry.
//!
//! A [`Command`] is what an activator binding (or a client on the command
//! socket) asks the [`GridSwitcher`](crate::switcher::GridSwitcher) to do.
//! Bindings are registered with a command value instead of a closure, and
//! every command goes through the single
//! [`GridSwitcher::handle`](crate::switcher::GridSwitcher::handle) entry
//! point.
//!
//! Directions are parsed leniently ("right", "Right", " LEFT "); `SwitchTo`
//! accepts `{"x": 1, "y": 0}` or the string `"col row"`.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Cardinal direction on the workspace grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Cell delta `(dx, dy)`; y grows downwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Parse a direction name, case-insensitively.
pub fn parse_direction(s: &str) -> Option<Direction> {
    match s.trim().to_ascii_lowercase().as_str() {
        "left" => Some(Direction::Left),
        "right" => Some(Direction::Right),
        "up" => Some(Direction::Up),
        "down" => Some(Direction::Down),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_direction(&s).ok_or_else(|| DeError::custom(format!("invalid direction: {:?}", s)))
    }
}

/// Identifier of a window group.
///
/// Groups are declared in configuration as `group_<N>`; `N` is the 1-based
/// workspace index the group is sent to, and doubles as its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {}", self.0)
    }
}

/// Absolute workspace target: `{"x":0,"y":0}` or `"col row"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwitchToTarget {
    pub x: i32,
    pub y: i32,
}

impl<'de> Deserialize<'de> for SwitchToTarget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = SwitchToTarget;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "object {{x, y}} or string \"col row\"")
            }
            fn visit_map<A>(self, mut map: A) -> Result<SwitchToTarget, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut x = None;
                let mut y = None;
                while let Some(k) = map.next_key::<String>()? {
                    match k.as_str() {
                        "x" => x = Some(map.next_value()?),
                        "y" => y = Some(map.next_value()?),
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                Ok(SwitchToTarget {
                    x: x.ok_or_else(|| DeError::missing_field("x"))?,
                    y: y.ok_or_else(|| DeError::missing_field("y"))?,
                })
            }
            fn visit_str<E>(self, s: &str) -> Result<SwitchToTarget, E>
            where
                E: DeError,
            {
                let parts: Vec<&str> = s.split_whitespace().collect();
                if parts.len() != 2 {
                    return Err(DeError::custom(format!(
                        "SwitchTo: expected \"col row\", got {:?}",
                        s
                    )));
                }
                let x: i32 = parts[0]
                    .parse()
                    .map_err(|_| DeError::custom("SwitchTo: col must be an integer"))?;
                let y: i32 = parts[1]
                    .parse()
                    .map_err(|_| DeError::custom("SwitchTo: row must be an integer"))?;
                Ok(SwitchToTarget { x, y })
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// Every action the switcher can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Slide the viewport one cell in the given direction.
    Go(Direction),

    /// Slide one cell and carry the top window along.
    MoveWindowAndGo(Direction),

    /// Slide to an absolute workspace.  Out-of-grid targets are clamped.
    SwitchTo(SwitchToTarget),

    /// Toggle the top window's membership in a group.  Joining sends the
    /// window to the group's workspace.
    AddToGroup(GroupId),

    /// Send the whole group to its workspace, or bring it here if any member
    /// is elsewhere.
    ToggleGroup(GroupId),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Go(dir) => write!(f, "go {}", dir),
            Command::MoveWindowAndGo(dir) => write!(f, "move window and go {}", dir),
            Command::SwitchTo(t) => write!(f, "switch to ({}, {})", t.x, t.y),
            Command::AddToGroup(id) => write!(f, "add to {}", id),
            Command::ToggleGroup(id) => write!(f, "toggle {}", id),
        }
    }
}
