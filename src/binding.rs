//! Activator binding strings.
//!
//! An activator is one or more triggers separated by `|`:
//!
//! ```text
//! <super> KEY_LEFT | swipe right 4
//! <super> <shift> KEY_UP
//! ```
//!
//! A trigger is either a key chord (any number of `<modifier>`s followed by
//! at most one `KEY_*` / `BTN_*` name) or a touchpad swipe
//! (`swipe <direction> <fingers>`).  The empty string is a valid activator
//! that never fires; hosts register nothing for it.
//!
//! Recognising the input is the host's job; this module only gives the
//! configuration strings a typed shape.

use crate::command::{parse_direction, Direction};
use std::fmt;
use std::str::FromStr;

/// Keyboard modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Super,
    Shift,
    Ctrl,
    Alt,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Super => write!(f, "<super>"),
            Modifier::Shift => write!(f, "<shift>"),
            Modifier::Ctrl => write!(f, "<ctrl>"),
            Modifier::Alt => write!(f, "<alt>"),
        }
    }
}

/// Modifiers plus an optional key.  A chord without a key fires on the
/// modifiers alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub modifiers: Vec<Modifier>,
    pub key: Option<String>,
}

/// A multi-finger touchpad swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swipe {
    pub direction: Direction,
    pub fingers: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    Key(KeyChord),
    Swipe(Swipe),
}

/// Parsed activator binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Activator {
    pub triggers: Vec<Trigger>,
}

/// Errors from parsing an activator string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingParseError {
    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),
    #[error("unknown key {0:?}")]
    UnknownKey(String),
    #[error("more than one key in {0:?}")]
    MultipleKeys(String),
    #[error("invalid gesture {0:?}")]
    InvalidGesture(String),
    #[error("empty trigger in {0:?}")]
    EmptyTrigger(String),
}

impl Activator {
    /// Whether the activator has no triggers at all.
    pub fn is_unbound(&self) -> bool {
        self.triggers.is_empty()
    }
}

fn parse_modifier(token: &str) -> Result<Modifier, BindingParseError> {
    let name = token
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_ascii_lowercase();
    match name.as_str() {
        "super" | "logo" => Ok(Modifier::Super),
        "shift" => Ok(Modifier::Shift),
        "ctrl" | "control" => Ok(Modifier::Ctrl),
        "alt" => Ok(Modifier::Alt),
        _ => Err(BindingParseError::UnknownModifier(token.to_string())),
    }
}

fn parse_swipe(part: &str) -> Result<Swipe, BindingParseError> {
    let invalid = || BindingParseError::InvalidGesture(part.to_string());
    let tokens: Vec<&str> = part.split_whitespace().collect();
    match tokens.as_slice() {
        ["swipe", dir, fingers] => {
            let direction = parse_direction(dir).ok_or_else(invalid)?;
            let fingers: u32 = fingers.parse().map_err(|_| invalid())?;
            if fingers < 2 {
                return Err(invalid());
            }
            Ok(Swipe { direction, fingers })
        }
        _ => Err(invalid()),
    }
}

fn parse_chord(part: &str) -> Result<KeyChord, BindingParseError> {
    let mut modifiers = Vec::new();
    let mut key: Option<String> = None;
    for token in part.split_whitespace() {
        if token.starts_with('<') && token.ends_with('>') {
            let m = parse_modifier(token)?;
            if !modifiers.contains(&m) {
                modifiers.push(m);
            }
        } else if token.starts_with("KEY_") || token.starts_with("BTN_") {
            if key.is_some() {
                return Err(BindingParseError::MultipleKeys(part.to_string()));
            }
            key = Some(token.to_string());
        } else {
            return Err(BindingParseError::UnknownKey(token.to_string()));
        }
    }
    modifiers.sort();
    Ok(KeyChord { modifiers, key })
}

impl FromStr for Activator {
    type Err = BindingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Activator::default());
        }
        let mut triggers = Vec::new();
        for part in s.split('|') {
            let part = part.trim();
            if part.is_empty() {
                return Err(BindingParseError::EmptyTrigger(s.to_string()));
            }
            if part.split_whitespace().next() == Some("swipe") {
                triggers.push(Trigger::Swipe(parse_swipe(part)?));
            } else {
                triggers.push(Trigger::Key(parse_chord(part)?));
            }
        }
        Ok(Activator { triggers })
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Key(chord) => {
                let mut parts: Vec<String> = chord.modifiers.iter().map(|m| m.to_string()).collect();
                if let Some(key) = &chord.key {
                    parts.push(key.clone());
                }
                write!(f, "{}", parts.join(" "))
            }
            Trigger::Swipe(s) => write!(f, "swipe {} {}", s.direction, s.fingers),
        }
    }
}

impl fmt::Display for Activator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.triggers.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_direction_binding() {
        let a: Activator = "<super> KEY_LEFT | swipe right 4".parse().unwrap();
        assert_eq!(
            a.triggers,
            vec![
                Trigger::Key(KeyChord {
                    modifiers: vec![Modifier::Super],
                    key: Some("KEY_LEFT".into()),
                }),
                Trigger::Swipe(Swipe {
                    direction: Direction::Right,
                    fingers: 4,
                }),
            ]
        );
    }

    #[test]
    fn modifiers_are_normalised() {
        let a: Activator = "<shift> <super> <shift> KEY_1".parse().unwrap();
        let b: Activator = "<super> <shift> KEY_1".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "<super> <shift> KEY_1");
    }

    #[test]
    fn empty_string_is_unbound() {
        let a: Activator = "   ".parse().unwrap();
        assert!(a.is_unbound());
    }

    #[test]
    fn modifier_only_chord() {
        let a: Activator = "<super>".parse().unwrap();
        assert_eq!(
            a.triggers,
            vec![Trigger::Key(KeyChord {
                modifiers: vec![Modifier::Super],
                key: None,
            })]
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            "<hyper> KEY_A".parse::<Activator>(),
            Err(BindingParseError::UnknownModifier("<hyper>".into()))
        );
        assert_eq!(
            "<super> KEY_A KEY_B".parse::<Activator>(),
            Err(BindingParseError::MultipleKeys("<super> KEY_A KEY_B".into()))
        );
        assert!(matches!(
            "swipe sideways 3".parse::<Activator>(),
            Err(BindingParseError::InvalidGesture(_))
        ));
        assert!(matches!(
            "swipe left 1".parse::<Activator>(),
            Err(BindingParseError::InvalidGesture(_))
        ));
        assert!(matches!(
            "<super> KEY_A ||".parse::<Activator>(),
            Err(BindingParseError::EmptyTrigger(_))
        ));
        assert_eq!(
            "<super> left".parse::<Activator>(),
            Err(BindingParseError::UnknownKey("left".into()))
        );
    }

    #[test]
    fn display_round_trips_through_parse() {
        let a: Activator = "<alt> BTN_LEFT | swipe up 3".parse().unwrap();
        let again: Activator = a.to_string().parse().unwrap();
        assert_eq!(a, again);
    }
}
