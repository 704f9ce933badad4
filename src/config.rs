//! Application configuration.
//!
//! The configuration is loaded from a JSON file
//! (`$XDG_CONFIG_HOME/vswitch/config.json` for the daemon).  There are two
//! sections: `"vswitch"` for the workspace slide and `"groups"` for window
//! groups.
//!
//! # Example
//!
//! ```json
//! {
//!   "vswitch": {
//!     "binding_left": "<super> KEY_LEFT | swipe right 4",
//!     "binding_win_left": "<super> <shift> KEY_LEFT",
//!     "duration": 180,
//!     "easing": "ease-out-cubic"
//!   },
//!   "groups": {
//!     "base_modifier": "<super>",
//!     "add_modifier": "<shift>",
//!     "group_1": "KEY_1",
//!     "group_2": "KEY_2"
//!   }
//! }
//! ```

use crate::command::{Direction, GroupId};
use crate::easing::Easing;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
///
/// Every field is optional, so a minimal `{}` file is valid and all
/// sections fall back to their compiled-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Workspace slide bindings and timing.
    #[serde(default)]
    pub vswitch: SwitchConfig,

    /// Window group bindings.
    #[serde(default)]
    pub groups: GroupsConfig,
}

/// Workspace slide bindings and timing.
///
/// `binding_*` move the viewport; `binding_win_*` move it and carry the
/// focused window along.  An empty string leaves the action unbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    pub binding_left: String,
    pub binding_right: String,
    pub binding_up: String,
    pub binding_down: String,
    pub binding_win_left: String,
    pub binding_win_right: String,
    pub binding_win_up: String,
    pub binding_win_down: String,
    /// Slide duration (ms).
    pub duration: u64,
    pub easing: Easing,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            binding_left: "<super> KEY_LEFT | swipe right 4".into(),
            binding_right: "<super> KEY_RIGHT | swipe left 4".into(),
            binding_up: "<super> KEY_UP | swipe down 4".into(),
            binding_down: "<super> KEY_DOWN | swipe up 4".into(),
            binding_win_left: "<super> <shift> KEY_LEFT".into(),
            binding_win_right: "<super> <shift> KEY_RIGHT".into(),
            binding_win_up: "<super> <shift> KEY_UP".into(),
            binding_win_down: "<super> <shift> KEY_DOWN".into(),
            duration: 180,
            easing: Easing::Linear,
        }
    }
}

impl SwitchConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration)
    }

    /// `(direction, go binding, carry-window binding)` for every direction.
    pub fn directional_bindings(&self) -> [(Direction, &str, &str); 4] {
        [
            (Direction::Left, self.binding_left.as_str(), self.binding_win_left.as_str()),
            (Direction::Right, self.binding_right.as_str(), self.binding_win_right.as_str()),
            (Direction::Up, self.binding_up.as_str(), self.binding_win_up.as_str()),
            (Direction::Down, self.binding_down.as_str(), self.binding_win_down.as_str()),
        ]
    }
}

/// Window group bindings.
///
/// Every `group_<N>` key declares group `N`, living on the `N`-th workspace
/// (1-based, row-major).  Its value is the key that, pressed together with
/// `base_modifier`, toggles the group, and together with `base_modifier`
/// and `add_modifier` adds or removes the focused window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupsConfig {
    pub base_modifier: String,
    pub add_modifier: String,
    #[serde(flatten)]
    pub keys: BTreeMap<String, serde_json::Value>,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            base_modifier: "<super>".into(),
            add_modifier: "<shift>".into(),
            keys: BTreeMap::new(),
        }
    }
}

impl GroupsConfig {
    /// Declared groups and their keys, in id order.
    ///
    /// Keys that are not `group_<integer>` (written without sign or leading
    /// zeros) or whose value is not a string are skipped with a warning, so
    /// every id appears at most once.
    pub fn group_keys(&self) -> Vec<(GroupId, String)> {
        let mut out = Vec::new();
        for (name, value) in &self.keys {
            let Some(suffix) = name.strip_prefix("group_") else {
                warn!("ignoring unknown groups option {:?}", name);
                continue;
            };
            let index = match suffix.parse::<i32>() {
                Ok(index) if index.to_string() == suffix => index,
                _ => {
                    warn!("ignoring {:?}: not a group index", name);
                    continue;
                }
            };
            let Some(key) = value.as_str() else {
                warn!("ignoring {:?}: key must be a string", name);
                continue;
            };
            out.push((GroupId(index), key.trim().to_string()));
        }
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Activator that adds the focused window to the group bound to `key`.
    pub fn add_binding(&self, key: &str) -> String {
        format!("{} {} {}", self.base_modifier, self.add_modifier, key)
    }

    /// Activator that toggles the group bound to `key`.
    pub fn toggle_binding(&self, key: &str) -> String {
        format!("{} {}", self.base_modifier, key)
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "vswitch": {
                "binding_left": "<alt> KEY_H",
                "binding_win_left": "",
                "duration": 250,
                "easing": "ease-out-cubic"
            },
            "groups": {
                "base_modifier": "<ctrl>",
                "add_modifier": "<alt>",
                "group_1": "KEY_1",
                "group_4": "KEY_F4"
            }
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.vswitch.binding_left, "<alt> KEY_H");
        assert_eq!(cfg.vswitch.binding_win_left, "");
        assert_eq!(cfg.vswitch.duration(), Duration::from_millis(250));
        assert_eq!(cfg.vswitch.easing, Easing::EaseOutCubic);
        assert_eq!(cfg.groups.base_modifier, "<ctrl>");
        assert_eq!(
            cfg.groups.group_keys(),
            vec![(GroupId(1), "KEY_1".into()), (GroupId(4), "KEY_F4".into())]
        );
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.vswitch, SwitchConfig::default());
        assert_eq!(cfg.vswitch.duration, 180);
        assert_eq!(cfg.vswitch.easing, Easing::Linear);
        assert_eq!(cfg.groups, GroupsConfig::default());
        assert!(cfg.groups.group_keys().is_empty());
    }

    #[test]
    fn deserialize_partial_vswitch() {
        let json = r#"{ "vswitch": { "duration": 90 } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.vswitch.duration, 90);
        assert_eq!(
            cfg.vswitch.binding_right,
            SwitchConfig::default().binding_right
        );
    }

    #[test]
    fn malformed_group_keys_are_skipped() {
        let json = r#"{ "groups": {
            "group_x": "KEY_X",
            "group_2": 5,
            "colour": "red",
            "group_3": " KEY_3 "
        } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.groups.group_keys(), vec![(GroupId(3), "KEY_3".into())]);
    }

    #[test]
    fn non_canonical_group_indices_are_skipped() {
        let json = r#"{ "groups": {
            "group_3": "KEY_3",
            "group_03": "KEY_A",
            "group_+3": "KEY_B",
            "group_-1": "KEY_C"
        } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(
            cfg.groups.group_keys(),
            vec![(GroupId(-1), "KEY_C".into()), (GroupId(3), "KEY_3".into())]
        );
    }

    #[test]
    fn group_activators_compose_modifiers() {
        let g = GroupsConfig::default();
        assert_eq!(g.add_binding("KEY_1"), "<super> <shift> KEY_1");
        assert_eq!(g.toggle_binding("KEY_1"), "<super> KEY_1");
    }

    #[test]
    fn default_bindings_cover_every_direction() {
        let cfg = SwitchConfig::default();
        let dirs: Vec<Direction> = cfg.directional_bindings().iter().map(|b| b.0).collect();
        assert_eq!(
            dirs,
            vec![Direction::Left, Direction::Right, Direction::Up, Direction::Down]
        );
        assert_eq!(cfg.directional_bindings()[0].1, "<super> KEY_LEFT | swipe right 4");
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "vswitch": {}, "future_section": { "key": 42 } }"#;
        let _cfg: Config = serde_json::from_str(json).unwrap();
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/vswitch.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
