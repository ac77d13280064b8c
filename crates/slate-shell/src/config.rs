//! Shell configuration, loaded from a JSON file with full defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use slate_core::{AppInfo, PanelConfig, ShellError, ShellResult, SlowTurnConfig};
use tracing::info;

/// Which positioning strategy drives the panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PositionerConfig {
    /// Rigid HUD attachment at a fixed offset in front of the head.
    Hud { forward_m: f32 },
    /// Smoothed yaw-follow with hysteresis.
    SlowTurn {
        distance_m: f32,
        #[serde(default)]
        tuning: SlowTurnConfig,
    },
    /// A fixed point in the world.
    FixedPoint { point: [f32; 3] },
}

impl Default for PositionerConfig {
    fn default() -> Self {
        Self::SlowTurn {
            distance_m: 1.5,
            tuning: SlowTurnConfig::default(),
        }
    }
}

/// Reference space used as the play space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaySpace {
    Stage,
    Local,
}

impl Default for PlaySpace {
    fn default() -> Self {
        Self::Stage
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShellConfig {
    pub app: AppInfo,
    pub panel: PanelConfig,
    pub positioner: PositionerConfig,
    pub play_space: PlaySpace,
    /// Register controller bindings after session creation.
    pub enable_controllers: bool,
    /// Ask the runtime for its fastest display refresh rate at startup.
    pub request_highest_refresh_rate: bool,
}

impl ShellConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> ShellResult<Self> {
        let Some(path) = path else {
            info!("no config file given, using defaults");
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|e| {
            ShellError::Config(format!("could not read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| ShellError::Config(format!("could not parse {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_a_file() {
        let config = ShellConfig::load(None).unwrap();
        assert_eq!(config.play_space, PlaySpace::Stage);
        assert!(matches!(
            config.positioner,
            PositionerConfig::SlowTurn { .. }
        ));
        assert_eq!(config.panel.texture_width, 1280);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: ShellConfig = serde_json::from_str(
            r#"{
                "play_space": "local",
                "positioner": { "kind": "fixed_point", "point": [0.0, 1.2, -2.0] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.play_space, PlaySpace::Local);
        assert!(matches!(
            config.positioner,
            PositionerConfig::FixedPoint { .. }
        ));
        assert_eq!(config.panel.refresh_rate_hz, 120.0);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = ShellConfig::load(Some(Path::new("/nonexistent/slate.json")));
        assert!(matches!(result, Err(ShellError::Config(_))));
    }
}
