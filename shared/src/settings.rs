//! Interaction tunables, loaded from `assets/interaction.ron`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::aim::AimTuning;
use crate::probe::ProbeSettings;

/// Current settings file version.
pub const SETTINGS_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct SmoothingSettings {
    /// Smooth time of both beam anchors.
    pub anchor_smooth_time: f32,
    /// Distance of the near anchor in front of the hand.
    pub near_anchor_distance: f32,
    /// How hard a held body is pulled toward the far anchor (1/s).
    pub pull_gain: f32,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            anchor_smooth_time: 0.08,
            near_anchor_distance: 0.35,
            pull_gain: 8.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TurnMode {
    #[default]
    Snap,
    Smooth,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct TurnSettings {
    pub mode: TurnMode,
    /// Degrees per snap.
    pub snap_degrees: f32,
    /// Degrees per second at full stick.
    pub smooth_speed: f32,
    /// Stick magnitude below which turn input is ignored.
    pub deadzone: f32,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            mode: TurnMode::Snap,
            snap_degrees: 45.0,
            smooth_speed: 120.0,
            deadzone: 0.5,
        }
    }
}

/// Names of the input actions the interaction layer reads.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ActionNames {
    pub grab: String,
    pub turn: String,
    pub recenter: String,
}

impl Default for ActionNames {
    fn default() -> Self {
        Self {
            grab: "grab".to_string(),
            turn: "turn".to_string(),
            recenter: "recenter".to_string(),
        }
    }
}

#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InteractionSettings {
    pub version: u32,
    pub probe: ProbeSettings,
    pub aim: AimTuning,
    pub smoothing: SmoothingSettings,
    pub turn: TurnSettings,
    pub actions: ActionNames,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            probe: ProbeSettings::default(),
            aim: AimTuning::default(),
            smoothing: SmoothingSettings::default(),
            turn: TurnSettings::default(),
            actions: ActionNames::default(),
        }
    }
}

impl InteractionSettings {
    /// Parse settings from RON text. Missing fields take their defaults.
    pub fn from_ron(text: &str) -> Result<Self, String> {
        let settings: InteractionSettings =
            ron::from_str(text).map_err(|e| format!("Failed to parse settings: {}", e))?;

        if settings.version != SETTINGS_VERSION {
            return Err(format!(
                "Unsupported settings version {} (expected {})",
                settings.version, SETTINGS_VERSION
            ));
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_ron(&text).map_err(|e| format!("{}: {}", path.display(), e))
    }

    /// Load from `path`, falling back to defaults with a warning.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => {
                info!("Loaded interaction settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("{} - using default interaction settings", e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        let positive = [
            ("probe.range", self.probe.range),
            ("probe.forgiveness_radius", self.probe.forgiveness_radius),
            ("aim.head_follow_rate", self.aim.head_follow_rate),
            ("aim.aiming_window", self.aim.aiming_window),
            ("aim.idle_relax_rate", self.aim.idle_relax_rate),
            ("aim.soft_strength_rate", self.aim.soft_strength_rate),
            ("aim.offset_smooth_time", self.aim.offset_smooth_time),
            ("smoothing.anchor_smooth_time", self.smoothing.anchor_smooth_time),
            ("smoothing.pull_gain", self.smoothing.pull_gain),
            ("turn.snap_degrees", self.turn.snap_degrees),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }
        Ok(())
    }
}
