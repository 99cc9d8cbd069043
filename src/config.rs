//! Game configuration
//!
//! Tunables for the metric aggregator, scorer, calibration and lighting check. Scoring
//! thresholds and penalties are fixed in `scorer` and `results`.

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Default number of questions drawn per session
pub const DEFAULT_QUESTIONS_PER_SESSION: usize = 5;

/// Default number of face-detected frames required before scoring
pub const DEFAULT_MIN_TRACKING_FRAMES: u32 = 10;

/// Default gaze movement window size
pub const DEFAULT_STABILITY_WINDOW: usize = 10;

/// Default calibration countdown per step in seconds
pub const DEFAULT_CALIBRATION_COUNTDOWN_SECS: u32 = 3;

/// Default jitter amplitude applied to per-question scores
pub const DEFAULT_JITTER_AMPLITUDE: f64 = 5.0;

/// Default normalized gaze offset separating center from a direction
pub const DEFAULT_DIRECTION_THRESHOLD: f64 = 0.3;

/// Default lowest frame brightness (0-100) considered usable
pub const DEFAULT_MIN_ACCEPTABLE_BRIGHTNESS: f64 = 30.0;

/// Game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Questions drawn from the category pool per session
    pub questions_per_session: usize,
    /// Face-detected frames required before an answer is scored
    pub min_tracking_frames: u32,
    /// Capacity of the gaze movement window
    pub stability_window: usize,
    /// Seconds each calibration step must be held
    pub calibration_countdown_secs: u32,
    /// Jitter is drawn uniformly from [-amplitude, +amplitude]
    pub jitter_amplitude: f64,
    /// Gaze offset used to match calibration directions
    pub direction_threshold: f64,
    /// Frame brightness (0-100) below which lighting is too poor to track
    pub min_acceptable_brightness: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            questions_per_session: DEFAULT_QUESTIONS_PER_SESSION,
            min_tracking_frames: DEFAULT_MIN_TRACKING_FRAMES,
            stability_window: DEFAULT_STABILITY_WINDOW,
            calibration_countdown_secs: DEFAULT_CALIBRATION_COUNTDOWN_SECS,
            jitter_amplitude: DEFAULT_JITTER_AMPLITUDE,
            direction_threshold: DEFAULT_DIRECTION_THRESHOLD,
            min_acceptable_brightness: DEFAULT_MIN_ACCEPTABLE_BRIGHTNESS,
        }
    }
}

impl GameConfig {
    /// Load and validate a configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String, GameError> {
        serde_json::to_string_pretty(self).map_err(GameError::Json)
    }

    /// Check that every tunable is usable
    pub fn validate(&self) -> Result<(), GameError> {
        if self.questions_per_session == 0 {
            return Err(GameError::Config(
                "questions_per_session must be at least 1".to_string(),
            ));
        }
        if self.stability_window == 0 {
            return Err(GameError::Config(
                "stability_window must be at least 1".to_string(),
            ));
        }
        if self.calibration_countdown_secs == 0 {
            return Err(GameError::Config(
                "calibration_countdown_secs must be at least 1".to_string(),
            ));
        }
        if !self.jitter_amplitude.is_finite() || self.jitter_amplitude < 0.0 {
            return Err(GameError::Config(format!(
                "jitter_amplitude must be a non-negative number, got {}",
                self.jitter_amplitude
            )));
        }
        if !(0.0..1.0).contains(&self.direction_threshold) {
            return Err(GameError::Config(format!(
                "direction_threshold must be in [0, 1), got {}",
                self.direction_threshold
            )));
        }
        if !(0.0..=100.0).contains(&self.min_acceptable_brightness) {
            return Err(GameError::Config(format!(
                "min_acceptable_brightness must be in [0, 100], got {}",
                self.min_acceptable_brightness
            )));
        }
        Ok(())
    }
}
