//! Calibration state machine
//!
//! Steps through center, left, right, up and down. Each step needs the face
//! in view and the gaze pointing the right way for a full countdown:
//!
//! - any sample without a face, or with a mismatched gaze, resets the countdown
//! - each 1 Hz tick decrements it only if a matching sample arrived since the
//!   previous tick; a silent tick resets it
//! - at zero the latest matching gaze is captured and the next step begins

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DEFAULT_CALIBRATION_COUNTDOWN_SECS, DEFAULT_DIRECTION_THRESHOLD};
use crate::types::{CalibrationData, CalibrationDirection, Point, TrackingSample};

/// Outcome of a countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum CalibrationEvent {
    /// Conditions not held; countdown sits at its full value
    Waiting {
        direction: CalibrationDirection,
        remaining: u32,
    },
    /// Conditions held; countdown decremented
    Holding {
        direction: CalibrationDirection,
        remaining: u32,
    },
    /// Step finished and gaze captured
    Captured {
        direction: CalibrationDirection,
        point: Point,
    },
    /// All steps are captured
    Complete,
}

/// Whether a normalized gaze points in the given calibration direction
pub fn gaze_matches(direction: CalibrationDirection, gaze: Point, threshold: f64) -> bool {
    match direction {
        CalibrationDirection::Center => gaze.x.abs() <= threshold && gaze.y.abs() <= threshold,
        CalibrationDirection::Left => gaze.x < -threshold,
        CalibrationDirection::Right => gaze.x > threshold,
        CalibrationDirection::Up => gaze.y < -threshold,
        CalibrationDirection::Down => gaze.y > threshold,
    }
}

/// Five-step calibration sequence
#[derive(Debug, Clone)]
pub struct Calibrator {
    countdown_secs: u32,
    threshold: f64,
    step: usize,
    remaining: u32,
    held: bool,
    latest_gaze: Option<Point>,
    data: CalibrationData,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(DEFAULT_CALIBRATION_COUNTDOWN_SECS, DEFAULT_DIRECTION_THRESHOLD)
    }
}

impl Calibrator {
    pub fn new(countdown_secs: u32, threshold: f64) -> Self {
        Self {
            countdown_secs,
            threshold,
            step: 0,
            remaining: countdown_secs,
            held: false,
            latest_gaze: None,
            data: CalibrationData::default(),
        }
    }

    /// Direction currently being calibrated, None once complete
    pub fn current_direction(&self) -> Option<CalibrationDirection> {
        CalibrationDirection::SEQUENCE.get(self.step).copied()
    }

    /// Seconds left on the current step
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_complete(&self) -> bool {
        self.current_direction().is_none()
    }

    pub fn data(&self) -> &CalibrationData {
        &self.data
    }

    pub fn into_data(self) -> CalibrationData {
        self.data
    }

    /// Record the latest sample; losing the face or the direction resets the countdown
    pub fn observe(&mut self, sample: &TrackingSample) {
        let Some(direction) = self.current_direction() else {
            return;
        };

        let matching_gaze = sample
            .gaze
            .filter(|gaze| gaze_matches(direction, *gaze, self.threshold));

        match (sample.face_detected(), matching_gaze) {
            (true, Some(gaze)) => {
                self.held = true;
                self.latest_gaze = Some(gaze);
            }
            _ => {
                if self.held || self.remaining != self.countdown_secs {
                    debug!(?direction, "calibration conditions lost, countdown reset");
                }
                self.held = false;
                self.remaining = self.countdown_secs;
            }
        }
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> CalibrationEvent {
        let Some(direction) = self.current_direction() else {
            return CalibrationEvent::Complete;
        };

        if !self.held {
            if self.remaining != self.countdown_secs {
                debug!(?direction, "no matching sample since last tick, countdown reset");
            }
            self.remaining = self.countdown_secs;
            return CalibrationEvent::Waiting {
                direction,
                remaining: self.remaining,
            };
        }

        // Each tick consumes the samples observed since the previous one
        self.held = false;
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return CalibrationEvent::Holding {
                direction,
                remaining: self.remaining,
            };
        }

        let point = self.latest_gaze.unwrap_or_default();
        self.data.set(direction, point);
        self.step += 1;
        self.remaining = self.countdown_secs;
        self.latest_gaze = None;

        info!(?direction, x = point.x, y = point.y, "calibration step captured");
        CalibrationEvent::Captured { direction, point }
    }
}
