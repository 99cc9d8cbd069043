//! Per-question verdict scoring
//!
//! Additive penalty model: start at 100, subtract one tier per factor, add a
//! small random jitter, clamp to [15, 100]. Scores of 50 and above are
//! truthful.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GameError;
use crate::features::{QuestionMetrics, QuestionTracker};
use crate::types::Verdict;

/// Starting score before penalties
const BASE_SCORE: f64 = 100.0;

/// Lowest confidence a scored question can receive
pub const MIN_CONFIDENCE: f64 = 15.0;

/// Highest confidence a scored question can receive
pub const MAX_CONFIDENCE: f64 = 100.0;

/// Scores at or above this are truthful
pub const TRUTHFUL_THRESHOLD: f64 = 50.0;

/// Scored verdict for one question
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredVerdict {
    pub verdict: Verdict,
    /// Confidence (15-100)
    pub confidence: f64,
    /// Sum of all penalties applied, before jitter
    pub penalty: f64,
    /// Jitter added after penalties
    pub jitter: f64,
}

/// Check the tracking preconditions for scoring an answer
///
/// The face must be visible in the latest sample (no samples at all counts as
/// no face), and at least `min_frames` face-detected frames must have been seen.
pub fn check_validity(tracker: &QuestionTracker, min_frames: u32) -> Result<(), GameError> {
    if !tracker.face_detected() {
        debug!("answer rejected: no face detected");
        return Err(GameError::NoFaceDetected);
    }
    if tracker.tracking_frames() < min_frames {
        debug!(
            frames = tracker.tracking_frames(),
            required = min_frames,
            "answer rejected: insufficient tracking"
        );
        return Err(GameError::InsufficientTracking {
            frames: tracker.tracking_frames(),
            required: min_frames,
        });
    }
    Ok(())
}

/// Total penalty for a question's metrics
pub fn total_penalty(metrics: &QuestionMetrics) -> f64 {
    gaze_penalty(metrics.gaze_stability)
        + blink_penalty(metrics.blink_rate, metrics.response_time_ms)
        + head_movement_penalty(metrics.head_movement)
        + response_time_penalty(metrics.response_time_ms)
        + look_away_penalty(metrics.look_away_count)
}

/// Score from penalty and jitter, clamped and rounded
pub fn finalize_score(penalty: f64, jitter: f64) -> f64 {
    (BASE_SCORE - penalty + jitter)
        .clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
        .round()
}

pub fn verdict_for(confidence: f64) -> Verdict {
    if confidence >= TRUTHFUL_THRESHOLD {
        Verdict::Truthful
    } else {
        Verdict::Suspicious
    }
}

/// Score a question, drawing jitter uniformly from [-amplitude, +amplitude]
pub fn score<R: Rng + ?Sized>(
    metrics: &QuestionMetrics,
    jitter_amplitude: f64,
    rng: &mut R,
) -> ScoredVerdict {
    let penalty = total_penalty(metrics);
    let jitter = if jitter_amplitude > 0.0 {
        rng.gen_range(-jitter_amplitude..=jitter_amplitude)
    } else {
        0.0
    };
    let confidence = finalize_score(penalty, jitter);
    let verdict = verdict_for(confidence);

    debug!(penalty, jitter, confidence, ?verdict, "question scored");

    ScoredVerdict {
        verdict,
        confidence,
        penalty,
        jitter,
    }
}

fn gaze_penalty(stability: f64) -> f64 {
    if stability < 50.0 {
        25.0
    } else if stability < 65.0 {
        15.0
    } else if stability < 75.0 {
        10.0
    } else if stability < 85.0 {
        5.0
    } else {
        0.0
    }
}

fn blink_penalty(blink_rate: f64, response_time_ms: f64) -> f64 {
    if blink_rate > 30.0 {
        20.0
    } else if blink_rate > 20.0 {
        12.0
    } else if blink_rate > 15.0 {
        8.0
    } else if blink_rate < 3.0 && response_time_ms > 1000.0 {
        // Staring without blinking over a long answer
        5.0
    } else {
        0.0
    }
}

fn head_movement_penalty(head_movement: f64) -> f64 {
    if head_movement > 25.0 {
        15.0
    } else if head_movement > 15.0 {
        10.0
    } else if head_movement > 8.0 {
        5.0
    } else {
        0.0
    }
}

fn response_time_penalty(response_time_ms: f64) -> f64 {
    if response_time_ms > 7000.0 {
        18.0
    } else if response_time_ms > 5000.0 {
        12.0
    } else if response_time_ms > 3500.0 {
        6.0
    } else if response_time_ms < 800.0 {
        8.0
    } else {
        0.0
    }
}

fn look_away_penalty(look_aways: u32) -> f64 {
    match look_aways {
        0 => 0.0,
        1 => 4.0,
        2 => 8.0,
        3 => 12.0,
        _ => 20.0,
    }
}
