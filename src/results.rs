//! Session results aggregation
//!
//! Averages the answered questions of a session and applies a coarse tiered
//! suspicion model, independent of the per-question scorer, to produce the
//! session verdict.

use tracing::info;

use crate::error::GameError;
use crate::types::{QuestionRecord, SessionMetrics, SessionVerdict};

/// Points of confidence lost per suspicion point
const CONFIDENCE_PER_SUSPICION: f64 = 10.0;

/// Confidence at or above which the session is confident
const CONFIDENT_THRESHOLD: f64 = 70.0;

/// Confidence at or above which the session is mixed
const MIXED_THRESHOLD: f64 = 40.0;

/// Reduce a completed session's records into session metrics
///
/// Every record must be answered.
pub fn calculate_results(questions: &[QuestionRecord]) -> Result<SessionMetrics, GameError> {
    if questions.is_empty() {
        return Err(GameError::EmptySession);
    }

    let answered = questions.iter().filter(|q| q.is_answered()).count();
    if answered != questions.len() {
        return Err(GameError::IncompleteSession {
            answered,
            total: questions.len(),
        });
    }

    let avg_gaze_stability = mean(questions.iter().map(|q| q.gaze_stability));
    let avg_blink_rate = mean(questions.iter().map(|q| q.blink_rate));
    let avg_head_movement = mean(questions.iter().map(|q| q.head_movement));
    let avg_response_time_ms = mean(questions.iter().map(|q| q.response_time_ms));
    let total_look_aways: u32 = questions.iter().map(|q| q.look_away_count).sum();

    let suspicion = suspicion_score(
        avg_gaze_stability,
        avg_blink_rate,
        avg_head_movement,
        avg_response_time_ms,
        total_look_aways,
    );
    let confidence_score = confidence_from_suspicion(suspicion);
    let verdict = session_verdict(confidence_score);

    info!(
        questions = questions.len(),
        suspicion,
        confidence_score,
        ?verdict,
        "session results calculated"
    );

    Ok(SessionMetrics {
        avg_gaze_stability,
        avg_blink_rate,
        avg_head_movement,
        avg_response_time_ms,
        total_look_aways,
        confidence_score,
        verdict,
    })
}

/// Tiered suspicion over the session averages (may be negative)
pub fn suspicion_score(
    avg_gaze_stability: f64,
    avg_blink_rate: f64,
    avg_head_movement: f64,
    avg_response_time_ms: f64,
    total_look_aways: u32,
) -> i32 {
    let mut suspicion = 0;

    suspicion += if avg_gaze_stability < 60.0 {
        3
    } else if avg_gaze_stability < 80.0 {
        1
    } else {
        -2
    };

    suspicion += if avg_blink_rate > 20.0 {
        2
    } else if avg_blink_rate > 10.0 {
        1
    } else {
        -1
    };

    if avg_head_movement > 30.0 {
        suspicion += 2;
    } else if avg_head_movement > 15.0 {
        suspicion += 1;
    }

    if avg_response_time_ms > 5000.0 {
        suspicion += 2;
    } else if avg_response_time_ms > 3000.0 {
        suspicion += 1;
    }

    if total_look_aways > 10 {
        suspicion += 2;
    } else if total_look_aways > 5 {
        suspicion += 1;
    }

    suspicion
}

/// `clamp(100 - suspicion * 10, 0, 100)`
pub fn confidence_from_suspicion(suspicion: i32) -> f64 {
    (100.0 - suspicion as f64 * CONFIDENCE_PER_SUSPICION).clamp(0.0, 100.0)
}

pub fn session_verdict(confidence_score: f64) -> SessionVerdict {
    if confidence_score >= CONFIDENT_THRESHOLD {
        SessionVerdict::Confident
    } else if confidence_score >= MIXED_THRESHOLD {
        SessionVerdict::Mixed
    } else {
        SessionVerdict::Suspicious
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let count = values.len();
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}
