//! Per-question metric aggregation
//!
//! Reduces the stream of tracking samples observed while one question is shown
//! into the behavioral metrics consumed by the verdict scorer.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::DEFAULT_STABILITY_WINDOW;
use crate::types::{Point, TrackingQuality, TrackingSample};

/// Scale mapping mean gaze movement onto the 0-100 stability range
const STABILITY_SCALE: f64 = 200.0;

/// Head movement proxy per look-away frame
const HEAD_MOVEMENT_PER_LOOK_AWAY: f64 = 5.0;

/// Milliseconds per minute, for blink rate normalization
const MS_PER_MINUTE: f64 = 60_000.0;

/// Metrics for one answered question, as fed to the scorer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuestionMetrics {
    /// Gaze stability (0-100)
    pub gaze_stability: f64,
    /// Blinks per minute
    pub blink_rate: f64,
    /// Head movement proxy
    pub head_movement: f64,
    /// Response time in milliseconds
    pub response_time_ms: f64,
    /// Look-away frames
    pub look_away_count: u32,
}

/// Bounded FIFO of frame-to-frame gaze movement magnitudes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazeStabilityWindow {
    movements: VecDeque<f64>,
    capacity: usize,
}

impl Default for GazeStabilityWindow {
    fn default() -> Self {
        Self::new(DEFAULT_STABILITY_WINDOW)
    }
}

impl GazeStabilityWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            movements: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a movement magnitude, evicting the oldest entry when full
    pub fn push(&mut self, movement: f64) {
        self.movements.push_back(movement);
        while self.movements.len() > self.capacity {
            self.movements.pop_front();
        }
    }

    /// Mean movement, or None when no movement has been observed
    pub fn mean(&self) -> Option<f64> {
        if self.movements.is_empty() {
            return None;
        }
        let sum: f64 = self.movements.iter().sum();
        Some(sum / self.movements.len() as f64)
    }

    /// Stability score: `round(clamp(100 - mean * 200, 0, 100))`, 100 when empty
    pub fn stability(&self) -> f64 {
        match self.mean() {
            Some(avg) => (100.0 - avg * STABILITY_SCALE).clamp(0.0, 100.0).round(),
            None => 100.0,
        }
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    pub fn clear(&mut self) {
        self.movements.clear();
    }
}

/// Accumulator scoped to the currently active question
///
/// A new tracker is created each time a question becomes active, so nothing
/// observed for one question leaks into the next.
#[derive(Debug, Clone)]
pub struct QuestionTracker {
    started_at: DateTime<Utc>,
    window: GazeStabilityWindow,
    last_gaze: Option<Point>,
    blink_count: u32,
    look_away_count: u32,
    tracking_frames: u32,
    face_detected: bool,
    tracking_quality: Option<TrackingQuality>,
}

impl QuestionTracker {
    /// Start tracking a question shown at `started_at`
    pub fn new(started_at: DateTime<Utc>, window_capacity: usize) -> Self {
        Self {
            started_at,
            window: GazeStabilityWindow::new(window_capacity),
            last_gaze: None,
            blink_count: 0,
            look_away_count: 0,
            tracking_frames: 0,
            face_detected: false,
            tracking_quality: None,
        }
    }

    /// Fold one sample into the accumulators
    pub fn ingest(&mut self, sample: &TrackingSample) {
        if let Some(gaze) = sample.gaze {
            if let Some(prev) = self.last_gaze {
                self.window.push(gaze.distance(&prev));
            }
            self.last_gaze = Some(gaze);
        }

        // Every frame counts while the state holds; consecutive frames are not merged.
        if sample.is_blinking {
            self.blink_count += 1;
        }
        if sample.is_looking_away {
            self.look_away_count += 1;
        }

        self.face_detected = sample.face_detected();
        if self.face_detected {
            self.tracking_frames += 1;
        }
        self.tracking_quality = Some(sample.tracking_quality);

        trace!(
            frames = self.tracking_frames,
            blinks = self.blink_count,
            look_aways = self.look_away_count,
            "sample ingested"
        );
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the most recent sample contained a face
    pub fn face_detected(&self) -> bool {
        self.face_detected
    }

    /// Face-detected frames accumulated so far
    pub fn tracking_frames(&self) -> u32 {
        self.tracking_frames
    }

    pub fn blink_count(&self) -> u32 {
        self.blink_count
    }

    pub fn look_away_count(&self) -> u32 {
        self.look_away_count
    }

    /// Quality label of the most recent sample
    pub fn tracking_quality(&self) -> Option<TrackingQuality> {
        self.tracking_quality
    }

    /// Current gaze stability (0-100)
    pub fn gaze_stability(&self) -> f64 {
        self.window.stability()
    }

    pub fn window(&self) -> &GazeStabilityWindow {
        &self.window
    }

    /// Milliseconds elapsed between question start and `now`, never negative
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> f64 {
        (now - self.started_at).num_milliseconds().max(0) as f64
    }

    /// Reduce the accumulators into question metrics for an answer given at `answered_at`
    pub fn metrics(&self, answered_at: DateTime<Utc>) -> QuestionMetrics {
        let response_time_ms = self.elapsed_ms(answered_at);

        QuestionMetrics {
            gaze_stability: self.gaze_stability(),
            blink_rate: compute_blink_rate(self.blink_count, response_time_ms),
            head_movement: compute_head_movement(self.look_away_count),
            response_time_ms,
            look_away_count: self.look_away_count,
        }
    }
}

/// Blinks per minute over the response time (0 when the response time is 0)
pub fn compute_blink_rate(blink_count: u32, response_time_ms: f64) -> f64 {
    if response_time_ms > 0.0 {
        blink_count as f64 * (MS_PER_MINUTE / response_time_ms)
    } else {
        0.0
    }
}

/// Head movement proxy derived from look-away frames
pub fn compute_head_movement(look_away_count: u32) -> f64 {
    look_away_count as f64 * HEAD_MOVEMENT_PER_LOOK_AWAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn face_sample(gaze: Option<Point>) -> TrackingSample {
        TrackingSample {
            left_iris: Some(Point::new(0.45, 0.5)),
            right_iris: Some(Point::new(0.55, 0.5)),
            gaze,
            is_blinking: false,
            is_looking_away: false,
            tracking_quality: TrackingQuality::Good,
        }
    }

    #[test]
    fn test_empty_window_is_fully_stable() {
        let window = GazeStabilityWindow::default();
        assert!(window.mean().is_none());
        assert_eq!(window.stability(), 100.0);
    }

    #[test]
    fn test_stability_formula() {
        let mut window = GazeStabilityWindow::new(10);
        window.push(0.1);
        window.push(0.2);

        // mean 0.15 -> 100 - 30 = 70
        assert_eq!(window.stability(), 70.0);
    }

    #[test]
    fn test_stability_rounds_and_clamps() {
        let mut window = GazeStabilityWindow::new(10);
        window.push(0.0123);
        // 100 - 2.46 = 97.54 -> 98
        assert_eq!(window.stability(), 98.0);

        window.clear();
        window.push(1.5);
        assert_eq!(window.stability(), 0.0);
    }

    #[test]
    fn test_window_evicts_oldest_first() {
        let mut window = GazeStabilityWindow::new(10);
        window.push(1.0);
        for _ in 0..10 {
            window.push(0.0);
        }

        assert_eq!(window.len(), 10);
        // The large movement was evicted
        assert_eq!(window.mean(), Some(0.0));
        assert_eq!(window.stability(), 100.0);
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut window = GazeStabilityWindow::new(10);
        for i in 0..25 {
            window.push(i as f64 * 0.01);
            assert!(window.len() <= 10);
        }
        // Holds 0.15..=0.24, mean 0.195 -> 61
        assert_eq!(window.stability(), 61.0);
    }

    #[test]
    fn test_tracker_measures_movement_between_gazes() {
        let mut tracker = QuestionTracker::new(start(), 10);
        tracker.ingest(&face_sample(Some(Point::new(0.0, 0.0))));
        tracker.ingest(&face_sample(Some(Point::new(0.3, 0.4))));

        // One movement of 0.5 -> 100 - 100 = 0
        assert_eq!(tracker.window().len(), 1);
        assert_eq!(tracker.gaze_stability(), 0.0);
    }

    #[test]
    fn test_null_gaze_is_skipped() {
        let mut tracker = QuestionTracker::new(start(), 10);
        tracker.ingest(&face_sample(Some(Point::new(0.0, 0.0))));
        tracker.ingest(&face_sample(None));
        tracker.ingest(&face_sample(Some(Point::new(0.03, 0.04))));

        // Movement measured against the last non-null gaze: 0.05 -> 90
        assert_eq!(tracker.window().len(), 1);
        assert_eq!(tracker.gaze_stability(), 90.0);
    }

    #[test]
    fn test_sustained_blink_counts_every_frame() {
        let mut tracker = QuestionTracker::new(start(), 10);
        for _ in 0..4 {
            let mut sample = face_sample(None);
            sample.is_blinking = true;
            tracker.ingest(&sample);
        }
        tracker.ingest(&face_sample(None));

        assert_eq!(tracker.blink_count(), 4);
    }

    #[test]
    fn test_no_face_frames_count_as_look_aways_but_not_tracking() {
        let mut tracker = QuestionTracker::new(start(), 10);
        tracker.ingest(&face_sample(None));
        tracker.ingest(&TrackingSample::no_face());
        tracker.ingest(&TrackingSample::no_face());

        assert_eq!(tracker.tracking_frames(), 1);
        assert_eq!(tracker.look_away_count(), 2);
        assert!(!tracker.face_detected());
        assert_eq!(tracker.tracking_quality(), Some(TrackingQuality::Poor));
    }

    #[test]
    fn test_metrics_at_answer_time() {
        let mut tracker = QuestionTracker::new(start(), 10);
        for i in 0..12 {
            let mut sample = face_sample(Some(Point::default()));
            sample.is_blinking = i % 6 == 0;
            sample.is_looking_away = i == 3;
            tracker.ingest(&sample);
        }

        let metrics = tracker.metrics(start() + Duration::milliseconds(3000));
        assert_eq!(metrics.response_time_ms, 3000.0);
        // 2 blinks in 3 seconds -> 40 per minute
        assert!((metrics.blink_rate - 40.0).abs() < 1e-9);
        assert_eq!(metrics.look_away_count, 1);
        assert_eq!(metrics.head_movement, 5.0);
        assert_eq!(metrics.gaze_stability, 100.0);
    }

    #[test]
    fn test_answer_before_start_clamps_response_time() {
        let tracker = QuestionTracker::new(start(), 10);
        let metrics = tracker.metrics(start() - Duration::milliseconds(50));
        assert_eq!(metrics.response_time_ms, 0.0);
        assert_eq!(metrics.blink_rate, 0.0);
    }

    #[test]
    fn test_blink_rate_zero_response_time() {
        assert_eq!(compute_blink_rate(5, 0.0), 0.0);
        assert!((compute_blink_rate(1, 6000.0) - 10.0).abs() < 1e-9);
    }
}
