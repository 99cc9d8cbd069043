//! Core data types
//!
//! Types for tracking samples, per-question records and session-level metrics
//! that flow through the verdict pipeline.

use serde::{Deserialize, Serialize};

/// A 2D point in normalized coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Sensor reliability label reported by the tracking source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// One processed camera frame from the face/eye tracking source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSample {
    /// Left iris center (absent when no face is detected)
    pub left_iris: Option<Point>,
    /// Right iris center (absent when no face is detected)
    pub right_iris: Option<Point>,
    /// Gaze vector, normalized to -1..1 on both axes
    pub gaze: Option<Point>,
    /// Whether the eyes are closed in this frame
    #[serde(default)]
    pub is_blinking: bool,
    /// Whether the gaze deviates from forward-facing in this frame
    #[serde(default)]
    pub is_looking_away: bool,
    /// Tracking quality label
    pub tracking_quality: TrackingQuality,
}

impl TrackingSample {
    /// A frame in which no face was found
    pub fn no_face() -> Self {
        Self {
            left_iris: None,
            right_iris: None,
            gaze: None,
            is_blinking: false,
            is_looking_away: true,
            tracking_quality: TrackingQuality::Poor,
        }
    }

    /// A face is detected when both iris positions are present
    pub fn face_detected(&self) -> bool {
        self.left_iris.is_some() && self.right_iris.is_some()
    }
}

/// Player answer to a yes/no question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Yes,
    No,
}

/// Per-question verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Truthful,
    Suspicious,
}

/// Session-level verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionVerdict {
    Confident,
    Mixed,
    Suspicious,
}

/// Stage of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intro,
    Permission,
    Calibration,
    Category,
    Questions,
    Results,
}

/// Question category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Food,
    #[serde(alias = "sex")]
    Relationships,
    #[serde(alias = "movie")]
    Movies,
    Music,
    Sports,
    Personal,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Relationships,
        Category::Movies,
        Category::Music,
        Category::Sports,
        Category::Personal,
    ];
}

/// Calibration target direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationDirection {
    Center,
    Left,
    Right,
    Up,
    Down,
}

impl CalibrationDirection {
    /// Calibration steps in the order they are presented
    pub const SEQUENCE: [CalibrationDirection; 5] = [
        CalibrationDirection::Center,
        CalibrationDirection::Left,
        CalibrationDirection::Right,
        CalibrationDirection::Up,
        CalibrationDirection::Down,
    ];
}

/// Gaze captured for each calibration direction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationData {
    pub center: Option<Point>,
    pub left: Option<Point>,
    pub right: Option<Point>,
    pub up: Option<Point>,
    pub down: Option<Point>,
}

impl CalibrationData {
    pub fn get(&self, direction: CalibrationDirection) -> Option<Point> {
        match direction {
            CalibrationDirection::Center => self.center,
            CalibrationDirection::Left => self.left,
            CalibrationDirection::Right => self.right,
            CalibrationDirection::Up => self.up,
            CalibrationDirection::Down => self.down,
        }
    }

    pub fn set(&mut self, direction: CalibrationDirection, point: Point) {
        let slot = match direction {
            CalibrationDirection::Center => &mut self.center,
            CalibrationDirection::Left => &mut self.left,
            CalibrationDirection::Right => &mut self.right,
            CalibrationDirection::Up => &mut self.up,
            CalibrationDirection::Down => &mut self.down,
        };
        *slot = Some(point);
    }

    /// All five directions captured
    pub fn is_complete(&self) -> bool {
        CalibrationDirection::SEQUENCE
            .iter()
            .all(|d| self.get(*d).is_some())
    }
}

/// A question as asked in one session, with the metrics observed while answering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Question identifier within its category
    pub id: u32,
    /// Question text
    pub text: String,
    /// Player answer (None while the question is unanswered)
    pub answer: Option<Answer>,
    /// Time from question start to answer in milliseconds
    pub response_time_ms: f64,
    /// Gaze stability (0-100)
    pub gaze_stability: f64,
    /// Blinks per minute
    pub blink_rate: f64,
    /// Head movement proxy
    pub head_movement: f64,
    /// Frames sampled as looking away
    pub look_away_count: u32,
    /// Per-question verdict
    pub verdict: Option<Verdict>,
    /// Confidence in the verdict (0-100)
    pub verdict_confidence: f64,
    /// Tracking quality at answer time
    pub tracking_quality: Option<TrackingQuality>,
}

impl QuestionRecord {
    /// Create an unanswered record
    pub fn new(id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            answer: None,
            response_time_ms: 0.0,
            gaze_stability: 100.0,
            blink_rate: 0.0,
            head_movement: 0.0,
            look_away_count: 0,
            verdict: None,
            verdict_confidence: 0.0,
            tracking_quality: None,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }
}

/// Session-level behavior metrics computed when all questions are answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub avg_gaze_stability: f64,
    pub avg_blink_rate: f64,
    pub avg_head_movement: f64,
    pub avg_response_time_ms: f64,
    pub total_look_aways: u32,
    /// Session confidence (0-100, higher is more confident)
    pub confidence_score: f64,
    pub verdict: SessionVerdict,
}

/// Device capabilities probed once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// A camera can be opened
    pub camera: bool,
    /// Speech recognition is available for spoken answers
    pub speech: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            camera: true,
            speech: false,
        }
    }
}
