//! Error types for Gazeverdict

use thiserror::Error;

use crate::types::{Category, Stage};

/// Errors that can occur while running a game session
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Camera is unavailable on this device")]
    CameraUnavailable,

    #[error("Camera permission was denied")]
    CameraPermissionDenied,

    #[error("No face detected, look at the camera and try again")]
    NoFaceDetected,

    #[error("Insufficient tracking: {frames} of {required} frames captured")]
    InsufficientTracking { frames: u32, required: u32 },

    #[error("Could not understand answer: {0:?}")]
    AmbiguousAnswer(String),

    #[error("Speech recognition is not available")]
    SpeechUnavailable,

    #[error("Cannot {action} during the {stage:?} stage")]
    InvalidTransition { action: &'static str, stage: Stage },

    #[error("Question pool for {0:?} is empty")]
    EmptyCategory(Category),

    #[error("Question pool for {category:?} has {available} questions, {required} required")]
    NotEnoughQuestions {
        category: Category,
        available: usize,
        required: usize,
    },

    #[error("Session incomplete: {answered} of {total} questions answered")]
    IncompleteSession { answered: usize, total: usize },

    #[error("Session has no questions")]
    EmptySession,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GameError {
    /// Whether the player can recover by simply trying again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GameError::CameraUnavailable
                | GameError::CameraPermissionDenied
                | GameError::NoFaceDetected
                | GameError::InsufficientTracking { .. }
                | GameError::AmbiguousAnswer(_)
        )
    }
}
