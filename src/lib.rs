//! Gazeverdict - behavioral-signal core for an eye-tracking truth-or-lie game
//!
//! Gazeverdict turns a stream of face/eye tracking samples into per-question
//! truthfulness verdicts and a session verdict:
//! landmark adaptation → per-question aggregation → verdict scoring
//! → session results → presentation encoding.
//!
//! ## Modules
//!
//! - **Session**: The game state machine, from camera permission through
//!   calibration and questions to results
//! - **Tracking**: Landmark adaptation, metric aggregation and calibration
//! - **Scoring**: Per-question verdicts and the session aggregate
//! - **Persistence**: Snapshot storage and the shared camera handle

pub mod adapter;
pub mod answer;
pub mod calibration;
pub mod camera;
pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod questions;
pub mod results;
pub mod scorer;
pub mod session;
pub mod store;
pub mod types;

pub use adapter::{BrightnessReading, LandmarkFrame};
pub use config::GameConfig;
pub use encoder::{QuestionFeedback, ResultsEncoder, ResultsReport};
pub use error::GameError;
pub use features::{GazeStabilityWindow, QuestionMetrics, QuestionTracker};
pub use questions::QuestionBank;
pub use session::{AnswerOutcome, GameSession, NextStep, SessionSnapshot};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{
    Answer, Capabilities, Category, QuestionRecord, SessionMetrics, SessionVerdict, Stage,
    TrackingQuality, TrackingSample, Verdict,
};

/// Crate version embedded in results reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for results reports
pub const PRODUCER_NAME: &str = "gazeverdict";
