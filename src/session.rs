//! Game session state machine
//!
//! Owns the session record and drives it through
//! intro → permission → calibration → category → questions → results.
//! Each action is one method; the metric tracker, calibrator and scorer are
//! invoked from here.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::adapter::{frame_brightness, BrightnessReading};
use crate::answer::parse_spoken_answer;
use crate::calibration::{CalibrationEvent, Calibrator};
use crate::config::GameConfig;
use crate::error::GameError;
use crate::features::QuestionTracker;
use crate::questions::QuestionBank;
use crate::results::calculate_results;
use crate::scorer::{check_validity, score, ScoredVerdict};
use crate::types::{
    Answer, CalibrationData, Capabilities, Category, QuestionRecord, SessionMetrics, Stage,
    TrackingSample,
};

/// What follows a successful answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step")]
pub enum NextStep {
    /// The question at `index` is now active
    Question { index: usize },
    /// The session is complete
    Results { metrics: SessionMetrics },
}

/// Result of a successful answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    /// Index of the answered question
    pub index: usize,
    /// The record as written
    pub record: QuestionRecord,
    /// Scoring details
    pub scored: ScoredVerdict,
    pub next: NextStep,
}

/// Persistable image of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub stage: Stage,
    pub camera_permission: Option<bool>,
    pub calibration: CalibrationData,
    pub category: Option<Category>,
    pub questions: Vec<QuestionRecord>,
    pub current_index: usize,
    pub behavior_metrics: Option<SessionMetrics>,
    /// Epoch of the last activated question; restores continue past it
    #[serde(default)]
    pub question_epoch: u64,
}

/// A single player's game
#[derive(Debug, Clone)]
pub struct GameSession {
    id: Uuid,
    config: GameConfig,
    bank: QuestionBank,
    capabilities: Capabilities,
    stage: Stage,
    camera_permission: Option<bool>,
    calibration: CalibrationData,
    calibrator: Option<Calibrator>,
    category: Option<Category>,
    questions: Vec<QuestionRecord>,
    current_index: usize,
    tracker: Option<QuestionTracker>,
    question_epoch: u64,
    metrics: Option<SessionMetrics>,
}

impl GameSession {
    /// Create a session with the built-in question bank
    pub fn new(config: GameConfig, capabilities: Capabilities) -> Result<Self, GameError> {
        Self::with_question_bank(config, QuestionBank::default(), capabilities)
    }

    pub fn with_question_bank(
        config: GameConfig,
        bank: QuestionBank,
        capabilities: Capabilities,
    ) -> Result<Self, GameError> {
        config.validate()?;
        let session = Self {
            id: Uuid::new_v4(),
            config,
            bank,
            capabilities,
            stage: Stage::Intro,
            camera_permission: None,
            calibration: CalibrationData::default(),
            calibrator: None,
            category: None,
            questions: Vec::new(),
            current_index: 0,
            tracker: None,
            question_epoch: 0,
            metrics: None,
        };
        info!(session_id = %session.id, ?capabilities, "session created");
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn camera_permission(&self) -> Option<bool> {
        self.camera_permission
    }

    pub fn calibration_data(&self) -> &CalibrationData {
        &self.calibration
    }

    /// Calibration in progress, if any
    pub fn calibrator(&self) -> Option<&Calibrator> {
        self.calibrator.as_ref()
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The active question while in the questions stage
    pub fn current_question(&self) -> Option<&QuestionRecord> {
        if self.stage != Stage::Questions {
            return None;
        }
        self.questions.get(self.current_index)
    }

    /// Accumulator for the active question
    pub fn tracker(&self) -> Option<&QuestionTracker> {
        self.tracker.as_ref()
    }

    /// Identifies the active question's tracking period
    pub fn question_epoch(&self) -> u64 {
        self.question_epoch
    }

    pub fn metrics(&self) -> Option<&SessionMetrics> {
        self.metrics.as_ref()
    }

    /// Leave the intro for the permission prompt
    pub fn start(&mut self) -> Result<(), GameError> {
        self.ensure_stage(Stage::Intro, "start")?;
        self.transition(Stage::Permission);
        Ok(())
    }

    /// Record the player's camera permission decision
    ///
    /// A grant moves on to calibration. A denial, or a device without a
    /// camera, keeps the session on the permission prompt.
    pub fn record_camera_permission(&mut self, granted: bool) -> Result<(), GameError> {
        self.ensure_stage(Stage::Permission, "record camera permission")?;

        if !self.capabilities.camera {
            self.camera_permission = Some(false);
            warn!("camera permission requested on a device without a camera");
            return Err(GameError::CameraUnavailable);
        }
        if !granted {
            self.camera_permission = Some(false);
            warn!("camera permission denied");
            return Err(GameError::CameraPermissionDenied);
        }

        self.camera_permission = Some(true);
        self.calibrator = Some(Calibrator::new(
            self.config.calibration_countdown_secs,
            self.config.direction_threshold,
        ));
        self.transition(Stage::Calibration);
        Ok(())
    }

    /// Push one tracking sample to whatever is consuming samples in this stage
    pub fn ingest(&mut self, sample: &TrackingSample) {
        match self.stage {
            Stage::Calibration => {
                if let Some(calibrator) = self.calibrator.as_mut() {
                    calibrator.observe(sample);
                }
            }
            Stage::Questions => {
                if let Some(tracker) = self.tracker.as_mut() {
                    tracker.ingest(sample);
                }
            }
            stage => trace!(?stage, "sample ignored outside tracking stages"),
        }
    }

    /// Push a sample tagged with the question epoch it was captured for
    ///
    /// Returns false, dropping the sample, when that question has ended.
    pub fn ingest_for(&mut self, epoch: u64, sample: &TrackingSample) -> bool {
        if self.stage != Stage::Questions || epoch != self.question_epoch {
            debug!(
                epoch,
                current = self.question_epoch,
                "stale sample dropped"
            );
            return false;
        }
        self.ingest(sample);
        true
    }

    /// Advance the calibration countdown by one second
    pub fn calibration_tick(&mut self) -> Result<CalibrationEvent, GameError> {
        self.ensure_stage(Stage::Calibration, "tick calibration")?;
        let calibrator = self.calibrator.get_or_insert_with(|| {
            Calibrator::new(
                self.config.calibration_countdown_secs,
                self.config.direction_threshold,
            )
        });

        let event = calibrator.tick();
        if let CalibrationEvent::Captured { direction, point } = event {
            self.calibration.set(direction, point);
        }
        Ok(event)
    }

    /// Leave calibration after all five directions are captured
    pub fn finish_calibration(&mut self) -> Result<(), GameError> {
        self.ensure_stage(Stage::Calibration, "finish calibration")?;
        let complete = self
            .calibrator
            .as_ref()
            .map(Calibrator::is_complete)
            .unwrap_or(false);
        if !complete {
            return Err(GameError::InvalidTransition {
                action: "finish an incomplete calibration",
                stage: self.stage,
            });
        }

        if let Some(calibrator) = self.calibrator.take() {
            self.calibration = calibrator.into_data();
        }
        self.transition(Stage::Category);
        Ok(())
    }

    /// Leave calibration without completing it
    pub fn skip_calibration(&mut self) -> Result<(), GameError> {
        self.ensure_stage(Stage::Calibration, "skip calibration")?;
        self.calibrator = None;
        info!("calibration skipped");
        self.transition(Stage::Category);
        Ok(())
    }

    /// Draw the session's questions from a category and show the first one
    pub fn select_category<R: Rng + ?Sized>(
        &mut self,
        category: Category,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<&QuestionRecord, GameError> {
        self.ensure_stage(Stage::Category, "select a category")?;
        self.ensure_permission()?;

        let questions = self
            .bank
            .draw(category, self.config.questions_per_session, rng)?;

        self.category = Some(category);
        self.questions = questions;
        self.current_index = 0;
        self.metrics = None;
        self.activate_question(now);
        self.transition(Stage::Questions);

        Ok(&self.questions[0])
    }

    /// Answer the active question
    ///
    /// The tracking gate is checked first; a rejection leaves the record and
    /// the active question untouched. On success the record is written once,
    /// and either the next question is activated or the results are computed.
    pub fn answer<R: Rng + ?Sized>(
        &mut self,
        answer: Answer,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<AnswerOutcome, GameError> {
        self.ensure_stage(Stage::Questions, "answer")?;
        let index = self.current_index;
        let total = self.questions.len();

        let tracker = self.tracker.as_ref().ok_or(GameError::NoFaceDetected)?;
        check_validity(tracker, self.config.min_tracking_frames)?;

        let metrics = tracker.metrics(now);
        let tracking_quality = tracker.tracking_quality();
        let scored = score(&metrics, self.config.jitter_amplitude, rng);

        let record = self
            .questions
            .get_mut(index)
            .ok_or(GameError::IncompleteSession {
                answered: index,
                total,
            })?;
        if record.is_answered() {
            // Unreachable while the progress invariant holds
            return Err(GameError::InvalidTransition {
                action: "answer an already answered question",
                stage: Stage::Questions,
            });
        }

        record.answer = Some(answer);
        record.response_time_ms = metrics.response_time_ms;
        record.gaze_stability = metrics.gaze_stability;
        record.blink_rate = metrics.blink_rate;
        record.head_movement = metrics.head_movement;
        record.look_away_count = metrics.look_away_count;
        record.verdict = Some(scored.verdict);
        record.verdict_confidence = scored.confidence;
        record.tracking_quality = tracking_quality;
        let record = record.clone();

        info!(
            index,
            id = record.id,
            ?answer,
            verdict = ?scored.verdict,
            confidence = scored.confidence,
            "question answered"
        );

        let next = if index + 1 < total {
            self.current_index += 1;
            self.activate_question(now);
            NextStep::Question {
                index: self.current_index,
            }
        } else {
            self.tracker = None;
            let metrics = self.calculate_results()?.clone();
            self.transition(Stage::Results);
            NextStep::Results { metrics }
        };

        Ok(AnswerOutcome {
            index,
            record,
            scored,
            next,
        })
    }

    /// Answer the active question from a speech transcript
    pub fn answer_spoken<R: Rng + ?Sized>(
        &mut self,
        transcript: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<AnswerOutcome, GameError> {
        if !self.capabilities.speech {
            return Err(GameError::SpeechUnavailable);
        }
        self.ensure_stage(Stage::Questions, "answer")?;
        let answer = parse_spoken_answer(transcript)?;
        self.answer(answer, now, rng)
    }

    /// Compute session metrics; every question must be answered
    pub fn calculate_results(&mut self) -> Result<&SessionMetrics, GameError> {
        let metrics = calculate_results(&self.questions)?;
        Ok(self.metrics.insert(metrics))
    }

    /// Discard everything and return to the intro
    pub fn reset(&mut self) {
        let previous = self.id;
        self.id = Uuid::new_v4();
        self.stage = Stage::Intro;
        self.camera_permission = None;
        self.calibration = CalibrationData::default();
        self.calibrator = None;
        self.category = None;
        self.questions.clear();
        self.current_index = 0;
        self.tracker = None;
        self.question_epoch += 1;
        self.metrics = None;
        info!(%previous, session_id = %self.id, "session reset");
    }

    /// Start another round after the results, keeping the camera grant
    ///
    /// Questions, metrics and calibration are cleared under a new session id
    /// and the player goes straight back to category selection.
    pub fn play_again(&mut self) -> Result<(), GameError> {
        self.ensure_stage(Stage::Results, "play again")?;
        self.ensure_permission()?;

        let previous = self.id;
        self.id = Uuid::new_v4();
        self.calibration = CalibrationData::default();
        self.calibrator = None;
        self.category = None;
        self.questions.clear();
        self.current_index = 0;
        self.tracker = None;
        self.question_epoch += 1;
        self.metrics = None;
        info!(%previous, session_id = %self.id, "new round");
        self.transition(Stage::Category);
        Ok(())
    }

    /// Rate the lighting of a raw RGBA camera frame against the configured minimum
    pub fn check_lighting(&self, rgba: &[u8]) -> BrightnessReading {
        let reading = frame_brightness(rgba, self.config.min_acceptable_brightness);
        if !reading.is_acceptable {
            debug!(brightness = reading.brightness, "lighting below minimum");
        }
        reading
    }

    /// Capture the persistable part of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            stage: self.stage,
            camera_permission: self.camera_permission,
            calibration: self.calibration.clone(),
            category: self.category,
            questions: self.questions.clone(),
            current_index: self.current_index,
            behavior_metrics: self.metrics.clone(),
            question_epoch: self.question_epoch,
        }
    }

    /// Rebuild a session from a snapshot
    ///
    /// Tracking state is not persisted: a restored question starts a fresh
    /// tracker at `now`, and a restored calibration starts from its first step.
    pub fn restore(
        snapshot: SessionSnapshot,
        config: GameConfig,
        bank: QuestionBank,
        capabilities: Capabilities,
        now: DateTime<Utc>,
    ) -> Result<Self, GameError> {
        config.validate()?;
        validate_snapshot(&snapshot)?;

        let mut session = Self {
            id: snapshot.session_id,
            config,
            bank,
            capabilities,
            stage: snapshot.stage,
            camera_permission: snapshot.camera_permission,
            calibration: snapshot.calibration,
            calibrator: None,
            category: snapshot.category,
            questions: snapshot.questions,
            current_index: snapshot.current_index,
            tracker: None,
            question_epoch: snapshot.question_epoch,
            metrics: snapshot.behavior_metrics,
        };

        match session.stage {
            Stage::Calibration => {
                session.calibrator = Some(Calibrator::new(
                    session.config.calibration_countdown_secs,
                    session.config.direction_threshold,
                ));
            }
            Stage::Questions => session.activate_question(now),
            _ => {}
        }

        info!(
            session_id = %session.id,
            stage = ?session.stage,
            index = session.current_index,
            "session restored"
        );
        Ok(session)
    }

    fn activate_question(&mut self, now: DateTime<Utc>) {
        self.question_epoch += 1;
        self.tracker = Some(QuestionTracker::new(now, self.config.stability_window));
        debug!(
            index = self.current_index,
            epoch = self.question_epoch,
            "question activated"
        );
    }

    fn transition(&mut self, to: Stage) {
        info!(from = ?self.stage, ?to, "stage transition");
        if self.stage == Stage::Calibration && to != Stage::Calibration {
            self.calibrator = None;
        }
        self.stage = to;
    }

    fn ensure_stage(&self, expected: Stage, action: &'static str) -> Result<(), GameError> {
        if self.stage != expected {
            return Err(GameError::InvalidTransition {
                action,
                stage: self.stage,
            });
        }
        Ok(())
    }

    fn ensure_permission(&self) -> Result<(), GameError> {
        if self.camera_permission != Some(true) {
            return Err(GameError::CameraPermissionDenied);
        }
        Ok(())
    }
}

/// Check the progress invariants of a snapshot
fn validate_snapshot(snapshot: &SessionSnapshot) -> Result<(), GameError> {
    let inconsistent =
        |reason: String| Err(GameError::Storage(format!("inconsistent snapshot: {reason}")));

    let protected = !matches!(snapshot.stage, Stage::Intro | Stage::Permission);
    if protected && snapshot.camera_permission != Some(true) {
        return inconsistent(format!(
            "{:?} stage without camera permission",
            snapshot.stage
        ));
    }

    match snapshot.stage {
        Stage::Questions => {
            if snapshot.current_index >= snapshot.questions.len() {
                return inconsistent(format!(
                    "index {} out of {} questions",
                    snapshot.current_index,
                    snapshot.questions.len()
                ));
            }
            for (i, question) in snapshot.questions.iter().enumerate() {
                if question.is_answered() != (i < snapshot.current_index) {
                    return inconsistent(format!("question {i} out of order"));
                }
            }
        }
        Stage::Results => {
            let answered = snapshot.questions.iter().all(QuestionRecord::is_answered);
            if snapshot.questions.is_empty() || !answered {
                return inconsistent("results stage with unanswered questions".to_string());
            }
            if snapshot.behavior_metrics.is_none() {
                return inconsistent("results stage without metrics".to_string());
            }
        }
        _ => {}
    }
    Ok(())
}
