//! Presentation encoder
//!
//! Builds the per-question feedback card and the end-of-session results
//! report as serializable payloads.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameError;
use crate::session::GameSession;
use crate::types::{
    Answer, Category, QuestionRecord, SessionMetrics, SessionVerdict, Stage, Verdict,
};
use crate::{PRODUCER_NAME, VERSION};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Game title used in player-facing text
pub const GAME_TITLE: &str = "GazeQuest";

const TRUTHFUL_PHRASES: &[&str] = &[
    "You're telling the truth!",
    "That was honest!",
    "You passed the test!",
    "No lies detected!",
    "Your eyes don't lie!",
];

const SUSPICIOUS_PHRASES: &[&str] = &[
    "Something's fishy here...",
    "Your eyes say otherwise!",
    "That looked suspicious...",
    "We caught you lying!",
    "Not so fast, fibber!",
];

/// Feedback shown after each answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub verdict: Verdict,
    pub confidence: f64,
    pub phrase: String,
}

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Results headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub subtitle: String,
}

/// One line of the per-question breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub id: u32,
    pub text: String,
    pub answer: Option<Answer>,
    pub verdict: Option<Verdict>,
    pub confidence: f64,
    pub response_time_ms: f64,
}

/// End-of-session results report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub session_id: Uuid,
    pub category: Option<Category>,
    pub computed_at_utc: String,
    pub headline: Headline,
    pub metrics: SessionMetrics,
    pub questions: Vec<QuestionSummary>,
    /// Message offered when the player shares the score
    pub share_text: String,
}

/// Pick a feedback phrase for a verdict
pub fn feedback_phrase<R: Rng + ?Sized>(verdict: Verdict, rng: &mut R) -> &'static str {
    let phrases = match verdict {
        Verdict::Truthful => TRUTHFUL_PHRASES,
        Verdict::Suspicious => SUSPICIOUS_PHRASES,
    };
    phrases.choose(rng).copied().unwrap_or_default()
}

/// Headline for a session verdict
pub fn headline(verdict: SessionVerdict) -> Headline {
    let (title, subtitle) = match verdict {
        SessionVerdict::Confident => ("Very Confident", "Your eyes tell no lies!"),
        SessionVerdict::Mixed => ("Mixed Signals", "Hmm... something seems off"),
        SessionVerdict::Suspicious => ("Suspicious", "Your eyes gave you away!"),
    };
    Headline {
        title: title.to_string(),
        subtitle: subtitle.to_string(),
    }
}

/// Share message for a session confidence score
pub fn share_text(confidence_score: f64) -> String {
    format!(
        "I scored {}% on {GAME_TITLE}! Can your eyes keep a secret?",
        confidence_score.round()
    )
}

/// Results encoder
pub struct ResultsEncoder {
    instance_id: String,
}

impl Default for ResultsEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Feedback card for an answered question
    pub fn feedback<R: Rng + ?Sized>(
        &self,
        record: &QuestionRecord,
        rng: &mut R,
    ) -> Result<QuestionFeedback, GameError> {
        let verdict = record.verdict.ok_or(GameError::InvalidTransition {
            action: "give feedback on an unanswered question",
            stage: Stage::Questions,
        })?;
        Ok(QuestionFeedback {
            verdict,
            confidence: record.verdict_confidence,
            phrase: feedback_phrase(verdict, rng).to_string(),
        })
    }

    /// Build the results report of a finished session
    pub fn encode(
        &self,
        session: &GameSession,
        computed_at: DateTime<Utc>,
    ) -> Result<ResultsReport, GameError> {
        let metrics = session
            .metrics()
            .cloned()
            .ok_or(GameError::InvalidTransition {
                action: "report results",
                stage: session.stage(),
            })?;

        let questions = session
            .questions()
            .iter()
            .map(|q| QuestionSummary {
                id: q.id,
                text: q.text.clone(),
                answer: q.answer,
                verdict: q.verdict,
                confidence: q.verdict_confidence,
                response_time_ms: q.response_time_ms,
            })
            .collect();

        Ok(ResultsReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            session_id: session.id(),
            category: session.category(),
            computed_at_utc: computed_at.to_rfc3339(),
            headline: headline(metrics.verdict),
            share_text: share_text(metrics.confidence_score),
            metrics,
            questions,
        })
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        session: &GameSession,
        computed_at: DateTime<Utc>,
    ) -> Result<String, GameError> {
        let report = self.encode(session, computed_at)?;
        serde_json::to_string_pretty(&report).map_err(GameError::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::types::{Capabilities, Point, TrackingQuality, TrackingSample};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn finished_session(rng: &mut StdRng) -> GameSession {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let sample = TrackingSample {
            left_iris: Some(Point::new(0.45, 0.5)),
            right_iris: Some(Point::new(0.55, 0.5)),
            gaze: Some(Point::default()),
            is_blinking: false,
            is_looking_away: false,
            tracking_quality: TrackingQuality::Good,
        };

        let mut session = GameSession::new(GameConfig::default(), Capabilities::default()).unwrap();
        session.start().unwrap();
        session.record_camera_permission(true).unwrap();
        session.skip_calibration().unwrap();
        session.select_category(Category::Food, start, rng).unwrap();

        let mut now = start;
        for _ in 0..5 {
            for _ in 0..10 {
                session.ingest(&sample);
            }
            now += Duration::seconds(2);
            session.answer(Answer::Yes, now, rng).unwrap();
        }
        session
    }

    #[test]
    fn test_feedback_phrase_matches_verdict() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert!(TRUTHFUL_PHRASES.contains(&feedback_phrase(Verdict::Truthful, &mut rng)));
            assert!(SUSPICIOUS_PHRASES.contains(&feedback_phrase(Verdict::Suspicious, &mut rng)));
        }
    }

    #[test]
    fn test_feedback_with_fixed_source() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(
            feedback_phrase(Verdict::Truthful, &mut rng),
            "You're telling the truth!"
        );
    }

    #[test]
    fn test_feedback_requires_scored_record() {
        let encoder = ResultsEncoder::new();
        let mut rng = StdRng::seed_from_u64(0);
        let record = QuestionRecord::new(1, "Do you sing in the shower?");
        assert!(encoder.feedback(&record, &mut rng).is_err());

        let mut scored = record.clone();
        scored.answer = Some(Answer::No);
        scored.verdict = Some(Verdict::Suspicious);
        scored.verdict_confidence = 42.0;
        let feedback = encoder.feedback(&scored, &mut rng).unwrap();
        assert_eq!(feedback.verdict, Verdict::Suspicious);
        assert_eq!(feedback.confidence, 42.0);
    }

    #[test]
    fn test_headlines() {
        assert_eq!(headline(SessionVerdict::Confident).title, "Very Confident");
        assert_eq!(
            headline(SessionVerdict::Mixed).subtitle,
            "Hmm... something seems off"
        );
        assert_eq!(
            headline(SessionVerdict::Suspicious).subtitle,
            "Your eyes gave you away!"
        );
    }

    #[test]
    fn test_share_text_rounds_score() {
        assert_eq!(
            share_text(86.6),
            "I scored 87% on GazeQuest! Can your eyes keep a secret?"
        );
        assert_eq!(
            share_text(100.0),
            "I scored 100% on GazeQuest! Can your eyes keep a secret?"
        );
    }

    #[test]
    fn test_report_requires_results() {
        let session = GameSession::new(GameConfig::default(), Capabilities::default()).unwrap();
        let encoder = ResultsEncoder::new();
        assert!(matches!(
            encoder.encode(&session, Utc::now()),
            Err(GameError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_encode_finished_session() {
        let mut rng = StdRng::seed_from_u64(21);
        let session = finished_session(&mut rng);
        let encoder = ResultsEncoder::with_instance_id("test-instance".to_string());
        let computed_at = Utc.with_ymd_and_hms(2024, 1, 15, 14, 5, 0).unwrap();

        let report = encoder.encode(&session, computed_at).unwrap();
        assert_eq!(report.session_id, session.id());
        assert_eq!(report.category, Some(Category::Food));
        assert_eq!(report.questions.len(), 5);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(&report.metrics, session.metrics().unwrap());
        assert_eq!(report.headline, headline(report.metrics.verdict));
        assert_eq!(report.share_text, share_text(report.metrics.confidence_score));
        assert!(report.questions.iter().all(|q| q.answer == Some(Answer::Yes)));

        let json = encoder.encode_to_json(&session, computed_at).unwrap();
        assert!(json.contains("\"report_version\""));
        assert!(json.contains("2024-01-15T14:05:00+00:00"));
    }
}
