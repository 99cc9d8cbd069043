//! Spoken answer classification
//!
//! Maps a speech transcript onto a yes/no answer. Transcripts that match both
//! sides or neither are rejected so the player can try again.

use tracing::debug;

use crate::error::GameError;
use crate::types::Answer;

const YES_PATTERNS: &[&str] = &[
    "yes",
    "yeah",
    "yep",
    "yup",
    "sure",
    "absolutely",
    "definitely",
    "of course",
    "affirmative",
    "correct",
    "right",
    "true",
    "i do",
    "i did",
    "i have",
    "i would",
];

const NO_PATTERNS: &[&str] = &[
    "no",
    "nope",
    "nah",
    "never",
    "not",
    "negative",
    "false",
    "wrong",
    "i don't",
    "i didn't",
    "i haven't",
    "i wouldn't",
];

/// Classify a transcript as yes or no
pub fn parse_spoken_answer(transcript: &str) -> Result<Answer, GameError> {
    let normalized = transcript.trim().to_lowercase();
    let is_yes = YES_PATTERNS.iter().any(|p| normalized.contains(p));
    let is_no = NO_PATTERNS.iter().any(|p| normalized.contains(p));

    debug!(transcript = %normalized, is_yes, is_no, "classifying spoken answer");

    match (is_yes, is_no) {
        (true, false) => Ok(Answer::Yes),
        (false, true) => Ok(Answer::No),
        _ => Err(GameError::AmbiguousAnswer(transcript.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_answers() {
        assert_eq!(parse_spoken_answer("Yes").unwrap(), Answer::Yes);
        assert_eq!(parse_spoken_answer("  yeah  ").unwrap(), Answer::Yes);
        assert_eq!(parse_spoken_answer("Nope").unwrap(), Answer::No);
        assert_eq!(parse_spoken_answer("never").unwrap(), Answer::No);
    }

    #[test]
    fn test_phrases() {
        assert_eq!(parse_spoken_answer("of course I did").unwrap(), Answer::Yes);
        assert_eq!(parse_spoken_answer("nah").unwrap(), Answer::No);
    }

    #[test]
    fn test_matching_both_sides_is_ambiguous() {
        // "i didn't" contains "i did"
        assert!(matches!(
            parse_spoken_answer("I didn't"),
            Err(GameError::AmbiguousAnswer(_))
        ));
        assert!(parse_spoken_answer("yes and no").is_err());
    }

    #[test]
    fn test_unrelated_speech_is_ambiguous() {
        let err = parse_spoken_answer("pizza").unwrap_err();
        assert!(err.is_retryable());
    }
}
