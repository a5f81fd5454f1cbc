use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most wrong answers a learner may give and still pass a task's quiz.
pub const MAX_WRONG_ANSWERS: u32 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizOutcomeError {
    #[error("quiz has no questions")]
    NoQuestions,

    #[error("wrong answers ({wrong}) exceed question count ({total})")]
    TooManyWrong { total: u32, wrong: u32 },
}

/// Score of one quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuizOutcome")]
pub struct QuizOutcome {
    total: u32,
    wrong: u32,
}

#[derive(Deserialize)]
struct RawQuizOutcome {
    total: u32,
    wrong: u32,
}

impl TryFrom<RawQuizOutcome> for QuizOutcome {
    type Error = QuizOutcomeError;

    fn try_from(raw: RawQuizOutcome) -> Result<Self, Self::Error> {
        Self::new(raw.total, raw.wrong)
    }
}

impl QuizOutcome {
    /// # Errors
    ///
    /// Returns `QuizOutcomeError` if the quiz is empty or `wrong > total`.
    pub fn new(total: u32, wrong: u32) -> Result<Self, QuizOutcomeError> {
        if total == 0 {
            return Err(QuizOutcomeError::NoQuestions);
        }
        if wrong > total {
            return Err(QuizOutcomeError::TooManyWrong { total, wrong });
        }
        Ok(Self { total, wrong })
    }

    /// Build an outcome from per-question correctness flags.
    ///
    /// # Errors
    ///
    /// Returns `QuizOutcomeError::NoQuestions` for an empty slice.
    pub fn from_answers(correct: &[bool]) -> Result<Self, QuizOutcomeError> {
        let total = u32::try_from(correct.len()).unwrap_or(u32::MAX);
        let wrong = u32::try_from(correct.iter().filter(|ok| !**ok).count()).unwrap_or(u32::MAX);
        Self::new(total, wrong)
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn wrong(&self) -> u32 {
        self.wrong
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.total.saturating_sub(self.wrong)
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.wrong <= MAX_WRONG_ANSWERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_mistakes_still_pass() {
        assert!(QuizOutcome::new(5, 2).unwrap().passed());
        assert!(!QuizOutcome::new(5, 3).unwrap().passed());
    }

    #[test]
    fn from_answers_counts_wrong() {
        let outcome = QuizOutcome::from_answers(&[true, false, true, true, false]).unwrap();
        assert_eq!(outcome.total(), 5);
        assert_eq!(outcome.wrong(), 2);
        assert_eq!(outcome.correct(), 3);
    }

    #[test]
    fn rejects_impossible_scores() {
        assert_eq!(QuizOutcome::new(0, 0), Err(QuizOutcomeError::NoQuestions));
        assert!(matches!(
            QuizOutcome::new(3, 4),
            Err(QuizOutcomeError::TooManyWrong { .. })
        ));
    }

    #[test]
    fn deserializing_goes_through_validation() {
        let bad: Result<QuizOutcome, _> = serde_json::from_str(r#"{"total":1,"wrong":2}"#);
        assert!(bad.is_err());
        let empty: Result<QuizOutcome, _> = serde_json::from_str(r#"{"total":0,"wrong":0}"#);
        assert!(empty.is_err());

        let ok: QuizOutcome = serde_json::from_str(r#"{"total":5,"wrong":2}"#).unwrap();
        assert_eq!(ok, QuizOutcome::new(5, 2).unwrap());
        assert_eq!(ok.correct(), 3);
    }
}
