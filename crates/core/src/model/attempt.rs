use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::QuestionSetId;
use crate::model::result::{SubmissionResult, percentage};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("submitted_at is before started_at")]
    InvalidTimeRange,

    #[error("correct ({correct}) plus pending review ({pending}) exceeds total ({total})")]
    CountMismatch { correct: u32, pending: u32, total: u32 },

    #[error("stored score {stored} does not match computed score {computed}")]
    ScoreMismatch { stored: u32, computed: u32 },
}

/// Aggregate record of one submitted attempt at a question set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSummary {
    set_id: QuestionSetId,
    started_at: DateTime<Utc>,
    submitted_at: DateTime<Utc>,
    total_questions: u32,
    correct_answers: u32,
    pending_review: u32,
    score_percentage: u32,
}

impl AttemptSummary {
    /// Build a summary from a fresh submission result.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidTimeRange` if `submitted_at` is before `started_at`.
    pub fn from_result(
        set_id: QuestionSetId,
        started_at: DateTime<Utc>,
        submitted_at: DateTime<Utc>,
        result: &SubmissionResult,
    ) -> Result<Self, AttemptError> {
        Self::from_persisted(
            set_id,
            started_at,
            submitted_at,
            result.total_questions,
            result.correct_answers,
            result.pending_review(),
            result.score_percentage,
        )
    }

    /// Rehydrate an attempt summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if timestamps are inverted or counts do not add up.
    pub fn from_persisted(
        set_id: QuestionSetId,
        started_at: DateTime<Utc>,
        submitted_at: DateTime<Utc>,
        total_questions: u32,
        correct_answers: u32,
        pending_review: u32,
        score_percentage: u32,
    ) -> Result<Self, AttemptError> {
        if submitted_at < started_at {
            return Err(AttemptError::InvalidTimeRange);
        }
        if correct_answers.saturating_add(pending_review) > total_questions {
            return Err(AttemptError::CountMismatch {
                correct: correct_answers,
                pending: pending_review,
                total: total_questions,
            });
        }
        let computed = percentage(correct_answers, total_questions);
        if computed != score_percentage {
            return Err(AttemptError::ScoreMismatch {
                stored: score_percentage,
                computed,
            });
        }

        Ok(Self {
            set_id,
            started_at,
            submitted_at,
            total_questions,
            correct_answers,
            pending_review,
            score_percentage,
        })
    }

    #[must_use]
    pub fn set_id(&self) -> &QuestionSetId {
        &self.set_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn pending_review(&self) -> u32 {
        self.pending_review
    }

    #[must_use]
    pub fn score_percentage(&self) -> u32 {
        self.score_percentage
    }
}
