use std::collections::BTreeMap;

use async_trait::async_trait;
use practice_core::model::{AnswerStore, QuestionId, QuestionSet, ScoredSubmission, TransportValue};
use practice_core::scoring;

use crate::error::SubmissionError;

/// Where a submission is scored.
///
/// Implementations receive the codec's transport encoding only, never
/// native answers, so a remote judge sees the same payload a network call
/// would carry.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// Score `answers` against `set`.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Transport` when the scorer cannot be reached
    /// or rejects the payload.
    async fn submit_answers(
        &self,
        set: &QuestionSet,
        answers: &BTreeMap<QuestionId, TransportValue>,
    ) -> Result<ScoredSubmission, SubmissionError>;
}

/// In-process scoring with the deterministic engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScoring;

#[async_trait]
impl SubmissionTransport for LocalScoring {
    async fn submit_answers(
        &self,
        set: &QuestionSet,
        answers: &BTreeMap<QuestionId, TransportValue>,
    ) -> Result<ScoredSubmission, SubmissionError> {
        let store = AnswerStore::from_transport(answers);
        Ok(scoring::score_submission(set, &store))
    }
}
