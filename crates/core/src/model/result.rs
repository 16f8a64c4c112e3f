use serde::Serialize;

use crate::codec::ValidationError;
use crate::model::answer::NativeAnswer;
use crate::model::ids::QuestionId;

/// Scoring outcome for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub requires_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<NativeAnswer>,
}

/// Display classification of a scored question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
    NeedsReview,
}

impl QuestionResult {
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        if self.requires_review {
            Verdict::NeedsReview
        } else if self.is_correct {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        }
    }
}

/// Per-question results plus aggregate statistics for one submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub question_results: Vec<QuestionResult>,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub score_percentage: u32,
}

impl SubmissionResult {
    /// Aggregate per-question results in set order.
    #[must_use]
    pub fn from_question_results(question_results: Vec<QuestionResult>) -> Self {
        let total_questions = u32::try_from(question_results.len()).unwrap_or(u32::MAX);
        let correct = question_results.iter().filter(|r| r.is_correct).count();
        let correct_answers = u32::try_from(correct).unwrap_or(u32::MAX);
        Self {
            question_results,
            correct_answers,
            total_questions,
            score_percentage: percentage(correct_answers, total_questions),
        }
    }

    #[must_use]
    pub fn result_for(&self, question_id: &QuestionId) -> Option<&QuestionResult> {
        self.question_results
            .iter()
            .find(|r| &r.question_id == question_id)
    }

    /// Number of questions waiting on a human verdict.
    #[must_use]
    pub fn pending_review(&self) -> u32 {
        let pending = self
            .question_results
            .iter()
            .filter(|r| r.requires_review)
            .count();
        u32::try_from(pending).unwrap_or(u32::MAX)
    }
}

/// `round(100 * part / whole)` with halves rounded up; `0` when `whole` is `0`.
#[must_use]
pub fn percentage(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let part = u64::from(part);
    let whole = u64::from(whole);
    let rounded = (200 * part + whole) / (2 * whole);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// A recovered per-question validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerDiagnostic {
    pub question_id: QuestionId,
    pub error: ValidationError,
}

/// Result of scoring a set, with the validation trail kept beside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredSubmission {
    pub result: SubmissionResult,
    pub diagnostics: Vec<AnswerDiagnostic>,
}

impl ScoredSubmission {
    #[must_use]
    pub fn diagnostic_for(&self, question_id: &QuestionId) -> Option<&ValidationError> {
        self.diagnostics
            .iter()
            .find(|d| &d.question_id == question_id)
            .map(|d| &d.error)
    }
}
