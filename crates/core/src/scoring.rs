//! Local, deterministic scoring of a question set against stored answers.
//!
//! Scoring is a pure function of `(QuestionSet, AnswerStore)`: no clock, no
//! I/O, no randomness. Calling it twice with the same inputs yields equal
//! output.

use crate::codec::{self, ValidationError};
use crate::model::question::{FALSE_OPTION_ID, QuestionKind, TRUE_OPTION_ID};
use crate::model::{
    AnswerDiagnostic, AnswerStore, AnswerValue, MatchMap, NativeAnswer, Question, QuestionBody,
    QuestionResult, QuestionSet, ScoredSubmission, SubmissionResult,
};

/// Score every question of `set` in order.
///
/// - Unanswered questions are incorrect and never need review.
/// - Answers that do not fit their question are incorrect and reported in
///   `diagnostics`; the rest of the set is still scored.
/// - Short answers are never auto-scored: `requires_review` is set and
///   `is_correct` stays `false`.
/// - There is no partial credit for fill-in-blank or matching questions.
#[must_use]
pub fn score_submission(set: &QuestionSet, answers: &AnswerStore) -> ScoredSubmission {
    let mut question_results = Vec::with_capacity(set.questions.len());
    let mut diagnostics = Vec::new();

    for question in &set.questions {
        let (result, error) = score_question(question, answers.get_answer(&question.id));
        if let Some(error) = error {
            diagnostics.push(AnswerDiagnostic {
                question_id: question.id.clone(),
                error,
            });
        }
        question_results.push(result);
    }

    ScoredSubmission {
        result: SubmissionResult::from_question_results(question_results),
        diagnostics,
    }
}

/// Score a single question against its stored answer, if any.
///
/// Returns the validation error alongside the result when the stored answer
/// could not be decoded or names no option of a true/false question.
#[must_use]
pub fn score_question(
    question: &Question,
    stored: Option<&AnswerValue>,
) -> (QuestionResult, Option<ValidationError>) {
    let mut result = QuestionResult {
        question_id: question.id.clone(),
        is_correct: false,
        explanation: question.explanation.clone(),
        requires_review: false,
        correct_answer: correct_answer(&question.body),
    };

    let Some(stored) = stored else {
        return (result, None);
    };

    if let Err(err) = check_true_false_text(&question.body, stored) {
        return (result, Some(err));
    }

    match codec::decode(&question.body, stored) {
        Ok(native) => {
            result.requires_review = question.kind().requires_review();
            result.is_correct = !result.requires_review && is_correct(&question.body, &native);
            (result, None)
        }
        Err(err) => (result, Some(err)),
    }
}

/// The expected answer of a question in its native shape.
///
/// For short answers this is the sample answer, which is reference text and
/// not an answer key.
#[must_use]
pub fn correct_answer(body: &QuestionBody) -> Option<NativeAnswer> {
    match body {
        QuestionBody::MultipleChoice { .. } => body
            .correct_option()
            .map(|o| NativeAnswer::Choice(o.id.clone())),
        QuestionBody::TrueFalse { .. } => body
            .correct_option()
            .map(|o| NativeAnswer::Bool(codec::text_to_bool(&o.id))),
        QuestionBody::ShortAnswer { sample_answer } => {
            Some(NativeAnswer::Text(sample_answer.clone()))
        }
        QuestionBody::FillInBlank { blanks } => Some(NativeAnswer::Blanks(blanks.clone())),
        QuestionBody::Matching { pairs } => Some(NativeAnswer::Matches(
            pairs
                .iter()
                .map(|p| (p.left.clone(), p.right.clone()))
                .collect(),
        )),
    }
}

/// A stored true/false answer must be exactly one of the two option ids.
fn check_true_false_text(body: &QuestionBody, stored: &AnswerValue) -> Result<(), ValidationError> {
    let (QuestionBody::TrueFalse { .. }, AnswerValue::Text(text)) = (body, stored) else {
        return Ok(());
    };
    if text == TRUE_OPTION_ID || text == FALSE_OPTION_ID {
        return Ok(());
    }
    Err(ValidationError::UnknownOption {
        kind: QuestionKind::TrueFalse,
        value: text.clone(),
    })
}

fn is_correct(body: &QuestionBody, native: &NativeAnswer) -> bool {
    match body {
        QuestionBody::MultipleChoice { .. } => {
            let NativeAnswer::Choice(selected) = native else {
                return false;
            };
            body.correct_option().is_some_and(|o| &o.id == selected)
        }
        QuestionBody::TrueFalse { .. } => {
            let NativeAnswer::Bool(selected) = native else {
                return false;
            };
            body.correct_option()
                .is_some_and(|o| o.id == codec::bool_to_text(*selected))
        }
        QuestionBody::ShortAnswer { .. } => false,
        QuestionBody::FillInBlank { blanks } => {
            let NativeAnswer::Blanks(given) = native else {
                return false;
            };
            given.len() == blanks.len()
                && blanks
                    .iter()
                    .zip(given)
                    .all(|(expected, actual)| blank_matches(expected, actual))
        }
        QuestionBody::Matching { pairs } => {
            let NativeAnswer::Matches(given) = native else {
                return false;
            };
            given.len() == pairs.len()
                && pairs
                    .iter()
                    .all(|p| pair_matches(given, &p.left, &p.right))
        }
    }
}

fn blank_matches(expected: &str, actual: &str) -> bool {
    expected.trim().to_lowercase() == actual.trim().to_lowercase()
}

fn pair_matches(given: &MatchMap, left: &str, right: &str) -> bool {
    given.get(left).is_some_and(|r| r == right)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
