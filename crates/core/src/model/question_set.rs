use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, QuestionId, QuestionSetId};
use crate::model::question::{Difficulty, Question, QuestionError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionSetError {
    #[error("question set title cannot be empty")]
    EmptyTitle,

    #[error("duplicate question id: {0}")]
    DuplicateQuestionId(QuestionId),

    #[error("question {question_id} is malformed: {source}")]
    Question {
        question_id: QuestionId,
        #[source]
        source: QuestionError,
    },
}

/// Ordered, immutable collection of questions for one practice session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    pub id: QuestionSetId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<Question>,
    pub difficulty: Difficulty,
    pub course_id: CourseId,
}

impl QuestionSet {
    #[must_use]
    pub fn new(
        id: impl Into<QuestionSetId>,
        title: impl Into<String>,
        course_id: impl Into<CourseId>,
        difficulty: Difficulty,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            questions,
            difficulty,
            course_id: course_id.into(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check set-level and per-question invariants.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError` for a blank title, duplicate question ids,
    /// or the first malformed question.
    pub fn validate(&self) -> Result<(), QuestionSetError> {
        if self.title.trim().is_empty() {
            return Err(QuestionSetError::EmptyTitle);
        }

        let mut seen = HashSet::with_capacity(self.questions.len());
        for question in &self.questions {
            if !seen.insert(&question.id) {
                return Err(QuestionSetError::DuplicateQuestionId(question.id.clone()));
            }
            question
                .validate()
                .map_err(|source| QuestionSetError::Question {
                    question_id: question.id.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    #[must_use]
    pub fn position_of(&self, id: &QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| &q.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.position_of(id).is_some()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
