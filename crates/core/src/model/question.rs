use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Option ids a true/false question must use.
pub const TRUE_OPTION_ID: &str = "true";
pub const FALSE_OPTION_ID: &str = "false";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Content invariants violated by a single question.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("choice question has no options")]
    NoOptions,

    #[error("expected exactly one correct option, found {found}")]
    CorrectOptionCount { found: usize },

    #[error("duplicate option id: {0}")]
    DuplicateOptionId(String),

    #[error("true/false options must be exactly \"true\" and \"false\"")]
    InvalidTrueFalseOptions,

    #[error("fill-in-blank question has no blanks")]
    NoBlanks,

    #[error("matching question has no pairs")]
    NoPairs,

    #[error("duplicate matching key: {0}")]
    DuplicateLeft(String),
}

//
// ─── SHARED CONTENT ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Basic,
    Medium,
    Advanced,
}

/// Source reference shown alongside an explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub title: String,
    pub preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl ChoiceOption {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_correct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

impl MatchPair {
    #[must_use]
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

//
// ─── VARIANTS ──────────────────────────────────────────────────────────────────
//

/// Discriminant of a question variant.
///
/// Kept free of `#[non_exhaustive]` so every `match` over it breaks the build
/// when a variant is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    ShortAnswer,
    TrueFalse,
    FillInBlank,
    Matching,
}

impl QuestionKind {
    /// Returns true when the engine cannot score this kind on its own.
    #[must_use]
    pub fn requires_review(self) -> bool {
        match self {
            QuestionKind::ShortAnswer => true,
            QuestionKind::MultipleChoice
            | QuestionKind::TrueFalse
            | QuestionKind::FillInBlank
            | QuestionKind::Matching => false,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::ShortAnswer => "short_answer",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::FillInBlank => "fill_in_blank",
            QuestionKind::Matching => "matching",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant-specific payload of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum QuestionBody {
    MultipleChoice { options: Vec<ChoiceOption> },
    ShortAnswer { sample_answer: String },
    TrueFalse { options: Vec<ChoiceOption> },
    FillInBlank { blanks: Vec<String> },
    Matching { pairs: Vec<MatchPair> },
}

impl QuestionBody {
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionBody::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            QuestionBody::ShortAnswer { .. } => QuestionKind::ShortAnswer,
            QuestionBody::TrueFalse { .. } => QuestionKind::TrueFalse,
            QuestionBody::FillInBlank { .. } => QuestionKind::FillInBlank,
            QuestionBody::Matching { .. } => QuestionKind::Matching,
        }
    }

    /// True/false question whose correct option is `correct`.
    #[must_use]
    pub fn true_false(correct: bool) -> Self {
        QuestionBody::TrueFalse {
            options: vec![
                ChoiceOption::new(TRUE_OPTION_ID, "True", correct),
                ChoiceOption::new(FALSE_OPTION_ID, "False", !correct),
            ],
        }
    }

    /// The single correct option of a choice question.
    #[must_use]
    pub fn correct_option(&self) -> Option<&ChoiceOption> {
        match self {
            QuestionBody::MultipleChoice { options } | QuestionBody::TrueFalse { options } => {
                options.iter().find(|o| o.is_correct)
            }
            QuestionBody::ShortAnswer { .. }
            | QuestionBody::FillInBlank { .. }
            | QuestionBody::Matching { .. } => None,
        }
    }

    /// Check the content invariants of this variant.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionError` found.
    pub fn validate(&self) -> Result<(), QuestionError> {
        match self {
            QuestionBody::MultipleChoice { options } => validate_options(options),
            QuestionBody::TrueFalse { options } => {
                validate_options(options)?;
                let mut ids: Vec<&str> = options.iter().map(|o| o.id.as_str()).collect();
                ids.sort_unstable();
                if ids != [FALSE_OPTION_ID, TRUE_OPTION_ID] {
                    return Err(QuestionError::InvalidTrueFalseOptions);
                }
                Ok(())
            }
            QuestionBody::ShortAnswer { .. } => Ok(()),
            QuestionBody::FillInBlank { blanks } => {
                if blanks.is_empty() {
                    return Err(QuestionError::NoBlanks);
                }
                Ok(())
            }
            QuestionBody::Matching { pairs } => {
                if pairs.is_empty() {
                    return Err(QuestionError::NoPairs);
                }
                let mut seen = HashSet::with_capacity(pairs.len());
                for pair in pairs {
                    if !seen.insert(pair.left.as_str()) {
                        return Err(QuestionError::DuplicateLeft(pair.left.clone()));
                    }
                }
                Ok(())
            }
        }
    }
}

fn validate_options(options: &[ChoiceOption]) -> Result<(), QuestionError> {
    if options.is_empty() {
        return Err(QuestionError::NoOptions);
    }
    let mut seen = HashSet::with_capacity(options.len());
    for option in options {
        if !seen.insert(option.id.as_str()) {
            return Err(QuestionError::DuplicateOptionId(option.id.clone()));
        }
    }
    let found = options.iter().filter(|o| o.is_correct).count();
    if found != 1 {
        return Err(QuestionError::CorrectOptionCount { found });
    }
    Ok(())
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Immutable practice question as delivered by the content provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    #[serde(flatten)]
    pub body: QuestionBody,
}

impl Question {
    #[must_use]
    pub fn new(
        id: impl Into<QuestionId>,
        text: impl Into<String>,
        difficulty: Difficulty,
        body: QuestionBody,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            difficulty,
            explanation: None,
            citations: Vec::new(),
            body,
        }
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    #[must_use]
    pub fn with_citation(mut self, citation: Citation) -> Self {
        self.citations.push(citation);
        self
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.body.kind()
    }

    /// Check text and variant invariants.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` describing the first violated invariant.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        self.body.validate()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
