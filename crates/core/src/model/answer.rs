use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::question::QuestionKind;

/// Left value to chosen right value of a matching answer.
pub type MatchMap = BTreeMap<String, String>;

//
// ─── STORED ANSWER ─────────────────────────────────────────────────────────────
//

/// Answer as kept in the answer store.
///
/// Shape only; whether it fits a question is decided by the codec when the
/// set is scored. `List` doubles as the flat `[k1, v1, k2, v2, ..]` encoding
/// of a matching answer when it arrives from storage or the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    List(Vec<String>),
    Map(MatchMap),
}

impl AnswerValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        AnswerValue::Text(value.into())
    }

    #[must_use]
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnswerValue::List(values.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn matches<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        AnswerValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Short name of the stored shape, for diagnostics.
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            AnswerValue::Text(_) => "text",
            AnswerValue::List(_) => "list",
            AnswerValue::Map(_) => "map",
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_owned())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        AnswerValue::List(value)
    }
}

impl From<MatchMap> for AnswerValue {
    fn from(value: MatchMap) -> Self {
        AnswerValue::Map(value)
    }
}

impl From<TransportValue> for AnswerValue {
    fn from(value: TransportValue) -> Self {
        match value {
            TransportValue::Text(s) => AnswerValue::Text(s),
            TransportValue::List(items) => AnswerValue::List(items),
        }
    }
}

//
// ─── TRANSPORT ─────────────────────────────────────────────────────────────────
//

/// Serialization-safe encoding of an answer: a string or a string array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransportValue {
    Text(String),
    List(Vec<String>),
}

//
// ─── NATIVE ────────────────────────────────────────────────────────────────────
//

/// Answer decoded into the natural shape of one question kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NativeAnswer {
    /// Selected option id of a multiple-choice question.
    Choice(String),
    /// Free text of a short-answer question.
    Text(String),
    /// True/false selection.
    Bool(bool),
    /// One entry per blank, index-aligned.
    Blanks(Vec<String>),
    Matches(MatchMap),
}

impl NativeAnswer {
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            NativeAnswer::Choice(_) => QuestionKind::MultipleChoice,
            NativeAnswer::Text(_) => QuestionKind::ShortAnswer,
            NativeAnswer::Bool(_) => QuestionKind::TrueFalse,
            NativeAnswer::Blanks(_) => QuestionKind::FillInBlank,
            NativeAnswer::Matches(_) => QuestionKind::Matching,
        }
    }
}
