//! Conversion between stored/transport answers and their per-kind native shape.
//!
//! This is the only place that knows a matching answer travels as a flat
//! `[k1, v1, k2, v2, ..]` sequence. Everything above it works with
//! [`NativeAnswer`]; everything below it with [`TransportValue`].

use thiserror::Error;

use crate::model::question::{FALSE_OPTION_ID, QuestionBody, QuestionKind, TRUE_OPTION_ID};
use crate::model::{AnswerValue, MatchMap, NativeAnswer, TransportValue};

/// A stored answer does not fit the shape its question expects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("{kind} question expects a {expected} answer, got a {found}")]
    ShapeMismatch {
        kind: QuestionKind,
        expected: &'static str,
        found: &'static str,
    },

    #[error("expected {expected} blank answers, got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("flat matching sequence has odd length {len}")]
    OddFlatSequence { len: usize },

    #[error("matching key {0:?} appears more than once")]
    DuplicateKey(String),

    #[error("{found} answer cannot be used for a {kind} question")]
    KindMismatch {
        kind: QuestionKind,
        found: QuestionKind,
    },

    #[error("{kind} answer {value:?} is not one of the question's options")]
    UnknownOption { kind: QuestionKind, value: String },
}

/// Encode a native answer into its transport form.
///
/// Matching answers are flattened in the order of the question's `pairs`;
/// keys the question does not know follow in map order so nothing is lost.
///
/// # Errors
///
/// Returns `ValidationError::KindMismatch` if `answer` belongs to another kind.
pub fn encode(
    body: &QuestionBody,
    answer: &NativeAnswer,
) -> Result<TransportValue, ValidationError> {
    match (body, answer) {
        (QuestionBody::MultipleChoice { .. }, NativeAnswer::Choice(id)) => {
            Ok(TransportValue::Text(id.clone()))
        }
        (QuestionBody::ShortAnswer { .. }, NativeAnswer::Text(text)) => {
            Ok(TransportValue::Text(text.clone()))
        }
        (QuestionBody::TrueFalse { .. }, NativeAnswer::Bool(value)) => {
            Ok(TransportValue::Text(bool_to_text(*value).to_owned()))
        }
        (QuestionBody::FillInBlank { .. }, NativeAnswer::Blanks(values)) => {
            Ok(TransportValue::List(values.clone()))
        }
        (QuestionBody::Matching { pairs }, NativeAnswer::Matches(map)) => {
            let mut flat = Vec::with_capacity(map.len() * 2);
            for pair in pairs {
                if let Some(right) = map.get(&pair.left) {
                    flat.push(pair.left.clone());
                    flat.push(right.clone());
                }
            }
            for (left, right) in map {
                if !pairs.iter().any(|p| &p.left == left) {
                    flat.push(left.clone());
                    flat.push(right.clone());
                }
            }
            Ok(TransportValue::List(flat))
        }
        (body, answer) => Err(ValidationError::KindMismatch {
            kind: body.kind(),
            found: answer.kind(),
        }),
    }
}

/// Decode a stored or transported answer into the native shape of `body`.
///
/// Matching accepts both the flat sequence and an already decoded map.
/// True/false is `true` only for the exact text `"true"`.
///
/// # Errors
///
/// Returns `ValidationError` when the stored shape does not fit the kind,
/// when blank counts differ, or when a flat matching sequence is odd-length
/// or repeats a key.
pub fn decode(body: &QuestionBody, value: &AnswerValue) -> Result<NativeAnswer, ValidationError> {
    let kind = body.kind();
    match body {
        QuestionBody::MultipleChoice { .. } => {
            expect_text(kind, value).map(|s| NativeAnswer::Choice(s.to_owned()))
        }
        QuestionBody::ShortAnswer { .. } => {
            expect_text(kind, value).map(|s| NativeAnswer::Text(s.to_owned()))
        }
        QuestionBody::TrueFalse { .. } => {
            expect_text(kind, value).map(|s| NativeAnswer::Bool(text_to_bool(s)))
        }
        QuestionBody::FillInBlank { blanks } => match value {
            AnswerValue::List(items) => {
                if items.len() != blanks.len() {
                    return Err(ValidationError::ArityMismatch {
                        expected: blanks.len(),
                        found: items.len(),
                    });
                }
                Ok(NativeAnswer::Blanks(items.clone()))
            }
            AnswerValue::Text(_) | AnswerValue::Map(_) => Err(ValidationError::ShapeMismatch {
                kind,
                expected: "list",
                found: value.shape(),
            }),
        },
        QuestionBody::Matching { .. } => match value {
            AnswerValue::Map(map) => Ok(NativeAnswer::Matches(map.clone())),
            AnswerValue::List(flat) => unflatten(flat).map(NativeAnswer::Matches),
            AnswerValue::Text(_) => Err(ValidationError::ShapeMismatch {
                kind,
                expected: "map or flat list",
                found: value.shape(),
            }),
        },
    }
}

/// Decode a transport value; see [`decode`].
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_transport(
    body: &QuestionBody,
    value: &TransportValue,
) -> Result<NativeAnswer, ValidationError> {
    decode(body, &AnswerValue::from(value.clone()))
}

/// Canonical text for a true/false selection.
#[must_use]
pub fn bool_to_text(value: bool) -> &'static str {
    if value { TRUE_OPTION_ID } else { FALSE_OPTION_ID }
}

/// Narrow coercion: only the exact, case-sensitive `"true"` is true.
#[must_use]
pub fn text_to_bool(value: &str) -> bool {
    value == TRUE_OPTION_ID
}

fn expect_text<'a>(kind: QuestionKind, value: &'a AnswerValue) -> Result<&'a str, ValidationError> {
    match value {
        AnswerValue::Text(s) => Ok(s),
        AnswerValue::List(_) | AnswerValue::Map(_) => Err(ValidationError::ShapeMismatch {
            kind,
            expected: "text",
            found: value.shape(),
        }),
    }
}

fn unflatten(flat: &[String]) -> Result<MatchMap, ValidationError> {
    if flat.len() % 2 != 0 {
        return Err(ValidationError::OddFlatSequence { len: flat.len() });
    }
    let mut map = MatchMap::new();
    for chunk in flat.chunks_exact(2) {
        let (left, right) = (&chunk[0], &chunk[1]);
        if map.insert(left.clone(), right.clone()).is_some() {
            return Err(ValidationError::DuplicateKey(left.clone()));
        }
    }
    Ok(map)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::{ChoiceOption, MatchPair};

    fn matching() -> QuestionBody {
        QuestionBody::Matching {
            pairs: vec![MatchPair::new("A", "1"), MatchPair::new("B", "2")],
        }
    }

    fn map(pairs: &[(&str, &str)]) -> MatchMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn round_trip(body: &QuestionBody, answer: NativeAnswer) {
        let encoded = encode(body, &answer).unwrap();
        let decoded = decode_transport(body, &encoded).unwrap();
        assert_eq!(decoded, answer);
    }

    #[test]
    fn every_kind_round_trips() {
        let mc = QuestionBody::MultipleChoice {
            options: vec![ChoiceOption::new("a", "2", true)],
        };
        round_trip(&mc, NativeAnswer::Choice("a".into()));

        let short = QuestionBody::ShortAnswer {
            sample_answer: "photosynthesis".into(),
        };
        round_trip(&short, NativeAnswer::Text("light to sugar".into()));

        let tf = QuestionBody::true_false(true);
        round_trip(&tf, NativeAnswer::Bool(true));
        round_trip(&tf, NativeAnswer::Bool(false));

        let fib = QuestionBody::FillInBlank {
            blanks: vec!["Paris".into(), "France".into()],
        };
        round_trip(&fib, NativeAnswer::Blanks(vec!["paris".into(), "".into()]));

        round_trip(&matching(), NativeAnswer::Matches(map(&[("A", "1"), ("B", "2")])));
        round_trip(&matching(), NativeAnswer::Matches(map(&[("B", "1")])));
    }

    #[test]
    fn matching_encodes_in_pair_order() {
        let answer = NativeAnswer::Matches(map(&[("B", "2"), ("A", "1")]));
        let encoded = encode(&matching(), &answer).unwrap();
        assert_eq!(
            encoded,
            TransportValue::List(vec!["A".into(), "1".into(), "B".into(), "2".into()])
        );
    }

    #[test]
    fn matching_keeps_unknown_keys_after_known_ones() {
        let answer = NativeAnswer::Matches(map(&[("Z", "9"), ("B", "2")]));
        let encoded = encode(&matching(), &answer).unwrap();
        assert_eq!(
            encoded,
            TransportValue::List(vec!["B".into(), "2".into(), "Z".into(), "9".into()])
        );
        assert_eq!(decode_transport(&matching(), &encoded).unwrap(), answer);
    }

    #[test]
    fn odd_flat_sequence_is_a_validation_error() {
        let err = decode(&matching(), &AnswerValue::list(["A", "1", "B"])).unwrap_err();
        assert_eq!(err, ValidationError::OddFlatSequence { len: 3 });
    }

    #[test]
    fn repeated_flat_key_is_a_validation_error() {
        let err = decode(&matching(), &AnswerValue::list(["A", "1", "A", "2"])).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateKey("A".into()));
    }

    #[test]
    fn matching_accepts_decoded_map() {
        let value = AnswerValue::matches([("A", "1")]);
        assert_eq!(
            decode(&matching(), &value).unwrap(),
            NativeAnswer::Matches(map(&[("A", "1")]))
        );
    }

    #[test]
    fn true_false_coercion_is_case_sensitive() {
        let tf = QuestionBody::true_false(true);
        assert_eq!(decode(&tf, &"true".into()).unwrap(), NativeAnswer::Bool(true));
        assert_eq!(decode(&tf, &"True".into()).unwrap(), NativeAnswer::Bool(false));
        assert_eq!(decode(&tf, &"yes".into()).unwrap(), NativeAnswer::Bool(false));
    }

    #[test]
    fn blank_count_must_match() {
        let fib = QuestionBody::FillInBlank {
            blanks: vec!["Paris".into(), "France".into()],
        };
        let err = decode(&fib, &AnswerValue::list(["Paris"])).unwrap_err();
        assert_eq!(err, ValidationError::ArityMismatch { expected: 2, found: 1 });
    }

    #[test]
    fn wrong_shape_is_reported() {
        let mc = QuestionBody::MultipleChoice {
            options: vec![ChoiceOption::new("a", "2", true)],
        };
        let err = decode(&mc, &AnswerValue::list(["a"])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ShapeMismatch {
                kind: QuestionKind::MultipleChoice,
                expected: "text",
                found: "list",
            }
        );
    }

    #[test]
    fn encoding_a_foreign_kind_fails() {
        let err = encode(&matching(), &NativeAnswer::Bool(true)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::KindMismatch {
                kind: QuestionKind::Matching,
                found: QuestionKind::TrueFalse,
            }
        );
    }
}
