use std::collections::BTreeMap;

use crate::codec::{self, ValidationError};
use crate::model::answer::{AnswerValue, TransportValue};
use crate::model::ids::QuestionId;
use crate::model::question_set::QuestionSet;

/// In-progress answers keyed by question, at most one per question.
///
/// No shape checks happen here; a mismatched answer is only detected when
/// the set is scored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerStore {
    answers: BTreeMap<QuestionId, AnswerValue>,
}

/// Answers that could be encoded for transport, plus those that could not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportSnapshot {
    pub answers: BTreeMap<QuestionId, TransportValue>,
    pub rejected: Vec<(QuestionId, ValidationError)>,
}

impl AnswerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the answer for `question_id`; last write wins.
    ///
    /// Returns the previous answer, if any.
    pub fn submit_answer(
        &mut self,
        question_id: QuestionId,
        answer: AnswerValue,
    ) -> Option<AnswerValue> {
        self.answers.insert(question_id, answer)
    }

    #[must_use]
    pub fn get_answer(&self, question_id: &QuestionId) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    #[must_use]
    pub fn has_answer(&self, question_id: &QuestionId) -> bool {
        self.answers.contains_key(question_id)
    }

    /// Number of distinct questions with a stored answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }

    /// Encode every answer that belongs to `set` into its transport form.
    ///
    /// Each answer is decoded against its question and re-encoded, so a
    /// matching answer always leaves as a flat sequence in pair order.
    /// Answers for unknown questions are skipped.
    #[must_use]
    pub fn transport_snapshot(&self, set: &QuestionSet) -> TransportSnapshot {
        let mut snapshot = TransportSnapshot::default();
        for question in &set.questions {
            let Some(value) = self.answers.get(&question.id) else {
                continue;
            };
            let encoded = codec::decode(&question.body, value)
                .and_then(|native| codec::encode(&question.body, &native));
            match encoded {
                Ok(transport) => {
                    snapshot.answers.insert(question.id.clone(), transport);
                }
                Err(err) => snapshot.rejected.push((question.id.clone(), err)),
            }
        }
        snapshot
    }

    /// Rebuild a store from a transport snapshot.
    #[must_use]
    pub fn from_transport(answers: &BTreeMap<QuestionId, TransportValue>) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(id, value)| (id.clone(), AnswerValue::from(value.clone())))
                .collect(),
        }
    }
}

impl FromIterator<(QuestionId, AnswerValue)> for AnswerStore {
    fn from_iter<T: IntoIterator<Item = (QuestionId, AnswerValue)>>(iter: T) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::{Difficulty, MatchPair, Question, QuestionBody};

    fn qid(s: &str) -> QuestionId {
        QuestionId::new(s)
    }

    #[test]
    fn later_answer_overwrites_earlier_one() {
        let mut store = AnswerStore::new();
        assert!(store.submit_answer(qid("q1"), "a".into()).is_none());
        let previous = store.submit_answer(qid("q1"), "b".into());

        assert_eq!(previous, Some(AnswerValue::text("a")));
        assert_eq!(store.get_answer(&qid("q1")), Some(&AnswerValue::text("b")));
        assert_eq!(store.answered_count(), 1);
    }

    #[test]
    fn clear_empties_the_store() {
        let mut store = AnswerStore::new();
        store.submit_answer(qid("q1"), "a".into());
        store.submit_answer(qid("q2"), AnswerValue::list(["x"]));
        assert_eq!(store.answered_count(), 2);

        store.clear();
        assert!(store.is_empty());
        assert!(store.get_answer(&qid("q1")).is_none());
    }

    #[test]
    fn snapshot_flattens_matching_and_reports_rejects() {
        let set = QuestionSet::new(
            "s1",
            "Mixed",
            "c1",
            Difficulty::Basic,
            vec![
                Question::new(
                    "m1",
                    "Match",
                    Difficulty::Basic,
                    QuestionBody::Matching {
                        pairs: vec![MatchPair::new("A", "1"), MatchPair::new("B", "2")],
                    },
                ),
                Question::new(
                    "f1",
                    "Fill",
                    Difficulty::Basic,
                    QuestionBody::FillInBlank {
                        blanks: vec!["x".into(), "y".into()],
                    },
                ),
            ],
        );

        let mut store = AnswerStore::new();
        store.submit_answer(qid("m1"), AnswerValue::matches([("B", "2"), ("A", "1")]));
        store.submit_answer(qid("f1"), AnswerValue::list(["x"]));
        store.submit_answer(qid("stray"), "ignored".into());

        let snapshot = store.transport_snapshot(&set);
        assert_eq!(
            snapshot.answers.get("m1"),
            Some(&TransportValue::List(vec![
                "A".into(),
                "1".into(),
                "B".into(),
                "2".into()
            ]))
        );
        assert_eq!(snapshot.answers.len(), 1);
        assert_eq!(snapshot.rejected.len(), 1);
        assert_eq!(snapshot.rejected[0].0, qid("f1"));

        let rebuilt = AnswerStore::from_transport(&snapshot.answers);
        assert_eq!(
            rebuilt.get_answer(&qid("m1")),
            Some(&AnswerValue::list(["A", "1", "B", "2"]))
        );
    }
}
