use std::sync::Arc;

use chrono::{DateTime, Utc};
use practice_core::model::{
    AnswerStore, AnswerValue, AttemptSummary, Question, QuestionId, QuestionSet,
    ScoredSubmission, SubmissionResult, TransportSnapshot,
};
use practice_core::scoring;

use super::progress::SessionProgress;
use super::state::SessionState;
use crate::error::{LoadError, SessionError, SubmissionError};

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One user's attempt at one question set, from load through restart.
///
/// Every mutation is an explicit transition; callers re-read `progress()` and
/// `scored()` after each call. Async orchestration lives in
/// `PracticeLoopService`, which drives the split `begin_submit` /
/// `complete_submit` / `fail_submit` steps around a transport call.
#[derive(Debug, Clone, Default)]
pub struct PracticeSession {
    state: SessionState,
    set: Option<Arc<QuestionSet>>,
    answers: AnswerStore,
    scored: Option<ScoredSubmission>,
    current_index: usize,
    started_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
    attempt_id: Option<i64>,
}

impl PracticeSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session on `set`.
    ///
    /// `started_at` should come from the services layer clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` if the set violates content invariants.
    pub fn start(set: QuestionSet, started_at: DateTime<Utc>) -> Result<Self, SessionError> {
        let mut session = Self::new();
        session.load_set(set, started_at)?;
        Ok(session)
    }

    /// `Idle -> Loaded`, then straight to `Answering` when the set has questions.
    ///
    /// On failure the session stays `Idle`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `Idle`, or
    /// `SessionError::Load` with `LoadError::Malformed` for invalid content.
    pub fn load_set(
        &mut self,
        set: QuestionSet,
        started_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::invalid("load a question set", self.state));
        }
        set.validate().map_err(LoadError::Malformed)?;

        tracing::info!(
            set_id = %set.id,
            questions = set.len(),
            "question set loaded"
        );
        self.state = Self::ready_state(&set);
        self.set = Some(Arc::new(set));
        self.answers.clear();
        self.scored = None;
        self.current_index = 0;
        self.started_at = Some(started_at);
        self.submitted_at = None;
        self.attempt_id = None;
        Ok(())
    }

    /// Drop the loaded set and go back to `Idle`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` while a submission is in flight.
    pub fn close(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Submitting {
            return Err(SessionError::invalid("close the session", self.state));
        }
        *self = Self::default();
        Ok(())
    }

    fn ready_state(set: &QuestionSet) -> SessionState {
        if set.is_empty() {
            SessionState::Loaded
        } else {
            SessionState::Answering
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn question_set(&self) -> Option<&QuestionSet> {
        self.set.as_deref()
    }

    pub(crate) fn shared_set(&self) -> Option<Arc<QuestionSet>> {
        self.set.clone()
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    #[must_use]
    pub fn get_answer(&self, question_id: &QuestionId) -> Option<&AnswerValue> {
        self.answers.get_answer(question_id)
    }

    /// Scored submission with diagnostics; present only while `Reviewing`.
    #[must_use]
    pub fn scored(&self) -> Option<&ScoredSubmission> {
        self.scored.as_ref()
    }

    #[must_use]
    pub fn result(&self) -> Option<&SubmissionResult> {
        self.scored.as_ref().map(|s| &s.result)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.set
            .as_deref()
            .and_then(|set| set.questions.get(self.current_index))
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.set.as_deref().map_or(0, QuestionSet::len)
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    /// Id of the persisted attempt for the current review, if stored.
    #[must_use]
    pub fn attempt_id(&self) -> Option<i64> {
        self.attempt_id
    }

    pub(crate) fn set_attempt_id(&mut self, id: i64) {
        self.attempt_id = Some(id);
    }

    /// Questions without a stored answer, in set order.
    #[must_use]
    pub fn unanswered_ids(&self) -> Vec<QuestionId> {
        self.set
            .as_deref()
            .map(|set| {
                set.questions
                    .iter()
                    .filter(|q| !self.answers.has_answer(&q.id))
                    .map(|q| q.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True when submitting now would leave questions unanswered.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.set
            .as_deref()
            .is_some_and(|set| set.questions.iter().any(|q| !self.answers.has_answer(&q.id)))
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress::from_session(self)
    }

    // ─── Answering ───────────────────────────────────────────────────────────

    /// Store `answer` for `question_id`; a later call overwrites an earlier one.
    ///
    /// Shape is not checked here; a mismatch is reported when the set is scored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `Answering` (the store
    /// is left untouched) or `SessionError::UnknownQuestion` for ids not in the set.
    pub fn submit_answer(
        &mut self,
        question_id: QuestionId,
        answer: impl Into<AnswerValue>,
    ) -> Result<Option<AnswerValue>, SessionError> {
        if !self.state.accepts_answers() {
            return Err(SessionError::invalid("submit an answer", self.state));
        }
        let known = self
            .set
            .as_deref()
            .is_some_and(|set| set.contains(&question_id));
        if !known {
            return Err(SessionError::UnknownQuestion(question_id));
        }

        let answer = answer.into();
        tracing::debug!(question_id = %question_id, shape = answer.shape(), "answer stored");
        Ok(self.answers.submit_answer(question_id, answer))
    }

    // ─── Navigation ──────────────────────────────────────────────────────────

    /// Move to `index`, clamped to the last question. Returns the new index.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` when no set is loaded.
    pub fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        if !self.state.has_set() {
            return Err(SessionError::invalid("navigate", self.state));
        }
        let last = self.total_questions().saturating_sub(1);
        self.current_index = index.min(last);
        Ok(self.current_index)
    }

    /// # Errors
    ///
    /// Same as [`Self::go_to`].
    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.go_to(self.current_index.saturating_add(1))
    }

    /// # Errors
    ///
    /// Same as [`Self::go_to`].
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.go_to(self.current_index.saturating_sub(1))
    }

    /// Move to a question by id.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownQuestion` if the id is not in the set.
    pub fn go_to_question(&mut self, question_id: &QuestionId) -> Result<usize, SessionError> {
        let position = self
            .set
            .as_deref()
            .and_then(|set| set.position_of(question_id))
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.clone()))?;
        self.go_to(position)
    }

    // ─── Submission ──────────────────────────────────────────────────────────

    /// `Answering -> Submitting` and return the encoded answer snapshot.
    ///
    /// Partial submission is allowed; unanswered questions score as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is
    /// `Loaded` or `Answering`, including a second submit while `Submitting`.
    pub fn begin_submit(&mut self) -> Result<TransportSnapshot, SessionError> {
        if !self.state.can_submit() {
            return Err(SessionError::invalid("submit", self.state));
        }
        let Some(set) = self.set.as_deref() else {
            return Err(SessionError::invalid("submit", self.state));
        };

        let unanswered = self.unanswered_ids();
        if !unanswered.is_empty() {
            tracing::warn!(
                set_id = %set.id,
                unanswered = unanswered.len(),
                total = set.len(),
                "submitting with unanswered questions"
            );
        }

        let snapshot = self.answers.transport_snapshot(set);
        self.state = SessionState::Submitting;
        Ok(snapshot)
    }

    /// `Submitting -> Reviewing` with a scored result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `Submitting`, or
    /// `SubmissionError::Inconsistent` if the result does not line up with the
    /// loaded set; in that case the session returns to answering.
    pub fn complete_submit(
        &mut self,
        scored: ScoredSubmission,
        submitted_at: DateTime<Utc>,
    ) -> Result<&ScoredSubmission, SessionError> {
        if self.state != SessionState::Submitting {
            return Err(SessionError::invalid("complete a submission", self.state));
        }
        if let Err(err) = self.check_consistent(&scored.result) {
            self.fail_submit();
            return Err(err.into());
        }

        for diagnostic in &scored.diagnostics {
            tracing::warn!(
                question_id = %diagnostic.question_id,
                error = %diagnostic.error,
                "answer did not match its question"
            );
        }
        tracing::info!(
            correct = scored.result.correct_answers,
            total = scored.result.total_questions,
            score = scored.result.score_percentage,
            "submission scored"
        );
        self.state = SessionState::Reviewing;
        self.submitted_at = Some(submitted_at);
        self.attempt_id = None;
        Ok(self.scored.insert(scored))
    }

    /// `Submitting -> Answering` (or `Loaded` for an empty set) after a failed
    /// scoring call. Answers are kept. No-op in any other state.
    pub fn fail_submit(&mut self) {
        if self.state != SessionState::Submitting {
            return;
        }
        self.state = self
            .set
            .as_deref()
            .map_or(SessionState::Idle, Self::ready_state);
    }

    /// Score locally and enter review in one step.
    ///
    /// # Errors
    ///
    /// Same as [`Self::begin_submit`].
    pub fn submit(
        &mut self,
        submitted_at: DateTime<Utc>,
    ) -> Result<&ScoredSubmission, SessionError> {
        self.begin_submit()?;
        let Some(set) = self.set.clone() else {
            self.fail_submit();
            return Err(SessionError::invalid("submit", self.state));
        };
        let scored = scoring::score_submission(&set, &self.answers);
        self.complete_submit(scored, submitted_at)
    }

    fn check_consistent(&self, result: &SubmissionResult) -> Result<(), SubmissionError> {
        let Some(set) = self.set.as_deref() else {
            return Err(SubmissionError::Inconsistent("no question set loaded".into()));
        };
        if result.question_results.len() != set.len() {
            return Err(SubmissionError::Inconsistent(format!(
                "expected {} question results, got {}",
                set.len(),
                result.question_results.len()
            )));
        }
        let aligned = set
            .questions
            .iter()
            .zip(&result.question_results)
            .all(|(q, r)| q.id == r.question_id);
        if !aligned {
            return Err(SubmissionError::Inconsistent(
                "question results are not in set order".into(),
            ));
        }
        let expected = SubmissionResult::from_question_results(result.question_results.clone());
        if expected.correct_answers != result.correct_answers
            || expected.total_questions != result.total_questions
            || expected.score_percentage != result.score_percentage
        {
            return Err(SubmissionError::Inconsistent(
                "aggregate counts disagree with question results".into(),
            ));
        }
        Ok(())
    }

    /// Summary of the reviewed attempt, ready to append to history.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `Reviewing`, or
    /// `SubmissionError::Attempt` if the timestamps are inverted.
    pub fn attempt_summary(&self) -> Result<AttemptSummary, SessionError> {
        let (Some(set), Some(scored), Some(started_at), Some(submitted_at)) = (
            self.set.as_deref(),
            self.scored.as_ref(),
            self.started_at,
            self.submitted_at,
        ) else {
            return Err(SessionError::invalid("summarize the attempt", self.state));
        };
        if self.state != SessionState::Reviewing {
            return Err(SessionError::invalid("summarize the attempt", self.state));
        }
        AttemptSummary::from_result(set.id.clone(), started_at, submitted_at, &scored.result)
            .map_err(|e| SubmissionError::from(e).into())
    }

    // ─── Restart ─────────────────────────────────────────────────────────────

    /// `Reviewing -> Answering` with an empty store and the same set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `Reviewing`.
    pub fn restart(&mut self, started_at: DateTime<Utc>) -> Result<(), SessionError> {
        if self.state != SessionState::Reviewing {
            return Err(SessionError::invalid("restart", self.state));
        }
        let Some(set) = self.set.as_deref() else {
            return Err(SessionError::invalid("restart", self.state));
        };

        tracing::info!(set_id = %set.id, "session restarted");
        self.state = Self::ready_state(set);
        self.answers.clear();
        self.scored = None;
        self.current_index = 0;
        self.started_at = Some(started_at);
        self.submitted_at = None;
        self.attempt_id = None;
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use practice_core::codec::ValidationError;
    use practice_core::model::{
        AnswerValue, ChoiceOption, Difficulty, MatchPair, Question, QuestionBody, QuestionSet,
    };
    use practice_core::time::fixed_now;

    fn qid(s: &str) -> QuestionId {
        QuestionId::new(s)
    }

    fn mc(id: &str, correct: &str) -> Question {
        Question::new(
            id,
            "Pick one",
            Difficulty::Basic,
            QuestionBody::MultipleChoice {
                options: vec![
                    ChoiceOption::new("a", "first", correct == "a"),
                    ChoiceOption::new("b", "second", correct == "b"),
                ],
            },
        )
    }

    fn set_of(questions: Vec<Question>) -> QuestionSet {
        QuestionSet::new("set-1", "Practice", "course-1", Difficulty::Basic, questions)
    }

    fn two_mc_session() -> PracticeSession {
        PracticeSession::start(set_of(vec![mc("q1", "a"), mc("q2", "b")]), fixed_now()).unwrap()
    }

    #[test]
    fn load_enters_answering_for_non_empty_set() {
        let session = two_mc_session();
        assert_eq!(session.state(), SessionState::Answering);
        assert_eq!(session.total_questions(), 2);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.started_at(), Some(fixed_now()));
    }

    #[test]
    fn empty_set_stays_loaded_and_scores_zero() {
        let mut session = PracticeSession::start(set_of(Vec::new()), fixed_now()).unwrap();
        assert_eq!(session.state(), SessionState::Loaded);
        assert!(!session.is_partial());

        let scored = session.submit(fixed_now()).unwrap();
        assert_eq!(scored.result.total_questions, 0);
        assert_eq!(scored.result.score_percentage, 0);
        assert_eq!(session.state(), SessionState::Reviewing);

        session.restart(fixed_now()).unwrap();
        assert_eq!(session.state(), SessionState::Loaded);
    }

    #[test]
    fn malformed_set_keeps_session_idle() {
        let mut session = PracticeSession::new();
        let bad = set_of(vec![mc("q1", "a"), mc("q1", "b")]);
        let err = session.load_set(bad, fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::Load(LoadError::Malformed(_))));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.question_set().is_none());
    }

    #[test]
    fn load_is_rejected_outside_idle() {
        let mut session = two_mc_session();
        let err = session
            .load_set(set_of(vec![mc("q9", "a")]), fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));

        session.close().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        session
            .load_set(set_of(vec![mc("q9", "a")]), fixed_now())
            .unwrap();
        assert_eq!(session.total_questions(), 1);
    }

    #[test]
    fn answers_overwrite_and_unknown_ids_are_rejected() {
        let mut session = two_mc_session();
        assert_eq!(session.submit_answer(qid("q1"), "b").unwrap(), None);
        let previous = session.submit_answer(qid("q1"), "a").unwrap();
        assert_eq!(previous, Some(AnswerValue::text("b")));
        assert_eq!(session.answers().answered_count(), 1);

        let err = session.submit_answer(qid("nope"), "a").unwrap_err();
        assert!(matches!(err, SessionError::UnknownQuestion(ref id) if id.as_str() == "nope"));
        assert_eq!(session.answers().answered_count(), 1);
    }

    #[test]
    fn scenario_scores_fifty_percent() {
        let mut session = two_mc_session();
        session.submit_answer(qid("q1"), "a").unwrap();
        session.submit_answer(qid("q2"), "a").unwrap();

        let scored = session.submit(fixed_now() + Duration::minutes(1)).unwrap();
        assert_eq!(scored.result.correct_answers, 1);
        assert_eq!(scored.result.total_questions, 2);
        assert_eq!(scored.result.score_percentage, 50);
        assert_eq!(session.state(), SessionState::Reviewing);
        assert_eq!(
            session.submitted_at(),
            Some(fixed_now() + Duration::minutes(1))
        );
    }

    #[test]
    fn reviewing_rejects_answers_and_keeps_state() {
        let mut session = two_mc_session();
        session.submit_answer(qid("q1"), "a").unwrap();
        session.submit(fixed_now()).unwrap();

        let answers_before = session.answers().clone();
        let result_before = session.result().cloned();

        let err = session.submit_answer(qid("q2"), "b").unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                state: SessionState::Reviewing,
                ..
            }
        ));
        assert_eq!(session.answers(), &answers_before);
        assert_eq!(session.result().cloned(), result_before);
    }

    #[test]
    fn second_submit_while_submitting_is_rejected() {
        let mut session = two_mc_session();
        session.begin_submit().unwrap();
        assert_eq!(session.state(), SessionState::Submitting);

        let err = session.begin_submit().unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                state: SessionState::Submitting,
                ..
            }
        ));
        assert!(session.submit_answer(qid("q1"), "a").is_err());
    }

    #[test]
    fn failed_submit_returns_to_answering_with_answers_kept() {
        let mut session = two_mc_session();
        session.submit_answer(qid("q1"), "a").unwrap();
        session.begin_submit().unwrap();
        session.fail_submit();

        assert_eq!(session.state(), SessionState::Answering);
        assert!(session.get_answer(&qid("q1")).is_some());
        assert!(session.result().is_none());
    }

    #[test]
    fn inconsistent_result_is_refused() {
        let mut session = two_mc_session();
        session.begin_submit().unwrap();

        let short = scoring::score_submission(&set_of(vec![mc("q1", "a")]), &AnswerStore::new());
        let err = session.complete_submit(short, fixed_now()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Submission(SubmissionError::Inconsistent(_))
        ));
        assert_eq!(session.state(), SessionState::Answering);
    }

    #[test]
    fn partial_submission_reports_unanswered() {
        let mut session = two_mc_session();
        session.submit_answer(qid("q2"), "b").unwrap();
        assert!(session.is_partial());
        assert_eq!(session.unanswered_ids(), vec![qid("q1")]);

        let scored = session.submit(fixed_now()).unwrap();
        let q1 = scored.result.result_for(&qid("q1")).unwrap();
        assert!(!q1.is_correct);
        assert!(!q1.requires_review);
        assert_eq!(scored.result.correct_answers, 1);
    }

    #[test]
    fn malformed_answer_is_isolated_in_diagnostics() {
        let matching = Question::new(
            "q-match",
            "Match",
            Difficulty::Medium,
            QuestionBody::Matching {
                pairs: vec![MatchPair::new("A", "1"), MatchPair::new("B", "2")],
            },
        );
        let mut session =
            PracticeSession::start(set_of(vec![mc("q1", "a"), matching]), fixed_now()).unwrap();
        session.submit_answer(qid("q1"), "a").unwrap();
        session
            .submit_answer(qid("q-match"), AnswerValue::list(["A", "1", "B"]))
            .unwrap();

        let scored = session.submit(fixed_now()).unwrap();
        assert_eq!(scored.result.correct_answers, 1);
        assert_eq!(
            scored.diagnostic_for(&qid("q-match")),
            Some(&ValidationError::OddFlatSequence { len: 3 })
        );
    }

    #[test]
    fn local_submit_keeps_diagnostics_for_review() {
        let tf = Question::new(
            "q-tf",
            "Rust has a garbage collector.",
            Difficulty::Basic,
            QuestionBody::true_false(false),
        );
        let mut session =
            PracticeSession::start(set_of(vec![mc("q1", "a"), tf]), fixed_now()).unwrap();
        session.submit_answer(qid("q1"), "b").unwrap();
        session.submit_answer(qid("q-tf"), "banana").unwrap();

        let scored = session.submit(fixed_now()).unwrap();
        assert_eq!(scored.result.correct_answers, 0);
        assert_eq!(scored.diagnostics.len(), 1);
        assert!(matches!(
            scored.diagnostic_for(&qid("q-tf")),
            Some(ValidationError::UnknownOption { .. })
        ));
        assert_eq!(session.state(), SessionState::Reviewing);
        assert_eq!(session.scored().map(|s| s.diagnostics.len()), Some(1));
    }

    #[test]
    fn restart_clears_answers_result_and_index() {
        let mut session = two_mc_session();
        session.submit_answer(qid("q1"), "a").unwrap();
        session.next().unwrap();
        session.submit(fixed_now()).unwrap();

        session.restart(fixed_now() + Duration::hours(1)).unwrap();
        assert_eq!(session.state(), SessionState::Answering);
        assert!(session.answers().is_empty());
        assert!(session.scored().is_none());
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.started_at(), Some(fixed_now() + Duration::hours(1)));
        assert_eq!(session.question_set().map(|s| s.id.as_str()), Some("set-1"));
    }

    #[test]
    fn restart_only_from_reviewing() {
        let mut session = two_mc_session();
        assert!(matches!(
            session.restart(fixed_now()),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn navigation_is_clamped() {
        let mut session = two_mc_session();
        assert_eq!(session.previous().unwrap(), 0);
        assert_eq!(session.next().unwrap(), 1);
        assert_eq!(session.next().unwrap(), 1);
        assert_eq!(session.go_to(10).unwrap(), 1);
        assert_eq!(session.go_to_question(&qid("q1")).unwrap(), 0);
        assert_eq!(session.current_question().map(|q| q.id.as_str()), Some("q1"));

        let mut idle = PracticeSession::new();
        assert!(idle.next().is_err());
    }

    #[test]
    fn attempt_summary_requires_review_state() {
        let mut session = two_mc_session();
        assert!(session.attempt_summary().is_err());

        session.submit_answer(qid("q1"), "a").unwrap();
        session.submit(fixed_now() + Duration::minutes(2)).unwrap();
        let summary = session.attempt_summary().unwrap();
        assert_eq!(summary.set_id().as_str(), "set-1");
        assert_eq!(summary.correct_answers(), 1);
        assert_eq!(summary.total_questions(), 2);
        assert_eq!(summary.score_percentage(), 50);
    }
}
