use std::sync::Arc;

use practice_core::model::{AnswerDiagnostic, CourseId, QuestionSetId, ScoredSubmission};
use storage::repository::{
    AttemptRepository, AttemptRow, QuestionSetHeader, QuestionSetRepository, Storage,
};

use super::service::PracticeSession;
use super::state::SessionState;
use super::transport::{LocalScoring, SubmissionTransport};
use crate::Clock;
use crate::error::{LoadError, SessionError};

/// Result of submitting a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub scored: ScoredSubmission,
    /// `None` when history is disabled or the append failed; see
    /// [`PracticeLoopService::finalize_attempt`].
    pub attempt_id: Option<i64>,
}

/// Orchestrates loading, scoring and attempt persistence for practice sessions.
#[derive(Clone)]
pub struct PracticeLoopService {
    clock: Clock,
    question_sets: Arc<dyn QuestionSetRepository>,
    attempts: Option<Arc<dyn AttemptRepository>>,
    transport: Arc<dyn SubmissionTransport>,
}

impl PracticeLoopService {
    /// Service that scores locally and keeps no attempt history.
    #[must_use]
    pub fn new(question_sets: Arc<dyn QuestionSetRepository>) -> Self {
        Self {
            clock: Clock::default(),
            question_sets,
            attempts: None,
            transport: Arc::new(LocalScoring),
        }
    }

    /// Service over both repositories of `storage`, with history enabled.
    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(Arc::clone(&storage.question_sets))
            .with_attempt_history(Arc::clone(&storage.attempts))
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn SubmissionTransport>) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_attempt_history(mut self, attempts: Arc<dyn AttemptRepository>) -> Self {
        self.attempts = Some(attempts);
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Fetch `set_id` and start a new session on it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` when the set is missing, malformed, or
    /// storage fails.
    pub async fn start_session(
        &self,
        set_id: &QuestionSetId,
    ) -> Result<PracticeSession, SessionError> {
        let mut session = PracticeSession::new();
        self.load(&mut session, set_id).await?;
        Ok(session)
    }

    /// Load `set_id` into an idle session. The session stays `Idle` on failure.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` if the session is not idle,
    /// or `SessionError::Load`.
    pub async fn load(
        &self,
        session: &mut PracticeSession,
        set_id: &QuestionSetId,
    ) -> Result<(), SessionError> {
        if session.state() != SessionState::Idle {
            return Err(SessionError::invalid("load a question set", session.state()));
        }
        let set = self
            .question_sets
            .get_question_set(set_id)
            .await
            .map_err(|e| LoadError::from_storage(set_id, e))
            .inspect_err(|e| {
                tracing::warn!(set_id = %set_id, error = %e, "question set load failed");
            })?;
        session.load_set(set, self.clock.now())
    }

    /// List the question sets of a course.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_sets(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<QuestionSetHeader>, SessionError> {
        Ok(self.question_sets.list_question_sets(course_id).await?)
    }

    /// Score the session through the configured transport and enter review.
    ///
    /// When history is enabled the attempt is appended afterwards. A failed
    /// append is logged and leaves the session in review with no attempt id.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session can submit
    /// (a submission already in flight included), or `SessionError::Submission`
    /// if scoring fails; the session then returns to answering.
    pub async fn submit(
        &self,
        session: &mut PracticeSession,
    ) -> Result<SubmitOutcome, SessionError> {
        let snapshot = session.begin_submit()?;
        let Some(set) = session.shared_set() else {
            session.fail_submit();
            return Err(SessionError::invalid("submit", session.state()));
        };

        let mut scored = match self.transport.submit_answers(&set, &snapshot.answers).await {
            Ok(scored) => scored,
            Err(err) => {
                tracing::error!(set_id = %set.id, error = %err, "submission failed");
                session.fail_submit();
                return Err(err.into());
            }
        };

        // Answers the codec refused never reached the transport; they scored
        // as unanswered, so attach their diagnostics here.
        for (question_id, error) in snapshot.rejected {
            if scored.diagnostic_for(&question_id).is_none() {
                scored.diagnostics.push(AnswerDiagnostic { question_id, error });
            }
        }

        let scored = session
            .complete_submit(scored, self.clock.now())
            .inspect_err(|e| tracing::error!(set_id = %set.id, error = %e, "submission rejected"))?
            .clone();

        let attempt_id = match self.append_attempt(session).await {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(set_id = %set.id, error = %err, "attempt history append failed");
                None
            }
        };

        Ok(SubmitOutcome { scored, attempt_id })
    }

    /// Append the reviewed attempt if it has not been stored yet.
    ///
    /// Returns the existing id when already stored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside review, or
    /// `SessionError::Submission` when the append fails.
    pub async fn finalize_attempt(
        &self,
        session: &mut PracticeSession,
    ) -> Result<Option<i64>, SessionError> {
        if let Some(id) = session.attempt_id() {
            return Ok(Some(id));
        }
        session.attempt_summary()?;
        self.append_attempt(session).await
    }

    async fn append_attempt(
        &self,
        session: &mut PracticeSession,
    ) -> Result<Option<i64>, SessionError> {
        let Some(attempts) = &self.attempts else {
            return Ok(None);
        };
        let summary = session.attempt_summary()?;
        let id = attempts
            .append_attempt(&summary)
            .await
            .map_err(crate::error::SubmissionError::from)?;
        tracing::info!(
            attempt_id = id,
            set_id = %summary.set_id(),
            score = summary.score_percentage(),
            "attempt recorded"
        );
        session.set_attempt_id(id);
        Ok(Some(id))
    }

    /// Clear answers and results and answer the same set again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside review.
    pub fn restart(&self, session: &mut PracticeSession) -> Result<(), SessionError> {
        session.restart(self.clock.now())
    }

    /// Attempt history for a set, newest first. Empty when history is disabled.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn history(
        &self,
        set_id: &QuestionSetId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, SessionError> {
        match &self.attempts {
            Some(attempts) => Ok(attempts.list_attempts(set_id, limit).await?),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use practice_core::codec::ValidationError;
    use practice_core::model::{
        AnswerValue, AttemptSummary, Difficulty, MatchPair, Question, QuestionBody, QuestionId,
        QuestionSet, TransportValue,
    };
    use practice_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, StorageError};

    use crate::error::SubmissionError;
    use crate::sessions::SessionState;

    fn matching_set() -> QuestionSet {
        QuestionSet::new(
            "set-1",
            "Symbols",
            "course-1",
            Difficulty::Basic,
            vec![
                Question::new(
                    "m1",
                    "Match",
                    Difficulty::Basic,
                    QuestionBody::Matching {
                        pairs: vec![MatchPair::new("Gold", "Au"), MatchPair::new("Iron", "Fe")],
                    },
                ),
                Question::new("tf", "True?", Difficulty::Basic, QuestionBody::true_false(true)),
            ],
        )
    }

    async fn seeded() -> (InMemoryRepository, PracticeLoopService) {
        let repo = InMemoryRepository::new();
        repo.upsert_question_set(&matching_set()).await.unwrap();
        let service = PracticeLoopService::new(Arc::new(repo.clone()))
            .with_attempt_history(Arc::new(repo.clone()))
            .with_clock(Clock::fixed(fixed_now()));
        (repo, service)
    }

    struct FailingTransport;

    #[async_trait]
    impl SubmissionTransport for FailingTransport {
        async fn submit_answers(
            &self,
            _set: &QuestionSet,
            _answers: &BTreeMap<QuestionId, TransportValue>,
        ) -> Result<ScoredSubmission, SubmissionError> {
            Err(SubmissionError::Transport("offline".into()))
        }
    }

    /// Attempt history that fails the first `failures` appends.
    struct FlakyHistory {
        inner: InMemoryRepository,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl AttemptRepository for FlakyHistory {
        async fn append_attempt(&self, summary: &AttemptSummary) -> Result<i64, StorageError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(StorageError::Connection("locked".into()));
            }
            self.inner.append_attempt(summary).await
        }

        async fn get_attempt(&self, id: i64) -> Result<AttemptSummary, StorageError> {
            self.inner.get_attempt(id).await
        }

        async fn list_attempts(
            &self,
            set_id: &QuestionSetId,
            limit: u32,
        ) -> Result<Vec<AttemptRow>, StorageError> {
            self.inner.list_attempts(set_id, limit).await
        }
    }

    #[tokio::test]
    async fn submit_scores_and_records_attempt() {
        let (repo, service) = seeded().await;
        let mut session = service
            .start_session(&QuestionSetId::new("set-1"))
            .await
            .unwrap();
        session
            .submit_answer(
                QuestionId::new("m1"),
                AnswerValue::matches([("Iron", "Fe"), ("Gold", "Au")]),
            )
            .unwrap();
        session.submit_answer(QuestionId::new("tf"), "false").unwrap();

        let outcome = service.submit(&mut session).await.unwrap();
        assert_eq!(outcome.scored.result.correct_answers, 1);
        assert_eq!(outcome.scored.result.score_percentage, 50);
        let attempt_id = outcome.attempt_id.expect("attempt stored");
        assert_eq!(session.attempt_id(), Some(attempt_id));

        let stored = repo.get_attempt(attempt_id).await.unwrap();
        assert_eq!(stored.score_percentage(), 50);
        assert_eq!(stored.submitted_at(), fixed_now());

        let history = service
            .history(&QuestionSetId::new("set-1"), 5)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn missing_set_is_a_load_error() {
        let (_repo, service) = seeded().await;
        let mut session = PracticeSession::new();
        let err = service
            .load(&mut session, &QuestionSetId::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Load(LoadError::NotFound(_))));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn load_into_started_session_is_rejected_before_fetch() {
        let (_repo, service) = seeded().await;
        let mut session = service
            .start_session(&QuestionSetId::new("set-1"))
            .await
            .unwrap();
        let err = service
            .load(&mut session, &QuestionSetId::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                state: SessionState::Answering,
                ..
            }
        ));
        assert_eq!(session.state(), SessionState::Answering);
        assert_eq!(session.question_set().map(|s| s.id.as_str()), Some("set-1"));
    }

    #[tokio::test]
    async fn odd_flat_sequence_is_reported_not_fatal() {
        let (_repo, service) = seeded().await;
        let mut session = service
            .start_session(&QuestionSetId::new("set-1"))
            .await
            .unwrap();
        session
            .submit_answer(QuestionId::new("m1"), AnswerValue::list(["Gold", "Au", "Iron"]))
            .unwrap();
        session.submit_answer(QuestionId::new("tf"), "true").unwrap();

        let outcome = service.submit(&mut session).await.unwrap();
        assert_eq!(outcome.scored.result.correct_answers, 1);
        assert_eq!(
            outcome.scored.diagnostic_for(&QuestionId::new("m1")),
            Some(&ValidationError::OddFlatSequence { len: 3 })
        );
        let m1 = outcome
            .scored
            .result
            .result_for(&QuestionId::new("m1"))
            .unwrap();
        assert!(!m1.is_correct);
        assert!(!m1.requires_review);
    }

    #[tokio::test]
    async fn transport_failure_returns_to_answering() {
        let (_repo, service) = seeded().await;
        let service = service.with_transport(Arc::new(FailingTransport));
        let mut session = service
            .start_session(&QuestionSetId::new("set-1"))
            .await
            .unwrap();
        session.submit_answer(QuestionId::new("tf"), "true").unwrap();

        let err = service.submit(&mut session).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Submission(SubmissionError::Transport(_))
        ));
        assert_eq!(session.state(), SessionState::Answering);
        assert!(session.get_answer(&QuestionId::new("tf")).is_some());
    }

    #[tokio::test]
    async fn failed_history_append_keeps_review_and_can_be_retried() {
        let repo = InMemoryRepository::new();
        repo.upsert_question_set(&matching_set()).await.unwrap();
        let history = Arc::new(FlakyHistory {
            inner: repo.clone(),
            failures: AtomicUsize::new(1),
        });
        let service = PracticeLoopService::new(Arc::new(repo.clone()))
            .with_attempt_history(history)
            .with_clock(Clock::fixed(fixed_now()));

        let mut session = service
            .start_session(&QuestionSetId::new("set-1"))
            .await
            .unwrap();
        let outcome = service.submit(&mut session).await.unwrap();
        assert_eq!(outcome.attempt_id, None);
        assert_eq!(session.state(), SessionState::Reviewing);

        let id = service.finalize_attempt(&mut session).await.unwrap();
        assert!(id.is_some());
        assert_eq!(session.attempt_id(), id);
        let again = service.finalize_attempt(&mut session).await.unwrap();
        assert_eq!(again, id);
    }

    #[tokio::test]
    async fn history_is_empty_when_disabled() {
        let repo = InMemoryRepository::new();
        repo.upsert_question_set(&matching_set()).await.unwrap();
        let service = PracticeLoopService::new(Arc::new(repo));

        let mut session = service
            .start_session(&QuestionSetId::new("set-1"))
            .await
            .unwrap();
        let outcome = service.submit(&mut session).await.unwrap();
        assert_eq!(outcome.attempt_id, None);
        assert!(service
            .history(&QuestionSetId::new("set-1"), 10)
            .await
            .unwrap()
            .is_empty());

        service.restart(&mut session).unwrap();
        assert_eq!(session.state(), SessionState::Answering);
    }
}
