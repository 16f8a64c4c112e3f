//! Shared error types for the services crate.

use thiserror::Error;

use practice_core::model::{AttemptError, QuestionId, QuestionSetError, QuestionSetId};
use storage::repository::StorageError;

use crate::sessions::SessionState;

/// Errors raised while fetching a question set for a session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("question set {0} not found")]
    NotFound(QuestionSetId),
    #[error("question set is malformed: {0}")]
    Malformed(#[from] QuestionSetError),
    #[error(transparent)]
    Storage(StorageError),
}

impl LoadError {
    /// Map a repository failure for `set_id`, keeping `NotFound` distinct.
    #[must_use]
    pub fn from_storage(set_id: &QuestionSetId, err: StorageError) -> Self {
        match err {
            StorageError::NotFound => LoadError::NotFound(set_id.clone()),
            other => LoadError::Storage(other),
        }
    }
}

/// Errors raised by the scoring step or by persisting its outcome.
///
/// Local scoring is total, so any occurrence of `Transport` or
/// `Inconsistent` with `LocalScoring` is a defect.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("submission transport failed: {0}")]
    Transport(String),
    #[error("scored result does not match the question set: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by practice sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {operation} while session is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },
    #[error("question {0} is not part of the loaded set")]
    UnknownQuestion(QuestionId),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    pub(crate) fn invalid(operation: &'static str, state: SessionState) -> Self {
        SessionError::InvalidTransition { operation, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_not_found_becomes_load_not_found() {
        let id = QuestionSetId::new("set-1");
        let err = LoadError::from_storage(&id, StorageError::NotFound);
        assert!(matches!(err, LoadError::NotFound(ref found) if found == &id));

        let err = LoadError::from_storage(&id, StorageError::Connection("down".into()));
        assert!(matches!(err, LoadError::Storage(StorageError::Connection(_))));
    }

    #[test]
    fn invalid_transition_names_operation_and_state() {
        let err = SessionError::invalid("submit an answer", SessionState::Reviewing);
        assert_eq!(
            err.to_string(),
            "cannot submit an answer while session is reviewing"
        );
    }
}
