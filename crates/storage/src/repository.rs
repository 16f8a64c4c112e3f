use async_trait::async_trait;
use practice_core::model::{AttemptSummary, CourseId, QuestionSet, QuestionSetId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Listing entry for a stored question set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSetHeader {
    pub id: QuestionSetId,
    pub title: String,
    pub course_id: CourseId,
    pub question_count: u32,
}

impl QuestionSetHeader {
    #[must_use]
    pub fn from_set(set: &QuestionSet) -> Self {
        Self {
            id: set.id.clone(),
            title: set.title.clone(),
            course_id: set.course_id.clone(),
            question_count: u32::try_from(set.questions.len()).unwrap_or(u32::MAX),
        }
    }
}

/// Persisted attempt summary with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRow {
    pub id: i64,
    pub summary: AttemptSummary,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: i64, summary: AttemptSummary) -> Self {
        Self { id, summary }
    }
}

/// Content provider contract: question sets as authored, verbatim.
#[async_trait]
pub trait QuestionSetRepository: Send + Sync {
    /// Persist or replace a question set and its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the set cannot be stored.
    async fn upsert_question_set(&self, set: &QuestionSet) -> Result<(), StorageError>;

    /// Fetch a question set by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_question_set(&self, id: &QuestionSetId) -> Result<QuestionSet, StorageError>;

    /// List the sets of a course, ordered by title.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_question_sets(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<QuestionSetHeader>, StorageError>;
}

/// History of submitted attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append an attempt summary and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn append_attempt(&self, summary: &AttemptSummary) -> Result<i64, StorageError>;

    /// Fetch an attempt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: i64) -> Result<AttemptSummary, StorageError>;

    /// Attempts for a set, newest submission first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_attempts(
        &self,
        set_id: &QuestionSetId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sets: Arc<Mutex<HashMap<QuestionSetId, QuestionSet>>>,
    attempts: Arc<Mutex<Vec<AttemptSummary>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionSetRepository for InMemoryRepository {
    async fn upsert_question_set(&self, set: &QuestionSet) -> Result<(), StorageError> {
        let mut guard = self
            .sets
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(set.id.clone(), set.clone());
        Ok(())
    }

    async fn get_question_set(&self, id: &QuestionSetId) -> Result<QuestionSet, StorageError> {
        let guard = self
            .sets
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_question_sets(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<QuestionSetHeader>, StorageError> {
        let guard = self
            .sets
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut headers: Vec<_> = guard
            .values()
            .filter(|set| &set.course_id == course_id)
            .map(QuestionSetHeader::from_set)
            .collect();
        headers.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(headers)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, summary: &AttemptSummary) -> Result<i64, StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(summary.clone());
        i64::try_from(guard.len()).map_err(|_| StorageError::Conflict)
    }

    async fn get_attempt(&self, id: i64) -> Result<AttemptSummary, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let index = id
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .ok_or(StorageError::NotFound)?;
        guard.get(index).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_attempts(
        &self,
        set_id: &QuestionSetId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut rows: Vec<AttemptRow> = guard
            .iter()
            .enumerate()
            .filter(|(_, summary)| summary.set_id() == set_id)
            .filter_map(|(index, summary)| {
                i64::try_from(index + 1)
                    .ok()
                    .map(|id| AttemptRow::new(id, summary.clone()))
            })
            .collect();
        rows.sort_by(|a, b| {
            b.summary
                .submitted_at()
                .cmp(&a.summary.submitted_at())
                .then_with(|| b.id.cmp(&a.id))
        });
        rows.truncate(limit);
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub question_sets: Arc<dyn QuestionSetRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let question_sets: Arc<dyn QuestionSetRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            question_sets,
            attempts,
        }
    }
}
