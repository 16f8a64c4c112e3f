use practice_core::model::{AttemptSummary, QuestionSetId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser, u32_from_i64};
use crate::repository::{AttemptRepository, AttemptRow, StorageError};

fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptSummary, StorageError> {
    let set_id = QuestionSetId::new(row.try_get::<String, _>("set_id").map_err(ser)?);
    let started_at = row.try_get("started_at").map_err(ser)?;
    let submitted_at = row.try_get("submitted_at").map_err(ser)?;
    let total = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let correct = u32_from_i64(
        "correct_answers",
        row.try_get::<i64, _>("correct_answers").map_err(ser)?,
    )?;
    let pending = u32_from_i64(
        "pending_review",
        row.try_get::<i64, _>("pending_review").map_err(ser)?,
    )?;
    let score = u32_from_i64(
        "score_percentage",
        row.try_get::<i64, _>("score_percentage").map_err(ser)?,
    )?;

    AttemptSummary::from_persisted(set_id, started_at, submitted_at, total, correct, pending, score)
        .map_err(ser)
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, summary: &AttemptSummary) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO attempts (
                    set_id, started_at, submitted_at, total_questions,
                    correct_answers, pending_review, score_percentage
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(summary.set_id().as_str())
        .bind(summary.started_at())
        .bind(summary.submitted_at())
        .bind(i64::from(summary.total_questions()))
        .bind(i64::from(summary.correct_answers()))
        .bind(i64::from(summary.pending_review()))
        .bind(i64::from(summary.score_percentage()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_attempt(&self, id: i64) -> Result<AttemptSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    set_id, started_at, submitted_at, total_questions,
                    correct_answers, pending_review, score_percentage
                FROM attempts
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }

    async fn list_attempts(
        &self,
        set_id: &QuestionSetId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, set_id, started_at, submitted_at, total_questions,
                    correct_answers, pending_review, score_percentage
                FROM attempts
                WHERE set_id = ?1
                ORDER BY submitted_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(set_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            out.push(AttemptRow::new(id, map_attempt_row(&row)?));
        }
        Ok(out)
    }
}
