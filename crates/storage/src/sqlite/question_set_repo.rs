use practice_core::model::{CourseId, Question, QuestionSet, QuestionSetId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, difficulty_str, parse_difficulty, ser, u32_from_i64};
use crate::repository::{QuestionSetHeader, QuestionSetRepository, StorageError};

fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let payload: String = row.try_get("payload").map_err(ser)?;
    serde_json::from_str(&payload).map_err(ser)
}

#[async_trait::async_trait]
impl QuestionSetRepository for SqliteRepository {
    async fn upsert_question_set(&self, set: &QuestionSet) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO question_sets (id, title, description, difficulty, course_id)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    difficulty = excluded.difficulty,
                    course_id = excluded.course_id
            ",
        )
        .bind(set.id.as_str())
        .bind(&set.title)
        .bind(set.description.as_deref())
        .bind(difficulty_str(set.difficulty))
        .bind(set.course_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM questions WHERE set_id = ?1")
            .bind(set.id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, question) in set.questions.iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            let payload = serde_json::to_string(question).map_err(ser)?;
            sqlx::query(
                r"
                    INSERT INTO questions (set_id, id, position, kind, payload)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(set.id.as_str())
            .bind(question.id.as_str())
            .bind(position)
            .bind(question.kind().as_str())
            .bind(payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
                _ => conn(e),
            })?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(set_id = %set.id, questions = set.questions.len(), "stored question set");
        Ok(())
    }

    async fn get_question_set(&self, id: &QuestionSetId) -> Result<QuestionSet, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, title, description, difficulty, course_id
                FROM question_sets
                WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let difficulty: String = row.try_get("difficulty").map_err(ser)?;
        let title: String = row.try_get("title").map_err(ser)?;
        let description: Option<String> = row.try_get("description").map_err(ser)?;
        let course_id: String = row.try_get("course_id").map_err(ser)?;

        let question_rows = sqlx::query(
            r"
                SELECT payload
                FROM questions
                WHERE set_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = Vec::with_capacity(question_rows.len());
        for row in &question_rows {
            questions.push(map_question_row(row)?);
        }

        Ok(QuestionSet {
            id: id.clone(),
            title,
            description,
            questions,
            difficulty: parse_difficulty(&difficulty)?,
            course_id: CourseId::new(course_id),
        })
    }

    async fn list_question_sets(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<QuestionSetHeader>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT s.id, s.title, s.course_id, COUNT(q.id) AS question_count
                FROM question_sets s
                LEFT JOIN questions q ON q.set_id = s.id
                WHERE s.course_id = ?1
                GROUP BY s.id, s.title, s.course_id
                ORDER BY s.title ASC, s.id ASC
            ",
        )
        .bind(course_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(QuestionSetHeader {
                id: QuestionSetId::new(row.try_get::<String, _>("id").map_err(ser)?),
                title: row.try_get("title").map_err(ser)?,
                course_id: CourseId::new(row.try_get::<String, _>("course_id").map_err(ser)?),
                question_count: u32_from_i64(
                    "question_count",
                    row.try_get::<i64, _>("question_count").map_err(ser)?,
                )?,
            });
        }
        Ok(out)
    }
}
