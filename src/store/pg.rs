use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::assignment::Assignment;
use crate::models::batch::{Batch, NewBatch};
use crate::models::candidate::{Candidate, NewCandidate};
use crate::models::exam_session::ExamSession;
use crate::models::question::{Difficulty, NewQuestion, Question};

use super::{ExamStore, SessionStart, SubmittedExam};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExamStore for PgStore {
    async fn insert_candidate(&self, new: NewCandidate) -> Result<Candidate> {
        let candidate = sqlx::query_as::<_, Candidate>(
            r#"
            INSERT INTO candidates (name, user_id, password_hash, email, batch_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new.name)
        .bind(new.user_id)
        .bind(new.password_hash)
        .bind(new.email)
        .bind(new.batch_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(candidate)
    }

    async fn candidate_by_id(&self, id: Uuid) -> Result<Candidate> {
        let candidate =
            sqlx::query_as::<_, Candidate>(r#"SELECT * FROM candidates WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound("Candidate not found".to_string()))?;
        Ok(candidate)
    }

    async fn candidate_by_user_id(&self, user_id: &str) -> Result<Candidate> {
        let candidate =
            sqlx::query_as::<_, Candidate>(r#"SELECT * FROM candidates WHERE user_id = $1"#)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound("Candidate not found".to_string()))?;
        Ok(candidate)
    }

    async fn candidates_in_batch(&self, batch_id: Uuid) -> Result<Vec<Candidate>> {
        let candidates = sqlx::query_as::<_, Candidate>(
            r#"SELECT * FROM candidates WHERE batch_id = $1 ORDER BY created_at"#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(candidates)
    }

    async fn user_id_taken(&self, user_id: &str) -> Result<bool> {
        let taken: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM candidates WHERE user_id = $1)"#)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(taken)
    }

    async fn record_login(&self, candidate_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(r#"UPDATE candidates SET last_login_at = $1, updated_at = $1 WHERE id = $2"#)
            .bind(now)
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_batch(&self, new: NewBatch) -> Result<Batch> {
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            INSERT INTO batches (title, exam_duration_minutes, start_date, end_date, total_candidates, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.title)
        .bind(new.exam_duration_minutes)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.total_candidates)
        .bind(new.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(batch)
    }

    async fn batch_by_id(&self, id: Uuid) -> Result<Batch> {
        let batch = sqlx::query_as::<_, Batch>(r#"SELECT * FROM batches WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Batch not found".to_string()))?;
        Ok(batch)
    }

    async fn batch_by_title(&self, title: &str) -> Result<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(r#"SELECT * FROM batches WHERE title = $1"#)
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(batch)
    }

    async fn create_batch_with_candidates(
        &self,
        new: NewBatch,
        roster: Vec<NewCandidate>,
    ) -> Result<(Batch, Vec<Candidate>)> {
        let mut tx = self.pool.begin().await?;

        let batch = sqlx::query_as::<_, Batch>(
            r#"
            INSERT INTO batches (title, exam_duration_minutes, start_date, end_date, total_candidates, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.title)
        .bind(new.exam_duration_minutes)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.total_candidates)
        .bind(new.created_by)
        .fetch_one(&mut *tx)
        .await?;

        let mut candidates = Vec::with_capacity(roster.len());
        for entry in roster {
            let candidate = sqlx::query_as::<_, Candidate>(
                r#"
                INSERT INTO candidates (name, user_id, password_hash, email, batch_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(entry.name)
            .bind(entry.user_id)
            .bind(entry.password_hash)
            .bind(entry.email)
            .bind(batch.id)
            .fetch_one(&mut *tx)
            .await?;
            candidates.push(candidate);
        }

        tx.commit().await?;
        Ok((batch, candidates))
    }

    async fn insert_questions(&self, new: Vec<NewQuestion>) -> Result<Vec<Question>> {
        let mut tx = self.pool.begin().await?;

        let mut created = Vec::with_capacity(new.len());
        for question in new {
            let question = sqlx::query_as::<_, Question>(
                r#"
                INSERT INTO questions (question, options, answer, topic, difficulty, created_by)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(question.question)
            .bind(question.options)
            .bind(question.answer)
            .bind(question.topic)
            .bind(question.difficulty)
            .bind(question.created_by)
            .fetch_one(&mut *tx)
            .await?;
            created.push(question);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn eligible_questions(
        &self,
        batch_id: Uuid,
        difficulty: Difficulty,
    ) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT * FROM questions
            WHERE difficulty = $1 AND (batch_id IS NULL OR batch_id = $2)
            "#,
        )
        .bind(difficulty)
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn questions_by_ids(&self, ids: &[i32]) -> Result<Vec<Question>> {
        let questions =
            sqlx::query_as::<_, Question>(r#"SELECT * FROM questions WHERE id = ANY($1)"#)
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(questions)
    }

    async fn create_assignments(
        &self,
        candidate_id: Uuid,
        batch_id: Uuid,
        question_ids: &[i32],
        now: DateTime<Utc>,
    ) -> Result<Vec<Assignment>> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent allocations for the same candidate; the
        // UNIQUE(candidate_id, question_id) constraint backs this up.
        sqlx::query(r#"SELECT pg_advisory_xact_lock(hashtext($1::text))"#)
            .bind(candidate_id)
            .execute(&mut *tx)
            .await?;

        let existing: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM assignments WHERE candidate_id = $1"#)
                .bind(candidate_id)
                .fetch_one(&mut *tx)
                .await?;
        if existing > 0 {
            return Err(Error::AlreadyAssigned);
        }

        let mut created = Vec::with_capacity(question_ids.len());
        for question_id in question_ids {
            // Lazy batch binding with the eligibility re-checked inside the
            // transaction: the pool was sampled earlier, so a question
            // claimed by another batch in between must fail the whole call.
            let claimed = sqlx::query(
                r#"
                UPDATE questions SET batch_id = $1
                WHERE id = $2 AND (batch_id IS NULL OR batch_id = $1)
                "#,
            )
            .bind(batch_id)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
            if claimed.rows_affected() == 0 {
                return Err(Error::QuestionUnavailable {
                    question_id: *question_id,
                });
            }

            let assignment = sqlx::query_as::<_, Assignment>(
                r#"
                INSERT INTO assignments (candidate_id, question_id, assigned_at)
                VALUES ($1, $2, $3)
                RETURNING *
                "#,
            )
            .bind(candidate_id)
            .bind(question_id)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            created.push(assignment);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn assignments_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Assignment>> {
        let assignments = sqlx::query_as::<_, Assignment>(
            r#"SELECT * FROM assignments WHERE candidate_id = $1 ORDER BY assigned_at"#,
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(assignments)
    }

    async fn assignment_exists(&self, candidate_id: Uuid, question_id: i32) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM assignments WHERE candidate_id = $1 AND question_id = $2)"#,
        )
        .bind(candidate_id)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn upsert_answer(
        &self,
        candidate_id: Uuid,
        question_id: i32,
        selected_option: &str,
        now: DateTime<Utc>,
    ) -> Result<Answer> {
        // Last writer wins by commit order.
        let answer = sqlx::query_as::<_, Answer>(
            r#"
            INSERT INTO answers (candidate_id, question_id, selected_option, is_saved, answered_at)
            VALUES ($1, $2, $3, TRUE, $4)
            ON CONFLICT (candidate_id, question_id)
            DO UPDATE SET selected_option = EXCLUDED.selected_option,
                          is_saved = TRUE,
                          answered_at = EXCLUDED.answered_at
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(question_id)
        .bind(selected_option)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(answer)
    }

    async fn answers_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Answer>> {
        let answers = sqlx::query_as::<_, Answer>(
            r#"SELECT * FROM answers WHERE candidate_id = $1 ORDER BY answered_at"#,
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn open_session(
        &self,
        candidate_id: Uuid,
        batch_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SessionStart> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(r#"SELECT pg_advisory_xact_lock(hashtext($1::text))"#)
            .bind(candidate_id)
            .execute(&mut *tx)
            .await?;

        let submitted: Option<ExamSession> = sqlx::query_as::<_, ExamSession>(
            r#"SELECT * FROM exam_sessions WHERE candidate_id = $1 AND batch_id = $2 AND is_submitted"#,
        )
        .bind(candidate_id)
        .bind(batch_id)
        .fetch_optional(&mut *tx)
        .await?;
        if submitted.is_some() {
            return Err(Error::AlreadySubmitted);
        }

        // One open session per candidate across all batches, enforced here
        // and by the partial unique index.
        let open: Option<ExamSession> = sqlx::query_as::<_, ExamSession>(
            r#"SELECT * FROM exam_sessions WHERE candidate_id = $1 AND NOT is_submitted"#,
        )
        .bind(candidate_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(session) = open {
            tx.commit().await?;
            return Ok(SessionStart::Resumed(session));
        }

        let session = sqlx::query_as::<_, ExamSession>(
            r#"
            INSERT INTO exam_sessions (candidate_id, batch_id, started_at, is_submitted)
            VALUES ($1, $2, $3, FALSE)
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(batch_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SessionStart::Started(session))
    }

    async fn close_session(&self, candidate_id: Uuid, now: DateTime<Utc>) -> Result<SubmittedExam> {
        let mut tx = self.pool.begin().await?;

        let open: Option<ExamSession> = sqlx::query_as::<_, ExamSession>(
            r#"SELECT * FROM exam_sessions WHERE candidate_id = $1 AND NOT is_submitted FOR UPDATE"#,
        )
        .bind(candidate_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(open) = open else {
            return Err(Error::NoActiveSession);
        };

        let session = sqlx::query_as::<_, ExamSession>(
            r#"UPDATE exam_sessions SET ended_at = $1, is_submitted = TRUE WHERE id = $2 RETURNING *"#,
        )
        .bind(now)
        .bind(open.id)
        .fetch_one(&mut *tx)
        .await?;

        let assigned_question_ids: Vec<i32> =
            sqlx::query_scalar(r#"SELECT question_id FROM assignments WHERE candidate_id = $1"#)
                .bind(candidate_id)
                .fetch_all(&mut *tx)
                .await?;
        let saved_question_ids: Vec<i32> = sqlx::query_scalar(
            r#"SELECT question_id FROM answers WHERE candidate_id = $1 AND is_saved"#,
        )
        .bind(candidate_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SubmittedExam {
            session,
            assigned_question_ids,
            saved_question_ids,
        })
    }

    async fn submitted_session_exists(&self, candidate_id: Uuid, batch_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM exam_sessions WHERE candidate_id = $1 AND batch_id = $2 AND is_submitted)"#,
        )
        .bind(candidate_id)
        .bind(batch_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
