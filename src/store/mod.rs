use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::answer::Answer;
use crate::models::assignment::Assignment;
use crate::models::batch::{Batch, NewBatch};
use crate::models::candidate::{Candidate, NewCandidate};
use crate::models::exam_session::ExamSession;
use crate::models::question::{Difficulty, NewQuestion, Question};

pub mod memory;
pub mod pg;

/// Outcome of `open_session`: either a fresh session was created or an
/// existing in-progress one was resumed.
#[derive(Debug, Clone)]
pub enum SessionStart {
    Started(ExamSession),
    Resumed(ExamSession),
}

impl SessionStart {
    pub fn session(&self) -> &ExamSession {
        match self {
            SessionStart::Started(s) | SessionStart::Resumed(s) => s,
        }
    }

    pub fn resumed(&self) -> bool {
        matches!(self, SessionStart::Resumed(_))
    }
}

/// Snapshot taken by `close_session` in the same transaction that flips the
/// session to submitted, so reconciliation sees a consistent view.
#[derive(Debug, Clone)]
pub struct SubmittedExam {
    pub session: ExamSession,
    pub assigned_question_ids: Vec<i32>,
    pub saved_question_ids: Vec<i32>,
}

/// Repository boundary over the six core entities. The write primitives
/// (`insert_questions`, `create_batch_with_candidates`, `create_assignments`,
/// `open_session`, `close_session`) are atomic: concurrent callers serialize
/// and a failed call persists nothing, never partial state.
#[async_trait]
pub trait ExamStore: Send + Sync {
    // candidates
    async fn insert_candidate(&self, new: NewCandidate) -> Result<Candidate>;
    async fn candidate_by_id(&self, id: Uuid) -> Result<Candidate>;
    async fn candidate_by_user_id(&self, user_id: &str) -> Result<Candidate>;
    async fn candidates_in_batch(&self, batch_id: Uuid) -> Result<Vec<Candidate>>;
    async fn user_id_taken(&self, user_id: &str) -> Result<bool>;
    async fn record_login(&self, candidate_id: Uuid, now: DateTime<Utc>) -> Result<()>;

    // batches
    async fn insert_batch(&self, new: NewBatch) -> Result<Batch>;
    async fn batch_by_id(&self, id: Uuid) -> Result<Batch>;
    async fn batch_by_title(&self, title: &str) -> Result<Option<Batch>>;
    /// Creates the batch and its whole roster in one transaction; each
    /// candidate's `batch_id` is set to the new batch. All-or-nothing: a
    /// failure anywhere leaves neither the batch nor any candidate behind.
    async fn create_batch_with_candidates(
        &self,
        new: NewBatch,
        roster: Vec<NewCandidate>,
    ) -> Result<(Batch, Vec<Candidate>)>;

    // questions
    /// Inserts the whole set in one transaction; a failure persists none.
    async fn insert_questions(&self, new: Vec<NewQuestion>) -> Result<Vec<Question>>;
    /// Pool eligible for allocation into `batch_id`: unbound questions plus
    /// those already claimed by this batch.
    async fn eligible_questions(
        &self,
        batch_id: Uuid,
        difficulty: Difficulty,
    ) -> Result<Vec<Question>>;
    async fn questions_by_ids(&self, ids: &[i32]) -> Result<Vec<Question>>;

    // assignments
    /// Creates the candidate's fixed paper in one transaction, binding each
    /// question's batch on first use. Fails with `AlreadyAssigned` if the
    /// candidate has any assignment, or `QuestionUnavailable` if a question
    /// was claimed by another batch since the pool was read; nothing is
    /// persisted in either case.
    async fn create_assignments(
        &self,
        candidate_id: Uuid,
        batch_id: Uuid,
        question_ids: &[i32],
        now: DateTime<Utc>,
    ) -> Result<Vec<Assignment>>;
    async fn assignments_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Assignment>>;
    async fn assignment_exists(&self, candidate_id: Uuid, question_id: i32) -> Result<bool>;

    // answers
    async fn upsert_answer(
        &self,
        candidate_id: Uuid,
        question_id: i32,
        selected_option: &str,
        now: DateTime<Utc>,
    ) -> Result<Answer>;
    async fn answers_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Answer>>;

    // sessions
    /// Fails with `AlreadySubmitted` if a submitted session exists for the
    /// pair; resumes an open session if present; otherwise creates one.
    async fn open_session(
        &self,
        candidate_id: Uuid,
        batch_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SessionStart>;
    /// Marks the candidate's unique open session submitted and snapshots the
    /// reconciliation sets. Fails with `NoActiveSession` if none is open.
    async fn close_session(&self, candidate_id: Uuid, now: DateTime<Utc>) -> Result<SubmittedExam>;
    async fn submitted_session_exists(&self, candidate_id: Uuid, batch_id: Uuid) -> Result<bool>;
}
