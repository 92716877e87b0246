use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::assignment::Assignment;
use crate::models::batch::{Batch, NewBatch};
use crate::models::candidate::{Candidate, NewCandidate};
use crate::models::exam_session::ExamSession;
use crate::models::question::{Difficulty, NewQuestion, Question};

use super::{ExamStore, SessionStart, SubmittedExam};

/// In-memory `ExamStore` with the same atomicity guarantees as `PgStore`
/// (a single mutex stands in for the per-primitive transactions). Lets the
/// engine test-suite exercise every allocation/session/ledger invariant
/// without a database.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    candidates: Vec<Candidate>,
    batches: Vec<Batch>,
    questions: Vec<Question>,
    assignments: Vec<Assignment>,
    answers: Vec<Answer>,
    sessions: Vec<ExamSession>,
    next_question_id: i32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn insert_candidate(&self, new: NewCandidate) -> Result<Candidate> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let candidate = Candidate {
            id: Uuid::new_v4(),
            name: new.name,
            user_id: new.user_id,
            password_hash: new.password_hash,
            email: new.email,
            batch_id: new.batch_id,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.candidates.push(candidate.clone());
        Ok(candidate)
    }

    async fn candidate_by_id(&self, id: Uuid) -> Result<Candidate> {
        let inner = self.inner.lock().unwrap();
        inner
            .candidates
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Candidate not found".to_string()))
    }

    async fn candidate_by_user_id(&self, user_id: &str) -> Result<Candidate> {
        let inner = self.inner.lock().unwrap();
        inner
            .candidates
            .iter()
            .find(|c| c.user_id == user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Candidate not found".to_string()))
    }

    async fn candidates_in_batch(&self, batch_id: Uuid) -> Result<Vec<Candidate>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .candidates
            .iter()
            .filter(|c| c.batch_id == Some(batch_id))
            .cloned()
            .collect())
    }

    async fn user_id_taken(&self, user_id: &str) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.candidates.iter().any(|c| c.user_id == user_id))
    }

    async fn record_login(&self, candidate_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(candidate) = inner.candidates.iter_mut().find(|c| c.id == candidate_id) {
            candidate.last_login_at = Some(now);
            candidate.updated_at = now;
        }
        Ok(())
    }

    async fn insert_batch(&self, new: NewBatch) -> Result<Batch> {
        let mut inner = self.inner.lock().unwrap();
        let batch = Batch {
            id: Uuid::new_v4(),
            title: new.title,
            exam_duration_minutes: new.exam_duration_minutes,
            start_date: new.start_date,
            end_date: new.end_date,
            total_candidates: new.total_candidates,
            is_active: true,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        inner.batches.push(batch.clone());
        Ok(batch)
    }

    async fn batch_by_id(&self, id: Uuid) -> Result<Batch> {
        let inner = self.inner.lock().unwrap();
        inner
            .batches
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Batch not found".to_string()))
    }

    async fn batch_by_title(&self, title: &str) -> Result<Option<Batch>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.batches.iter().find(|b| b.title == title).cloned())
    }

    async fn create_batch_with_candidates(
        &self,
        new: NewBatch,
        roster: Vec<NewCandidate>,
    ) -> Result<(Batch, Vec<Candidate>)> {
        let mut inner = self.inner.lock().unwrap();
        // Mirror the UNIQUE(user_id) constraint before mutating anything.
        for entry in &roster {
            if inner.candidates.iter().any(|c| c.user_id == entry.user_id) {
                return Err(Error::Internal(format!(
                    "user_id '{}' already exists",
                    entry.user_id
                )));
            }
        }

        let now = Utc::now();
        let batch = Batch {
            id: Uuid::new_v4(),
            title: new.title,
            exam_duration_minutes: new.exam_duration_minutes,
            start_date: new.start_date,
            end_date: new.end_date,
            total_candidates: new.total_candidates,
            is_active: true,
            created_by: new.created_by,
            created_at: now,
        };
        let candidates: Vec<Candidate> = roster
            .into_iter()
            .map(|entry| Candidate {
                id: Uuid::new_v4(),
                name: entry.name,
                user_id: entry.user_id,
                password_hash: entry.password_hash,
                email: entry.email,
                batch_id: Some(batch.id),
                is_active: true,
                last_login_at: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        inner.batches.push(batch.clone());
        inner.candidates.extend(candidates.iter().cloned());
        Ok((batch, candidates))
    }

    async fn insert_questions(&self, new: Vec<NewQuestion>) -> Result<Vec<Question>> {
        let mut inner = self.inner.lock().unwrap();
        let mut created = Vec::with_capacity(new.len());
        for entry in new {
            inner.next_question_id += 1;
            let question = Question {
                id: inner.next_question_id,
                question: entry.question,
                options: entry.options,
                answer: entry.answer,
                topic: entry.topic,
                difficulty: entry.difficulty,
                batch_id: None,
                created_by: entry.created_by,
                created_at: Utc::now(),
            };
            inner.questions.push(question.clone());
            created.push(question);
        }
        Ok(created)
    }

    async fn eligible_questions(
        &self,
        batch_id: Uuid,
        difficulty: Difficulty,
    ) -> Result<Vec<Question>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .questions
            .iter()
            .filter(|q| {
                q.difficulty == difficulty
                    && (q.batch_id.is_none() || q.batch_id == Some(batch_id))
            })
            .cloned()
            .collect())
    }

    async fn questions_by_ids(&self, ids: &[i32]) -> Result<Vec<Question>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .questions
            .iter()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn create_assignments(
        &self,
        candidate_id: Uuid,
        batch_id: Uuid,
        question_ids: &[i32],
        now: DateTime<Utc>,
    ) -> Result<Vec<Assignment>> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .assignments
            .iter()
            .any(|a| a.candidate_id == candidate_id)
        {
            return Err(Error::AlreadyAssigned);
        }

        // Re-check eligibility before mutating so a question claimed by
        // another batch since sampling fails the whole call.
        for &question_id in question_ids {
            let question = inner
                .questions
                .iter()
                .find(|q| q.id == question_id)
                .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;
            if matches!(question.batch_id, Some(bound) if bound != batch_id) {
                return Err(Error::QuestionUnavailable { question_id });
            }
        }

        let mut created = Vec::with_capacity(question_ids.len());
        for &question_id in question_ids {
            if let Some(question) = inner.questions.iter_mut().find(|q| q.id == question_id) {
                if question.batch_id.is_none() {
                    question.batch_id = Some(batch_id);
                }
            }
            let assignment = Assignment {
                id: Uuid::new_v4(),
                candidate_id,
                question_id,
                assigned_at: now,
            };
            inner.assignments.push(assignment.clone());
            created.push(assignment);
        }
        Ok(created)
    }

    async fn assignments_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Assignment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .assignments
            .iter()
            .filter(|a| a.candidate_id == candidate_id)
            .cloned()
            .collect())
    }

    async fn assignment_exists(&self, candidate_id: Uuid, question_id: i32) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .assignments
            .iter()
            .any(|a| a.candidate_id == candidate_id && a.question_id == question_id))
    }

    async fn upsert_answer(
        &self,
        candidate_id: Uuid,
        question_id: i32,
        selected_option: &str,
        now: DateTime<Utc>,
    ) -> Result<Answer> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .answers
            .iter_mut()
            .find(|a| a.candidate_id == candidate_id && a.question_id == question_id)
        {
            existing.selected_option = selected_option.to_string();
            existing.is_saved = true;
            existing.answered_at = now;
            return Ok(existing.clone());
        }

        let answer = Answer {
            id: Uuid::new_v4(),
            candidate_id,
            question_id,
            selected_option: selected_option.to_string(),
            is_saved: true,
            answered_at: now,
        };
        inner.answers.push(answer.clone());
        Ok(answer)
    }

    async fn answers_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Answer>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .answers
            .iter()
            .filter(|a| a.candidate_id == candidate_id)
            .cloned()
            .collect())
    }

    async fn open_session(
        &self,
        candidate_id: Uuid,
        batch_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SessionStart> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .sessions
            .iter()
            .any(|s| s.candidate_id == candidate_id && s.batch_id == batch_id && s.is_submitted)
        {
            return Err(Error::AlreadySubmitted);
        }
        if let Some(open) = inner
            .sessions
            .iter()
            .find(|s| s.candidate_id == candidate_id && !s.is_submitted)
        {
            return Ok(SessionStart::Resumed(open.clone()));
        }

        let session = ExamSession {
            id: Uuid::new_v4(),
            candidate_id,
            batch_id,
            started_at: now,
            ended_at: None,
            is_submitted: false,
        };
        inner.sessions.push(session.clone());
        Ok(SessionStart::Started(session))
    }

    async fn close_session(&self, candidate_id: Uuid, now: DateTime<Utc>) -> Result<SubmittedExam> {
        let mut inner = self.inner.lock().unwrap();
        let session = match inner
            .sessions
            .iter_mut()
            .find(|s| s.candidate_id == candidate_id && !s.is_submitted)
        {
            Some(open) => {
                open.ended_at = Some(now);
                open.is_submitted = true;
                open.clone()
            }
            None => return Err(Error::NoActiveSession),
        };

        let assigned_question_ids = inner
            .assignments
            .iter()
            .filter(|a| a.candidate_id == candidate_id)
            .map(|a| a.question_id)
            .collect();
        let saved_question_ids = inner
            .answers
            .iter()
            .filter(|a| a.candidate_id == candidate_id && a.is_saved)
            .map(|a| a.question_id)
            .collect();

        Ok(SubmittedExam {
            session,
            assigned_question_ids,
            saved_question_ids,
        })
    }

    async fn submitted_session_exists(&self, candidate_id: Uuid, batch_id: Uuid) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sessions
            .iter()
            .any(|s| s.candidate_id == candidate_id && s.batch_id == batch_id && s.is_submitted))
    }
}
