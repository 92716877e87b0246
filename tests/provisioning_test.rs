use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use exam_portal_backend::error::{Error, Result};
use exam_portal_backend::models::answer::Answer;
use exam_portal_backend::models::assignment::Assignment;
use exam_portal_backend::models::batch::{Batch, NewBatch};
use exam_portal_backend::models::candidate::{Candidate, NewCandidate};
use exam_portal_backend::models::question::{Difficulty, NewQuestion, Question};
use exam_portal_backend::services::notification_service::{CredentialDelivery, CredentialNotifier};
use exam_portal_backend::services::question_service::QuestionService;
use exam_portal_backend::services::roster_service::{BatchSpec, RosterEntry, RosterService};
use exam_portal_backend::store::memory::MemoryStore;
use exam_portal_backend::store::{ExamStore, SessionStart, SubmittedExam};
use exam_portal_backend::utils::credentials::verify_password;

/// Notifier double that records deliveries instead of posting them.
#[derive(Default)]
struct RecordingNotifier {
    deliveries: Mutex<Vec<CredentialDelivery>>,
}

#[async_trait]
impl CredentialNotifier for RecordingNotifier {
    async fn deliver_credentials(&self, delivery: &CredentialDelivery) -> Result<()> {
        self.deliveries.lock().unwrap().push(delivery.clone());
        Ok(())
    }
}

/// Store double whose bulk writes fail, standing in for a backend that
/// errors mid-request. Everything else passes through to a real
/// `MemoryStore` so the tests can inspect what survived the failure.
struct FailingStore {
    inner: MemoryStore,
}

impl FailingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
        }
    }
}

#[async_trait]
impl ExamStore for FailingStore {
    async fn insert_candidate(&self, new: NewCandidate) -> Result<Candidate> {
        self.inner.insert_candidate(new).await
    }

    async fn candidate_by_id(&self, id: Uuid) -> Result<Candidate> {
        self.inner.candidate_by_id(id).await
    }

    async fn candidate_by_user_id(&self, user_id: &str) -> Result<Candidate> {
        self.inner.candidate_by_user_id(user_id).await
    }

    async fn candidates_in_batch(&self, batch_id: Uuid) -> Result<Vec<Candidate>> {
        self.inner.candidates_in_batch(batch_id).await
    }

    async fn user_id_taken(&self, user_id: &str) -> Result<bool> {
        self.inner.user_id_taken(user_id).await
    }

    async fn record_login(&self, candidate_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.inner.record_login(candidate_id, now).await
    }

    async fn insert_batch(&self, new: NewBatch) -> Result<Batch> {
        self.inner.insert_batch(new).await
    }

    async fn batch_by_id(&self, id: Uuid) -> Result<Batch> {
        self.inner.batch_by_id(id).await
    }

    async fn batch_by_title(&self, title: &str) -> Result<Option<Batch>> {
        self.inner.batch_by_title(title).await
    }

    async fn create_batch_with_candidates(
        &self,
        _new: NewBatch,
        _roster: Vec<NewCandidate>,
    ) -> Result<(Batch, Vec<Candidate>)> {
        Err(Error::Internal("storage unavailable".to_string()))
    }

    async fn insert_questions(&self, _new: Vec<NewQuestion>) -> Result<Vec<Question>> {
        Err(Error::Internal("storage unavailable".to_string()))
    }

    async fn eligible_questions(
        &self,
        batch_id: Uuid,
        difficulty: Difficulty,
    ) -> Result<Vec<Question>> {
        self.inner.eligible_questions(batch_id, difficulty).await
    }

    async fn questions_by_ids(&self, ids: &[i32]) -> Result<Vec<Question>> {
        self.inner.questions_by_ids(ids).await
    }

    async fn create_assignments(
        &self,
        candidate_id: Uuid,
        batch_id: Uuid,
        question_ids: &[i32],
        now: DateTime<Utc>,
    ) -> Result<Vec<Assignment>> {
        self.inner
            .create_assignments(candidate_id, batch_id, question_ids, now)
            .await
    }

    async fn assignments_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Assignment>> {
        self.inner.assignments_for_candidate(candidate_id).await
    }

    async fn assignment_exists(&self, candidate_id: Uuid, question_id: i32) -> Result<bool> {
        self.inner.assignment_exists(candidate_id, question_id).await
    }

    async fn upsert_answer(
        &self,
        candidate_id: Uuid,
        question_id: i32,
        selected_option: &str,
        now: DateTime<Utc>,
    ) -> Result<Answer> {
        self.inner
            .upsert_answer(candidate_id, question_id, selected_option, now)
            .await
    }

    async fn answers_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Answer>> {
        self.inner.answers_for_candidate(candidate_id).await
    }

    async fn open_session(
        &self,
        candidate_id: Uuid,
        batch_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SessionStart> {
        self.inner.open_session(candidate_id, batch_id, now).await
    }

    async fn close_session(&self, candidate_id: Uuid, now: DateTime<Utc>) -> Result<SubmittedExam> {
        self.inner.close_session(candidate_id, now).await
    }

    async fn submitted_session_exists(&self, candidate_id: Uuid, batch_id: Uuid) -> Result<bool> {
        self.inner.submitted_session_exists(candidate_id, batch_id).await
    }
}

fn batch_spec(title: &str) -> BatchSpec {
    BatchSpec {
        title: title.to_string(),
        exam_duration_minutes: 60,
        start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 6, 7).unwrap(),
        created_by: None,
    }
}

fn entry(name: &str, email: &str) -> RosterEntry {
    RosterEntry {
        name: name.to_string(),
        email: email.to_string(),
    }
}

fn new_question(text: &str) -> NewQuestion {
    NewQuestion {
        question: text.to_string(),
        options: json!({"A": "right", "B": "wrong"}),
        answer: "A".to_string(),
        topic: "general".to_string(),
        difficulty: Difficulty::Easy,
        created_by: None,
    }
}

#[tokio::test]
async fn provisioning_generates_credentials_and_delivers_them() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = RosterService::new(
        store.clone(),
        notifier.clone(),
        "https://exams.example.com".to_string(),
    );

    let report = service
        .provision_batch(
            batch_spec("Batch A"),
            vec![
                entry("Alice Smith", "alice@example.com"),
                entry("Bob Stone", "bob@example.com"),
                entry("", "noname@example.com"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(report.batch_title, "Batch A");
    assert_eq!(report.provisioned.len(), 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.provisioned[0].user_id, "alices001");
    assert_eq!(report.provisioned[1].user_id, "bobsto001");

    // Candidates are bound to the batch and their stored hash matches the
    // delivered one-time password.
    let deliveries = notifier.deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 2);
    for delivery in deliveries.iter() {
        assert_eq!(delivery.batch_title, "Batch A");
        assert_eq!(delivery.exam_portal_url, "https://exams.example.com");
        let candidate = store.candidate_by_user_id(&delivery.user_id).await.unwrap();
        assert_eq!(candidate.batch_id, Some(report.batch_id));
        assert!(verify_password(&delivery.one_time_password, &candidate.password_hash).unwrap());
    }
}

#[tokio::test]
async fn colliding_names_get_distinct_logins() {
    let store = Arc::new(MemoryStore::new());
    let service = RosterService::new(
        store.clone(),
        Arc::new(RecordingNotifier::default()),
        "https://exams.example.com".to_string(),
    );

    let report = service
        .provision_batch(
            batch_spec("Batch A"),
            vec![
                entry("Alice Smith", "alice.s@example.com"),
                entry("Alice Stone", "alice.t@example.com"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(report.provisioned[0].user_id, "alices001");
    assert_eq!(report.provisioned[1].user_id, "alices002");
}

#[tokio::test]
async fn duplicate_batch_title_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let service = RosterService::new(
        store.clone(),
        Arc::new(RecordingNotifier::default()),
        "https://exams.example.com".to_string(),
    );

    service
        .provision_batch(batch_spec("Batch A"), vec![])
        .await
        .unwrap();
    let err = service
        .provision_batch(batch_spec("Batch A"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn failed_provisioning_leaves_no_batch_or_candidates() {
    let store = Arc::new(FailingStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = RosterService::new(
        store.clone(),
        notifier.clone(),
        "https://exams.example.com".to_string(),
    );

    let err = service
        .provision_batch(
            batch_spec("Batch A"),
            vec![
                entry("Alice Smith", "alice@example.com"),
                entry("Bob Stone", "bob@example.com"),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Internal(_)));

    // Nothing survives the failed request: no batch row, no partial roster,
    // and no credentials went out.
    assert!(store.inner.batch_by_title("Batch A").await.unwrap().is_none());
    assert!(!store.inner.user_id_taken("alices001").await.unwrap());
    assert!(!store.inner.user_id_taken("bobsto001").await.unwrap());
    assert!(notifier.deliveries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn import_persists_the_whole_set() {
    let store = Arc::new(MemoryStore::new());
    let service = QuestionService::new(store.clone());

    let imported = service
        .import_questions(vec![new_question("q1"), new_question("q2"), new_question("q3")])
        .await
        .unwrap();
    assert_eq!(imported, 3);
    assert_eq!(store.questions_by_ids(&[1, 2, 3]).await.unwrap().len(), 3);
}

#[tokio::test]
async fn failed_import_leaves_no_questions_behind() {
    let store = Arc::new(FailingStore::new());
    let service = QuestionService::new(store.clone());

    let err = service
        .import_questions(vec![
            new_question("q1"),
            new_question("q2"),
            new_question("q3"),
            new_question("q4"),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Internal(_)));
    assert!(store.inner.questions_by_ids(&[1, 2, 3, 4]).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_question_aborts_the_import_before_any_write() {
    let store = Arc::new(MemoryStore::new());
    let service = QuestionService::new(store.clone());

    let mut bad = new_question("q2");
    bad.answer = "Z".to_string();
    let err = service
        .import_questions(vec![new_question("q1"), bad])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
    assert!(store.questions_by_ids(&[1, 2]).await.unwrap().is_empty());
}
