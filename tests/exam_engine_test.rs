use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use exam_portal_backend::error::Error;
use exam_portal_backend::models::batch::{Batch, NewBatch};
use exam_portal_backend::models::candidate::{Candidate, NewCandidate};
use exam_portal_backend::models::question::{Difficulty, NewQuestion};
use exam_portal_backend::services::allocation_service::{AllocationService, Distribution};
use exam_portal_backend::services::answer_service::AnswerService;
use exam_portal_backend::services::result_service::ResultService;
use exam_portal_backend::services::session_service::{
    SessionService, EXCEEDED_TIME, WITHIN_TIME,
};
use exam_portal_backend::store::memory::MemoryStore;
use exam_portal_backend::store::ExamStore;
use exam_portal_backend::utils::clock::{Clock, ManualClock};

struct Harness {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    allocation: AllocationService,
    sessions: SessionService,
    answers: AnswerService,
    results: ResultService,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));

        let dyn_store: Arc<dyn ExamStore> = store.clone();
        let dyn_clock: Arc<dyn exam_portal_backend::utils::clock::Clock> = clock.clone();
        Self {
            allocation: AllocationService::new(dyn_store.clone(), dyn_clock.clone()),
            sessions: SessionService::new(dyn_store.clone(), dyn_clock.clone()),
            answers: AnswerService::new(dyn_store.clone(), dyn_clock),
            results: ResultService::new(dyn_store),
            store,
            clock,
        }
    }

    async fn seed_batch(&self, title: &str, duration_minutes: i32) -> Batch {
        self.store
            .insert_batch(NewBatch {
                title: title.to_string(),
                exam_duration_minutes: duration_minutes,
                start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 6, 7).unwrap(),
                total_candidates: 1,
                created_by: None,
            })
            .await
            .unwrap()
    }

    async fn seed_candidate(&self, user_id: &str, batch_id: Option<Uuid>) -> Candidate {
        self.store
            .insert_candidate(NewCandidate {
                name: format!("Candidate {}", user_id),
                user_id: user_id.to_string(),
                password_hash: "hash".to_string(),
                email: format!("{}@example.com", user_id),
                batch_id,
            })
            .await
            .unwrap()
    }

    /// Seeds `count` questions per tier; every question's correct label is "A".
    async fn seed_question_bank(&self, count: usize) {
        let mut questions = Vec::new();
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            for i in 0..count {
                questions.push(NewQuestion {
                    question: format!("{} question {}", difficulty, i),
                    options: json!({"A": "right", "B": "wrong"}),
                    answer: "A".to_string(),
                    topic: "general".to_string(),
                    difficulty,
                    created_by: None,
                });
            }
        }
        self.store.insert_questions(questions).await.unwrap();
    }
}

#[tokio::test]
async fn allocation_fills_each_difficulty_tier() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 60).await;
    let candidate = h.seed_candidate("alice001", Some(batch.id)).await;
    h.seed_question_bank(10).await;

    let assignments = h
        .allocation
        .allocate(candidate.id, batch.id, Distribution::default_for(10))
        .await
        .unwrap();
    assert_eq!(assignments.len(), 10);

    let ids: Vec<i32> = assignments.iter().map(|a| a.question_id).collect();
    let distinct: HashSet<i32> = ids.iter().copied().collect();
    assert_eq!(distinct.len(), 10);

    let questions = h.store.questions_by_ids(&ids).await.unwrap();
    let count_of = |d: Difficulty| questions.iter().filter(|q| q.difficulty == d).count();
    assert_eq!(count_of(Difficulty::Easy), 4);
    assert_eq!(count_of(Difficulty::Medium), 3);
    assert_eq!(count_of(Difficulty::Hard), 3);
}

#[tokio::test]
async fn allocation_is_all_or_nothing_when_a_tier_is_short() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 60).await;
    let candidate = h.seed_candidate("alice001", Some(batch.id)).await;
    // 2 per tier: the Easy tier (needs 4 of 10) cannot be satisfied.
    h.seed_question_bank(2).await;

    let err = h
        .allocation
        .allocate(candidate.id, batch.id, Distribution::default_for(10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientPool {
            difficulty: Difficulty::Easy,
            requested: 4,
            available: 2,
        }
    ));

    let assignments = h.store.assignments_for_candidate(candidate.id).await.unwrap();
    assert!(assignments.is_empty());
}

#[tokio::test]
async fn reallocation_is_rejected() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 60).await;
    let candidate = h.seed_candidate("alice001", Some(batch.id)).await;
    h.seed_question_bank(10).await;

    h.allocation
        .allocate(candidate.id, batch.id, Distribution::default_for(10))
        .await
        .unwrap();
    let err = h
        .allocation
        .allocate(candidate.id, batch.id, Distribution::default_for(10))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyAssigned));

    let assignments = h.store.assignments_for_candidate(candidate.id).await.unwrap();
    assert_eq!(assignments.len(), 10);
}

#[tokio::test]
async fn allocated_questions_are_claimed_by_their_batch() {
    let h = Harness::new();
    let batch_a = h.seed_batch("Batch A", 60).await;
    let batch_b = h.seed_batch("Batch B", 60).await;
    let candidate = h.seed_candidate("alice001", Some(batch_a.id)).await;
    h.seed_question_bank(4).await;

    h.allocation
        .allocate(candidate.id, batch_a.id, Distribution::default_for(10))
        .await
        .unwrap();

    // 4/3/3 of the 4-per-tier bank got claimed by batch A; batch B only
    // sees what is left unclaimed, batch A still sees its own claims.
    let pool_len = |batch_id, difficulty| {
        let store = h.store.clone();
        async move { store.eligible_questions(batch_id, difficulty).await.unwrap().len() }
    };
    assert_eq!(pool_len(batch_b.id, Difficulty::Easy).await, 0);
    assert_eq!(pool_len(batch_b.id, Difficulty::Medium).await, 1);
    assert_eq!(pool_len(batch_b.id, Difficulty::Hard).await, 1);
    assert_eq!(pool_len(batch_a.id, Difficulty::Easy).await, 4);
    assert_eq!(pool_len(batch_a.id, Difficulty::Medium).await, 4);
    assert_eq!(pool_len(batch_a.id, Difficulty::Hard).await, 4);
}

#[tokio::test]
async fn assignment_rejects_questions_claimed_by_another_batch() {
    let h = Harness::new();
    let batch_a = h.seed_batch("Batch A", 60).await;
    let batch_b = h.seed_batch("Batch B", 60).await;
    let alice = h.seed_candidate("alice001", Some(batch_a.id)).await;
    let bob = h.seed_candidate("bob001", Some(batch_b.id)).await;
    // One question per tier: ids 1 (Easy), 2 (Medium), 3 (Hard).
    h.seed_question_bank(1).await;

    h.store
        .create_assignments(alice.id, batch_a.id, &[1], h.clock.now())
        .await
        .unwrap();

    // Question 1 now belongs to batch A; assigning it into batch B must
    // fail without persisting anything, including question 2's binding.
    let err = h
        .store
        .create_assignments(bob.id, batch_b.id, &[2, 1], h.clock.now())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::QuestionUnavailable { question_id: 1 }));

    let assignments = h.store.assignments_for_candidate(bob.id).await.unwrap();
    assert!(assignments.is_empty());
    let medium_pool = h
        .store
        .eligible_questions(batch_b.id, Difficulty::Medium)
        .await
        .unwrap();
    assert_eq!(medium_pool.len(), 1);
}

#[tokio::test]
async fn batch_allocation_collects_per_candidate_failures() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 60).await;
    let alice = h.seed_candidate("alice001", Some(batch.id)).await;
    let _bob = h.seed_candidate("bob001", Some(batch.id)).await;
    h.seed_question_bank(10).await;

    // Alice already has a paper; the batch run reports her and continues.
    h.allocation
        .allocate(alice.id, batch.id, Distribution::default_for(10))
        .await
        .unwrap();
    let report = h.allocation.allocate_batch(batch.id, 10).await.unwrap();
    assert_eq!(report.allocated, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].candidate_id, alice.id);
}

#[tokio::test]
async fn starting_twice_resumes_the_same_session() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 60).await;
    let candidate = h.seed_candidate("alice001", Some(batch.id)).await;

    let first = h.sessions.start(candidate.id).await.unwrap();
    assert!(!first.resumed());

    h.clock.advance(Duration::minutes(5));
    let second = h.sessions.start(candidate.id).await.unwrap();
    assert!(second.resumed());
    assert_eq!(second.session().id, first.session().id);
    assert_eq!(second.session().started_at, first.session().started_at);
}

#[tokio::test]
async fn start_requires_a_batch_binding() {
    let h = Harness::new();
    let candidate = h.seed_candidate("alice001", None).await;

    let err = h.sessions.start(candidate.id).await.unwrap_err();
    assert!(matches!(err, Error::NotAssignedToBatch));
}

#[tokio::test]
async fn submitted_exam_is_terminal() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 60).await;
    let candidate = h.seed_candidate("alice001", Some(batch.id)).await;

    h.sessions.start(candidate.id).await.unwrap();
    h.clock.advance(Duration::minutes(10));
    h.sessions.submit(candidate.id).await.unwrap();

    let err = h.sessions.start(candidate.id).await.unwrap_err();
    assert!(matches!(err, Error::AlreadySubmitted));
    let err = h.sessions.submit(candidate.id).await.unwrap_err();
    assert!(matches!(err, Error::NoActiveSession));
}

#[tokio::test]
async fn answers_are_limited_to_the_assigned_paper() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 60).await;
    let candidate = h.seed_candidate("alice001", Some(batch.id)).await;
    h.seed_question_bank(4).await;

    let assignments = h
        .allocation
        .allocate(candidate.id, batch.id, Distribution::default_for(10))
        .await
        .unwrap();
    let assigned: HashSet<i32> = assignments.iter().map(|a| a.question_id).collect();
    let unassigned = (1..=12).find(|id| !assigned.contains(id)).unwrap();

    let err = h
        .answers
        .save_answer(candidate.id, unassigned, "A")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotAssigned));
}

#[tokio::test]
async fn resaving_overwrites_the_previous_choice() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 60).await;
    let candidate = h.seed_candidate("alice001", Some(batch.id)).await;
    h.seed_question_bank(4).await;

    let assignments = h
        .allocation
        .allocate(candidate.id, batch.id, Distribution::default_for(10))
        .await
        .unwrap();
    let question_id = assignments[0].question_id;

    h.answers
        .save_answer(candidate.id, question_id, "A")
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(1));
    h.answers
        .save_answer(candidate.id, question_id, "B")
        .await
        .unwrap();

    let answers = h.answers.answers(candidate.id).await.unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].selected_option, "B");
    assert!(answers[0].is_saved);
}

#[tokio::test]
async fn saving_after_submission_is_rejected() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 60).await;
    let candidate = h.seed_candidate("alice001", Some(batch.id)).await;
    h.seed_question_bank(4).await;

    let assignments = h
        .allocation
        .allocate(candidate.id, batch.id, Distribution::default_for(10))
        .await
        .unwrap();
    let question_id = assignments[0].question_id;

    h.sessions.start(candidate.id).await.unwrap();
    h.sessions.submit(candidate.id).await.unwrap();

    let err = h
        .answers
        .save_answer(candidate.id, question_id, "A")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadySubmitted));
}

#[tokio::test]
async fn submit_reports_elapsed_time_and_unanswered_questions() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 60).await;
    let candidate = h.seed_candidate("alice001", Some(batch.id)).await;
    h.seed_question_bank(4).await;

    let assignments = h
        .allocation
        .allocate(candidate.id, batch.id, Distribution::default_for(10))
        .await
        .unwrap();
    let mut assigned: Vec<i32> = assignments.iter().map(|a| a.question_id).collect();
    assigned.sort_unstable();

    h.sessions.start(candidate.id).await.unwrap();
    for &question_id in &assigned[..6] {
        h.answers
            .save_answer(candidate.id, question_id, "A")
            .await
            .unwrap();
    }

    h.clock.advance(Duration::minutes(61));
    let summary = h.sessions.submit(candidate.id).await.unwrap();
    assert_eq!(summary.exam_duration_used_minutes, 61.0);
    assert_eq!(summary.duration_status, EXCEEDED_TIME);
    assert_eq!(summary.unanswered_question_ids, assigned[6..].to_vec());
}

#[tokio::test]
async fn submit_within_the_allowed_duration() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 90).await;
    let candidate = h.seed_candidate("alice001", Some(batch.id)).await;

    h.sessions.start(candidate.id).await.unwrap();
    h.clock.advance(Duration::minutes(45));
    let summary = h.sessions.submit(candidate.id).await.unwrap();
    assert_eq!(summary.exam_duration_used_minutes, 45.0);
    assert_eq!(summary.duration_status, WITHIN_TIME);
}

#[tokio::test]
async fn batch_results_reconcile_scores_and_status() {
    let h = Harness::new();
    let batch = h.seed_batch("Batch A", 60).await;
    let alice = h.seed_candidate("alice001", Some(batch.id)).await;
    let bob = h.seed_candidate("bob001", Some(batch.id)).await;
    h.seed_question_bank(10).await;

    let assignments = h
        .allocation
        .allocate(alice.id, batch.id, Distribution::default_for(10))
        .await
        .unwrap();
    h.allocation
        .allocate(bob.id, batch.id, Distribution::default_for(10))
        .await
        .unwrap();

    // Alice: one correct, one wrong, then submits. Bob never starts.
    h.sessions.start(alice.id).await.unwrap();
    h.answers
        .save_answer(alice.id, assignments[0].question_id, "A")
        .await
        .unwrap();
    h.answers
        .save_answer(alice.id, assignments[1].question_id, "B")
        .await
        .unwrap();
    h.sessions.submit(alice.id).await.unwrap();

    let results = h.results.batch_results(batch.id).await.unwrap();
    assert_eq!(results.batch_title, "Batch A");
    assert_eq!(results.results.len(), 2);

    let alice_row = results
        .results
        .iter()
        .find(|r| r.user_id == "alice001")
        .unwrap();
    assert_eq!(alice_row.score, 1);
    assert_eq!(alice_row.attempted, 2);
    assert_eq!(alice_row.exam_status, "Submitted");

    let bob_row = results
        .results
        .iter()
        .find(|r| r.user_id == "bob001")
        .unwrap();
    assert_eq!(bob_row.score, 0);
    assert_eq!(bob_row.attempted, 0);
    assert_eq!(bob_row.exam_status, "Not Submitted");
}
