pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use sqlx::PgPool;

use crate::services::{
    admin_service::AdminService, allocation_service::AllocationService,
    answer_service::AnswerService, notification_service::WebhookNotifier,
    question_service::QuestionService, result_service::ResultService,
    roster_service::RosterService, session_service::SessionService,
};
use crate::store::{pg::PgStore, ExamStore};
use crate::utils::clock::{Clock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub store: Arc<dyn ExamStore>,
    pub admin_service: AdminService,
    pub allocation_service: AllocationService,
    pub answer_service: AnswerService,
    pub question_service: QuestionService,
    pub result_service: ResultService,
    pub roster_service: RosterService,
    pub session_service: SessionService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let store: Arc<dyn ExamStore> = Arc::new(PgStore::new(pool.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let notifier = Arc::new(WebhookNotifier::new(config.credentials_webhook_url.clone()));

        Self {
            pool: pool.clone(),
            store: store.clone(),
            admin_service: AdminService::new(pool),
            allocation_service: AllocationService::new(store.clone(), clock.clone()),
            answer_service: AnswerService::new(store.clone(), clock.clone()),
            question_service: QuestionService::new(store.clone()),
            result_service: ResultService::new(store.clone()),
            roster_service: RosterService::new(store.clone(), notifier, config.exam_portal_url.clone()),
            session_service: SessionService::new(store, clock),
        }
    }
}
