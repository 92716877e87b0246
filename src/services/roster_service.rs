use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::batch::{Batch, NewBatch};
use crate::models::candidate::NewCandidate;
use crate::services::notification_service::{CredentialDelivery, CredentialNotifier};
use crate::store::ExamStore;
use crate::utils::credentials::{
    generate_one_time_password, hash_password, numbered_user_id, user_id_base,
    ONE_TIME_PASSWORD_LEN,
};

#[derive(Debug, Clone)]
pub struct BatchSpec {
    pub title: String,
    pub exam_duration_minutes: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedCandidate {
    pub candidate_id: Uuid,
    pub name: String,
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchProvisionReport {
    pub batch_id: Uuid,
    pub batch_title: String,
    pub provisioned: Vec<ProvisionedCandidate>,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct RosterService {
    store: Arc<dyn ExamStore>,
    notifier: Arc<dyn CredentialNotifier>,
    exam_portal_url: String,
}

impl RosterService {
    pub fn new(
        store: Arc<dyn ExamStore>,
        notifier: Arc<dyn CredentialNotifier>,
        exam_portal_url: String,
    ) -> Self {
        Self {
            store,
            notifier,
            exam_portal_url,
        }
    }

    /// Creates a batch and provisions its candidate roster: each entry gets a
    /// generated login, a one-time password (stored hashed) and a credential
    /// delivery. Entries with missing fields are skipped, not fatal. The
    /// batch and the whole roster are persisted in one transaction, so a
    /// failure mid-roster leaves nothing behind; credential delivery happens
    /// after the commit and never aborts provisioning.
    pub async fn provision_batch(
        &self,
        spec: BatchSpec,
        roster: Vec<RosterEntry>,
    ) -> Result<BatchProvisionReport> {
        if self.store.batch_by_title(&spec.title).await?.is_some() {
            return Err(Error::BadRequest(format!(
                "Batch '{}' already exists",
                spec.title
            )));
        }

        // Generate every credential before touching the store.
        let mut skipped = 0;
        let mut claimed_ids: HashSet<String> = HashSet::new();
        let mut new_candidates = Vec::new();
        let mut passwords = Vec::new();
        for entry in roster {
            if entry.name.trim().is_empty() || entry.email.trim().is_empty() {
                tracing::warn!("skipping roster entry with missing name or email");
                skipped += 1;
                continue;
            }

            let user_id = self.next_user_id(&entry.name, &mut claimed_ids).await?;
            let password = generate_one_time_password(ONE_TIME_PASSWORD_LEN);
            let password_hash = hash_password(&password)
                .map_err(|err| Error::Internal(format!("Password hashing failed: {}", err)))?;

            new_candidates.push(NewCandidate {
                name: entry.name,
                user_id,
                password_hash,
                email: entry.email,
                batch_id: None,
            });
            passwords.push(password);
        }

        let total_candidates = new_candidates.len() as i32;
        let (batch, candidates) = self
            .store
            .create_batch_with_candidates(
                NewBatch {
                    title: spec.title,
                    exam_duration_minutes: spec.exam_duration_minutes,
                    start_date: spec.start_date,
                    end_date: spec.end_date,
                    total_candidates,
                    created_by: spec.created_by,
                },
                new_candidates,
            )
            .await?;

        let mut provisioned = Vec::with_capacity(candidates.len());
        for (candidate, password) in candidates.into_iter().zip(passwords) {
            self.deliver(&batch, &candidate.name, &candidate.email, &candidate.user_id, &password)
                .await;

            provisioned.push(ProvisionedCandidate {
                candidate_id: candidate.id,
                name: candidate.name,
                user_id: candidate.user_id,
                email: candidate.email,
            });
        }

        tracing::info!(
            batch = %batch.title,
            provisioned = provisioned.len(),
            skipped,
            "batch provisioned"
        );
        Ok(BatchProvisionReport {
            batch_id: batch.id,
            batch_title: batch.title,
            provisioned,
            skipped,
        })
    }

    /// First free "{base}{:03}" login, checking both this roster's claims and
    /// the store.
    async fn next_user_id(
        &self,
        name: &str,
        claimed: &mut HashSet<String>,
    ) -> Result<String> {
        let base = user_id_base(name);
        for suffix in 1..=9999 {
            let candidate_id = numbered_user_id(&base, suffix);
            if claimed.contains(&candidate_id) {
                continue;
            }
            if !self.store.user_id_taken(&candidate_id).await? {
                claimed.insert(candidate_id.clone());
                return Ok(candidate_id);
            }
        }
        Err(Error::Internal(format!(
            "Could not allocate a login id for '{}'",
            base
        )))
    }

    // Delivery failure is logged, never aborts provisioning: credentials can
    // be re-sent, a half-created batch cannot.
    async fn deliver(&self, batch: &Batch, name: &str, email: &str, user_id: &str, password: &str) {
        let delivery = CredentialDelivery {
            candidate_name: name.to_string(),
            email: email.to_string(),
            user_id: user_id.to_string(),
            one_time_password: password.to_string(),
            batch_title: batch.title.clone(),
            exam_portal_url: self.exam_portal_url.clone(),
        };
        if let Err(err) = self.notifier.deliver_credentials(&delivery).await {
            tracing::warn!(candidate = %user_id, error = %err, "credential delivery failed");
        }
    }
}
