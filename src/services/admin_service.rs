use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::middleware::auth::create_token;
use crate::models::admin::Admin;
use crate::utils::credentials::{hash_password, verify_password};

const ADMIN_TOKEN_HOURS: i64 = 24;

#[derive(Clone)]
pub struct AdminService {
    pool: PgPool,
}

impl AdminService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Admin> {
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM admins WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        if existing.is_some() {
            return Err(Error::BadRequest(
                "An admin with this email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(password)
            .map_err(|err| Error::Internal(format!("Password hashing failed: {}", err)))?;

        let admin = sqlx::query_as::<_, Admin>(
            r#"
            INSERT INTO admins (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, is_active, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(admin = %admin.email, "admin registered");
        Ok(admin)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(Admin, String)> {
        let admin = sqlx::query_as::<_, Admin>(
            r#"
            SELECT id, name, email, password_hash, is_active, created_at, updated_at
            FROM admins
            WHERE email = $1 AND is_active = TRUE
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::Unauthorized("Invalid email or password".to_string()))?;

        let verified = verify_password(password, &admin.password_hash)
            .map_err(|err| Error::Internal(format!("Password verification failed: {}", err)))?;
        if !verified {
            return Err(Error::Unauthorized("Invalid email or password".to_string()));
        }

        let token = create_token(&admin.id.to_string(), "admin", ADMIN_TOKEN_HOURS)?;
        Ok((admin, token))
    }
}
