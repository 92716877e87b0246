use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

pub fn create_token(subject: &str, role: &str, valid_hours: i64) -> Result<String> {
    let config = crate::config::get_config();
    let exp = (Utc::now() + Duration::hours(valid_hours)).timestamp() as usize;
    let claims = Claims {
        sub: subject.to_string(),
        exp,
        role: Some(role.to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Token issuance failed: {}", e)))
}

fn decode_bearer(req: &Request) -> std::result::Result<Claims, Response> {
    let unauthorized = |code: &str| {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
    };

    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims),
        Err(_) => Err(unauthorized("invalid_token")),
    }
}

pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    match decode_bearer(&req) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

pub async fn require_admin(mut req: Request, next: Next) -> Response {
    match decode_bearer(&req) {
        Ok(claims) => {
            let role = claims.role.clone().unwrap_or_default();
            if !role.eq_ignore_ascii_case("admin") {
                return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"}))).into_response();
            }
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}
