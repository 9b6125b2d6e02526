use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::workflow::Actor;
use crate::AppState;

const HR_ROLES: [&str; 2] = ["admin", "hr"];
const ADMIN_ROLES: [&str; 1] = ["admin"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    /// Every authenticated caller acts as an HR actor identified by `sub`.
    pub fn actor(&self) -> Actor {
        Actor::hr(Some(self.sub.clone()))
    }

    fn has_role(&self, allowed: &[&str]) -> bool {
        let role = self.role.as_deref().unwrap_or_default();
        allowed.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

fn decode_bearer(req: &Request, secret: &str) -> std::result::Result<Claims, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"));
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            reject(StatusCode::UNAUTHORIZED, "invalid_token")
        })
}

async fn require_roles(state: &AppState, mut req: Request, next: Next, allowed: &[&str]) -> Response {
    let claims = match decode_bearer(&req, &state.jwt_secret) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    if !claims.has_role(allowed) {
        tracing::warn!(sub = %claims.sub, role = ?claims.role, path = %req.uri().path(), "Forbidden");
        return reject(StatusCode::FORBIDDEN, "forbidden");
    }
    req.extensions_mut().insert(claims);
    next.run(req).await
}

pub async fn require_hr_or_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(&state, req, next, &HR_ROLES).await
}

/// Threshold policy writes are admin-only.
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(&state, req, next, &ADMIN_ROLES).await
}
