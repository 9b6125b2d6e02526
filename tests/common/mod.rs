#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use recruitment_workflow::{
    config::Config,
    middleware::auth::Claims,
    models::threshold_policy::ThresholdPolicy,
    services::screening_service::{ScreeningEvaluator, ScreeningRequest},
    AppState,
};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key";

/// Returns a score fixed at construction time.
pub struct FixedScore(pub i64);

#[async_trait]
impl ScreeningEvaluator for FixedScore {
    async fn evaluate_raw(&self, _request: &ScreeningRequest) -> anyhow::Result<JsonValue> {
        Ok(json!({
            "score": self.0,
            "analysis": "fixed test verdict",
            "strengths": ["rust", "postgres"],
            "weaknesses": [],
            "recommendation": "review"
        }))
    }
}

pub struct TestApp {
    pub app: Router,
    pub pool: PgPool,
}

fn test_config(database_url: String) -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url,
        jwt_secret: JWT_SECRET.into(),
        openai_api_key: None,
        openai_model: "gpt-4o".into(),
        ai_screening_timeout_secs: 5,
        integration_rps: 1_000,
        auto_screen_on_application: false,
        default_policy: ThresholdPolicy::default(),
    }
}

/// `None` when no database is configured; callers skip in that case.
pub async fn setup(evaluator: Option<Arc<dyn ScreeningEvaluator>>) -> Option<TestApp> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let config = test_config(database_url);
    let pool = recruitment_workflow::database::pool::create_pool(&config.database_url)
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    let state = AppState::with_evaluator(pool.clone(), &config, evaluator);
    let app = recruitment_workflow::routes::router(state, config.integration_rps);
    Some(TestApp { app, pool })
}

pub fn token(role: &str) -> String {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
    let jwt = encode(
        &Header::default(),
        &Claims {
            sub: format!("{}-user", role),
            exp,
            role: Some(role.into()),
        },
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("sign token");
    format!("Bearer {}", jwt)
}

impl TestApp {
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        auth: Option<&str>,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };
        (status, json)
    }

    pub async fn hr(&self, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
        let auth = token("hr");
        self.call(method, uri, Some(&auth), body).await
    }

    pub async fn seed_vacancy(&self, title: &str) -> Uuid {
        sqlx::query_scalar(
            r#"INSERT INTO vacancies (title, department, requirements, skills, salary_from, salary_to, currency)
               VALUES ($1, 'Engineering', 'Rust services', '["rust","sql"]'::jsonb, 800000, 1200000, 'INR')
               RETURNING id"#,
        )
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .expect("seed vacancy")
    }

    pub async fn seed_candidate(&self, vacancy_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO candidates (id, name, email, resume_text, skills, vacancy_id, expected_ctc)
               VALUES ($1, $2, $3, 'Five years of Rust', '["rust"]'::jsonb, $4, 1000000)"#,
        )
        .bind(id)
        .bind(format!("Candidate {}", &id.to_string()[..8]))
        .bind(format!("c_{}@example.com", id))
        .bind(vacancy_id)
        .execute(&self.pool)
        .await
        .expect("seed candidate");
        id
    }

    pub async fn seed_interview(&self, candidate_id: Uuid) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO interviews (candidate_id, interviewer, scheduled_at) VALUES ($1, 'Panel', NOW()) RETURNING id",
        )
        .bind(candidate_id)
        .fetch_one(&self.pool)
        .await
        .expect("seed interview")
    }

    pub async fn candidate_status(&self, candidate_id: Uuid) -> String {
        sqlx::query_scalar("SELECT status FROM candidates WHERE id = $1")
            .bind(candidate_id)
            .fetch_one(&self.pool)
            .await
            .expect("candidate status")
    }

    pub async fn candidate_version(&self, candidate_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT version FROM candidates WHERE id = $1")
            .bind(candidate_id)
            .fetch_one(&self.pool)
            .await
            .expect("candidate version")
    }

    pub async fn history(&self, candidate_id: Uuid) -> Vec<JsonValue> {
        let (status, body) = self
            .hr("GET", &format!("/api/workflow/candidates/{}/workflow", candidate_id), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["entries"].as_array().cloned().unwrap_or_default()
    }
}
