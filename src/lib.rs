pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    candidate_service::CandidateService,
    ctc_service::CtcService,
    interview_service::InterviewService,
    policy_service::PolicyService,
    screening_service::{OpenAiEvaluator, ScreeningAdapter, ScreeningEvaluator, ScreeningService},
    workflow_service::WorkflowService,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt_secret: Arc<str>,
    pub auto_screen_on_application: bool,
    pub workflow_service: WorkflowService,
    pub screening_service: ScreeningService,
    pub interview_service: InterviewService,
    pub ctc_service: CtcService,
    pub policy_service: PolicyService,
    pub candidate_service: CandidateService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let evaluator = config.openai_api_key.clone().map(|key| {
            Arc::new(OpenAiEvaluator::new(key, config.openai_model.clone(), http_client))
                as Arc<dyn ScreeningEvaluator>
        });
        if evaluator.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, screening will use the neutral fallback");
        }
        Ok(Self::with_evaluator(pool, config, evaluator))
    }

    /// Builds the state around an explicit scoring capability (or none).
    pub fn with_evaluator(
        pool: PgPool,
        config: &Config,
        evaluator: Option<Arc<dyn ScreeningEvaluator>>,
    ) -> Self {
        let adapter = ScreeningAdapter::new(
            evaluator,
            Duration::from_secs(config.ai_screening_timeout_secs),
        );
        let policy_service = PolicyService::new(pool.clone(), config.default_policy.clone());
        let workflow_service = WorkflowService::new(pool.clone());
        let screening_service = ScreeningService::new(
            pool.clone(),
            adapter,
            policy_service.clone(),
            workflow_service.clone(),
        );
        let interview_service =
            InterviewService::new(pool.clone(), policy_service.clone(), workflow_service.clone());
        let ctc_service = CtcService::new(pool.clone());
        let candidate_service = CandidateService::new(pool.clone());

        Self {
            pool,
            jwt_secret: Arc::from(config.jwt_secret.as_str()),
            auto_screen_on_application: config.auto_screen_on_application,
            workflow_service,
            screening_service,
            interview_service,
            ctc_service,
            policy_service,
            candidate_service,
        }
    }
}
