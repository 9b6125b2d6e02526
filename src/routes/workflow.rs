use crate::{
    dto::workflow_dto::{
        AdvanceRequest, CompleteActionRequest, PauseRequest, PendingActionsQuery, PolicyQuery,
        PolicyResponse, ProcessInterviewRequest, ResumeRequest, UpsertPolicyRequest,
    },
    error::Result,
    middleware::auth::Claims,
    models::workflow::Actor,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

#[axum::debug_handler]
pub async fn start_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(candidate_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let result = state
        .workflow_service
        .start_application(candidate_id, claims.actor())
        .await?;

    if state.auto_screen_on_application {
        let screening = state.screening_service.clone();
        tokio::spawn(async move {
            if let Err(e) = screening.evaluate_candidate(candidate_id, Actor::system()).await {
                tracing::error!(error = ?e, %candidate_id, "Automatic screening after application failed");
            }
        });
    }

    Ok((StatusCode::CREATED, Json(result)))
}

#[axum::debug_handler]
pub async fn advance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(candidate_id): Path<Uuid>,
    Json(payload): Json<AdvanceRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let result = state
        .workflow_service
        .advance(candidate_id, payload, claims.actor())
        .await?;
    Ok(Json(result))
}

pub async fn pause(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(candidate_id): Path<Uuid>,
    Json(payload): Json<PauseRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let result = state
        .workflow_service
        .pause(candidate_id, payload.reason, claims.actor())
        .await?;
    Ok(Json(result))
}

pub async fn resume(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(candidate_id): Path<Uuid>,
    payload: Option<Json<ResumeRequest>>,
) -> Result<impl IntoResponse> {
    let reason = payload
        .and_then(|Json(p)| p.reason)
        .filter(|r| !r.trim().is_empty());
    let result = state
        .workflow_service
        .resume(candidate_id, reason, claims.actor())
        .await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn evaluate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(candidate_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let result = state
        .screening_service
        .evaluate_candidate(candidate_id, claims.actor())
        .await?;
    Ok(Json(result))
}

pub async fn history(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let history = state.workflow_service.history(candidate_id).await?;
    Ok(Json(history))
}

#[axum::debug_handler]
pub async fn process_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(interview_id): Path<Uuid>,
    Json(payload): Json<ProcessInterviewRequest>,
) -> Result<impl IntoResponse> {
    let result = state
        .interview_service
        .process_interview(interview_id, payload, claims.actor())
        .await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn complete_action(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(log_id): Path<i64>,
    Json(payload): Json<CompleteActionRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let result = state
        .workflow_service
        .complete_action(log_id, payload, claims.actor())
        .await?;
    Ok(Json(result))
}

pub async fn pending_actions(
    State(state): State<AppState>,
    Query(query): Query<PendingActionsQuery>,
) -> Result<impl IntoResponse> {
    let list = state
        .workflow_service
        .pending_actions(query.page.unwrap_or(1), query.per_page.unwrap_or(20))
        .await?;
    Ok(Json(list))
}

pub async fn status_summary(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let summary = state.workflow_service.status_summary().await?;
    Ok(Json(summary))
}

pub async fn get_policy(
    State(state): State<AppState>,
    Query(query): Query<PolicyQuery>,
) -> Result<impl IntoResponse> {
    let (scope, policy) = state
        .policy_service
        .resolve_with_scope(query.vacancy_id, query.department.as_deref())
        .await?;
    Ok(Json(PolicyResponse { scope, policy }))
}

pub async fn list_policies(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let policies = state.policy_service.list().await?;
    Ok(Json(policies))
}

#[axum::debug_handler]
pub async fn upsert_policy(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpsertPolicyRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let record = state.policy_service.upsert(payload, claims.actor()).await?;
    Ok(Json(record))
}
