use crate::{
    dto::ctc_dto::{
        CancelCtcRequest, CandidateResponseRequest, CtcProposal, FinalizeCtcRequest,
        GenerateBreakdownRequest, StartCtcRequest,
    },
    error::Result,
    middleware::auth::Claims,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

#[axum::debug_handler]
pub async fn start(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartCtcRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let result = state
        .ctc_service
        .start(payload.candidate_id, payload.proposal, claims.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let discussion = state.ctc_service.get(id).await?;
    Ok(Json(discussion))
}

pub async fn get_for_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let discussion = state.ctc_service.get_for_candidate(candidate_id).await?;
    Ok(Json(discussion))
}

#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CtcProposal>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let discussion = state.ctc_service.update(id, payload, claims.actor()).await?;
    Ok(Json(discussion))
}

pub async fn compare_benchmark(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let report = state.ctc_service.compare_benchmark(id, claims.actor()).await?;
    Ok(Json(report))
}

pub async fn generate_breakdown(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<GenerateBreakdownRequest>>,
) -> Result<impl IntoResponse> {
    let annual_ctc = payload.and_then(|Json(p)| p.annual_ctc);
    let result = state
        .ctc_service
        .generate_breakdown(id, annual_ctc, claims.actor())
        .await?;
    Ok(Json(result))
}

pub async fn validate(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let report = state.ctc_service.validate(id).await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn finalize(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FinalizeCtcRequest>,
) -> Result<impl IntoResponse> {
    let result = state
        .ctc_service
        .finalize(id, payload.candidate_accepted, claims.actor())
        .await?;
    Ok(Json(result))
}

pub async fn record_response(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CandidateResponseRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let discussion = state
        .ctc_service
        .record_response(id, payload.response, claims.actor())
        .await?;
    Ok(Json(discussion))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelCtcRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let discussion = state.ctc_service.cancel(id, payload.reason, claims.actor()).await?;
    Ok(Json(discussion))
}
