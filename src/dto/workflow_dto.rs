use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::models::threshold_policy::{ScreeningDecision, ThresholdPolicy};
use crate::models::workflow::{TransitionResult, WorkflowLogEntry};
use crate::services::screening_service::Evaluation;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdvanceRequest {
    pub target_step: String,
    pub detail: Option<JsonValue>,
    #[serde(default)]
    pub override_transition: bool,
    #[validate(length(min = 1))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PauseRequest {
    #[validate(length(min = 1, message = "reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ResumeRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteActionRequest {
    pub resolution: String,
    pub next_step: Option<String>,
    pub detail: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteActionResponse {
    pub log_id: i64,
    pub candidate_id: Uuid,
    pub resolved: WorkflowLogEntry,
    pub transition: Option<TransitionResult>,
    pub current_step: Option<String>,
    pub status: String,
    pub requires_hr_action: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProcessInterviewRequest {
    pub score: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInterviewResponse {
    pub interview_id: Uuid,
    pub score: Decimal,
    pub pass_score: Decimal,
    #[serde(flatten)]
    pub transition: TransitionResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateCandidateResponse {
    #[serde(flatten)]
    pub transition: TransitionResult,
    pub evaluation: Evaluation,
    pub fallback_used: bool,
    pub fallback_reason: Option<String>,
    pub decision: ScreeningDecision,
    pub policy: ThresholdPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PendingActionsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatusSummary {
    pub total_candidates: i64,
    pub by_status: HashMap<String, i64>,
    pub by_automation_status: HashMap<String, i64>,
    pub pending_actions: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowHistoryResponse {
    pub candidate_id: Uuid,
    pub status: String,
    pub automation_status: String,
    pub current_step: Option<String>,
    pub entries: Vec<WorkflowLogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PolicyQuery {
    pub vacancy_id: Option<Uuid>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertPolicyRequest {
    pub vacancy_id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub department: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub auto_reject_threshold: i32,
    #[validate(range(min = 0, max = 100))]
    pub hr_review_threshold: i32,
    #[validate(range(min = 0, max = 100))]
    pub auto_shortlist_threshold: i32,
    pub interview_pass_score: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResponse {
    pub scope: String,
    pub policy: ThresholdPolicy,
}
