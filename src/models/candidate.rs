use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::workflow::AutomationStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume_text: Option<String>,
    pub skills: Option<JsonValue>,
    pub vacancy_id: Option<Uuid>,
    pub expected_ctc: Option<Decimal>,
    pub status: String,
    pub automation_status: String,
    pub screening_score: Option<i32>,
    pub screening_analysis: Option<JsonValue>,
    pub final_interview_score: Option<Decimal>,
    pub auto_rejected_at: Option<DateTime<Utc>>,
    pub auto_shortlisted_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    pub fn is_paused(&self) -> bool {
        self.automation_status == AutomationStatus::Paused.as_str()
    }

    pub fn skill_list(&self) -> Vec<String> {
        self.skills
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|e| e.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub const CANDIDATE_COLUMNS: &str = "id, name, email, phone, resume_text, skills, vacancy_id, expected_ctc, \
    status, automation_status, screening_score, screening_analysis, final_interview_score, \
    auto_rejected_at, auto_shortlisted_at, rejection_reason, version, created_at, updated_at";
