use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::ctc_discussion::{max_amount, CtcDiscussion, SalaryBreakdown};
use crate::models::workflow::TransitionResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CtcProposal {
    #[validate(length(min = 1))]
    pub designation: Option<String>,
    pub expected_ctc: Option<Decimal>,
    pub offered_ctc: Option<Decimal>,
    pub fixed_pay: Option<Decimal>,
    pub variable_pay: Option<Decimal>,
    pub joining_bonus: Option<Decimal>,
    pub joining_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl CtcProposal {
    /// Monetary fields must be non-negative and fit the money columns.
    pub fn check_amounts(&self) -> std::result::Result<(), String> {
        let fields = [
            ("expected_ctc", self.expected_ctc),
            ("offered_ctc", self.offered_ctc),
            ("fixed_pay", self.fixed_pay),
            ("variable_pay", self.variable_pay),
            ("joining_bonus", self.joining_bonus),
        ];
        for (name, value) in fields {
            if value.map(|v| v < Decimal::ZERO).unwrap_or(false) {
                return Err(format!("{} must not be negative", name));
            }
            if value.map(|v| v > max_amount()).unwrap_or(false) {
                return Err(format!("{} exceeds {}", name, max_amount()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartCtcRequest {
    pub candidate_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub proposal: CtcProposal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartCtcResponse {
    pub discussion: CtcDiscussion,
    pub transition: TransitionResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateBreakdownRequest {
    pub annual_ctc: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateBreakdownResponse {
    pub discussion: CtcDiscussion,
    pub breakdown: SalaryBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeCtcRequest {
    pub candidate_accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferLetterPayload {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub designation: Option<String>,
    pub offered_ctc: Decimal,
    pub fixed_pay: Option<Decimal>,
    pub variable_pay: Option<Decimal>,
    pub joining_bonus: Option<Decimal>,
    pub joining_date: NaiveDate,
    pub salary_breakdown: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeCtcResponse {
    pub discussion: CtcDiscussion,
    pub transitions: Vec<TransitionResult>,
    pub offer_letter: Option<OfferLetterPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CandidateResponseRequest {
    #[validate(length(min = 1, message = "response is required"))]
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CancelCtcRequest {
    #[validate(length(min = 1, message = "reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtcValidation {
    pub is_valid: bool,
    pub missing_fields: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: Decimal,
    pub max: Decimal,
    pub median: Option<Decimal>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationGap {
    pub direction: String,
    pub amount: Decimal,
    pub percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub designation: Option<String>,
    pub currency: Option<String>,
    pub offered_ctc: Option<Decimal>,
    pub expected_ctc: Option<Decimal>,
    pub vacancy_range: Option<SalaryRange>,
    pub historical_range: Option<SalaryRange>,
    pub offer_band: Option<SalaryRange>,
    pub reference: Option<SalaryRange>,
    pub offer_position: Option<String>,
    pub within_range: Option<bool>,
    pub expectation_gap: Option<ExpectationGap>,
    pub analysis: Vec<String>,
}
