use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CtcStatus {
    Pending,
    InProgress,
    Finalized,
    Cancelled,
}

impl CtcStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CtcStatus::Pending => "pending",
            CtcStatus::InProgress => "in_progress",
            CtcStatus::Finalized => "finalized",
            CtcStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for CtcStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CtcStatus::Pending),
            "in_progress" => Ok(CtcStatus::InProgress),
            "finalized" => Ok(CtcStatus::Finalized),
            "cancelled" => Ok(CtcStatus::Cancelled),
            other => Err(Error::Internal(format!("Unknown CTC status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CtcDiscussion {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub designation: Option<String>,
    pub expected_ctc: Option<Decimal>,
    pub offered_ctc: Option<Decimal>,
    pub fixed_pay: Option<Decimal>,
    pub variable_pay: Option<Decimal>,
    pub joining_bonus: Option<Decimal>,
    pub joining_date: Option<NaiveDate>,
    pub salary_breakdown: Option<JsonValue>,
    pub company_benchmark: Option<JsonValue>,
    pub notes: Option<String>,
    pub status: String,
    pub candidate_response: Option<String>,
    pub created_by: Option<String>,
    pub finalized_by: Option<String>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CtcDiscussion {
    pub fn status(&self) -> Result<CtcStatus, Error> {
        self.status.parse()
    }

    pub fn is_finalized(&self) -> bool {
        self.status == CtcStatus::Finalized.as_str()
    }

    pub fn has_breakdown(&self) -> bool {
        self.salary_breakdown
            .as_ref()
            .and_then(|b| b.get("components"))
            .and_then(|c| c.as_array())
            .map(|c| !c.is_empty())
            .unwrap_or(false)
    }
}

pub const CTC_COLUMNS: &str = "id, candidate_id, designation, expected_ctc, offered_ctc, fixed_pay, variable_pay, \
    joining_bonus, joining_date, salary_breakdown, company_benchmark, notes, status, candidate_response, \
    created_by, finalized_by, finalized_at, created_at, updated_at";

/// Largest amount a `NUMERIC(14,2)` money column holds.
pub fn max_amount() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

/// (key, label, percent of annual CTC). Shares sum to 100.
pub const BREAKDOWN_SHARES: [(&str, &str, i64); 6] = [
    ("basic", "Basic Salary", 40),
    ("hra", "House Rent Allowance", 20),
    ("conveyance", "Conveyance Allowance", 5),
    ("medical", "Medical Allowance", 5),
    ("special_allowance", "Special Allowance", 18),
    ("employer_pf", "Employer PF Contribution", 12),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryComponent {
    pub key: String,
    pub label: String,
    pub percentage: Decimal,
    pub annual: Decimal,
    pub monthly: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryBreakdown {
    pub annual_ctc: Decimal,
    pub monthly_ctc: Decimal,
    pub components: Vec<SalaryComponent>,
}

impl SalaryBreakdown {
    /// Splits `annual_ctc` into whole-unit annual components; each component is
    /// rounded independently, so the sum may drift from the input by a few units.
    /// Callers keep `annual_ctc` within [`max_amount`].
    pub fn generate(annual_ctc: Decimal) -> Self {
        let hundred = Decimal::from(100);
        let twelve = Decimal::from(12);
        let components = BREAKDOWN_SHARES
            .iter()
            .map(|(key, label, pct)| {
                let percentage = Decimal::from(*pct);
                let annual = (annual_ctc * percentage / hundred).round();
                SalaryComponent {
                    key: key.to_string(),
                    label: label.to_string(),
                    percentage,
                    annual,
                    monthly: (annual / twelve).round_dp(2),
                }
            })
            .collect();

        Self {
            annual_ctc,
            monthly_ctc: (annual_ctc / twelve).round_dp(2),
            components,
        }
    }

    pub fn total_annual(&self) -> Decimal {
        self.components.iter().map(|c| c.annual).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_cover_the_whole_ctc() {
        let total: i64 = BREAKDOWN_SHARES.iter().map(|(_, _, pct)| pct).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn breakdown_of_round_figure_is_exact() {
        let breakdown = SalaryBreakdown::generate(Decimal::from(900_000));
        let basic = &breakdown.components[0];
        assert_eq!(basic.key, "basic");
        assert_eq!(basic.annual, Decimal::from(360_000));
        assert_eq!(basic.monthly, Decimal::from(30_000));
        assert_eq!(breakdown.total_annual(), Decimal::from(900_000));
        assert_eq!(breakdown.monthly_ctc, Decimal::from(75_000));
    }

    #[test]
    fn breakdown_sum_stays_within_rounding_tolerance() {
        let tolerance = Decimal::from(6);
        for raw in [1i64, 7, 99, 1_001, 123_457, 987_653, 1_234_567, 9_999_999] {
            let ctc = Decimal::from(raw);
            let breakdown = SalaryBreakdown::generate(ctc);
            assert_eq!(breakdown.components.len(), 6);
            let drift = (breakdown.total_annual() - ctc).abs();
            assert!(drift <= tolerance, "ctc {} drifted by {}", ctc, drift);
        }
        let fractional = Decimal::new(45_678_955, 2);
        let drift = (SalaryBreakdown::generate(fractional).total_annual() - fractional).abs();
        assert!(drift <= tolerance);
    }

    #[test]
    fn breakdown_of_largest_storable_amount() {
        let breakdown = SalaryBreakdown::generate(max_amount());
        let drift = (breakdown.total_annual() - max_amount()).abs();
        assert!(drift <= Decimal::from(6));
        assert_eq!(breakdown.components[0].annual, Decimal::from(400_000_000_000i64));
    }

    #[test]
    fn has_breakdown_requires_components() {
        let now = Utc::now();
        let mut discussion = CtcDiscussion {
            id: Uuid::new_v4(),
            candidate_id: Uuid::new_v4(),
            designation: None,
            expected_ctc: None,
            offered_ctc: None,
            fixed_pay: None,
            variable_pay: None,
            joining_bonus: None,
            joining_date: None,
            salary_breakdown: Some(serde_json::json!({ "components": [] })),
            company_benchmark: None,
            notes: None,
            status: "pending".into(),
            candidate_response: None,
            created_by: None,
            finalized_by: None,
            finalized_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(!discussion.has_breakdown());
        discussion.salary_breakdown =
            Some(serde_json::to_value(SalaryBreakdown::generate(Decimal::from(1000))).unwrap());
        assert!(discussion.has_breakdown());
        assert_eq!(discussion.status().unwrap(), CtcStatus::Pending);
    }
}
