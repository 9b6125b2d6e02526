use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Cut points governing automated decisions. Resolved once per decision and
/// passed by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    pub auto_reject_threshold: i32,
    pub hr_review_threshold: i32,
    pub auto_shortlist_threshold: i32,
    pub interview_pass_score: Decimal,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            auto_reject_threshold: 40,
            hr_review_threshold: 70,
            auto_shortlist_threshold: 70,
            interview_pass_score: Decimal::new(35, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningDecision {
    Reject,
    HrReview { near_shortlist: bool },
    Shortlist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewDecision {
    Pass,
    Fail,
}

impl ThresholdPolicy {
    pub fn check(&self) -> std::result::Result<(), String> {
        let ordered = 0 <= self.auto_reject_threshold
            && self.auto_reject_threshold <= self.hr_review_threshold
            && self.hr_review_threshold <= self.auto_shortlist_threshold
            && self.auto_shortlist_threshold <= 100;
        if !ordered {
            return Err(format!(
                "thresholds must satisfy 0 <= reject ({}) <= hr_review ({}) <= shortlist ({}) <= 100",
                self.auto_reject_threshold, self.hr_review_threshold, self.auto_shortlist_threshold
            ));
        }
        if self.interview_pass_score < Decimal::ZERO || self.interview_pass_score > Decimal::from(5) {
            return Err(format!(
                "interview_pass_score must be within 0..=5, got {}",
                self.interview_pass_score
            ));
        }
        Ok(())
    }

    /// Three-way split, evaluated reject first, then "below shortlist", else
    /// shortlist. `hr_review_threshold` only labels the review band.
    pub fn decide_screening(&self, score: i32) -> ScreeningDecision {
        if score < self.auto_reject_threshold {
            ScreeningDecision::Reject
        } else if score < self.auto_shortlist_threshold {
            ScreeningDecision::HrReview {
                near_shortlist: score >= self.hr_review_threshold,
            }
        } else {
            ScreeningDecision::Shortlist
        }
    }

    pub fn decide_interview(&self, score: Decimal) -> InterviewDecision {
        if score < self.interview_pass_score {
            InterviewDecision::Fail
        } else {
            InterviewDecision::Pass
        }
    }
}

/// Where a stored policy applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyScope {
    Global,
    Department(String),
    Vacancy(Uuid),
}

impl PolicyScope {
    pub fn key(&self) -> String {
        match self {
            PolicyScope::Global => "global".to_string(),
            PolicyScope::Department(name) => format!("department:{}", name.trim().to_lowercase()),
            PolicyScope::Vacancy(id) => format!("vacancy:{}", id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ThresholdPolicyRecord {
    pub id: Uuid,
    pub scope: String,
    pub auto_reject_threshold: i32,
    pub hr_review_threshold: i32,
    pub auto_shortlist_threshold: i32,
    pub interview_pass_score: Decimal,
    pub updated_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<ThresholdPolicyRecord> for ThresholdPolicy {
    fn from(value: ThresholdPolicyRecord) -> Self {
        Self {
            auto_reject_threshold: value.auto_reject_threshold,
            hr_review_threshold: value.hr_review_threshold,
            auto_shortlist_threshold: value.auto_shortlist_threshold,
            interview_pass_score: value.interview_pass_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_screening_boundaries() {
        let policy = ThresholdPolicy::default();
        assert_eq!(policy.decide_screening(39), ScreeningDecision::Reject);
        assert_eq!(
            policy.decide_screening(40),
            ScreeningDecision::HrReview { near_shortlist: false }
        );
        assert_eq!(
            policy.decide_screening(69),
            ScreeningDecision::HrReview { near_shortlist: false }
        );
        assert_eq!(policy.decide_screening(70), ScreeningDecision::Shortlist);
        assert_eq!(policy.decide_screening(85), ScreeningDecision::Shortlist);
    }

    #[test]
    fn diverging_review_and_shortlist_thresholds_keep_branch_order() {
        let policy = ThresholdPolicy {
            auto_reject_threshold: 30,
            hr_review_threshold: 50,
            auto_shortlist_threshold: 80,
            ..ThresholdPolicy::default()
        };
        assert_eq!(
            policy.decide_screening(45),
            ScreeningDecision::HrReview { near_shortlist: false }
        );
        assert_eq!(
            policy.decide_screening(60),
            ScreeningDecision::HrReview { near_shortlist: true }
        );
        assert_eq!(policy.decide_screening(80), ScreeningDecision::Shortlist);
    }

    #[test]
    fn interview_boundary_is_inclusive() {
        let policy = ThresholdPolicy::default();
        assert_eq!(policy.decide_interview(Decimal::new(35, 1)), InterviewDecision::Pass);
        assert_eq!(policy.decide_interview(Decimal::new(349, 2)), InterviewDecision::Fail);
        assert_eq!(policy.decide_interview(Decimal::new(28, 1)), InterviewDecision::Fail);
    }

    #[test]
    fn check_rejects_unordered_thresholds() {
        let mut policy = ThresholdPolicy::default();
        assert!(policy.check().is_ok());
        policy.auto_reject_threshold = 80;
        assert!(policy.check().is_err());
        let policy = ThresholdPolicy {
            interview_pass_score: Decimal::from(6),
            ..ThresholdPolicy::default()
        };
        assert!(policy.check().is_err());
    }

    #[test]
    fn scope_keys() {
        assert_eq!(PolicyScope::Global.key(), "global");
        assert_eq!(
            PolicyScope::Department(" Engineering ".into()).key(),
            "department:engineering"
        );
    }
}
