use crate::dto::workflow_dto::EvaluateCandidateResponse;
use crate::error::Result;
use crate::models::candidate::Candidate;
use crate::models::threshold_policy::{ScreeningDecision, ThresholdPolicy};
use crate::models::vacancy::Vacancy;
use crate::models::workflow::{Actor, NewLogEntry, WorkflowStep};
use crate::services::candidate_service::CandidateService;
use crate::services::policy_service::PolicyService;
use crate::services::workflow_log_service::WorkflowLogService;
use crate::services::workflow_service::WorkflowService;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const MAX_POINTS: usize = 5;
const NEUTRAL_SCORE: i32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningRequest {
    pub candidate_name: String,
    pub resume_text: String,
    pub candidate_skills: Vec<String>,
    pub vacancy_title: Option<String>,
    pub vacancy_requirements: Option<String>,
    pub vacancy_skills: Vec<String>,
}

impl ScreeningRequest {
    pub fn new(candidate: &Candidate, vacancy: Option<&Vacancy>) -> Self {
        Self {
            candidate_name: candidate.name.clone(),
            resume_text: candidate.resume_text.clone().unwrap_or_default(),
            candidate_skills: candidate.skill_list(),
            vacancy_title: vacancy.map(|v| v.title.clone()),
            vacancy_requirements: vacancy
                .and_then(|v| v.requirements.clone().or_else(|| v.description.clone())),
            vacancy_skills: vacancy.map(|v| v.skill_list()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Shortlist,
    Review,
    Reject,
}

impl Recommendation {
    fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "shortlist" | "shortlisted" => Recommendation::Shortlist,
            "reject" | "rejected" => Recommendation::Reject,
            _ => Recommendation::Review,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: i32,
    pub analysis: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendation: Recommendation,
}

impl Evaluation {
    pub fn neutral() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            analysis: "Automated screening unavailable; manual HR review required.".to_string(),
            strengths: vec![],
            weaknesses: vec![],
            recommendation: Recommendation::Review,
        }
    }

    /// Normalizes a raw capability response. Only a missing or non-numeric
    /// score is fatal; everything else is coerced.
    pub fn from_response(raw: &JsonValue) -> std::result::Result<Self, String> {
        let score = raw
            .get("score")
            .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
            .filter(|s| s.is_finite())
            .ok_or_else(|| "response has no numeric score".to_string())?;

        let points = |key: &str| -> Vec<String> {
            raw.get(key)
                .and_then(|v| v.as_array())
                .map(|a| {
                    a.iter()
                        .filter_map(|e| e.as_str())
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .take(MAX_POINTS)
                        .collect()
                })
                .unwrap_or_default()
        };

        Ok(Self {
            score: score.round().clamp(0.0, 100.0) as i32,
            analysis: raw
                .get("analysis")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .trim()
                .to_string(),
            strengths: points("strengths"),
            weaknesses: points("weaknesses"),
            recommendation: raw
                .get("recommendation")
                .and_then(|v| v.as_str())
                .map(Recommendation::parse_lenient)
                .unwrap_or(Recommendation::Review),
        })
    }
}

/// Either a genuine score or the neutral fallback with the reason it was used.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreeningOutcome {
    Scored(Evaluation),
    FallbackUsed { evaluation: Evaluation, reason: String },
}

impl ScreeningOutcome {
    fn fallback(reason: impl Into<String>) -> Self {
        ScreeningOutcome::FallbackUsed {
            evaluation: Evaluation::neutral(),
            reason: reason.into(),
        }
    }

    pub fn evaluation(&self) -> &Evaluation {
        match self {
            ScreeningOutcome::Scored(e) => e,
            ScreeningOutcome::FallbackUsed { evaluation, .. } => evaluation,
        }
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            ScreeningOutcome::Scored(_) => None,
            ScreeningOutcome::FallbackUsed { reason, .. } => Some(reason),
        }
    }
}

/// External scoring capability. Returns the raw JSON verdict; normalization and
/// failure handling live in [`ScreeningAdapter`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScreeningEvaluator: Send + Sync {
    async fn evaluate_raw(&self, request: &ScreeningRequest) -> anyhow::Result<JsonValue>;
}

#[derive(Clone)]
pub struct OpenAiEvaluator {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiEvaluator {
    pub fn new(api_key: String, model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ScreeningEvaluator for OpenAiEvaluator {
    async fn evaluate_raw(&self, request: &ScreeningRequest) -> anyhow::Result<JsonValue> {
        let system_prompt = r#"You are a strict and unbiased senior recruiter.
Evaluate how well the candidate's resume matches the vacancy.

Rules:
1. A fundamentally different profession scores 0-30.
2. Transferable soft skills alone never justify a high score.
3. Missing mandatory requirements (licenses, education, years of experience) cost heavily.
4. Scale: 0-39 mismatch, 40-69 partial match needing human review, 70-100 strong match.

Return JSON: { "score": <0-100>, "analysis": "<concise explanation>",
"strengths": [<up to 5 strings>], "weaknesses": [<up to 5 strings>],
"recommendation": "shortlist" | "review" | "reject" }"#;

        let user_content = json!({
            "candidate": request.candidate_name,
            "candidate_skills": request.candidate_skills,
            "vacancy": request.vacancy_title,
            "requirements": request.vacancy_requirements,
            "required_skills": request.vacancy_skills,
            "resume": request.resume_text,
        });

        let payload = json!({
            "model": self.model,
            "temperature": 0.1,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_content.to_string()}
            ],
            "response_format": { "type": "json_object" }
        });

        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API Error {}: {}", status, text);
        }

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response format"))
    }
}

/// Bounds the capability call and downgrades every failure to the neutral
/// fallback. Never returns an error.
#[derive(Clone)]
pub struct ScreeningAdapter {
    evaluator: Option<Arc<dyn ScreeningEvaluator>>,
    timeout: Duration,
}

impl ScreeningAdapter {
    pub fn new(evaluator: Option<Arc<dyn ScreeningEvaluator>>, timeout: Duration) -> Self {
        Self { evaluator, timeout }
    }

    pub async fn evaluate(&self, request: &ScreeningRequest) -> ScreeningOutcome {
        let Some(evaluator) = &self.evaluator else {
            return ScreeningOutcome::fallback("no scoring capability configured");
        };

        let raw = match tokio::time::timeout(self.timeout, evaluator.evaluate_raw(request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(error = ?e, "Screening evaluator failed, using neutral score");
                return ScreeningOutcome::fallback(format!("evaluator error: {}", e));
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs_f64(), "Screening evaluator timed out, using neutral score");
                return ScreeningOutcome::fallback(format!(
                    "evaluator timed out after {}s",
                    self.timeout.as_secs_f64()
                ));
            }
        };

        match Evaluation::from_response(&raw) {
            Ok(evaluation) => ScreeningOutcome::Scored(evaluation),
            Err(reason) => {
                tracing::warn!(%reason, "Unparseable screening response, using neutral score");
                ScreeningOutcome::fallback(format!("malformed response: {}", reason))
            }
        }
    }
}

#[derive(Clone)]
pub struct ScreeningService {
    pool: PgPool,
    adapter: ScreeningAdapter,
    candidates: CandidateService,
    policies: PolicyService,
    workflow: WorkflowService,
}

impl ScreeningService {
    pub fn new(
        pool: PgPool,
        adapter: ScreeningAdapter,
        policies: PolicyService,
        workflow: WorkflowService,
    ) -> Self {
        Self {
            candidates: CandidateService::new(pool.clone()),
            pool,
            adapter,
            policies,
            workflow,
        }
    }

    pub async fn evaluate_candidate(
        &self,
        candidate_id: Uuid,
        actor: Actor,
    ) -> Result<EvaluateCandidateResponse> {
        let result = self.evaluate_candidate_inner(candidate_id, &actor).await;
        self.workflow
            .audit()
            .audited(&actor, "workflow.evaluate", "candidate", candidate_id, result)
            .await
    }

    async fn evaluate_candidate_inner(
        &self,
        candidate_id: Uuid,
        actor: &Actor,
    ) -> Result<EvaluateCandidateResponse> {
        let candidate = self.candidates.require_candidate(candidate_id).await?;
        let vacancy = self.candidates.vacancy_for(&candidate).await?;
        let policy = self
            .policies
            .resolve(candidate.vacancy_id, vacancy.as_ref().and_then(|v| v.department.as_deref()))
            .await?;

        // Slow external call happens before the candidate row is locked.
        let outcome = self
            .adapter
            .evaluate(&ScreeningRequest::new(&candidate, vacancy.as_ref()))
            .await;
        let evaluation = outcome.evaluation().clone();
        let decision = policy.decide_screening(evaluation.score);

        let mut tx = self.pool.begin().await?;
        let candidate = CandidateService::lock(&mut tx, candidate_id).await?;
        let current = WorkflowLogService::current_step(&mut tx, candidate_id).await?;
        let paused = candidate.is_paused();

        let plan = screening_plan(&policy, decision, evaluation.score, paused);
        WorkflowService::ensure_transition(current, plan.step)?;

        sqlx::query(
            r#"
            UPDATE candidates
            SET screening_score = $2,
                screening_analysis = $3,
                auto_rejected_at = CASE WHEN $4 THEN NOW() ELSE auto_rejected_at END,
                rejection_reason = CASE WHEN $4 THEN $5 ELSE rejection_reason END,
                auto_shortlisted_at = CASE WHEN $6 THEN NOW() ELSE auto_shortlisted_at END
            WHERE id = $1
            "#,
        )
        .bind(candidate_id)
        .bind(evaluation.score)
        .bind(serde_json::to_value(&evaluation)?)
        .bind(plan.step == WorkflowStep::Rejected)
        .bind(&plan.rejection_reason)
        .bind(plan.step == WorkflowStep::Shortlisted)
        .execute(&mut *tx)
        .await?;

        let mut entry = NewLogEntry::new(plan.step, "ai_screening_completed", Actor::system())
            .with_details(json!({
                "score": evaluation.score,
                "analysis": evaluation.analysis,
                "strengths": evaluation.strengths,
                "weaknesses": evaluation.weaknesses,
                "recommendation": evaluation.recommendation,
                "decision": decision,
                "review_band": plan.review_band,
                "automation_paused": paused,
                "fallback_used": outcome.fallback_reason().is_some(),
                "fallback_reason": outcome.fallback_reason(),
                "policy": policy,
                "requested_by": actor.id,
            }));
        if let Some(prompt) = plan.hr_prompt {
            entry = entry.needs_hr(prompt);
        }

        let (transition, _) = WorkflowService::record_step(&mut tx, &candidate, current, entry).await?;
        tx.commit().await?;

        Ok(EvaluateCandidateResponse {
            transition,
            fallback_used: outcome.fallback_reason().is_some(),
            fallback_reason: outcome.fallback_reason().map(|s| s.to_string()),
            evaluation,
            decision,
            policy,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ScreeningPlan {
    step: WorkflowStep,
    hr_prompt: Option<String>,
    rejection_reason: Option<String>,
    review_band: Option<&'static str>,
}

/// Maps a threshold decision onto the step to log. While automation is paused
/// nothing is auto-applied and the candidate is handed to HR.
fn screening_plan(
    policy: &ThresholdPolicy,
    decision: ScreeningDecision,
    score: i32,
    paused: bool,
) -> ScreeningPlan {
    if paused {
        return ScreeningPlan {
            step: WorkflowStep::HrReviewRequired,
            hr_prompt: Some(format!(
                "Automation is paused for this candidate. Screening score {} was not auto-applied; decide manually.",
                score
            )),
            rejection_reason: None,
            review_band: None,
        };
    }
    match decision {
        ScreeningDecision::Reject => ScreeningPlan {
            step: WorkflowStep::Rejected,
            hr_prompt: None,
            rejection_reason: Some(format!(
                "Screening score {} below auto-reject threshold {}",
                score, policy.auto_reject_threshold
            )),
            review_band: None,
        },
        ScreeningDecision::HrReview { near_shortlist } => ScreeningPlan {
            step: WorkflowStep::HrReviewRequired,
            hr_prompt: Some(format!(
                "Screening score {} is below the shortlist threshold {}. Review the resume and shortlist or reject.",
                score, policy.auto_shortlist_threshold
            )),
            rejection_reason: None,
            review_band: Some(if near_shortlist {
                "near_shortlist"
            } else {
                "below_review_threshold"
            }),
        },
        ScreeningDecision::Shortlist => ScreeningPlan {
            step: WorkflowStep::Shortlisted,
            hr_prompt: None,
            rejection_reason: None,
            review_band: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ScreeningRequest {
        ScreeningRequest {
            candidate_name: "Asha".into(),
            resume_text: "Rust, Postgres, 6 years".into(),
            candidate_skills: vec!["rust".into()],
            vacancy_title: Some("Backend Engineer".into()),
            vacancy_requirements: None,
            vacancy_skills: vec![],
        }
    }

    struct SlowEvaluator;

    #[async_trait]
    impl ScreeningEvaluator for SlowEvaluator {
        async fn evaluate_raw(&self, _request: &ScreeningRequest) -> anyhow::Result<JsonValue> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!({ "score": 99 }))
        }
    }

    #[test]
    fn normalizes_scores_and_lists() {
        let raw = json!({
            "score": 104.6,
            "analysis": "  strong  ",
            "strengths": ["a", "b", "c", "d", "e", "f", ""],
            "weaknesses": "not a list",
            "recommendation": "Shortlist"
        });
        let eval = Evaluation::from_response(&raw).unwrap();
        assert_eq!(eval.score, 100);
        assert_eq!(eval.analysis, "strong");
        assert_eq!(eval.strengths.len(), 5);
        assert!(eval.weaknesses.is_empty());
        assert_eq!(eval.recommendation, Recommendation::Shortlist);

        let eval = Evaluation::from_response(&json!({ "score": "72", "recommendation": "maybe" })).unwrap();
        assert_eq!(eval.score, 72);
        assert_eq!(eval.recommendation, Recommendation::Review);
    }

    #[test]
    fn missing_score_is_malformed() {
        assert!(Evaluation::from_response(&json!({ "analysis": "great" })).is_err());
        assert!(Evaluation::from_response(&json!({ "score": "high" })).is_err());
    }

    #[tokio::test]
    async fn no_capability_uses_fallback() {
        let adapter = ScreeningAdapter::new(None, Duration::from_secs(1));
        let outcome = adapter.evaluate(&request()).await;
        assert_eq!(outcome.evaluation().score, 50);
        assert_eq!(outcome.evaluation().recommendation, Recommendation::Review);
        assert!(outcome.fallback_reason().unwrap().contains("no scoring capability"));
    }

    #[tokio::test]
    async fn scored_response_is_not_a_fallback() {
        let mut mock = MockScreeningEvaluator::new();
        mock.expect_evaluate_raw()
            .times(1)
            .returning(|_| Ok(json!({ "score": 50, "recommendation": "review" })));
        let adapter = ScreeningAdapter::new(Some(Arc::new(mock)), Duration::from_secs(1));
        let outcome = adapter.evaluate(&request()).await;
        assert!(matches!(outcome, ScreeningOutcome::Scored(ref e) if e.score == 50));
        assert!(outcome.fallback_reason().is_none());
    }

    #[tokio::test]
    async fn evaluator_error_and_garbage_fall_back() {
        let mut failing = MockScreeningEvaluator::new();
        failing
            .expect_evaluate_raw()
            .returning(|_| Err(anyhow::anyhow!("503 upstream")));
        let adapter = ScreeningAdapter::new(Some(Arc::new(failing)), Duration::from_secs(1));
        let outcome = adapter.evaluate(&request()).await;
        assert!(outcome.fallback_reason().unwrap().contains("503 upstream"));

        let mut garbage = MockScreeningEvaluator::new();
        garbage
            .expect_evaluate_raw()
            .returning(|_| Ok(json!(["not", "an", "object"])));
        let adapter = ScreeningAdapter::new(Some(Arc::new(garbage)), Duration::from_secs(1));
        let outcome = adapter.evaluate(&request()).await;
        assert!(outcome.fallback_reason().unwrap().starts_with("malformed response"));
        assert_eq!(outcome.evaluation(), &Evaluation::neutral());
    }

    #[test]
    fn timeout_falls_back() {
        let adapter = ScreeningAdapter::new(Some(Arc::new(SlowEvaluator)), Duration::from_millis(20));
        let outcome = tokio_test::block_on(adapter.evaluate(&request()));
        assert!(outcome.fallback_reason().unwrap().contains("timed out"));
        assert_eq!(outcome.evaluation().score, 50);
    }

    #[test]
    fn plan_follows_threshold_decision() {
        let policy = ThresholdPolicy::default();
        let plan = screening_plan(&policy, policy.decide_screening(85), 85, false);
        assert_eq!(plan.step, WorkflowStep::Shortlisted);
        assert!(plan.hr_prompt.is_none());

        let plan = screening_plan(&policy, policy.decide_screening(39), 39, false);
        assert_eq!(plan.step, WorkflowStep::Rejected);
        assert!(plan.rejection_reason.unwrap().contains("39"));

        let plan = screening_plan(&policy, policy.decide_screening(40), 40, false);
        assert_eq!(plan.step, WorkflowStep::HrReviewRequired);
        assert!(plan.hr_prompt.is_some());
    }

    #[test]
    fn paused_candidates_are_handed_to_hr() {
        let policy = ThresholdPolicy::default();
        for score in [10, 55, 95] {
            let plan = screening_plan(&policy, policy.decide_screening(score), score, true);
            assert_eq!(plan.step, WorkflowStep::HrReviewRequired);
            assert!(plan.hr_prompt.unwrap().contains("paused"));
        }
    }

    #[test]
    fn neutral_fallback_lands_in_review() {
        let policy = ThresholdPolicy::default();
        assert_eq!(
            policy.decide_screening(Evaluation::neutral().score),
            ScreeningDecision::HrReview { near_shortlist: false }
        );
    }
}
