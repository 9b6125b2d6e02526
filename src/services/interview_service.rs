use crate::dto::workflow_dto::{ProcessInterviewRequest, ProcessInterviewResponse};
use crate::error::{Error, Result};
use crate::models::interview::Interview;
use crate::models::threshold_policy::{InterviewDecision, ThresholdPolicy};
use crate::models::workflow::{Actor, NewLogEntry, WorkflowStep};
use crate::services::candidate_service::CandidateService;
use crate::services::policy_service::PolicyService;
use crate::services::workflow_log_service::WorkflowLogService;
use crate::services::workflow_service::WorkflowService;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Clone)]
pub struct InterviewService {
    pool: PgPool,
    candidates: CandidateService,
    policies: PolicyService,
    workflow: WorkflowService,
}

impl InterviewService {
    pub fn new(pool: PgPool, policies: PolicyService, workflow: WorkflowService) -> Self {
        Self {
            candidates: CandidateService::new(pool.clone()),
            pool,
            policies,
            workflow,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Interview>> {
        let row = sqlx::query_as::<_, Interview>(
            r#"
            SELECT id, candidate_id, scheduled_at, interviewer, status, score, notes, completed_at, created_at
            FROM interviews
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Interview> {
        sqlx::query_as::<_, Interview>(
            r#"
            SELECT id, candidate_id, scheduled_at, interviewer, status, score, notes, completed_at, created_at
            FROM interviews
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Interview {} not found", id)))
    }

    pub async fn process_interview(
        &self,
        interview_id: Uuid,
        payload: ProcessInterviewRequest,
        actor: Actor,
    ) -> Result<ProcessInterviewResponse> {
        let result = self.process_interview_inner(interview_id, payload, &actor).await;
        self.workflow
            .audit()
            .audited(&actor, "workflow.process_interview", "interview", interview_id, result)
            .await
    }

    async fn process_interview_inner(
        &self,
        interview_id: Uuid,
        payload: ProcessInterviewRequest,
        actor: &Actor,
    ) -> Result<ProcessInterviewResponse> {
        let score = check_score(payload.score)?;

        let interview = self
            .get(interview_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Interview {} not found", interview_id)))?;
        let candidate = self.candidates.require_candidate(interview.candidate_id).await?;
        let vacancy = self.candidates.vacancy_for(&candidate).await?;
        let policy = self
            .policies
            .resolve(candidate.vacancy_id, vacancy.as_ref().and_then(|v| v.department.as_deref()))
            .await?;

        let mut tx = self.pool.begin().await?;
        let candidate = CandidateService::lock(&mut tx, interview.candidate_id).await?;
        let interview = Self::lock(&mut tx, interview_id).await?;
        let current = WorkflowLogService::current_step(&mut tx, candidate.id).await?;

        let decision = policy.decide_interview(score);
        let outcome = interview_outcome(&policy, decision, score, candidate.is_paused());
        WorkflowService::ensure_transition(current, outcome.step)?;

        sqlx::query(
            r#"
            UPDATE interviews
            SET score = $2, notes = COALESCE($3, notes), status = 'completed', completed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(interview.id)
        .bind(score)
        .bind(&payload.notes)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE candidates
            SET final_interview_score = $2,
                auto_rejected_at = CASE WHEN $3 THEN NOW() ELSE auto_rejected_at END,
                rejection_reason = CASE WHEN $3 THEN $4 ELSE rejection_reason END
            WHERE id = $1
            "#,
        )
        .bind(candidate.id)
        .bind(score)
        .bind(outcome.step == WorkflowStep::Rejected)
        .bind(&outcome.rejection_reason)
        .execute(&mut *tx)
        .await?;

        let mut entry = NewLogEntry::new(outcome.step, "interview_processed", Actor::system())
            .with_details(json!({
                "interview_id": interview.id,
                "score": score,
                "pass_score": policy.interview_pass_score,
                "decision": decision,
                "notes": payload.notes,
                "automation_paused": candidate.is_paused(),
                "submitted_by": actor.id,
            }));
        if let Some(prompt) = outcome.hr_prompt {
            entry = entry.needs_hr(prompt);
        }

        let (transition, _) = WorkflowService::record_step(&mut tx, &candidate, current, entry).await?;
        tx.commit().await?;

        Ok(ProcessInterviewResponse {
            interview_id: interview.id,
            score,
            pass_score: policy.interview_pass_score,
            transition,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct InterviewOutcome {
    step: WorkflowStep,
    hr_prompt: Option<String>,
    rejection_reason: Option<String>,
}

/// Scores are stored as `NUMERIC(3,2)`, so anything finer than two decimals
/// would be decided on one value and persisted as another.
fn check_score(score: Option<Decimal>) -> Result<Decimal> {
    let score = score.ok_or_else(|| Error::ValidationFailed("score is required".into()))?;
    if score < Decimal::ZERO || score > Decimal::from(5) {
        return Err(Error::ValidationFailed(format!(
            "score must be within 0..=5, got {}",
            score
        )));
    }
    if score.normalize().scale() > 2 {
        return Err(Error::ValidationFailed(format!(
            "score allows at most two decimal places, got {}",
            score
        )));
    }
    Ok(score)
}

/// A pass never goes straight to an offer: it stops at `selected` and asks HR
/// to open the CTC negotiation.
fn interview_outcome(
    policy: &ThresholdPolicy,
    decision: InterviewDecision,
    score: Decimal,
    paused: bool,
) -> InterviewOutcome {
    match decision {
        InterviewDecision::Pass => InterviewOutcome {
            step: WorkflowStep::Selected,
            hr_prompt: Some(format!(
                "Candidate passed the interview (score {} >= {}). Start the CTC discussion.",
                score, policy.interview_pass_score
            )),
            rejection_reason: None,
        },
        InterviewDecision::Fail if paused => InterviewOutcome {
            step: WorkflowStep::InterviewCompleted,
            hr_prompt: Some(format!(
                "Automation is paused. Interview score {} is below the pass score {}; decide manually.",
                score, policy.interview_pass_score
            )),
            rejection_reason: None,
        },
        InterviewDecision::Fail => InterviewOutcome {
            step: WorkflowStep::Rejected,
            hr_prompt: None,
            rejection_reason: Some(format!(
                "Interview score {} below pass score {}",
                score, policy.interview_pass_score
            )),
        },
    }
}
