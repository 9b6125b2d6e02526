use crate::dto::workflow_dto::{
    AdvanceRequest, CompleteActionRequest, CompleteActionResponse, WorkflowHistoryResponse,
    WorkflowStatusSummary,
};
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CANDIDATE_COLUMNS};
use crate::models::workflow::{
    Actor, AutomationStatus, NewLogEntry, TransitionResult, WorkflowStep,
};
use crate::services::audit_service::AuditService;
use crate::services::candidate_service::CandidateService;
use crate::services::workflow_log_service::{PendingActionList, WorkflowLogService};
use serde_json::{json, Map, Value as JsonValue};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Workflow engine: every mutation locks the candidate row, writes the new
/// status and appends exactly one ledger entry inside one transaction.
#[derive(Clone)]
pub struct WorkflowService {
    pool: PgPool,
    log: WorkflowLogService,
    candidates: CandidateService,
    audit: AuditService,
}

impl WorkflowService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            log: WorkflowLogService::new(pool.clone()),
            candidates: CandidateService::new(pool.clone()),
            audit: AuditService::new(pool.clone()),
            pool,
        }
    }

    pub fn audit(&self) -> &AuditService {
        &self.audit
    }

    /// Projects the step onto the candidate, bumps its version and appends the
    /// ledger entry. Callers hold the candidate lock inside `conn`'s transaction.
    pub(crate) async fn record_step(
        conn: &mut PgConnection,
        candidate: &Candidate,
        previous_step: Option<WorkflowStep>,
        entry: NewLogEntry,
    ) -> Result<(TransitionResult, Candidate)> {
        // Meta steps keep the current status.
        let sql = format!(
            "UPDATE candidates SET status = COALESCE($2, status), version = version + 1, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            CANDIDATE_COLUMNS
        );
        let updated = sqlx::query_as::<_, Candidate>(&sql)
            .bind(candidate.id)
            .bind(entry.step.status().map(|s| s.as_str()))
            .fetch_one(&mut *conn)
            .await?;

        let row = WorkflowLogService::append(conn, candidate.id, previous_step, &entry).await?;

        tracing::info!(
            candidate_id = %candidate.id,
            from = previous_step.map(|s| s.as_str()).unwrap_or("none"),
            to = %entry.step,
            actor = %entry.actor,
            requires_hr_action = entry.requires_hr_action,
            "Workflow transition recorded"
        );

        let result = TransitionResult {
            candidate_id: candidate.id,
            log_id: row.id,
            previous_step,
            new_step: entry.step,
            status: updated.status.clone(),
            automation_status: updated.automation_status.clone(),
            requires_hr_action: row.requires_hr_action,
            hr_prompt: row.hr_prompt,
        };
        Ok((result, updated))
    }

    /// Refuses `target` unless the transition table allows it after `current`.
    pub(crate) fn ensure_transition(
        current: Option<WorkflowStep>,
        target: WorkflowStep,
    ) -> Result<()> {
        if target.can_follow(current) {
            return Ok(());
        }
        Err(Error::InvalidTransition(format!(
            "cannot move from {} to {}",
            current.map(|s| s.as_str()).unwrap_or("no history"),
            target
        )))
    }

    pub async fn start_application(&self, candidate_id: Uuid, actor: Actor) -> Result<TransitionResult> {
        let result = self.start_application_inner(candidate_id, &actor).await;
        self.audit
            .audited(&actor, "workflow.new_application", "candidate", candidate_id, result)
            .await
    }

    async fn start_application_inner(&self, candidate_id: Uuid, actor: &Actor) -> Result<TransitionResult> {
        let mut tx = self.pool.begin().await?;
        let candidate = CandidateService::lock(&mut tx, candidate_id).await?;
        let current = WorkflowLogService::current_step(&mut tx, candidate_id).await?;
        Self::ensure_transition(current, WorkflowStep::NewApplication)?;

        let entry = NewLogEntry::new(WorkflowStep::NewApplication, "application_received", actor.clone())
            .with_details(json!({ "vacancy_id": candidate.vacancy_id }));
        let (result, _) = Self::record_step(&mut tx, &candidate, current, entry).await?;
        tx.commit().await?;
        Ok(result)
    }

    pub async fn advance(
        &self,
        candidate_id: Uuid,
        payload: AdvanceRequest,
        actor: Actor,
    ) -> Result<TransitionResult> {
        let result = self.advance_inner(candidate_id, payload, &actor).await;
        self.audit
            .audited(&actor, "workflow.advance", "candidate", candidate_id, result)
            .await
    }

    async fn advance_inner(
        &self,
        candidate_id: Uuid,
        payload: AdvanceRequest,
        actor: &Actor,
    ) -> Result<TransitionResult> {
        if payload.target_step.trim().is_empty() {
            return Err(Error::ValidationFailed("target_step is required".into()));
        }
        let target: WorkflowStep = payload.target_step.parse()?;
        if target.is_meta() {
            return Err(Error::BadRequest(format!(
                "'{}' is set through the pause/resume operations",
                target
            )));
        }

        let mut tx = self.pool.begin().await?;
        let candidate = CandidateService::lock(&mut tx, candidate_id).await?;
        let current = WorkflowLogService::current_step(&mut tx, candidate_id).await?;
        let reason = payload.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());

        let overridden = match Self::ensure_transition(current, target) {
            Ok(()) => false,
            Err(err) => {
                if !payload.override_transition {
                    return Err(err);
                }
                if reason.is_none() {
                    return Err(Error::ValidationFailed(
                        "override_transition requires a reason".into(),
                    ));
                }
                true
            }
        };

        let mut details = match payload.detail {
            Some(JsonValue::Object(map)) => map,
            Some(other) => {
                let mut map = Map::new();
                map.insert("detail".into(), other);
                map
            }
            None => Map::new(),
        };
        if let Some(reason) = reason {
            details.insert("reason".into(), json!(reason));
        }
        if overridden {
            details.insert("override".into(), json!(true));
            tracing::warn!(
                %candidate_id,
                from = current.map(|s| s.as_str()).unwrap_or("none"),
                to = %target,
                actor = %actor,
                "Out-of-graph transition forced by override"
            );
        }

        if target == WorkflowStep::Rejected {
            sqlx::query("UPDATE candidates SET rejection_reason = $2 WHERE id = $1")
                .bind(candidate_id)
                .bind(reason.unwrap_or("Rejected by HR"))
                .execute(&mut *tx)
                .await?;
        }

        let mut entry = NewLogEntry::new(target, format!("moved_to_{}", target), actor.clone())
            .with_details(JsonValue::Object(details));
        match target {
            WorkflowStep::HrReviewRequired => {
                entry = entry.needs_hr("Review the candidate and decide whether to shortlist or reject.");
            }
            WorkflowStep::GenerateOfferLetter => {
                entry = entry.needs_hr("Generate and send the offer letter.");
            }
            _ => {}
        }

        let (result, _) = Self::record_step(&mut tx, &candidate, current, entry).await?;
        tx.commit().await?;
        Ok(result)
    }

    pub async fn pause(&self, candidate_id: Uuid, reason: String, actor: Actor) -> Result<TransitionResult> {
        let result = self
            .set_automation(candidate_id, AutomationStatus::Paused, Some(reason), &actor)
            .await;
        self.audit
            .audited(&actor, "workflow.pause", "candidate", candidate_id, result)
            .await
    }

    pub async fn resume(
        &self,
        candidate_id: Uuid,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<TransitionResult> {
        let result = self
            .set_automation(candidate_id, AutomationStatus::Automated, reason, &actor)
            .await;
        self.audit
            .audited(&actor, "workflow.resume", "candidate", candidate_id, result)
            .await
    }

    async fn set_automation(
        &self,
        candidate_id: Uuid,
        target: AutomationStatus,
        reason: Option<String>,
        actor: &Actor,
    ) -> Result<TransitionResult> {
        let mut tx = self.pool.begin().await?;
        let candidate = CandidateService::lock(&mut tx, candidate_id).await?;
        if candidate.automation_status == target.as_str() {
            return Err(Error::ValidationFailed(format!(
                "automation is already {}",
                target.as_str()
            )));
        }
        let current = WorkflowLogService::current_step(&mut tx, candidate_id).await?;

        sqlx::query("UPDATE candidates SET automation_status = $2 WHERE id = $1")
            .bind(candidate_id)
            .bind(target.as_str())
            .execute(&mut *tx)
            .await?;

        let (step, action) = match target {
            AutomationStatus::Paused => (WorkflowStep::Paused, "automation_paused"),
            AutomationStatus::Automated => (WorkflowStep::Resumed, "automation_resumed"),
        };
        let entry = NewLogEntry::new(step, action, actor.clone()).with_details(json!({
            "reason": reason,
            "status": candidate.status,
        }));
        let (result, _) = Self::record_step(&mut tx, &candidate, current, entry).await?;
        tx.commit().await?;
        Ok(result)
    }

    pub async fn complete_action(
        &self,
        log_id: i64,
        payload: CompleteActionRequest,
        actor: Actor,
    ) -> Result<CompleteActionResponse> {
        let candidate_id = self
            .log
            .candidate_of(log_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Workflow log entry {} not found", log_id)))?;
        let result = self.complete_action_inner(candidate_id, log_id, payload, &actor).await;
        self.audit
            .audited(&actor, "workflow.complete_action", "candidate", candidate_id, result)
            .await
    }

    async fn complete_action_inner(
        &self,
        candidate_id: Uuid,
        log_id: i64,
        payload: CompleteActionRequest,
        actor: &Actor,
    ) -> Result<CompleteActionResponse> {
        if payload.resolution.trim().is_empty() {
            return Err(Error::ValidationFailed("resolution is required".into()));
        }
        let next_step = payload
            .next_step
            .as_deref()
            .map(str::parse::<WorkflowStep>)
            .transpose()?;
        if next_step.map(|s| s.is_meta()).unwrap_or(false) {
            return Err(Error::BadRequest(
                "pause/resume cannot be used as next_step".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let candidate = CandidateService::lock(&mut tx, candidate_id).await?;
        let entry = WorkflowLogService::get_for_update(&mut tx, log_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Workflow log entry {} not found", log_id)))?;
        if !entry.requires_hr_action {
            return Err(Error::Conflict {
                message: format!("Workflow log entry {} has no pending HR action", log_id),
                conflicting_id: None,
            });
        }

        let resolution = json!({
            "note": payload.resolution.trim(),
            "resolved_by": actor.id,
            "resolved_at": chrono::Utc::now(),
            "next_step": next_step.map(|s| s.as_str()),
            "detail": payload.detail,
        });
        let resolved = WorkflowLogService::resolve(&mut tx, log_id, &resolution).await?;

        let current = WorkflowLogService::current_step(&mut tx, candidate_id).await?;
        let (transition, status) = match next_step {
            Some(target) => {
                Self::ensure_transition(current, target)?;
                if target == WorkflowStep::Rejected {
                    sqlx::query("UPDATE candidates SET rejection_reason = $2 WHERE id = $1")
                        .bind(candidate_id)
                        .bind(payload.resolution.trim())
                        .execute(&mut *tx)
                        .await?;
                }
                let new_entry = NewLogEntry::new(target, "hr_action_completed", actor.clone())
                    .with_details(json!({
                        "resolved_log_id": log_id,
                        "resolution": payload.resolution.trim(),
                    }));
                let (result, updated) =
                    Self::record_step(&mut tx, &candidate, current, new_entry).await?;
                (Some(result), updated.status)
            }
            None => (None, candidate.status.clone()),
        };

        let latest = WorkflowLogService::latest(&mut tx, candidate_id).await?;
        tx.commit().await?;

        tracing::info!(%candidate_id, log_id, actor = %actor, "HR action completed");

        Ok(CompleteActionResponse {
            log_id,
            candidate_id,
            resolved,
            current_step: transition
                .as_ref()
                .map(|t| t.new_step.as_str().to_string())
                .or_else(|| current.map(|s| s.as_str().to_string())),
            transition,
            status,
            requires_hr_action: latest.map(|l| l.requires_hr_action).unwrap_or(false),
        })
    }

    pub async fn history(&self, candidate_id: Uuid) -> Result<WorkflowHistoryResponse> {
        let candidate = self.candidates.require_candidate(candidate_id).await?;
        let entries = self.log.history(candidate_id).await?;
        let current_step = entries
            .iter()
            .rev()
            .find(|e| !matches!(e.workflow_step.as_str(), "paused" | "resumed"))
            .map(|e| e.workflow_step.clone());
        Ok(WorkflowHistoryResponse {
            candidate_id,
            status: candidate.status,
            automation_status: candidate.automation_status,
            current_step,
            entries,
        })
    }

    pub async fn pending_actions(&self, page: i64, per_page: i64) -> Result<PendingActionList> {
        self.log.pending_actions(page, per_page).await
    }

    pub async fn status_summary(&self) -> Result<WorkflowStatusSummary> {
        let by_status = self.candidates.get_status_counts().await?;
        let by_automation_status = self.candidates.get_automation_counts().await?;
        let pending_actions = self.log.pending_count().await?;
        Ok(WorkflowStatusSummary {
            total_candidates: by_status.values().sum(),
            by_status,
            by_automation_status,
            pending_actions,
        })
    }
}
