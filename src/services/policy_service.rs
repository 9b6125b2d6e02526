use crate::dto::workflow_dto::UpsertPolicyRequest;
use crate::error::{Error, Result};
use crate::models::threshold_policy::{PolicyScope, ThresholdPolicy, ThresholdPolicyRecord};
use crate::models::workflow::Actor;
use crate::services::audit_service::AuditService;
use sqlx::PgPool;
use uuid::Uuid;

/// Stored threshold overrides, resolved vacancy -> department -> global ->
/// configured defaults.
#[derive(Clone)]
pub struct PolicyService {
    pool: PgPool,
    defaults: ThresholdPolicy,
}

impl PolicyService {
    pub fn new(pool: PgPool, defaults: ThresholdPolicy) -> Self {
        Self { pool, defaults }
    }

    pub async fn resolve(
        &self,
        vacancy_id: Option<Uuid>,
        department: Option<&str>,
    ) -> Result<ThresholdPolicy> {
        let (_, policy) = self.resolve_with_scope(vacancy_id, department).await?;
        Ok(policy)
    }

    pub async fn resolve_with_scope(
        &self,
        vacancy_id: Option<Uuid>,
        department: Option<&str>,
    ) -> Result<(String, ThresholdPolicy)> {
        let mut scopes = Vec::with_capacity(3);
        if let Some(vid) = vacancy_id {
            scopes.push(PolicyScope::Vacancy(vid).key());
        }
        if let Some(dept) = department.filter(|d| !d.trim().is_empty()) {
            scopes.push(PolicyScope::Department(dept.to_string()).key());
        }
        scopes.push(PolicyScope::Global.key());

        let records = sqlx::query_as::<_, ThresholdPolicyRecord>(
            r#"
            SELECT id, scope, auto_reject_threshold, hr_review_threshold, auto_shortlist_threshold,
                   interview_pass_score, updated_by, updated_at
            FROM threshold_policies
            WHERE scope = ANY($1)
            "#,
        )
        .bind(&scopes)
        .fetch_all(&self.pool)
        .await?;

        for scope in &scopes {
            if let Some(record) = records.iter().find(|r| &r.scope == scope) {
                return Ok((scope.clone(), record.clone().into()));
            }
        }
        Ok(("default".to_string(), self.defaults.clone()))
    }

    pub async fn list(&self) -> Result<Vec<ThresholdPolicyRecord>> {
        let rows = sqlx::query_as::<_, ThresholdPolicyRecord>(
            r#"
            SELECT id, scope, auto_reject_threshold, hr_review_threshold, auto_shortlist_threshold,
                   interview_pass_score, updated_by, updated_at
            FROM threshold_policies
            ORDER BY scope
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn upsert(
        &self,
        payload: UpsertPolicyRequest,
        actor: Actor,
    ) -> Result<ThresholdPolicyRecord> {
        let scope = match (payload.vacancy_id, payload.department.as_deref()) {
            (Some(_), Some(_)) => {
                return Err(Error::BadRequest(
                    "a policy is scoped to a vacancy or a department, not both".into(),
                ))
            }
            (Some(vid), None) => PolicyScope::Vacancy(vid),
            (None, Some(dept)) => PolicyScope::Department(dept.to_string()),
            (None, None) => PolicyScope::Global,
        };
        let policy = ThresholdPolicy {
            auto_reject_threshold: payload.auto_reject_threshold,
            hr_review_threshold: payload.hr_review_threshold,
            auto_shortlist_threshold: payload.auto_shortlist_threshold,
            interview_pass_score: payload.interview_pass_score,
        };
        policy.check().map_err(Error::ValidationFailed)?;

        let mut tx = self.pool.begin().await?;
        let record = sqlx::query_as::<_, ThresholdPolicyRecord>(
            r#"
            INSERT INTO threshold_policies (
                scope, auto_reject_threshold, hr_review_threshold, auto_shortlist_threshold,
                interview_pass_score, updated_by
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (scope) DO UPDATE SET
                auto_reject_threshold = EXCLUDED.auto_reject_threshold,
                hr_review_threshold = EXCLUDED.hr_review_threshold,
                auto_shortlist_threshold = EXCLUDED.auto_shortlist_threshold,
                interview_pass_score = EXCLUDED.interview_pass_score,
                updated_by = EXCLUDED.updated_by,
                updated_at = NOW()
            RETURNING id, scope, auto_reject_threshold, hr_review_threshold, auto_shortlist_threshold,
                      interview_pass_score, updated_by, updated_at
            "#,
        )
        .bind(scope.key())
        .bind(policy.auto_reject_threshold)
        .bind(policy.hr_review_threshold)
        .bind(policy.auto_shortlist_threshold)
        .bind(policy.interview_pass_score)
        .bind(&actor.id)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            &actor,
            "threshold_policy.upsert",
            "threshold_policy",
            record.id,
            Some(serde_json::to_value(&policy)?),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(scope = %record.scope, actor = %actor, "Threshold policy updated");
        Ok(record)
    }
}
