use crate::error::{Error, Result};
use crate::models::audit_log::AuditLog;
use crate::models::workflow::Actor;
use serde_json::{json, Value as JsonValue};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Generic audit trail for mutations that are not workflow transitions
/// (CTC edits, policy changes) and for refused mutation attempts.
#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record<'e, E>(
        executor: E,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        changes: Option<JsonValue>,
    ) -> Result<AuditLog>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (actor_id, action, entity_type, entity_id, changes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, actor_id, action, entity_type, entity_id, changes, created_at
            "#,
        )
        .bind(actor.to_string())
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(changes)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn log(
        &self,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        changes: Option<JsonValue>,
    ) -> Result<AuditLog> {
        Self::record(&self.pool, actor, action, entity_type, entity_id, changes).await
    }

    /// Records a refused mutation. Never fails the caller: the original error is
    /// what gets surfaced.
    pub async fn record_failure(
        &self,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        err: &Error,
    ) {
        tracing::warn!(
            %entity_id,
            entity_type,
            action,
            actor = %actor,
            error = %err,
            "Mutation attempt refused"
        );
        let changes = json!({ "error": err.to_string() });
        let failed_action = format!("{}.failed", action);
        if let Err(e) = self
            .log(actor, &failed_action, entity_type, entity_id, Some(changes))
            .await
        {
            tracing::error!(error = ?e, %entity_id, "Failed to write audit record for refused attempt");
        }
    }

    pub async fn list_for_entity(&self, entity_id: Uuid) -> Result<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, actor_id, action, entity_type, entity_id, changes, created_at
            FROM audit_logs
            WHERE entity_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn audited<T>(
        &self,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        result: Result<T>,
    ) -> Result<T> {
        if let Err(err) = &result {
            self.record_failure(actor, action, entity_type, entity_id, err)
                .await;
        }
        result
    }
}
