use crate::error::Result;
use crate::models::workflow::{NewLogEntry, WorkflowLogEntry, WorkflowStep};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

const LOG_COLUMNS: &str = "id, candidate_id, workflow_step, previous_step, action_taken, actor, actor_id, \
    details, is_automated, requires_hr_action, hr_prompt, created_at";

/// Latest ledger entry of a candidate that still waits for a human decision.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingAction {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: WorkflowLogEntry,
    pub candidate_name: String,
    pub candidate_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingActionList {
    pub items: Vec<PendingAction>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Append-only writer and reader for `workflow_logs`. Rows are never deleted;
/// the only update is clearing `requires_hr_action` with a merged resolution.
#[derive(Clone)]
pub struct WorkflowLogService {
    pool: PgPool,
}

impl WorkflowLogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(
        conn: &mut PgConnection,
        candidate_id: Uuid,
        previous_step: Option<WorkflowStep>,
        entry: &NewLogEntry,
    ) -> Result<WorkflowLogEntry> {
        let sql = format!(
            r#"
            INSERT INTO workflow_logs (
                candidate_id, workflow_step, previous_step, action_taken, actor, actor_id,
                details, is_automated, requires_hr_action, hr_prompt
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            LOG_COLUMNS
        );
        let row = sqlx::query_as::<_, WorkflowLogEntry>(&sql)
            .bind(candidate_id)
            .bind(entry.step.as_str())
            .bind(previous_step.map(|s| s.as_str()))
            .bind(&entry.action_taken)
            .bind(entry.actor.kind.as_str())
            .bind(&entry.actor.id)
            .bind(&entry.details)
            .bind(entry.actor.is_automated())
            .bind(entry.requires_hr_action)
            .bind(&entry.hr_prompt)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Step of the latest non-meta entry; pause/resume markers do not move the
    /// candidate through the pipeline.
    pub async fn current_step(
        conn: &mut PgConnection,
        candidate_id: Uuid,
    ) -> Result<Option<WorkflowStep>> {
        let step: Option<String> = sqlx::query_scalar(
            r#"
            SELECT workflow_step
            FROM workflow_logs
            WHERE candidate_id = $1
              AND workflow_step NOT IN ('paused', 'resumed')
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(candidate_id)
        .fetch_optional(&mut *conn)
        .await?;
        step.map(|s| s.parse()).transpose()
    }

    pub async fn latest(
        conn: &mut PgConnection,
        candidate_id: Uuid,
    ) -> Result<Option<WorkflowLogEntry>> {
        let sql = format!(
            "SELECT {} FROM workflow_logs WHERE candidate_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
            LOG_COLUMNS
        );
        let row = sqlx::query_as::<_, WorkflowLogEntry>(&sql)
            .bind(candidate_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn get_for_update(
        conn: &mut PgConnection,
        log_id: i64,
    ) -> Result<Option<WorkflowLogEntry>> {
        let sql = format!("SELECT {} FROM workflow_logs WHERE id = $1 FOR UPDATE", LOG_COLUMNS);
        let row = sqlx::query_as::<_, WorkflowLogEntry>(&sql)
            .bind(log_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn candidate_of(&self, log_id: i64) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar("SELECT candidate_id FROM workflow_logs WHERE id = $1")
            .bind(log_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// Clears the HR flag and merges `resolution` into the existing details
    /// under the `resolution` key; the original automated context stays intact.
    pub async fn resolve(
        conn: &mut PgConnection,
        log_id: i64,
        resolution: &JsonValue,
    ) -> Result<WorkflowLogEntry> {
        let sql = format!(
            r#"
            UPDATE workflow_logs
            SET requires_hr_action = FALSE,
                details = COALESCE(details, '{{}}'::jsonb) || jsonb_build_object('resolution', $2::jsonb)
            WHERE id = $1
            RETURNING {}
            "#,
            LOG_COLUMNS
        );
        let row = sqlx::query_as::<_, WorkflowLogEntry>(&sql)
            .bind(log_id)
            .bind(resolution)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn history(&self, candidate_id: Uuid) -> Result<Vec<WorkflowLogEntry>> {
        let sql = format!(
            "SELECT {} FROM workflow_logs WHERE candidate_id = $1 ORDER BY created_at ASC, id ASC",
            LOG_COLUMNS
        );
        let rows = sqlx::query_as::<_, WorkflowLogEntry>(&sql)
            .bind(candidate_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn pending_actions(&self, page: i64, per_page: i64) -> Result<PendingActionList> {
        let (page, per_page, offset) = page_window(page, per_page);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM workflow_logs l
            WHERE l.requires_hr_action = TRUE
              AND l.id = (SELECT MAX(l2.id) FROM workflow_logs l2 WHERE l2.candidate_id = l.candidate_id)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, PendingAction>(
            r#"
            SELECT l.id, l.candidate_id, l.workflow_step, l.previous_step, l.action_taken, l.actor,
                   l.actor_id, l.details, l.is_automated, l.requires_hr_action, l.hr_prompt, l.created_at,
                   c.name AS candidate_name, c.status AS candidate_status
            FROM workflow_logs l
            JOIN candidates c ON c.id = l.candidate_id
            WHERE l.requires_hr_action = TRUE
              AND l.id = (SELECT MAX(l2.id) FROM workflow_logs l2 WHERE l2.candidate_id = l.candidate_id)
            ORDER BY l.created_at ASC, l.id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;
        Ok(PendingActionList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn pending_count(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM workflow_logs l
            WHERE l.requires_hr_action = TRUE
              AND l.id = (SELECT MAX(l2.id) FROM workflow_logs l2 WHERE l2.candidate_id = l.candidate_id)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}

/// Normalizes paging input into `(page, per_page, offset)`. Out-of-range pages
/// saturate to an empty window.
fn page_window(page: i64, per_page: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let per_page = per_page.clamp(1, 100);
    (page, per_page, (page - 1).saturating_mul(per_page))
}
