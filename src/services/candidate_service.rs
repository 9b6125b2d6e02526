use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CANDIDATE_COLUMNS};
use crate::models::vacancy::Vacancy;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

/// Read access to candidate and vacancy records owned by the CRUD modules.
#[derive(Clone)]
pub struct CandidateService {
    pool: PgPool,
}

impl CandidateService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        let sql = format!("SELECT {} FROM candidates WHERE id = $1", CANDIDATE_COLUMNS);
        let candidate = sqlx::query_as::<_, Candidate>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(candidate)
    }

    pub async fn require_candidate(&self, id: Uuid) -> Result<Candidate> {
        self.get_candidate(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))
    }

    /// Locks the candidate row for the rest of the transaction. Every workflow
    /// mutation goes through here first, so writes for one candidate are serialized.
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Candidate> {
        let sql = format!(
            "SELECT {} FROM candidates WHERE id = $1 FOR UPDATE",
            CANDIDATE_COLUMNS
        );
        sqlx::query_as::<_, Candidate>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))
    }

    pub async fn get_vacancy(&self, id: Uuid) -> Result<Option<Vacancy>> {
        let vacancy = sqlx::query_as::<_, Vacancy>(
            r#"
            SELECT id, title, department, description, requirements, skills,
                   salary_from, salary_to, currency, created_at
            FROM vacancies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vacancy)
    }

    pub async fn vacancy_for(&self, candidate: &Candidate) -> Result<Option<Vacancy>> {
        match candidate.vacancy_id {
            Some(vid) => self.get_vacancy(vid).await,
            None => Ok(None),
        }
    }

    pub async fn get_status_counts(&self) -> Result<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) AS count
            FROM candidates
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn get_automation_counts(&self) -> Result<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT automation_status, COUNT(*) AS count
            FROM candidates
            GROUP BY automation_status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}
