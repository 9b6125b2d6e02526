use crate::dto::ctc_dto::{
    BenchmarkReport, CtcProposal, CtcValidation, ExpectationGap, FinalizeCtcResponse,
    GenerateBreakdownResponse, OfferLetterPayload, SalaryRange, StartCtcResponse,
};
use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::ctc_discussion::{
    max_amount, CtcDiscussion, CtcStatus, SalaryBreakdown, CTC_COLUMNS,
};
use crate::models::workflow::{Actor, NewLogEntry, WorkflowStep};
use crate::services::audit_service::AuditService;
use crate::services::candidate_service::CandidateService;
use crate::services::workflow_log_service::WorkflowLogService;
use crate::services::workflow_service::WorkflowService;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Compensation negotiation between `selected` and offer-letter generation.
#[derive(Clone)]
pub struct CtcService {
    pool: PgPool,
    candidates: CandidateService,
    audit: AuditService,
}

impl CtcService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            candidates: CandidateService::new(pool.clone()),
            audit: AuditService::new(pool.clone()),
            pool,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<CtcDiscussion> {
        let sql = format!("SELECT {} FROM ctc_discussions WHERE id = $1", CTC_COLUMNS);
        sqlx::query_as::<_, CtcDiscussion>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("CTC discussion {} not found", id)))
    }

    /// Active discussion of a candidate, or the most recent cancelled one.
    pub async fn get_for_candidate(&self, candidate_id: Uuid) -> Result<CtcDiscussion> {
        let sql = format!(
            "SELECT {} FROM ctc_discussions WHERE candidate_id = $1 \
             ORDER BY (status <> 'cancelled') DESC, created_at DESC LIMIT 1",
            CTC_COLUMNS
        );
        sqlx::query_as::<_, CtcDiscussion>(&sql)
            .bind(candidate_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("No CTC discussion for candidate {}", candidate_id))
            })
    }

    async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<CtcDiscussion> {
        let sql = format!("SELECT {} FROM ctc_discussions WHERE id = $1 FOR UPDATE", CTC_COLUMNS);
        sqlx::query_as::<_, CtcDiscussion>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| Error::NotFound(format!("CTC discussion {} not found", id)))
    }

    fn ensure_editable(discussion: &CtcDiscussion) -> Result<()> {
        match discussion.status()? {
            CtcStatus::Finalized => Err(Error::ValidationFailed(format!(
                "CTC discussion {} is finalized and can no longer be changed",
                discussion.id
            ))),
            CtcStatus::Cancelled => Err(Error::ValidationFailed(format!(
                "CTC discussion {} is cancelled",
                discussion.id
            ))),
            CtcStatus::Pending | CtcStatus::InProgress => Ok(()),
        }
    }

    pub async fn start(
        &self,
        candidate_id: Uuid,
        proposal: CtcProposal,
        actor: Actor,
    ) -> Result<StartCtcResponse> {
        let result = self.start_inner(candidate_id, proposal, &actor).await;
        self.audit
            .audited(&actor, "ctc.start", "candidate", candidate_id, result)
            .await
    }

    async fn start_inner(
        &self,
        candidate_id: Uuid,
        proposal: CtcProposal,
        actor: &Actor,
    ) -> Result<StartCtcResponse> {
        proposal.check_amounts().map_err(Error::ValidationFailed)?;
        let snapshot = self.candidates.require_candidate(candidate_id).await?;
        let vacancy_title = self.candidates.vacancy_for(&snapshot).await?.map(|v| v.title);

        let mut tx = self.pool.begin().await?;
        let candidate = CandidateService::lock(&mut tx, candidate_id).await?;

        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM ctc_discussions WHERE candidate_id = $1 AND status <> 'cancelled' LIMIT 1",
        )
        .bind(candidate_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(existing_id) = existing {
            return Err(Error::Conflict {
                message: format!(
                    "Candidate {} already has an open CTC discussion",
                    candidate_id
                ),
                conflicting_id: Some(existing_id),
            });
        }

        let current = WorkflowLogService::current_step(&mut tx, candidate_id).await?;
        WorkflowService::ensure_transition(current, WorkflowStep::CtcDiscussion)?;

        let sql = format!(
            r#"
            INSERT INTO ctc_discussions (
                candidate_id, designation, expected_ctc, offered_ctc, fixed_pay, variable_pay,
                joining_bonus, joining_date, notes, status, created_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10)
            RETURNING {}
            "#,
            CTC_COLUMNS
        );
        let discussion = sqlx::query_as::<_, CtcDiscussion>(&sql)
            .bind(candidate_id)
            .bind(proposal.designation.clone().or(vacancy_title))
            .bind(proposal.expected_ctc.or(candidate.expected_ctc))
            .bind(proposal.offered_ctc)
            .bind(proposal.fixed_pay)
            .bind(proposal.variable_pay)
            .bind(proposal.joining_bonus)
            .bind(proposal.joining_date)
            .bind(&proposal.notes)
            .bind(&actor.id)
            .fetch_one(&mut *tx)
            .await?;

        let entry = NewLogEntry::new(WorkflowStep::CtcDiscussion, "ctc_discussion_started", actor.clone())
            .with_details(json!({
                "ctc_discussion_id": discussion.id,
                "expected_ctc": discussion.expected_ctc,
                "offered_ctc": discussion.offered_ctc,
            }));
        let (transition, _) = WorkflowService::record_step(&mut tx, &candidate, current, entry).await?;
        tx.commit().await?;

        Ok(StartCtcResponse {
            discussion,
            transition,
        })
    }

    pub async fn update(&self, id: Uuid, partial: CtcProposal, actor: Actor) -> Result<CtcDiscussion> {
        let result = self.update_inner(id, partial, &actor).await;
        self.audit.audited(&actor, "ctc.update", "ctc_discussion", id, result).await
    }

    async fn update_inner(&self, id: Uuid, partial: CtcProposal, actor: &Actor) -> Result<CtcDiscussion> {
        partial.check_amounts().map_err(Error::ValidationFailed)?;
        let mut tx = self.pool.begin().await?;
        let discussion = Self::lock(&mut tx, id).await?;
        Self::ensure_editable(&discussion)?;

        let sql = format!(
            r#"
            UPDATE ctc_discussions SET
                designation = COALESCE($2, designation),
                expected_ctc = COALESCE($3, expected_ctc),
                offered_ctc = COALESCE($4, offered_ctc),
                fixed_pay = COALESCE($5, fixed_pay),
                variable_pay = COALESCE($6, variable_pay),
                joining_bonus = COALESCE($7, joining_bonus),
                joining_date = COALESCE($8, joining_date),
                notes = COALESCE($9, notes),
                status = CASE WHEN status = 'pending' THEN 'in_progress' ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CTC_COLUMNS
        );
        let updated = sqlx::query_as::<_, CtcDiscussion>(&sql)
            .bind(id)
            .bind(&partial.designation)
            .bind(partial.expected_ctc)
            .bind(partial.offered_ctc)
            .bind(partial.fixed_pay)
            .bind(partial.variable_pay)
            .bind(partial.joining_bonus)
            .bind(partial.joining_date)
            .bind(&partial.notes)
            .fetch_one(&mut *tx)
            .await?;

        AuditService::record(
            &mut *tx,
            actor,
            "ctc.update",
            "ctc_discussion",
            id,
            Some(serde_json::to_value(&partial)?),
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn generate_breakdown(
        &self,
        id: Uuid,
        annual_ctc: Option<Decimal>,
        actor: Actor,
    ) -> Result<GenerateBreakdownResponse> {
        let result = self.generate_breakdown_inner(id, annual_ctc, &actor).await;
        self.audit
            .audited(&actor, "ctc.generate_breakdown", "ctc_discussion", id, result)
            .await
    }

    async fn generate_breakdown_inner(
        &self,
        id: Uuid,
        annual_ctc: Option<Decimal>,
        actor: &Actor,
    ) -> Result<GenerateBreakdownResponse> {
        let mut tx = self.pool.begin().await?;
        let discussion = Self::lock(&mut tx, id).await?;
        Self::ensure_editable(&discussion)?;

        let figure = annual_ctc.or(discussion.offered_ctc).ok_or_else(|| {
            Error::ValidationFailed("annual_ctc or offered_ctc is required for a breakdown".into())
        })?;
        if figure <= Decimal::ZERO {
            return Err(Error::ValidationFailed("annual CTC must be positive".into()));
        }
        if figure > max_amount() {
            return Err(Error::ValidationFailed(format!(
                "annual CTC must not exceed {}",
                max_amount()
            )));
        }

        let breakdown = SalaryBreakdown::generate(figure);
        let sql = format!(
            r#"
            UPDATE ctc_discussions SET
                salary_breakdown = $2,
                offered_ctc = COALESCE(offered_ctc, $3),
                status = 'in_progress',
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CTC_COLUMNS
        );
        let updated = sqlx::query_as::<_, CtcDiscussion>(&sql)
            .bind(id)
            .bind(serde_json::to_value(&breakdown)?)
            .bind(figure)
            .fetch_one(&mut *tx)
            .await?;

        AuditService::record(
            &mut *tx,
            actor,
            "ctc.generate_breakdown",
            "ctc_discussion",
            id,
            Some(json!({ "annual_ctc": figure })),
        )
        .await?;
        tx.commit().await?;

        Ok(GenerateBreakdownResponse {
            discussion: updated,
            breakdown,
        })
    }

    pub async fn compare_benchmark(&self, id: Uuid, actor: Actor) -> Result<BenchmarkReport> {
        let result = self.compare_benchmark_inner(id, &actor).await;
        self.audit
            .audited(&actor, "ctc.compare_benchmark", "ctc_discussion", id, result)
            .await
    }

    async fn compare_benchmark_inner(&self, id: Uuid, actor: &Actor) -> Result<BenchmarkReport> {
        let discussion = self.get(id).await?;
        let candidate = self.candidates.require_candidate(discussion.candidate_id).await?;
        let vacancy = self.candidates.vacancy_for(&candidate).await?;

        let designation = discussion
            .designation
            .clone()
            .or_else(|| vacancy.as_ref().map(|v| v.title.clone()));
        let historical = match designation.as_deref() {
            Some(d) => self.historical_benchmark(d).await?,
            None => None,
        };
        let vacancy_range = vacancy
            .as_ref()
            .and_then(|v| range_from_bounds(v.salary_from, v.salary_to, "vacancy"));

        let report = build_benchmark(
            designation,
            vacancy.as_ref().and_then(|v| v.currency.clone()),
            discussion.offered_ctc,
            discussion.expected_ctc.or(candidate.expected_ctc),
            vacancy_range,
            historical,
        );

        let mut tx = self.pool.begin().await?;
        let locked = Self::lock(&mut tx, id).await?;
        // Finalized and cancelled discussions keep their last snapshot.
        if Self::ensure_editable(&locked).is_ok() {
            sqlx::query(
                "UPDATE ctc_discussions SET company_benchmark = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .bind(serde_json::to_value(&report)?)
            .execute(&mut *tx)
            .await?;
            AuditService::record(
                &mut *tx,
                actor,
                "ctc.compare_benchmark",
                "ctc_discussion",
                id,
                Some(json!({ "reference": report.reference })),
            )
            .await?;
        }
        tx.commit().await?;
        Ok(report)
    }

    async fn historical_benchmark(&self, designation: &str) -> Result<Option<SalaryRange>> {
        let row: Option<(Decimal, Option<Decimal>, Decimal)> = sqlx::query_as(
            r#"
            SELECT min_ctc, median_ctc, max_ctc
            FROM salary_benchmarks
            WHERE LOWER(designation) = LOWER($1)
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(designation.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(min, median, max)| SalaryRange {
            min,
            max,
            median,
            source: "historical".to_string(),
        }))
    }

    pub async fn validate(&self, id: Uuid) -> Result<CtcValidation> {
        let discussion = self.get(id).await?;
        Ok(validate_discussion(&discussion, chrono::Utc::now().date_naive()))
    }

    pub async fn finalize(
        &self,
        id: Uuid,
        candidate_accepted: bool,
        actor: Actor,
    ) -> Result<FinalizeCtcResponse> {
        let result = self.finalize_inner(id, candidate_accepted, &actor).await;
        self.audit
            .audited(&actor, "ctc.finalize", "ctc_discussion", id, result)
            .await
    }

    async fn finalize_inner(
        &self,
        id: Uuid,
        candidate_accepted: bool,
        actor: &Actor,
    ) -> Result<FinalizeCtcResponse> {
        let candidate_id = self.get(id).await?.candidate_id;

        let mut tx = self.pool.begin().await?;
        let candidate = CandidateService::lock(&mut tx, candidate_id).await?;
        let discussion = Self::lock(&mut tx, id).await?;
        Self::ensure_editable(&discussion)?;

        let mut missing = Vec::new();
        if discussion.offered_ctc.is_none() {
            missing.push("offered_ctc");
        }
        if discussion.joining_date.is_none() {
            missing.push("joining_date");
        }
        let (Some(offered_ctc), Some(joining_date)) = (discussion.offered_ctc, discussion.joining_date)
        else {
            return Err(Error::ValidationFailed(format!(
                "cannot finalize CTC discussion, missing: {}",
                missing.join(", ")
            )));
        };

        let current = WorkflowLogService::current_step(&mut tx, candidate_id).await?;
        WorkflowService::ensure_transition(current, WorkflowStep::CtcFinalized)?;

        let sql = format!(
            r#"
            UPDATE ctc_discussions SET
                status = 'finalized',
                finalized_by = $2,
                finalized_at = NOW(),
                candidate_response = COALESCE(candidate_response, $3),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CTC_COLUMNS
        );
        let finalized = sqlx::query_as::<_, CtcDiscussion>(&sql)
            .bind(id)
            .bind(&actor.id)
            .bind(if candidate_accepted { "accepted" } else { "declined" })
            .fetch_one(&mut *tx)
            .await?;

        let entry = NewLogEntry::new(WorkflowStep::CtcFinalized, "ctc_finalized", actor.clone())
            .with_details(json!({
                "ctc_discussion_id": id,
                "offered_ctc": offered_ctc,
                "joining_date": joining_date,
                "candidate_accepted": candidate_accepted,
            }));
        let (first, candidate) = WorkflowService::record_step(&mut tx, &candidate, current, entry).await?;
        let mut transitions = vec![first];

        let offer_letter = if candidate_accepted {
            let payload = offer_letter_payload(&candidate, &finalized, offered_ctc, joining_date);
            let entry = NewLogEntry::new(
                WorkflowStep::GenerateOfferLetter,
                "offer_letter_ready",
                Actor::system(),
            )
            .with_details(json!({
                "ctc_discussion_id": id,
                "offer_letter": payload,
            }))
            .needs_hr(format!(
                "CTC finalized at {} with joining date {}. Generate and send the offer letter to {}.",
                offered_ctc, joining_date, candidate.name
            ));
            let (second, _) = WorkflowService::record_step(
                &mut tx,
                &candidate,
                Some(WorkflowStep::CtcFinalized),
                entry,
            )
            .await?;
            transitions.push(second);
            Some(payload)
        } else {
            None
        };

        tx.commit().await?;
        tracing::info!(
            ctc_discussion_id = %id,
            %candidate_id,
            candidate_accepted,
            actor = %actor,
            "CTC discussion finalized"
        );

        Ok(FinalizeCtcResponse {
            discussion: finalized,
            transitions,
            offer_letter,
        })
    }

    /// The one field that stays writable after finalization.
    pub async fn record_response(&self, id: Uuid, response: String, actor: Actor) -> Result<CtcDiscussion> {
        let result = self.record_response_inner(id, response, &actor).await;
        self.audit
            .audited(&actor, "ctc.candidate_response", "ctc_discussion", id, result)
            .await
    }

    async fn record_response_inner(
        &self,
        id: Uuid,
        response: String,
        actor: &Actor,
    ) -> Result<CtcDiscussion> {
        if response.trim().is_empty() {
            return Err(Error::ValidationFailed("response is required".into()));
        }
        let mut tx = self.pool.begin().await?;
        let discussion = Self::lock(&mut tx, id).await?;
        if discussion.status()? == CtcStatus::Cancelled {
            return Err(Error::ValidationFailed(format!(
                "CTC discussion {} is cancelled",
                id
            )));
        }
        let sql = format!(
            "UPDATE ctc_discussions SET candidate_response = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            CTC_COLUMNS
        );
        let updated = sqlx::query_as::<_, CtcDiscussion>(&sql)
            .bind(id)
            .bind(response.trim())
            .fetch_one(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            actor,
            "ctc.candidate_response",
            "ctc_discussion",
            id,
            Some(json!({ "response": response.trim() })),
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn cancel(&self, id: Uuid, reason: String, actor: Actor) -> Result<CtcDiscussion> {
        let result = self.cancel_inner(id, reason, &actor).await;
        self.audit.audited(&actor, "ctc.cancel", "ctc_discussion", id, result).await
    }

    async fn cancel_inner(&self, id: Uuid, reason: String, actor: &Actor) -> Result<CtcDiscussion> {
        let mut tx = self.pool.begin().await?;
        let discussion = Self::lock(&mut tx, id).await?;
        Self::ensure_editable(&discussion)?;
        let sql = format!(
            "UPDATE ctc_discussions SET status = 'cancelled', updated_at = NOW() WHERE id = $1 RETURNING {}",
            CTC_COLUMNS
        );
        let updated = sqlx::query_as::<_, CtcDiscussion>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            actor,
            "ctc.cancel",
            "ctc_discussion",
            id,
            Some(json!({ "reason": reason })),
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }
}

fn offer_letter_payload(
    candidate: &Candidate,
    discussion: &CtcDiscussion,
    offered_ctc: Decimal,
    joining_date: NaiveDate,
) -> OfferLetterPayload {
    OfferLetterPayload {
        candidate_id: candidate.id,
        candidate_name: candidate.name.clone(),
        candidate_email: candidate.email.clone(),
        designation: discussion.designation.clone(),
        offered_ctc,
        fixed_pay: discussion.fixed_pay,
        variable_pay: discussion.variable_pay,
        joining_bonus: discussion.joining_bonus,
        joining_date,
        salary_breakdown: discussion.salary_breakdown.clone(),
    }
}

fn range_from_bounds(from: Option<Decimal>, to: Option<Decimal>, source: &str) -> Option<SalaryRange> {
    let (min, max) = match (from, to) {
        (Some(a), Some(b)) => (a.min(b), a.max(b)),
        (Some(a), None) | (None, Some(a)) => (a, a),
        (None, None) => return None,
    };
    Some(SalaryRange {
        min,
        max,
        median: None,
        source: source.to_string(),
    })
}

fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part / whole * Decimal::from(100)).round_dp(2)
}

/// Best-effort comparison. Reference range precedence: vacancy, historical,
/// then a +/-10% band around the offer.
pub fn build_benchmark(
    designation: Option<String>,
    currency: Option<String>,
    offered_ctc: Option<Decimal>,
    expected_ctc: Option<Decimal>,
    vacancy_range: Option<SalaryRange>,
    historical_range: Option<SalaryRange>,
) -> BenchmarkReport {
    let mut analysis = Vec::new();

    let offer_band = match (&vacancy_range, &historical_range, offered_ctc) {
        (None, None, Some(offered)) => {
            let spread = offered * Decimal::new(10, 2);
            Some(SalaryRange {
                min: (offered - spread).round_dp(2),
                max: (offered + spread).round_dp(2),
                median: Some(offered),
                source: "offer_band".to_string(),
            })
        }
        _ => None,
    };
    let reference = vacancy_range
        .clone()
        .or_else(|| historical_range.clone())
        .or_else(|| offer_band.clone());

    match &reference {
        Some(r) if r.source == "offer_band" => analysis.push(
            "No vacancy range or historical benchmark available; using a +/-10% band around the offer."
                .to_string(),
        ),
        Some(r) => analysis.push(format!("Reference range {} - {} ({}).", r.min, r.max, r.source)),
        None => analysis.push("No benchmark data and no offer on record yet.".to_string()),
    }

    let (offer_position, within_range) = match (offered_ctc, &reference) {
        (Some(offered), Some(r)) => {
            let position = if offered < r.min {
                "below_range"
            } else if offered > r.max {
                "above_range"
            } else {
                "within_range"
            };
            let msg = match position {
                "below_range" => format!(
                    "Offer {} is {}% below the reference minimum {}.",
                    offered,
                    percent_of(r.min - offered, r.min),
                    r.min
                ),
                "above_range" => format!(
                    "Offer {} is {}% above the reference maximum {}.",
                    offered,
                    percent_of(offered - r.max, r.max),
                    r.max
                ),
                _ => format!("Offer {} is within the reference range.", offered),
            };
            analysis.push(msg);
            (Some(position.to_string()), Some(position == "within_range"))
        }
        _ => (None, None),
    };

    let expectation_gap = match (expected_ctc, offered_ctc) {
        (Some(expected), Some(offered)) => {
            let amount = expected - offered;
            let direction = if amount > Decimal::ZERO {
                "expectation_above_offer"
            } else if amount < Decimal::ZERO {
                "expectation_below_offer"
            } else {
                "matches"
            };
            let percent = percent_of(amount.abs(), offered);
            analysis.push(match direction {
                "expectation_above_offer" => format!(
                    "Candidate expects {} more than offered ({}%); negotiation likely.",
                    amount, percent
                ),
                "expectation_below_offer" => format!(
                    "Offer exceeds the candidate's expectation by {} ({}%).",
                    amount.abs(),
                    percent
                ),
                _ => "Offer matches the candidate's expectation.".to_string(),
            });
            Some(ExpectationGap {
                direction: direction.to_string(),
                amount: amount.abs(),
                percent,
            })
        }
        (Some(_), None) => {
            analysis.push("Candidate expectation recorded but no offer yet.".to_string());
            None
        }
        _ => None,
    };

    BenchmarkReport {
        designation,
        currency,
        offered_ctc,
        expected_ctc,
        vacancy_range,
        historical_range,
        offer_band,
        reference,
        offer_position,
        within_range,
        expectation_gap,
        analysis,
    }
}

/// Read-only readiness check; `finalize` only hard-requires offered_ctc and
/// joining_date.
pub fn validate_discussion(discussion: &CtcDiscussion, today: NaiveDate) -> CtcValidation {
    let mut missing_fields = Vec::new();
    let mut warnings = Vec::new();

    if discussion.offered_ctc.is_none() {
        missing_fields.push("offered_ctc".to_string());
    }
    if discussion.fixed_pay.is_none() && !discussion.has_breakdown() {
        missing_fields.push("fixed_pay_or_breakdown".to_string());
    }
    match discussion.joining_date {
        None => missing_fields.push("joining_date".to_string()),
        Some(date) if date < today => {
            warnings.push(format!("Joining date {} is in the past", date));
        }
        Some(_) => {}
    }

    if let (Some(offered), Some(expected)) = (discussion.offered_ctc, discussion.expected_ctc) {
        if offered < expected {
            warnings.push(format!(
                "Offered CTC {} is below the candidate's expectation {} ({}% lower)",
                offered,
                expected,
                percent_of(expected - offered, expected)
            ));
        }
    }
    if discussion.variable_pay.is_none() {
        warnings.push("Variable pay is not specified".to_string());
    }
    if let (Some(fixed), Some(variable), Some(offered)) =
        (discussion.fixed_pay, discussion.variable_pay, discussion.offered_ctc)
    {
        if fixed + variable > offered {
            warnings.push(format!(
                "Fixed ({}) plus variable ({}) pay exceeds the offered CTC {}",
                fixed, variable, offered
            ));
        }
    }
    if discussion.is_finalized() {
        warnings.push("Discussion is already finalized".to_string());
    }

    CtcValidation {
        is_valid: missing_fields.is_empty(),
        missing_fields,
        warnings,
    }
}
