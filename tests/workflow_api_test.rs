mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{setup, token, FixedScore};
use recruitment_workflow::services::audit_service::AuditService;
use serde_json::json;

#[tokio::test]
async fn screening_interview_and_rejection_flow() {
    let Some(t) = setup(Some(Arc::new(FixedScore(85)))).await else {
        return;
    };
    let vacancy_id = t.seed_vacancy("Backend Engineer").await;
    let candidate_id = t.seed_candidate(vacancy_id).await;

    let (status, body) = t
        .hr("POST", &format!("/api/workflow/candidates/{}/applications", candidate_id), None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["new_step"], "new_application");
    assert_eq!(body["status"], "new");

    let (status, body) = t
        .hr("POST", &format!("/api/workflow/candidates/{}/evaluate", candidate_id), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["new_step"], "shortlisted");
    assert_eq!(body["status"], "shortlisted");
    assert_eq!(body["evaluation"]["score"], 85);
    assert_eq!(body["fallback_used"], false);
    assert_eq!(body["requires_hr_action"], false);

    let shortlisted_at: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT auto_shortlisted_at FROM candidates WHERE id = $1")
            .bind(candidate_id)
            .fetch_one(&t.pool)
            .await
            .unwrap();
    assert!(shortlisted_at.is_some());

    let (status, body) = t
        .hr(
            "POST",
            &format!("/api/workflow/candidates/{}/advance", candidate_id),
            Some(json!({ "target_step": "interview_scheduled", "detail": { "slot": "mon-10" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "interview_scheduled");

    let interview_id = t.seed_interview(candidate_id).await;
    let (status, body) = t
        .hr(
            "POST",
            &format!("/api/workflow/interviews/{}/process", interview_id),
            Some(json!({ "score": 2.8, "notes": "weak system design" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["new_step"], "rejected");
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["requires_hr_action"], false);

    let reason: Option<String> =
        sqlx::query_scalar("SELECT rejection_reason FROM candidates WHERE id = $1")
            .bind(candidate_id)
            .fetch_one(&t.pool)
            .await
            .unwrap();
    let reason = reason.expect("rejection reason");
    assert!(reason.contains("2.8"), "{}", reason);
    assert!(reason.contains("3.5"), "{}", reason);

    let entries = t.history(candidate_id).await;
    let steps: Vec<&str> = entries
        .iter()
        .map(|e| e["workflow_step"].as_str().unwrap())
        .collect();
    assert_eq!(
        steps,
        vec!["new_application", "shortlisted", "interview_scheduled", "rejected"]
    );
    assert_eq!(entries[1]["actor"], "system");
    assert_eq!(entries[1]["is_automated"], true);
    assert_eq!(entries[2]["actor"], "hr");
    assert_eq!(entries[2]["actor_id"], "hr-user");

    let ids: Vec<i64> = entries.iter().map(|e| e["id"].as_i64().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    let times: Vec<DateTime<Utc>> = entries
        .iter()
        .map(|e| serde_json::from_value(e["created_at"].clone()).unwrap())
        .collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));

    // Terminal: nothing follows a rejection without an override.
    let (status, _) = t
        .hr(
            "POST",
            &format!("/api/workflow/candidates/{}/advance", candidate_id),
            Some(json!({ "target_step": "selected" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn hr_review_is_queued_and_resolved_in_place() {
    let Some(t) = setup(Some(Arc::new(FixedScore(55)))).await else {
        return;
    };
    let vacancy_id = t.seed_vacancy("Data Engineer").await;
    let candidate_id = t.seed_candidate(vacancy_id).await;

    t.hr("POST", &format!("/api/workflow/candidates/{}/applications", candidate_id), None)
        .await;
    let (status, body) = t
        .hr("POST", &format!("/api/workflow/candidates/{}/evaluate", candidate_id), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["new_step"], "hr_review_required");
    assert_eq!(body["status"], "screening");
    assert_eq!(body["requires_hr_action"], true);
    let log_id = body["log_id"].as_i64().unwrap();

    let (status, body) = t
        .hr("GET", "/api/workflow/pending-actions?page=1&per_page=100", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let total_before = body["total"].as_i64().unwrap();
    assert!(body["items"]
        .as_array()
        .unwrap()
        .iter()
        .any(|i| i["id"].as_i64() == Some(log_id)));

    let (status, body) = t
        .hr(
            "POST",
            &format!("/api/workflow/actions/{}/complete", log_id),
            Some(json!({ "resolution": "Reviewed CV, keep on hold" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["requires_hr_action"], false);
    assert!(body["transition"].is_null());
    let details = &body["resolved"]["details"];
    assert_eq!(details["score"], 55);
    assert_eq!(details["resolution"]["note"], "Reviewed CV, keep on hold");

    let entries = t.history(candidate_id).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(t.candidate_status(candidate_id).await, "screening");

    let (_, body) = t
        .hr("GET", "/api/workflow/pending-actions?page=1&per_page=100", None)
        .await;
    assert!(!body["items"]
        .as_array()
        .unwrap()
        .iter()
        .any(|i| i["id"].as_i64() == Some(log_id)));
    assert!(body["total"].as_i64().unwrap() <= total_before);

    let (status, body) = t
        .hr(
            "POST",
            &format!("/api/workflow/actions/{}/complete", log_id),
            Some(json!({ "resolution": "again" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
}

#[tokio::test]
async fn completing_an_action_can_move_the_candidate_on() {
    let Some(t) = setup(Some(Arc::new(FixedScore(60)))).await else {
        return;
    };
    let vacancy_id = t.seed_vacancy("QA Engineer").await;
    let candidate_id = t.seed_candidate(vacancy_id).await;

    t.hr("POST", &format!("/api/workflow/candidates/{}/applications", candidate_id), None)
        .await;
    let (_, body) = t
        .hr("POST", &format!("/api/workflow/candidates/{}/evaluate", candidate_id), None)
        .await;
    let log_id = body["log_id"].as_i64().unwrap();

    let (status, body) = t
        .hr(
            "POST",
            &format!("/api/workflow/actions/{}/complete", log_id),
            Some(json!({ "resolution": "Strong portfolio", "next_step": "shortlisted" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["transition"]["new_step"], "shortlisted");
    assert_eq!(body["status"], "shortlisted");

    let entries = t.history(candidate_id).await;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1]["requires_hr_action"], false);
    assert_eq!(entries[2]["workflow_step"], "shortlisted");
    assert_eq!(entries[2]["details"]["resolved_log_id"], log_id);
}

#[tokio::test]
async fn transition_guards_and_overrides() {
    let Some(t) = setup(None).await else {
        return;
    };
    let vacancy_id = t.seed_vacancy("Designer").await;
    let candidate_id = t.seed_candidate(vacancy_id).await;
    let advance = format!("/api/workflow/candidates/{}/advance", candidate_id);

    // No history yet: only new_application may start the pipeline.
    let (status, _) = t
        .hr("POST", &advance, Some(json!({ "target_step": "shortlisted" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    t.hr("POST", &format!("/api/workflow/candidates/{}/applications", candidate_id), None)
        .await;

    let (status, body) = t
        .hr("POST", &advance, Some(json!({ "target_step": "bogus_step" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, _) = t.hr("POST", &advance, Some(json!({ "target_step": "" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = t
        .hr("POST", &advance, Some(json!({ "target_step": "joined" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = t
        .hr(
            "POST",
            &advance,
            Some(json!({ "target_step": "joined", "override_transition": true })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = t
        .hr(
            "POST",
            &advance,
            Some(json!({
                "target_step": "selected",
                "override_transition": true,
                "reason": "Internal referral, interviewed offline"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "selected");

    let entries = t.history(candidate_id).await;
    assert_eq!(entries.len(), 2);
    let last = entries.last().unwrap();
    assert_eq!(last["details"]["override"], true);
    assert_eq!(last["details"]["reason"], "Internal referral, interviewed offline");

    // Refused attempts leave an audit trail.
    let failed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_logs WHERE entity_id = $1 AND action = 'workflow.advance.failed'",
    )
    .bind(candidate_id)
    .fetch_one(&t.pool)
    .await
    .unwrap();
    assert!(failed >= 3);
}

#[tokio::test]
async fn paused_candidates_are_not_auto_decided() {
    let Some(t) = setup(Some(Arc::new(FixedScore(95)))).await else {
        return;
    };
    let vacancy_id = t.seed_vacancy("SRE").await;
    let candidate_id = t.seed_candidate(vacancy_id).await;

    t.hr("POST", &format!("/api/workflow/candidates/{}/applications", candidate_id), None)
        .await;
    let (status, body) = t
        .hr(
            "POST",
            &format!("/api/workflow/candidates/{}/pause", candidate_id),
            Some(json!({ "reason": "Referral from CTO" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["new_step"], "paused");
    assert_eq!(body["automation_status"], "paused");
    assert_eq!(body["status"], "new");

    let (status, _) = t
        .hr(
            "POST",
            &format!("/api/workflow/candidates/{}/pause", candidate_id),
            Some(json!({ "reason": "twice" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = t
        .hr("POST", &format!("/api/workflow/candidates/{}/evaluate", candidate_id), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["new_step"], "hr_review_required");
    assert_eq!(body["requires_hr_action"], true);
    assert_eq!(body["evaluation"]["score"], 95);

    let (status, body) = t
        .hr("POST", &format!("/api/workflow/candidates/{}/resume", candidate_id), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["automation_status"], "automated");
    assert_eq!(body["status"], "screening");

    let (_, body) = t
        .hr("GET", &format!("/api/workflow/candidates/{}/workflow", candidate_id), None)
        .await;
    assert_eq!(body["current_step"], "hr_review_required");
    assert_eq!(body["entries"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn missing_capability_falls_back_to_neutral_review() {
    let Some(t) = setup(None).await else {
        return;
    };
    let vacancy_id = t.seed_vacancy("Analyst").await;
    let candidate_id = t.seed_candidate(vacancy_id).await;

    t.hr("POST", &format!("/api/workflow/candidates/{}/applications", candidate_id), None)
        .await;
    let (status, body) = t
        .hr("POST", &format!("/api/workflow/candidates/{}/evaluate", candidate_id), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["fallback_used"], true);
    assert_eq!(body["evaluation"]["score"], 50);
    assert_eq!(body["new_step"], "hr_review_required");
    assert_eq!(body["requires_hr_action"], true);
}

#[tokio::test]
async fn concurrent_advances_for_one_candidate_serialize() {
    let Some(t) = setup(None).await else {
        return;
    };
    let vacancy_id = t.seed_vacancy("Site Reliability").await;
    let candidate_id = t.seed_candidate(vacancy_id).await;
    t.hr("POST", &format!("/api/workflow/candidates/{}/applications", candidate_id), None)
        .await;

    let before = t.candidate_version(candidate_id).await;

    let advance = format!("/api/workflow/candidates/{}/advance", candidate_id);
    let review = json!({ "target_step": "hr_review_required" });
    let ((first_status, first), (second_status, second)) = tokio::join!(
        t.hr("POST", &advance, Some(review.clone())),
        t.hr("POST", &advance, Some(review.clone())),
    );
    assert_eq!(first_status, StatusCode::OK, "{}", first);
    assert_eq!(second_status, StatusCode::OK, "{}", second);

    let (earlier, later) = if first["log_id"].as_i64() < second["log_id"].as_i64() {
        (first, second)
    } else {
        (second, first)
    };
    assert_eq!(earlier["previous_step"], "new_application");
    assert_eq!(later["previous_step"], earlier["new_step"]);
    let chained = [&earlier, &later]
        .iter()
        .filter(|r| r["previous_step"] == "hr_review_required")
        .count();
    assert_eq!(chained, 1);

    assert_eq!(t.candidate_version(candidate_id).await, before + 2);
    let entries = t.history(candidate_id).await;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2]["previous_step"], entries[1]["workflow_step"]);
}

#[tokio::test]
async fn interview_score_is_validated() {
    let Some(t) = setup(None).await else {
        return;
    };
    let vacancy_id = t.seed_vacancy("Support").await;
    let candidate_id = t.seed_candidate(vacancy_id).await;
    let interview_id = t.seed_interview(candidate_id).await;
    let uri = format!("/api/workflow/interviews/{}/process", interview_id);

    let (status, _) = t.hr("POST", &uri, Some(json!({ "notes": "no score" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = t.hr("POST", &uri, Some(json!({ "score": 7 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = t.hr("POST", &uri, Some(json!({ "score": 3.499 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
    let stored: Option<rust_decimal::Decimal> =
        sqlx::query_scalar("SELECT score FROM interviews WHERE id = $1")
            .bind(interview_id)
            .fetch_one(&t.pool)
            .await
            .unwrap();
    assert!(stored.is_none());
    assert!(t.history(candidate_id).await.is_empty());

    let audit = AuditService::new(t.pool.clone())
        .list_for_entity(interview_id)
        .await
        .unwrap();
    assert_eq!(audit.len(), 3);
    assert!(audit
        .iter()
        .all(|row| row.action == "workflow.process_interview.failed"));
    assert!(audit[2].changes.as_ref().unwrap()["error"]
        .as_str()
        .is_some_and(|e| e.contains("two decimal places")));

    let missing = uuid::Uuid::new_v4();
    let (status, _) = t
        .hr(
            "POST",
            &format!("/api/workflow/interviews/{}/process", missing),
            Some(json!({ "score": 4.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn routes_require_hr_or_admin_and_policies_require_admin() {
    let Some(t) = setup(None).await else {
        return;
    };

    let (status, _) = t.call("GET", "/api/workflow/status", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let candidate = token("candidate");
    let (status, _) = t.call("GET", "/api/workflow/status", Some(&candidate), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t.hr("GET", "/api/workflow/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["total_candidates"].is_i64());

    let (status, body) = t
        .hr(
            "GET",
            "/api/workflow/pending-actions?page=9223372036854775807&per_page=100",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["items"].as_array().unwrap().is_empty());

    let vacancy_id = t.seed_vacancy("Policy Vacancy").await;
    let policy = json!({
        "vacancy_id": vacancy_id,
        "auto_reject_threshold": 30,
        "hr_review_threshold": 60,
        "auto_shortlist_threshold": 80,
        "interview_pass_score": 4.0
    });
    let (status, _) = t.hr("PUT", "/api/workflow/config", Some(policy.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = token("admin");
    let (status, body) = t
        .call("PUT", "/api/workflow/config", Some(&admin), Some(policy))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["scope"], format!("vacancy:{}", vacancy_id));

    let config_uri = format!("/api/workflow/config?vacancy_id={}", vacancy_id);
    let (status, _) = t.hr("GET", &config_uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t.call("GET", &config_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scope"], format!("vacancy:{}", vacancy_id));
    assert_eq!(body["policy"]["auto_shortlist_threshold"], 80);

    let (status, _) = t
        .call(
            "PUT",
            "/api/workflow/config",
            Some(&admin),
            Some(json!({
                "vacancy_id": vacancy_id,
                "auto_reject_threshold": 70,
                "hr_review_threshold": 60,
                "auto_shortlist_threshold": 80,
                "interview_pass_score": 4.0
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn health_reports_database() {
    let Some(t) = setup(None).await else {
        return;
    };
    let (status, body) = t.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
}
