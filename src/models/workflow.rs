use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Fine-grained position of a candidate in the hiring pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    NewApplication,
    AiScreening,
    HrReviewRequired,
    Shortlisted,
    ScheduleInterview,
    InterviewScheduled,
    InterviewCompleted,
    Selected,
    Rejected,
    CtcDiscussion,
    CtcFinalized,
    GenerateOfferLetter,
    OfferSent,
    OfferAccepted,
    OfferRejected,
    Joined,
    Paused,
    Resumed,
}

/// Coarse, candidate-facing bucket projected from a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    New,
    Screening,
    Shortlisted,
    InterviewScheduled,
    Interviewed,
    Selected,
    OfferSent,
    OfferAccepted,
    OfferRejected,
    Joined,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationStatus {
    Automated,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    System,
    Hr,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 18] = [
        WorkflowStep::NewApplication,
        WorkflowStep::AiScreening,
        WorkflowStep::HrReviewRequired,
        WorkflowStep::Shortlisted,
        WorkflowStep::ScheduleInterview,
        WorkflowStep::InterviewScheduled,
        WorkflowStep::InterviewCompleted,
        WorkflowStep::Selected,
        WorkflowStep::Rejected,
        WorkflowStep::CtcDiscussion,
        WorkflowStep::CtcFinalized,
        WorkflowStep::GenerateOfferLetter,
        WorkflowStep::OfferSent,
        WorkflowStep::OfferAccepted,
        WorkflowStep::OfferRejected,
        WorkflowStep::Joined,
        WorkflowStep::Paused,
        WorkflowStep::Resumed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::NewApplication => "new_application",
            WorkflowStep::AiScreening => "ai_screening",
            WorkflowStep::HrReviewRequired => "hr_review_required",
            WorkflowStep::Shortlisted => "shortlisted",
            WorkflowStep::ScheduleInterview => "schedule_interview",
            WorkflowStep::InterviewScheduled => "interview_scheduled",
            WorkflowStep::InterviewCompleted => "interview_completed",
            WorkflowStep::Selected => "selected",
            WorkflowStep::Rejected => "rejected",
            WorkflowStep::CtcDiscussion => "ctc_discussion",
            WorkflowStep::CtcFinalized => "ctc_finalized",
            WorkflowStep::GenerateOfferLetter => "generate_offer_letter",
            WorkflowStep::OfferSent => "offer_sent",
            WorkflowStep::OfferAccepted => "offer_accepted",
            WorkflowStep::OfferRejected => "offer_rejected",
            WorkflowStep::Joined => "joined",
            WorkflowStep::Paused => "paused",
            WorkflowStep::Resumed => "resumed",
        }
    }

    /// Fixed step -> status projection. Meta steps (pause/resume) have none and
    /// leave the candidate's status untouched.
    pub fn status(&self) -> Option<CandidateStatus> {
        let status = match self {
            WorkflowStep::NewApplication => CandidateStatus::New,
            WorkflowStep::AiScreening | WorkflowStep::HrReviewRequired => CandidateStatus::Screening,
            WorkflowStep::Shortlisted | WorkflowStep::ScheduleInterview => {
                CandidateStatus::Shortlisted
            }
            WorkflowStep::InterviewScheduled => CandidateStatus::InterviewScheduled,
            WorkflowStep::InterviewCompleted => CandidateStatus::Interviewed,
            WorkflowStep::Selected
            | WorkflowStep::CtcDiscussion
            | WorkflowStep::CtcFinalized
            | WorkflowStep::GenerateOfferLetter => CandidateStatus::Selected,
            WorkflowStep::Rejected => CandidateStatus::Rejected,
            WorkflowStep::OfferSent => CandidateStatus::OfferSent,
            WorkflowStep::OfferAccepted => CandidateStatus::OfferAccepted,
            WorkflowStep::OfferRejected => CandidateStatus::OfferRejected,
            WorkflowStep::Joined => CandidateStatus::Joined,
            WorkflowStep::Paused | WorkflowStep::Resumed => return None,
        };
        Some(status)
    }

    pub fn is_meta(&self) -> bool {
        self.status().is_none()
    }

    /// Steps that may directly follow this one in the intended pipeline.
    pub fn successors(&self) -> &'static [WorkflowStep] {
        use WorkflowStep::*;
        match self {
            NewApplication => &[AiScreening, HrReviewRequired, Shortlisted, Rejected],
            AiScreening => &[HrReviewRequired, Shortlisted, Rejected],
            HrReviewRequired => &[AiScreening, HrReviewRequired, Shortlisted, Rejected],
            Shortlisted => &[ScheduleInterview, InterviewScheduled, Rejected],
            ScheduleInterview => &[InterviewScheduled, Rejected],
            InterviewScheduled => &[InterviewCompleted, Selected, Rejected],
            InterviewCompleted => &[Selected, Rejected],
            Selected => &[CtcDiscussion, Rejected],
            CtcDiscussion => &[CtcDiscussion, CtcFinalized, Rejected],
            CtcFinalized => &[GenerateOfferLetter, Rejected],
            GenerateOfferLetter => &[OfferSent, Rejected],
            OfferSent => &[OfferAccepted, OfferRejected],
            OfferAccepted => &[Joined, OfferRejected],
            OfferRejected => &[Rejected],
            Rejected | Joined => &[],
            Paused | Resumed => &[],
        }
    }

    /// Whether `self` may be logged after the candidate's current pipeline step.
    /// A candidate without history may only enter at `new_application`.
    pub fn can_follow(&self, previous: Option<WorkflowStep>) -> bool {
        match previous {
            None => *self == WorkflowStep::NewApplication,
            Some(prev) => prev.successors().contains(self),
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStep {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        WorkflowStep::ALL
            .iter()
            .copied()
            .find(|step| step.as_str() == needle)
            .ok_or_else(|| Error::InvalidStep(needle.to_string()))
    }
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::New => "new",
            CandidateStatus::Screening => "screening",
            CandidateStatus::Shortlisted => "shortlisted",
            CandidateStatus::InterviewScheduled => "interview_scheduled",
            CandidateStatus::Interviewed => "interviewed",
            CandidateStatus::Selected => "selected",
            CandidateStatus::OfferSent => "offer_sent",
            CandidateStatus::OfferAccepted => "offer_accepted",
            CandidateStatus::OfferRejected => "offer_rejected",
            CandidateStatus::Joined => "joined",
            CandidateStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AutomationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationStatus::Automated => "automated",
            AutomationStatus::Paused => "paused",
        }
    }
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::System => "system",
            ActorKind::Hr => "hr",
        }
    }
}

/// Who caused a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub kind: ActorKind,
    pub id: Option<String>,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            kind: ActorKind::System,
            id: None,
        }
    }

    pub fn hr(id: Option<String>) -> Self {
        Self {
            kind: ActorKind::Hr,
            id,
        }
    }

    pub fn is_automated(&self) -> bool {
        self.kind == ActorKind::System
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.kind.as_str(), id),
            None => f.write_str(self.kind.as_str()),
        }
    }
}

/// Immutable row of the workflow ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowLogEntry {
    pub id: i64,
    pub candidate_id: Uuid,
    pub workflow_step: String,
    pub previous_step: Option<String>,
    pub action_taken: String,
    pub actor: String,
    pub actor_id: Option<String>,
    pub details: JsonValue,
    pub is_automated: bool,
    pub requires_hr_action: bool,
    pub hr_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Entry about to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub step: WorkflowStep,
    pub action_taken: String,
    pub actor: Actor,
    pub details: JsonValue,
    pub requires_hr_action: bool,
    pub hr_prompt: Option<String>,
}

impl NewLogEntry {
    pub fn new(step: WorkflowStep, action_taken: impl Into<String>, actor: Actor) -> Self {
        Self {
            step,
            action_taken: action_taken.into(),
            actor,
            details: JsonValue::Object(Default::default()),
            requires_hr_action: false,
            hr_prompt: None,
        }
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = details;
        self
    }

    pub fn needs_hr(mut self, prompt: impl Into<String>) -> Self {
        self.requires_hr_action = true;
        self.hr_prompt = Some(prompt.into());
        self
    }
}

/// Result of any engine operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionResult {
    pub candidate_id: Uuid,
    pub log_id: i64,
    pub previous_step: Option<WorkflowStep>,
    pub new_step: WorkflowStep,
    pub status: String,
    pub automation_status: String,
    pub requires_hr_action: bool,
    pub hr_prompt: Option<String>,
}
