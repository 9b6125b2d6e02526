pub mod audit_service;
pub mod candidate_service;
pub mod ctc_service;
pub mod interview_service;
pub mod policy_service;
pub mod screening_service;
pub mod workflow_log_service;
pub mod workflow_service;
