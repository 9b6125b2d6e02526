pub mod audit_log;
pub mod candidate;
pub mod ctc_discussion;
pub mod interview;
pub mod threshold_policy;
pub mod vacancy;
pub mod workflow;
