pub mod ctc_dto;
pub mod workflow_dto;
