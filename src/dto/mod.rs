pub mod feedback_dto;
pub mod quote_dto;
pub mod user_dto;
