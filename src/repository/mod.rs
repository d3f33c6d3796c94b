pub mod feedback_repo;
pub mod memory;
pub mod quote_repo;
pub mod repository_error;
pub mod user_repo;
