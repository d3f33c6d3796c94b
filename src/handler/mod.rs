pub mod feedback_handler;
pub mod quote_handler;
pub mod user_handler;
