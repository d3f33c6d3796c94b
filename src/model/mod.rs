pub mod actor;
pub mod feedback;
pub mod quote;
pub mod quote_status;
pub mod user;
