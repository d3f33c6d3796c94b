pub mod feedback_service;
pub mod identity_service;
pub mod notification_service;
pub mod quote_service;
pub mod user_service;
