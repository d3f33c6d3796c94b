pub mod quote_router;
pub mod user_router;
