pub mod email;
pub mod error;
pub mod jwt;
pub mod logger;
pub mod password;
pub mod quote_id;
