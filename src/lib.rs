//! Quote lifecycle and order tracking backend for a moving-services business.
//!
//! Customers submit move quote requests, staff price and progress them, and
//! customers accept, pay and rate the service. The state machine lives in
//! [`model::quote_status`], the orchestration in [`service::quote_service`].

pub mod app;
pub mod config;
pub mod dto;
pub mod handler;
pub mod middlewares;
pub mod model;
pub mod repository;
pub mod router;
pub mod service;
pub mod util;
