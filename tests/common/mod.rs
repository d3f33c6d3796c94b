#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use bson::oid::ObjectId;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use movers_backend::app::app::build_router;
use movers_backend::config::JwtConfig;
use movers_backend::dto::quote_dto::CreateQuoteRequest;
use movers_backend::model::actor::Actor;
use movers_backend::model::quote_status::LifecyclePolicy;
use movers_backend::model::user::UserRole;
use movers_backend::repository::memory::{InMemoryFeedbackRepository, InMemoryQuoteRepository, InMemoryUserRepository};
use movers_backend::service::feedback_service::FeedbackServiceImpl;
use movers_backend::service::identity_service::JwtIdentityResolver;
use movers_backend::service::notification_service::{LifecycleEvent, NotificationSink, Notifier, NotifyError};
use movers_backend::service::quote_service::QuoteServiceImpl;
use movers_backend::service::user_service::UserServiceImpl;
use movers_backend::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};

/// Forwards every event to a channel the test can drain.
pub struct RecordingSink {
    tx: UnboundedSender<LifecycleEvent>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

/// Fails every delivery.
pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn notify(&self, _event: &LifecycleEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp unreachable".to_string()))
    }
}

pub struct TestEnv {
    pub quotes: Arc<QuoteServiceImpl>,
    pub feedback: Arc<FeedbackServiceImpl>,
    pub users: Arc<UserServiceImpl>,
    pub quote_repo: Arc<InMemoryQuoteRepository>,
    pub feedback_repo: Arc<InMemoryFeedbackRepository>,
    pub jwt: Arc<JwtTokenUtilsImpl>,
    pub events: UnboundedReceiver<LifecycleEvent>,
}

impl TestEnv {
    pub fn new() -> Self {
        let (tx, events) = unbounded_channel();
        Self::with_sink(Arc::new(RecordingSink { tx }), events)
    }

    pub fn failing() -> Self {
        let (_tx, events) = unbounded_channel();
        Self::with_sink(Arc::new(FailingSink), events)
    }

    fn with_sink(sink: Arc<dyn NotificationSink>, events: UnboundedReceiver<LifecycleEvent>) -> Self {
        let quote_repo = Arc::new(InMemoryQuoteRepository::new());
        let feedback_repo = Arc::new(InMemoryFeedbackRepository::new());
        let jwt = Arc::new(JwtTokenUtilsImpl::new(JwtConfig::default()));
        let notifier = Notifier::new(sink);

        let quotes = Arc::new(QuoteServiceImpl::new(
            quote_repo.clone(),
            notifier.clone(),
            LifecyclePolicy::default(),
            "UP",
        ));
        let feedback = Arc::new(FeedbackServiceImpl::new(
            quote_repo.clone(),
            feedback_repo.clone(),
            notifier,
        ));
        let users = Arc::new(UserServiceImpl::new(
            Arc::new(InMemoryUserRepository::new()),
            jwt.clone(),
        ));

        TestEnv {
            quotes,
            feedback,
            users,
            quote_repo,
            feedback_repo,
            jwt,
            events,
        }
    }

    pub fn router(&self) -> Router {
        build_router(
            self.quotes.clone(),
            self.feedback.clone(),
            self.users.clone(),
            Arc::new(JwtIdentityResolver::new(self.jwt.clone())),
        )
    }

    pub fn bearer(&self, actor: &Actor) -> String {
        let (id, email, role) = match actor {
            Actor::Account { id, email } => (id, email, UserRole::User),
            Actor::Staff { id, email } => (id, email, UserRole::Admin),
            Actor::Anonymous => panic!("anonymous actors have no token"),
        };
        let pair = self
            .jwt
            .generate_token_pair(&id.to_hex(), email, role)
            .expect("token pair");
        format!("Bearer {}", pair.access_token)
    }

    /// Waits for the next dispatched event.
    pub async fn next_event(&mut self) -> LifecycleEvent {
        tokio::time::timeout(std::time::Duration::from_secs(2), self.events.recv())
            .await
            .expect("event within timeout")
            .expect("channel open")
    }
}

pub fn customer(email: &str) -> Actor {
    Actor::account(ObjectId::new(), email)
}

pub fn staff() -> Actor {
    Actor::staff(ObjectId::new(), "ops@movers.example")
}

pub fn delhi_to_mumbai(email: &str) -> CreateQuoteRequest {
    serde_json::from_value(delhi_to_mumbai_json(email)).expect("valid request")
}

pub fn delhi_to_mumbai_json(email: &str) -> serde_json::Value {
    serde_json::json!({
        "fullName": "Asha Verma",
        "email": email,
        "phone": "9876543210",
        "fromCity": "Delhi",
        "fromPostalCode": "110001",
        "toCity": "Mumbai",
        "toPostalCode": "400001",
        "moveDate": "2025-03-01",
        "flexibility": "few_days",
        "moveType": "household",
        "propertyType": "2BHK",
        "fromFloor": 2,
        "toFloor": 5,
        "toHasLift": true
    })
}
