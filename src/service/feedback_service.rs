use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::model::actor::Actor;
use crate::model::feedback::{Feedback, FeedbackSubmission};
use crate::model::quote_status::QuoteStatus;
use crate::repository::feedback_repo::FeedbackRepository;
use crate::repository::quote_repo::QuoteRepository;
use crate::service::notification_service::{LifecycleEvent, Notifier};
use crate::util::error::ServiceError;

pub const MAX_COMMENT_CHARS: usize = 1000;

#[async_trait]
pub trait FeedbackService: Send + Sync {
    /// Creates or updates the owner's rating of a completed quote.
    async fn submit_feedback(
        &self,
        quote_id: &str,
        rating: i32,
        comment: Option<String>,
        actor: &Actor,
    ) -> Result<Feedback, ServiceError>;

    /// Feedback left on a quote, visible to its owner and to staff.
    async fn get_feedback(&self, quote_id: &str, actor: &Actor) -> Result<Option<Feedback>, ServiceError>;
}

pub struct FeedbackServiceImpl {
    pub quote_repo: Arc<dyn QuoteRepository>,
    pub feedback_repo: Arc<dyn FeedbackRepository>,
    pub notifier: Notifier,
}

impl FeedbackServiceImpl {
    pub fn new(
        quote_repo: Arc<dyn QuoteRepository>,
        feedback_repo: Arc<dyn FeedbackRepository>,
        notifier: Notifier,
    ) -> Self {
        FeedbackServiceImpl {
            quote_repo,
            feedback_repo,
            notifier,
        }
    }
}

#[async_trait]
impl FeedbackService for FeedbackServiceImpl {
    #[instrument(skip(self, comment, actor))]
    async fn submit_feedback(
        &self,
        quote_id: &str,
        rating: i32,
        comment: Option<String>,
        actor: &Actor,
    ) -> Result<Feedback, ServiceError> {
        // Checked in order; the first failure wins.
        if !(1..=5).contains(&rating) {
            return Err(ServiceError::InvalidInput("rating must be between 1 and 5".to_string()));
        }
        let comment = comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        if comment.as_ref().is_some_and(|c| c.chars().count() > MAX_COMMENT_CHARS) {
            return Err(ServiceError::InvalidInput(format!(
                "comment must be at most {} characters",
                MAX_COMMENT_CHARS
            )));
        }

        let quote = self
            .quote_repo
            .find_by_quote_id(quote_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote not found: {}", quote_id)))?;

        if quote.status != QuoteStatus::Completed {
            warn!(quote_id, status = %quote.status, "Feedback on unfinished quote");
            return Err(ServiceError::PreconditionFailed {
                current: quote.status,
                message: format!(
                    "feedback is only accepted for completed quotes (current status: {})",
                    quote.status
                ),
            });
        }

        let user = match (actor.id(), quote.user) {
            (Some(id), Some(owner)) if id == owner && !actor.is_staff() => id,
            (None, _) => {
                return Err(ServiceError::Unauthenticated("Sign in to leave feedback".to_string()));
            }
            _ => {
                return Err(ServiceError::NotAuthorized(
                    "Only the owner of the quote can leave feedback".to_string(),
                ));
            }
        };

        let feedback = self
            .feedback_repo
            .upsert(FeedbackSubmission {
                quote: quote.id,
                quote_id: quote.quote_id.clone(),
                user,
                rating,
                comment,
            })
            .await?;

        info!(quote_id, rating, "Feedback stored");
        self.notifier.dispatch(LifecycleEvent::FeedbackReceived {
            quote_id: feedback.quote_id.clone(),
            rating: feedback.rating,
            comment: feedback.comment.clone(),
        });
        Ok(feedback)
    }

    #[instrument(skip(self, actor))]
    async fn get_feedback(&self, quote_id: &str, actor: &Actor) -> Result<Option<Feedback>, ServiceError> {
        if !actor.is_authenticated() {
            return Err(ServiceError::Unauthenticated("Sign in to view feedback".to_string()));
        }
        let quote = self
            .quote_repo
            .find_by_quote_id(quote_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote not found: {}", quote_id)))?;
        if !actor.is_staff() && quote.user != actor.id() {
            return Err(ServiceError::NotAuthorized(
                "Only the owner of the quote or staff can view its feedback".to_string(),
            ));
        }
        Ok(self.feedback_repo.find_by_quote(quote.id).await?)
    }
}
