//! The quote lifecycle engine.
//!
//! Every operation resolves the quote, checks the actor against it, asks
//! [`QuoteStatus::transition`] whether the change is legal, applies the side
//! effect fields, and persists with a compare-and-swap on `version`. Lost
//! races are re-read and re-validated a bounded number of times.

use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{NaiveDate, Utc};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::dto::quote_dto::CreateQuoteRequest;
use crate::model::actor::Actor;
use crate::model::quote::{PaymentDetails, PaymentMethod, PaymentStatus, Quote};
use crate::model::quote_status::{LifecyclePolicy, LifecycleTrigger, QuoteStatus};
use crate::repository::quote_repo::QuoteRepository;
use crate::repository::repository_error::RepositoryError;
use crate::service::identity_service::{normalize_email, owner_for_new_quote, ownership, Ownership};
use crate::service::notification_service::{LifecycleEvent, Notifier};
use crate::util::error::ServiceError;
use crate::util::quote_id::mint_quote_id;

/// Attempts before a lost compare-and-swap race is reported as a conflict.
pub const MAX_CAS_ATTEMPTS: u32 = 3;
/// Attempts at minting an unused quote id.
pub const MAX_MINT_ATTEMPTS: u32 = 5;

/// Outcome of a successful payment.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub quote: Quote,
    pub transaction_id: String,
}

#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn create_quote(&self, request: CreateQuoteRequest, actor: &Actor) -> Result<Quote, ServiceError>;
    async fn list_by_owner(&self, actor: &Actor) -> Result<Vec<Quote>, ServiceError>;
    /// Staff listing, newest first. Returns the page and the total count.
    async fn list_all(&self, page: u32, limit: u32, actor: &Actor) -> Result<(Vec<Quote>, u64), ServiceError>;
    async fn get_by_quote_id(&self, quote_id: &str, actor: &Actor) -> Result<Quote, ServiceError>;
    /// Public lookup; callers must only expose the public subset.
    async fn track_by_quote_id(&self, quote_id: &str) -> Result<Quote, ServiceError>;
    async fn set_price(
        &self,
        quote_id: &str,
        estimated_cost: f64,
        admin_notes: Option<String>,
        actor: &Actor,
    ) -> Result<Quote, ServiceError>;
    async fn accept(&self, quote_id: &str, final_cost: Option<f64>, actor: &Actor) -> Result<Quote, ServiceError>;
    async fn submit_payment(
        &self,
        quote_id: &str,
        method: PaymentMethod,
        amount: f64,
        actor: &Actor,
    ) -> Result<PaymentReceipt, ServiceError>;
    async fn cancel(&self, quote_id: &str, actor: &Actor) -> Result<Quote, ServiceError>;
    async fn update_status(
        &self,
        quote_id: &str,
        status: QuoteStatus,
        admin_notes: Option<String>,
        actor: &Actor,
    ) -> Result<Quote, ServiceError>;
    async fn assign(&self, quote_id: &str, staff_id: &str, actor: &Actor) -> Result<Quote, ServiceError>;
    async fn delete_own(&self, quote_id: &str, actor: &Actor) -> Result<(), ServiceError>;
    async fn delete_any(&self, quote_id: &str, actor: &Actor) -> Result<(), ServiceError>;
    /// Binds every unowned quote carrying the actor's email to the actor.
    async fn claim(&self, actor: &Actor) -> Result<u64, ServiceError>;
}

pub struct QuoteServiceImpl {
    pub quote_repo: Arc<dyn QuoteRepository>,
    pub notifier: Notifier,
    pub policy: LifecyclePolicy,
    pub quote_id_prefix: String,
}

impl QuoteServiceImpl {
    pub fn new(
        quote_repo: Arc<dyn QuoteRepository>,
        notifier: Notifier,
        policy: LifecyclePolicy,
        quote_id_prefix: impl Into<String>,
    ) -> Self {
        QuoteServiceImpl {
            quote_repo,
            notifier,
            policy,
            quote_id_prefix: quote_id_prefix.into(),
        }
    }

    async fn find(&self, quote_id: &str) -> Result<Quote, ServiceError> {
        self.quote_repo
            .find_by_quote_id(quote_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote not found: {}", quote_id)))
    }

    /// Loads the quote and checks the actor may act on it. An unowned quote
    /// whose email matches the account is claimed first.
    async fn load_authorized(&self, quote_id: &str, actor: &Actor) -> Result<Quote, ServiceError> {
        if !actor.is_authenticated() {
            return Err(ServiceError::Unauthenticated("Sign in to manage quotes".to_string()));
        }
        let quote = self.find(quote_id).await?;
        match ownership(actor, &quote) {
            Ownership::Staff | Ownership::Owner => Ok(quote),
            Ownership::Denied => Err(not_authorized(quote_id)),
            Ownership::Claimable => {
                if let Actor::Account { id, email } = actor {
                    if self.quote_repo.claim_one(quote_id, &normalize_email(email), *id).await? {
                        info!(quote_id, "Claimed unowned quote for matching account");
                    }
                }
                let quote = self.find(quote_id).await?;
                match ownership(actor, &quote) {
                    Ownership::Staff | Ownership::Owner => Ok(quote),
                    _ => Err(not_authorized(quote_id)),
                }
            }
        }
    }

    /// Read, change, compare-and-swap. `change` runs against a fresh read on
    /// every attempt. Returns the state before and after the change.
    async fn update_with_retry<F>(
        &self,
        quote_id: &str,
        actor: &Actor,
        change: F,
    ) -> Result<(Quote, Quote), ServiceError>
    where
        F: Fn(&mut Quote) -> Result<(), ServiceError> + Send + Sync,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let before = self.load_authorized(quote_id, actor).await?;
            let mut after = before.clone();
            if let Err(err) = change(&mut after) {
                if let ServiceError::PreconditionFailed { current, .. } = &err {
                    warn!(quote_id, current = %current, "Transition rejected");
                }
                return Err(err);
            }
            match self.quote_repo.update_versioned(after).await {
                Ok(stored) => return Ok((before, stored)),
                Err(RepositoryError::VersionConflict(_)) => {
                    warn!(quote_id, attempt, "Quote changed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Conflict(format!(
            "Quote {} is being modified concurrently, try again",
            quote_id
        )))
    }
}

fn not_authorized(quote_id: &str) -> ServiceError {
    ServiceError::NotAuthorized(format!("Not allowed to act on quote {}", quote_id))
}

fn require_staff(actor: &Actor) -> Result<(), ServiceError> {
    match actor {
        Actor::Staff { .. } => Ok(()),
        Actor::Account { .. } => Err(ServiceError::NotAuthorized("Staff access required".to_string())),
        Actor::Anonymous => Err(ServiceError::Unauthenticated("Staff access required".to_string())),
    }
}

fn validate_cost(name: &str, value: f64) -> Result<(), ServiceError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ServiceError::InvalidInput(format!(
            "{} must be a finite, non-negative amount",
            name
        )));
    }
    Ok(())
}

#[async_trait]
impl QuoteService for QuoteServiceImpl {
    #[instrument(skip(self, request, actor))]
    async fn create_quote(&self, request: CreateQuoteRequest, actor: &Actor) -> Result<Quote, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        NaiveDate::parse_from_str(&request.move_date, "%Y-%m-%d")
            .map_err(|_| ServiceError::InvalidInput("moveDate must be a YYYY-MM-DD date".to_string()))?;

        let owner = owner_for_new_quote(actor);
        let details = request.move_details();
        let email = normalize_email(&request.email);

        for attempt in 1..=MAX_MINT_ATTEMPTS {
            let quote = Quote::new_submission(
                mint_quote_id(&self.quote_id_prefix, Utc::now()),
                owner,
                request.full_name.trim().to_string(),
                email.clone(),
                request.phone.trim().to_string(),
                details.clone(),
            );
            match self.quote_repo.insert(quote).await {
                Ok(stored) => {
                    info!(quote_id = %stored.quote_id, owned = owner.is_some(), "Quote submitted");
                    self.notifier.dispatch(LifecycleEvent::QuoteSubmitted { quote: stored.clone() });
                    return Ok(stored);
                }
                Err(RepositoryError::AlreadyExists(_)) => {
                    warn!(attempt, "Quote id collision, minting again");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::InternalError("Could not mint a unique quote id".to_string()))
    }

    #[instrument(skip(self, actor))]
    async fn list_by_owner(&self, actor: &Actor) -> Result<Vec<Quote>, ServiceError> {
        let owner = actor
            .id()
            .ok_or_else(|| ServiceError::Unauthenticated("Sign in to list your quotes".to_string()))?;
        Ok(self.quote_repo.list_by_owner(owner).await?)
    }

    #[instrument(skip(self, actor))]
    async fn list_all(&self, page: u32, limit: u32, actor: &Actor) -> Result<(Vec<Quote>, u64), ServiceError> {
        require_staff(actor)?;
        let quotes = self.quote_repo.list(page, limit).await?;
        let total = self.quote_repo.count().await?;
        Ok((quotes, total))
    }

    #[instrument(skip(self, actor))]
    async fn get_by_quote_id(&self, quote_id: &str, actor: &Actor) -> Result<Quote, ServiceError> {
        self.load_authorized(quote_id, actor).await
    }

    #[instrument(skip(self))]
    async fn track_by_quote_id(&self, quote_id: &str) -> Result<Quote, ServiceError> {
        self.find(quote_id).await
    }

    #[instrument(skip(self, admin_notes, actor))]
    async fn set_price(
        &self,
        quote_id: &str,
        estimated_cost: f64,
        admin_notes: Option<String>,
        actor: &Actor,
    ) -> Result<Quote, ServiceError> {
        require_staff(actor)?;
        validate_cost("estimatedCost", estimated_cost)?;

        let policy = self.policy;
        let (_, quote) = self
            .update_with_retry(quote_id, actor, |quote| {
                quote.status = quote.status.transition(LifecycleTrigger::SetPrice, &policy)?;
                quote.estimated_cost = Some(estimated_cost);
                quote.quoted_at = Some(bson::DateTime::now());
                if let Some(notes) = &admin_notes {
                    quote.admin_notes = Some(notes.clone());
                }
                Ok(())
            })
            .await?;

        info!(quote_id, estimated_cost, "Quote priced");
        self.notifier.dispatch(LifecycleEvent::QuotePriced { quote: quote.clone() });
        Ok(quote)
    }

    #[instrument(skip(self, actor))]
    async fn accept(&self, quote_id: &str, final_cost: Option<f64>, actor: &Actor) -> Result<Quote, ServiceError> {
        if let Some(cost) = final_cost {
            validate_cost("finalCost", cost)?;
        }
        let trigger = if actor.is_staff() {
            LifecycleTrigger::StaffAccept
        } else {
            LifecycleTrigger::OwnerAccept
        };

        let policy = self.policy;
        let (_, quote) = self
            .update_with_retry(quote_id, actor, |quote| {
                quote.status = quote.status.transition(trigger, &policy)?;
                if let Some(cost) = final_cost {
                    quote.final_cost = Some(cost);
                }
                quote.responded_at = Some(bson::DateTime::now());
                Ok(())
            })
            .await?;

        info!(quote_id, "Quote accepted");
        self.notifier.dispatch(LifecycleEvent::QuoteAccepted { quote: quote.clone() });
        Ok(quote)
    }

    #[instrument(skip(self, actor))]
    async fn submit_payment(
        &self,
        quote_id: &str,
        method: PaymentMethod,
        amount: f64,
        actor: &Actor,
    ) -> Result<PaymentReceipt, ServiceError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ServiceError::InvalidInput("amount must be greater than 0".to_string()));
        }

        let policy = self.policy;
        let transaction_id = format!("TXN-{}", uuid::Uuid::new_v4().simple().to_string().to_uppercase());
        let (_, quote) = self
            .update_with_retry(quote_id, actor, |quote| {
                quote.status = quote.status.transition(LifecycleTrigger::SubmitPayment, &policy)?;
                quote.payment_status = PaymentStatus::Completed;
                quote.payment_details = Some(PaymentDetails {
                    method,
                    transaction_id: transaction_id.clone(),
                    amount,
                    paid_at: bson::DateTime::now(),
                });
                Ok(())
            })
            .await?;

        info!(quote_id, transaction_id = %transaction_id, "Payment recorded");
        self.notifier.dispatch(LifecycleEvent::PaymentReceived {
            quote: quote.clone(),
            transaction_id: transaction_id.clone(),
            method,
            amount,
        });
        Ok(PaymentReceipt { quote, transaction_id })
    }

    #[instrument(skip(self, actor))]
    async fn cancel(&self, quote_id: &str, actor: &Actor) -> Result<Quote, ServiceError> {
        let policy = self.policy;
        let (_, quote) = self
            .update_with_retry(quote_id, actor, |quote| {
                quote.status = quote.status.transition(LifecycleTrigger::OwnerCancel, &policy)?;
                Ok(())
            })
            .await?;

        info!(quote_id, "Quote cancelled");
        self.notifier.dispatch(LifecycleEvent::QuoteCancelled { quote: quote.clone() });
        Ok(quote)
    }

    #[instrument(skip(self, admin_notes, actor))]
    async fn update_status(
        &self,
        quote_id: &str,
        status: QuoteStatus,
        admin_notes: Option<String>,
        actor: &Actor,
    ) -> Result<Quote, ServiceError> {
        require_staff(actor)?;

        let policy = self.policy;
        let (before, quote) = self
            .update_with_retry(quote_id, actor, |quote| {
                quote.status = quote.status.transition(LifecycleTrigger::StaffUpdate(status), &policy)?;
                if status == QuoteStatus::Accepted {
                    quote.responded_at = Some(bson::DateTime::now());
                }
                if let Some(notes) = &admin_notes {
                    quote.admin_notes = Some(notes.clone());
                }
                Ok(())
            })
            .await?;

        info!(quote_id, from = %before.status, to = %quote.status, "Quote status updated by staff");
        let event = match quote.status {
            QuoteStatus::Accepted => LifecycleEvent::QuoteAccepted { quote: quote.clone() },
            QuoteStatus::Cancelled => LifecycleEvent::QuoteCancelled { quote: quote.clone() },
            _ => LifecycleEvent::QuoteStatusChanged {
                quote: quote.clone(),
                previous: before.status,
            },
        };
        self.notifier.dispatch(event);
        Ok(quote)
    }

    #[instrument(skip(self, actor))]
    async fn assign(&self, quote_id: &str, staff_id: &str, actor: &Actor) -> Result<Quote, ServiceError> {
        require_staff(actor)?;
        let assignee = ObjectId::parse_str(staff_id)
            .map_err(|_| ServiceError::InvalidInput("staffId must be an account id".to_string()))?;

        let (_, quote) = self
            .update_with_retry(quote_id, actor, |quote| {
                quote.assigned_to = Some(assignee);
                Ok(())
            })
            .await?;
        info!(quote_id, assignee = %assignee, "Quote assigned");
        Ok(quote)
    }

    #[instrument(skip(self, actor))]
    async fn delete_own(&self, quote_id: &str, actor: &Actor) -> Result<(), ServiceError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let quote = self.load_authorized(quote_id, actor).await?;
            quote.status.transition(LifecycleTrigger::OwnerDelete, &self.policy)?;
            match self.quote_repo.delete_versioned(quote_id, quote.version).await {
                Ok(()) => {
                    info!(quote_id, "Quote deleted by its owner");
                    self.notifier.dispatch(LifecycleEvent::QuoteDeleted { snapshot: quote });
                    return Ok(());
                }
                Err(RepositoryError::VersionConflict(_)) => {
                    warn!(quote_id, attempt, "Quote changed concurrently, retrying delete");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Conflict(format!(
            "Quote {} is being modified concurrently, try again",
            quote_id
        )))
    }

    #[instrument(skip(self, actor))]
    async fn delete_any(&self, quote_id: &str, actor: &Actor) -> Result<(), ServiceError> {
        require_staff(actor)?;
        self.quote_repo.delete(quote_id).await?;
        info!(quote_id, "Quote deleted by staff");
        Ok(())
    }

    #[instrument(skip(self, actor))]
    async fn claim(&self, actor: &Actor) -> Result<u64, ServiceError> {
        let (Some(id), Some(email)) = (actor.id(), actor.email()) else {
            return Err(ServiceError::Unauthenticated("Sign in to claim quotes".to_string()));
        };
        let claimed = self.quote_repo.claim_orphaned(&normalize_email(email), id).await?;
        info!(claimed, "Claim completed");
        Ok(claimed)
    }
}
