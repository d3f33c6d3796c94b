//! In-memory repositories for tests and local runs without MongoDB.
//!
//! They honour the same contracts as the Mongo adapters: unique `quoteId`,
//! compare-and-swap on `version`, one feedback per (quote, user) and unique
//! account emails.

use async_trait::async_trait;
use bson::oid::ObjectId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::feedback::{Feedback, FeedbackSubmission};
use crate::model::quote::Quote;
use crate::model::user::User;
use crate::repository::feedback_repo::FeedbackRepository;
use crate::repository::quote_repo::QuoteRepository;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::user_repo::{prepare_new_user, UserRepository};

fn read<T>(lock: &RwLock<T>) -> RepositoryResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|err| RepositoryError::database(format!("Lock poisoned: {}", err)))
}

fn write<T>(lock: &RwLock<T>) -> RepositoryResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|err| RepositoryError::database(format!("Lock poisoned: {}", err)))
}

fn sort_newest_first(quotes: &mut [Quote]) {
    quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// Thread-safe in-memory quote repository keyed by `quoteId`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQuoteRepository {
    quotes: Arc<RwLock<HashMap<String, Quote>>>,
}

impl InMemoryQuoteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn insert(&self, quote: Quote) -> RepositoryResult<Quote> {
        let mut quotes = write(&self.quotes)?;
        if quotes.contains_key(&quote.quote_id) {
            return Err(RepositoryError::already_exists(format!(
                "Quote id already used: {}",
                quote.quote_id
            )));
        }
        quotes.insert(quote.quote_id.clone(), quote.clone());
        Ok(quote)
    }

    async fn find_by_quote_id(&self, quote_id: &str) -> RepositoryResult<Option<Quote>> {
        Ok(read(&self.quotes)?.get(quote_id).cloned())
    }

    async fn update_versioned(&self, mut quote: Quote) -> RepositoryResult<Quote> {
        let mut quotes = write(&self.quotes)?;
        let stored = quotes
            .get(&quote.quote_id)
            .ok_or_else(|| RepositoryError::not_found(format!("Quote not found: {}", quote.quote_id)))?;
        if stored.version != quote.version {
            return Err(RepositoryError::version_conflict(format!(
                "Quote {} changed since version {}",
                quote.quote_id, quote.version
            )));
        }
        quote.version += 1;
        quote.updated_at = bson::DateTime::now();
        quotes.insert(quote.quote_id.clone(), quote.clone());
        Ok(quote)
    }

    async fn delete_versioned(&self, quote_id: &str, expected_version: i64) -> RepositoryResult<()> {
        let mut quotes = write(&self.quotes)?;
        let stored = quotes
            .get(quote_id)
            .ok_or_else(|| RepositoryError::not_found(format!("Quote not found: {}", quote_id)))?;
        if stored.version != expected_version {
            return Err(RepositoryError::version_conflict(format!(
                "Quote {} changed since version {}",
                quote_id, expected_version
            )));
        }
        quotes.remove(quote_id);
        Ok(())
    }

    async fn delete(&self, quote_id: &str) -> RepositoryResult<()> {
        write(&self.quotes)?
            .remove(quote_id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found(format!("Quote not found: {}", quote_id)))
    }

    async fn list_by_owner(&self, owner: ObjectId) -> RepositoryResult<Vec<Quote>> {
        let mut owned: Vec<Quote> = read(&self.quotes)?
            .values()
            .filter(|quote| quote.user == Some(owner))
            .cloned()
            .collect();
        sort_newest_first(&mut owned);
        Ok(owned)
    }

    async fn list(&self, page: u32, limit: u32) -> RepositoryResult<Vec<Quote>> {
        let mut all: Vec<Quote> = read(&self.quotes)?.values().cloned().collect();
        sort_newest_first(&mut all);
        let skip = (page.max(1) as usize - 1) * limit as usize;
        Ok(all.into_iter().skip(skip).take(limit as usize).collect())
    }

    async fn count(&self) -> RepositoryResult<u64> {
        Ok(read(&self.quotes)?.len() as u64)
    }

    async fn claim_orphaned(&self, email: &str, owner: ObjectId) -> RepositoryResult<u64> {
        let mut quotes = write(&self.quotes)?;
        let now = bson::DateTime::now();
        let mut claimed = 0;
        for quote in quotes.values_mut() {
            if quote.user.is_none() && quote.email == email {
                quote.user = Some(owner);
                quote.updated_at = now;
                quote.version += 1;
                claimed += 1;
            }
        }
        Ok(claimed)
    }

    async fn claim_one(&self, quote_id: &str, email: &str, owner: ObjectId) -> RepositoryResult<bool> {
        let mut quotes = write(&self.quotes)?;
        match quotes.get_mut(quote_id) {
            Some(quote) if quote.user.is_none() && quote.email == email => {
                quote.user = Some(owner);
                quote.updated_at = bson::DateTime::now();
                quote.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Thread-safe in-memory feedback repository keyed by (quote, user).
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeedbackRepository {
    rows: Arc<RwLock<HashMap<(ObjectId, ObjectId), Feedback>>>,
}

impl InMemoryFeedbackRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn upsert(&self, submission: FeedbackSubmission) -> RepositoryResult<Feedback> {
        let mut rows = write(&self.rows)?;
        let now = bson::DateTime::now();
        let row = rows
            .entry((submission.quote, submission.user))
            .and_modify(|existing| {
                existing.rating = submission.rating;
                existing.comment = submission.comment.clone();
                existing.updated_at = now;
            })
            .or_insert_with(|| Feedback {
                id: ObjectId::new(),
                quote: submission.quote,
                quote_id: submission.quote_id.clone(),
                user: submission.user,
                rating: submission.rating,
                comment: submission.comment.clone(),
                created_at: now,
                updated_at: now,
            });
        Ok(row.clone())
    }

    async fn find_by_quote(&self, quote: ObjectId) -> RepositoryResult<Option<Feedback>> {
        Ok(read(&self.rows)?
            .values()
            .find(|row| row.quote == quote)
            .cloned())
    }
}

/// Thread-safe in-memory account store with unique emails.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<ObjectId, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: User) -> RepositoryResult<User> {
        let user = prepare_new_user(user);
        let mut users = write(&self.users)?;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::already_exists(format!(
                "Email already registered: {}",
                user.email
            )));
        }
        if let Some(id) = user.id {
            users.insert(id, user.clone());
        }
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(read(&self.users)?
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        Ok(read(&self.users)?.get(id).cloned())
    }
}
