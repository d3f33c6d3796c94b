use crate::config::mongo_conf::MongoConfig;
use crate::model::quote::Quote;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::stream::TryStreamExt;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::IndexModel;
use tracing::{error, info, warn};

/// Persistence port for quotes.
///
/// Writes that depend on a previously read state are compare-and-swap on
/// `version`, so two concurrent transitions on one quote cannot both apply.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Inserts a new quote. Fails with `AlreadyExists` on a `quoteId` collision.
    async fn insert(&self, quote: Quote) -> RepositoryResult<Quote>;

    async fn find_by_quote_id(&self, quote_id: &str) -> RepositoryResult<Option<Quote>>;

    /// Persists `quote` if the stored version still equals `quote.version`.
    /// Returns the stored quote with its bumped version.
    async fn update_versioned(&self, quote: Quote) -> RepositoryResult<Quote>;

    /// Removes the quote if the stored version still equals `expected_version`.
    async fn delete_versioned(&self, quote_id: &str, expected_version: i64) -> RepositoryResult<()>;

    async fn delete(&self, quote_id: &str) -> RepositoryResult<()>;

    /// Quotes owned by `owner`, newest first.
    async fn list_by_owner(&self, owner: ObjectId) -> RepositoryResult<Vec<Quote>>;

    /// All quotes, newest first. `page` starts at 1.
    async fn list(&self, page: u32, limit: u32) -> RepositoryResult<Vec<Quote>>;

    async fn count(&self) -> RepositoryResult<u64>;

    /// Binds every unowned quote carrying `email` to `owner` in one update.
    async fn claim_orphaned(&self, email: &str, owner: ObjectId) -> RepositoryResult<u64>;

    /// Binds a single unowned quote carrying `email` to `owner`.
    /// Returns false when the quote is no longer unowned.
    async fn claim_one(&self, quote_id: &str, email: &str, owner: ObjectId) -> RepositoryResult<bool>;
}

pub struct MongoQuoteRepository {
    collection: mongodb::Collection<Quote>,
}

impl MongoQuoteRepository {
    pub fn new(db: &mongodb::Database, config: &MongoConfig) -> Self {
        MongoQuoteRepository {
            collection: db.collection::<Quote>(&config.quote_collection),
        }
    }

    /// Creates the indexes the lifecycle relies on.
    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "quoteId": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            IndexModel::builder().keys(doc! { "email": 1, "user": 1 }).build(),
            IndexModel::builder().keys(doc! { "user": 1, "createdAt": -1 }).build(),
            IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
        ];
        self.collection.create_indexes(indexes, None).await?;
        info!("Quote indexes ensured");
        Ok(())
    }

    fn newest_first() -> FindOptions {
        FindOptions::builder().sort(doc! { "createdAt": -1, "_id": -1 }).build()
    }
}

#[async_trait]
impl QuoteRepository for MongoQuoteRepository {
    #[tracing::instrument(skip(self, quote), fields(quote_id = %quote.quote_id))]
    async fn insert(&self, quote: Quote) -> RepositoryResult<Quote> {
        match self.collection.insert_one(&quote, None).await {
            Ok(_) => {
                info!("Quote created");
                Ok(quote)
            }
            Err(e) => {
                let err = RepositoryError::from(e);
                match &err {
                    RepositoryError::AlreadyExists(_) => warn!("Quote id collision"),
                    _ => error!("Failed to create quote: {}", err),
                }
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_quote_id(&self, quote_id: &str) -> RepositoryResult<Option<Quote>> {
        self.collection
            .find_one(doc! { "quoteId": quote_id }, None)
            .await
            .map_err(|e| {
                error!("Failed to fetch quote: {}", e);
                RepositoryError::database(format!("Failed to fetch quote {}: {}", quote_id, e))
            })
    }

    #[tracing::instrument(skip(self, quote), fields(quote_id = %quote.quote_id, version = quote.version))]
    async fn update_versioned(&self, mut quote: Quote) -> RepositoryResult<Quote> {
        let expected_version = quote.version;
        quote.version += 1;
        quote.updated_at = bson::DateTime::now();

        let filter = doc! { "quoteId": quote.quote_id.as_str(), "version": expected_version };
        let result = self
            .collection
            .replace_one(filter, &quote, None)
            .await
            .map_err(|e| {
                error!("Failed to update quote: {}", e);
                RepositoryError::database(format!("Failed to update quote: {}", e))
            })?;

        if result.matched_count == 1 {
            return Ok(quote);
        }
        match self.find_by_quote_id(&quote.quote_id).await? {
            Some(_) => Err(RepositoryError::version_conflict(format!(
                "Quote {} changed since version {}",
                quote.quote_id, expected_version
            ))),
            None => Err(RepositoryError::not_found(format!("Quote not found: {}", quote.quote_id))),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete_versioned(&self, quote_id: &str, expected_version: i64) -> RepositoryResult<()> {
        let filter = doc! { "quoteId": quote_id, "version": expected_version };
        let result = self.collection.delete_one(filter, None).await.map_err(|e| {
            error!("Failed to delete quote: {}", e);
            RepositoryError::database(format!("Failed to delete quote: {}", e))
        })?;

        if result.deleted_count == 1 {
            info!("Quote deleted");
            return Ok(());
        }
        match self.find_by_quote_id(quote_id).await? {
            Some(_) => Err(RepositoryError::version_conflict(format!(
                "Quote {} changed since version {}",
                quote_id, expected_version
            ))),
            None => Err(RepositoryError::not_found(format!("Quote not found: {}", quote_id))),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, quote_id: &str) -> RepositoryResult<()> {
        let result = self
            .collection
            .delete_one(doc! { "quoteId": quote_id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to delete quote: {}", e)))?;
        if result.deleted_count == 0 {
            return Err(RepositoryError::not_found(format!("Quote not found: {}", quote_id)));
        }
        info!("Quote deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(owner = %owner))]
    async fn list_by_owner(&self, owner: ObjectId) -> RepositoryResult<Vec<Quote>> {
        let cursor = self
            .collection
            .find(doc! { "user": owner }, Self::newest_first())
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list quotes: {}", e)))?;
        let quotes: Vec<Quote> = cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::serialization(format!("Failed to read quotes: {}", e)))?;
        info!("Fetched {} quotes for owner", quotes.len());
        Ok(quotes)
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, page: u32, limit: u32) -> RepositoryResult<Vec<Quote>> {
        let skip = u64::from(page.max(1) - 1) * u64::from(limit);
        let mut options = Self::newest_first();
        options.skip = Some(skip);
        options.limit = Some(i64::from(limit));

        let cursor = self
            .collection
            .find(None, options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list quotes: {}", e)))?;
        let quotes: Vec<Quote> = cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::serialization(format!("Failed to read quotes: {}", e)))?;
        info!("Fetched {} quotes", quotes.len());
        Ok(quotes)
    }

    #[tracing::instrument(skip(self))]
    async fn count(&self) -> RepositoryResult<u64> {
        self.collection
            .count_documents(None, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to count quotes: {}", e)))
    }

    #[tracing::instrument(skip(self, email), fields(owner = %owner))]
    async fn claim_orphaned(&self, email: &str, owner: ObjectId) -> RepositoryResult<u64> {
        let filter = doc! { "email": email, "user": null };
        let update = doc! {
            "$set": { "user": owner, "updatedAt": bson::DateTime::now() },
            "$inc": { "version": 1_i64 },
        };
        let result = self
            .collection
            .update_many(filter, update, None)
            .await
            .map_err(|e| {
                error!("Failed to claim quotes: {}", e);
                RepositoryError::database(format!("Failed to claim quotes: {}", e))
            })?;
        info!(claimed = result.modified_count, "Claimed orphaned quotes");
        Ok(result.modified_count)
    }

    #[tracing::instrument(skip(self, email), fields(owner = %owner))]
    async fn claim_one(&self, quote_id: &str, email: &str, owner: ObjectId) -> RepositoryResult<bool> {
        let filter = doc! { "quoteId": quote_id, "email": email, "user": null };
        let update = doc! {
            "$set": { "user": owner, "updatedAt": bson::DateTime::now() },
            "$inc": { "version": 1_i64 },
        };
        let result = self
            .collection
            .update_one(filter, update, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to claim quote: {}", e)))?;
        Ok(result.modified_count == 1)
    }
}
