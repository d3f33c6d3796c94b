use crate::config::mongo_conf::MongoConfig;
use crate::model::feedback::{Feedback, FeedbackSubmission};
use crate::repository::repository_error::{is_duplicate_key, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::IndexModel;
use tracing::{error, info, warn};

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Creates or replaces the rating for (`quote`, `user`) in one atomic step.
    async fn upsert(&self, submission: FeedbackSubmission) -> RepositoryResult<Feedback>;

    async fn find_by_quote(&self, quote: ObjectId) -> RepositoryResult<Option<Feedback>>;
}

pub struct MongoFeedbackRepository {
    collection: mongodb::Collection<Feedback>,
}

impl MongoFeedbackRepository {
    pub fn new(db: &mongodb::Database, config: &MongoConfig) -> Self {
        MongoFeedbackRepository {
            collection: db.collection::<Feedback>(&config.feedback_collection),
        }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "quote": 1, "user": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_indexes(vec![index], None).await?;
        info!("Feedback indexes ensured");
        Ok(())
    }

    async fn upsert_once(&self, submission: &FeedbackSubmission) -> Result<Option<Feedback>, mongodb::error::Error> {
        let now = bson::DateTime::now();
        let filter = doc! { "quote": submission.quote, "user": submission.user };
        let update = doc! {
            "$set": {
                "rating": submission.rating,
                "comment": submission.comment.as_deref(),
                "updatedAt": now,
            },
            "$setOnInsert": {
                "_id": ObjectId::new(),
                "quoteId": submission.quote_id.as_str(),
                "createdAt": now,
            },
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        self.collection.find_one_and_update(filter, update, options).await
    }
}

#[async_trait]
impl FeedbackRepository for MongoFeedbackRepository {
    #[tracing::instrument(skip(self, submission), fields(quote_id = %submission.quote_id))]
    async fn upsert(&self, submission: FeedbackSubmission) -> RepositoryResult<Feedback> {
        // Two first-time upserts can race on the unique index; the loser retries as an update.
        let result = match self.upsert_once(&submission).await {
            Err(e) if is_duplicate_key(&e) => {
                warn!("Concurrent feedback insert, retrying as update");
                self.upsert_once(&submission).await
            }
            other => other,
        };

        match result {
            Ok(Some(feedback)) => {
                info!("Feedback stored");
                Ok(feedback)
            }
            Ok(None) => Err(RepositoryError::database("Feedback upsert returned no document")),
            Err(e) => {
                error!("Failed to store feedback: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_quote(&self, quote: ObjectId) -> RepositoryResult<Option<Feedback>> {
        self.collection
            .find_one(doc! { "quote": quote }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to fetch feedback: {}", e)))
    }
}
