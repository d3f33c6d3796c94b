//! Runs against the MongoDB configured in `.env`; `cargo test -- --ignored` to include.

use bson::oid::ObjectId;
use movers_backend::config::mongo_conf::MongoConfig;
use movers_backend::model::feedback::FeedbackSubmission;
use movers_backend::repository::feedback_repo::{FeedbackRepository, MongoFeedbackRepository};
use movers_backend::repository::repository_error::{RepositoryError, RepositoryResult};

async fn setup_feedback_repository() -> RepositoryResult<MongoFeedbackRepository> {
    let _ = dotenv::dotenv();
    let config = MongoConfig::from_env()
        .map_err(|e| RepositoryError::database(format!("Failed to load MongoConfig: {}", e)))?;
    let db = config
        .connect()
        .await
        .map_err(|e| RepositoryError::database(format!("Failed to connect: {}", e)))?;
    let repo = MongoFeedbackRepository::new(&db, &config);
    repo.ensure_indexes().await?;
    Ok(repo)
}

#[tokio::test]
#[ignore]
async fn test_second_rating_replaces_the_first() {
    let repo = setup_feedback_repository().await.expect("Failed to setup feedback repository");
    let quote = ObjectId::new();
    let user = ObjectId::new();
    let submission = |rating: i32, comment: &str| FeedbackSubmission {
        quote,
        quote_id: "UP25060001".to_string(),
        user,
        rating,
        comment: Some(comment.to_string()),
    };

    let first = repo.upsert(submission(5, "Careful packers")).await.expect("Failed to store feedback");
    assert_eq!(first.rating, 5);

    let second = repo.upsert(submission(3, "Arrived late")).await.expect("Failed to store feedback");
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.rating, 3);
    assert_eq!(second.comment.as_deref(), Some("Arrived late"));

    let stored = repo
        .find_by_quote(quote)
        .await
        .expect("Failed to fetch feedback")
        .expect("Feedback should exist");
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.rating, 3);
    assert_eq!(stored.quote_id, "UP25060001");
}

#[tokio::test]
#[ignore]
async fn test_missing_feedback_is_none() {
    let repo = setup_feedback_repository().await.expect("Failed to setup feedback repository");
    let found = repo.find_by_quote(ObjectId::new()).await.expect("Failed to fetch feedback");
    assert!(found.is_none());
}
