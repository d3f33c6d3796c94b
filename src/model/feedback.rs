use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Customer rating of a completed move. At most one per (quote, user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub quote: ObjectId,
    pub quote_id: String,
    pub user: ObjectId,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

/// Validated input for the feedback upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackSubmission {
    pub quote: ObjectId,
    pub quote_id: String,
    pub user: ObjectId,
    pub rating: i32,
    pub comment: Option<String>,
}
