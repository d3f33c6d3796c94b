use crate::config::mongo_conf::MongoConfig;
use crate::model::user::User;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;
use tracing::{error, info};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Assigns an id and timestamps, then stores the account.
    /// Fails with `AlreadyExists` when the email is taken.
    async fn insert(&self, user: User) -> RepositoryResult<User>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>>;
}

pub struct MongoUserRepository {
    collection: mongodb::Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &mongodb::Database, config: &MongoConfig) -> Self {
        MongoUserRepository {
            collection: db.collection::<User>(&config.user_collection),
        }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_indexes(vec![index], None).await?;
        info!("User indexes ensured");
        Ok(())
    }
}

/// Fills the fields the store owns on a new account.
pub(crate) fn prepare_new_user(mut user: User) -> User {
    let now = chrono::Local::now().to_rfc3339();
    user.id = Some(ObjectId::new());
    user.email = user.email.trim().to_lowercase();
    user.created_at = Some(now.clone());
    user.updated_at = Some(now);
    user
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[tracing::instrument(skip(self, user), fields(email = %user.email))]
    async fn insert(&self, user: User) -> RepositoryResult<User> {
        let user = prepare_new_user(user);
        match self.collection.insert_one(&user, None).await {
            Ok(_) => {
                info!("User created");
                Ok(user)
            }
            Err(e) => {
                let err = RepositoryError::from(e);
                if !matches!(err, RepositoryError::AlreadyExists(_)) {
                    error!("Failed to insert user: {}", err);
                }
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let filter = doc! { "email": email.trim().to_lowercase() };
        self.collection
            .find_one(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find user by email: {}", e)))
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        self.collection
            .find_one(doc! { "_id": *id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find user by id: {}", e)))
    }
}
