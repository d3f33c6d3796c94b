use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{error, info, instrument, warn};

use crate::config::AdminUserConfig;
use crate::dto::user_dto::{RegisterRequest, UserAuthResponse, UserView};
use crate::model::user::{User, UserRole};
use crate::repository::repository_error::RepositoryError;
use crate::repository::user_repo::UserRepository;
use crate::service::identity_service::normalize_email;
use crate::util::error::ServiceError;
use crate::util::jwt::{JwtTokenUtils, TokenPair};
use crate::util::password::{PasswordUtils, PasswordUtilsImpl};

#[async_trait]
pub trait UserService: Send + Sync {
    async fn register(&self, request: RegisterRequest) -> Result<UserAuthResponse, ServiceError>;
    async fn login(&self, email: String, password: String) -> Result<UserAuthResponse, ServiceError>;
    async fn refresh_token(&self, refresh_token: String) -> Result<TokenPair, ServiceError>;
    /// Creates the staff account from configuration unless the email exists.
    async fn seed_admin(&self, config: &AdminUserConfig) -> Result<(), ServiceError>;
}

pub struct UserServiceImpl {
    pub user_repo: Arc<dyn UserRepository>,
    pub jwt_utils: Arc<dyn JwtTokenUtils>,
}

impl UserServiceImpl {
    pub fn new(user_repo: Arc<dyn UserRepository>, jwt_utils: Arc<dyn JwtTokenUtils>) -> Self {
        Self { user_repo, jwt_utils }
    }

    fn issue_tokens(&self, user: &User) -> Result<TokenPair, ServiceError> {
        let id = user
            .id
            .ok_or_else(|| ServiceError::InternalError("Stored user has no id".to_string()))?;
        self.jwt_utils
            .generate_token_pair(&id.to_hex(), &user.email, user.role)
            .map_err(|e| ServiceError::InternalError(format!("JWT error: {}", e)))
    }

    async fn create_account(&self, mut user: User, password: &str) -> Result<User, ServiceError> {
        user.password_hash = PasswordUtilsImpl::hash_password(password)
            .map_err(|e| ServiceError::InternalError(format!("Password hash error: {}", e)))?;
        match self.user_repo.insert(user).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::AlreadyExists(_)) => {
                Err(ServiceError::Conflict("Email is already registered".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn register(&self, request: RegisterRequest) -> Result<UserAuthResponse, ServiceError> {
        if let Err(problems) = PasswordUtilsImpl::validate_password_strength(&request.password) {
            return Err(ServiceError::InvalidInput(problems.join("; ")));
        }

        let user = User {
            id: None,
            username: request.username,
            first_name: request.first_name,
            last_name: request.last_name,
            email: normalize_email(&request.email),
            password_hash: String::new(),
            role: UserRole::User,
            created_at: None,
            updated_at: None,
        };
        let inserted = self.create_account(user, &request.password).await;
        match &inserted {
            Ok(_) => info!("User registered"),
            Err(e) => warn!("Registration rejected: {e}"),
        }
        let inserted = inserted?;

        let tokens = self.issue_tokens(&inserted)?;
        Ok(UserAuthResponse {
            user: UserView::from(inserted),
            tokens,
        })
    }

    #[instrument(skip(self, password))]
    async fn login(&self, email: String, password: String) -> Result<UserAuthResponse, ServiceError> {
        let invalid = || ServiceError::Unauthenticated("Invalid credentials".to_string());

        let user = match self.user_repo.find_by_email(&email).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("Login for unknown email");
                return Err(invalid());
            }
            Err(e) => {
                error!("Failed to fetch user for login: {e}");
                return Err(e.into());
            }
        };

        let valid = PasswordUtilsImpl::verify_password(&password, &user.password_hash)
            .map_err(|e| ServiceError::InternalError(format!("Password verify error: {}", e)))?;
        if !valid {
            warn!("Invalid credentials");
            return Err(invalid());
        }

        let tokens = self.issue_tokens(&user)?;
        info!("User logged in");
        Ok(UserAuthResponse {
            user: UserView::from(user),
            tokens,
        })
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh_token(&self, refresh_token: String) -> Result<TokenPair, ServiceError> {
        let claims = self
            .jwt_utils
            .validate_refresh_token(&refresh_token)
            .map_err(|e| ServiceError::Unauthenticated(format!("Invalid refresh token: {}", e)))?;
        let gone = || ServiceError::Unauthenticated("Account no longer exists".to_string());
        let id = ObjectId::parse_str(&claims.sub).map_err(|_| gone())?;
        let user = match self.user_repo.find_by_id(&id).await? {
            Some(user) => user,
            None => {
                warn!("Refresh for a deleted account");
                return Err(gone());
            }
        };
        // Role and email come from the stored account, not the old claims.
        let tokens = self.issue_tokens(&user)?;
        info!("Token refreshed");
        Ok(tokens)
    }

    #[instrument(skip(self, config), fields(email = %config.email))]
    async fn seed_admin(&self, config: &AdminUserConfig) -> Result<(), ServiceError> {
        if self.user_repo.find_by_email(&config.email).await?.is_some() {
            info!("Admin account already present");
            return Ok(());
        }
        let admin = User {
            id: None,
            username: config.username.clone(),
            first_name: config.first_name.clone(),
            last_name: config.last_name.clone(),
            email: normalize_email(&config.email),
            password_hash: String::new(),
            role: UserRole::Admin,
            created_at: None,
            updated_at: None,
        };
        self.create_account(admin, &config.password).await?;
        info!("Admin account created");
        Ok(())
    }
}
