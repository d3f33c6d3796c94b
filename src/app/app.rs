use axum::{middleware, routing::get, Router};
use std::error::Error;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AdminUserConfig, AppConfig, EmailConfig, JwtConfig, LifecycleConfig, MongoConfig};
use crate::handler::quote_handler::QuoteRoutesState;
use crate::middlewares::auth_middleware::{identify, AuthState};
use crate::repository::feedback_repo::MongoFeedbackRepository;
use crate::repository::quote_repo::MongoQuoteRepository;
use crate::repository::user_repo::MongoUserRepository;
use crate::router::quote_router::quote_router;
use crate::router::user_router::user_router;
use crate::service::feedback_service::{FeedbackService, FeedbackServiceImpl};
use crate::service::identity_service::{IdentityResolver, JwtIdentityResolver};
use crate::service::notification_service::{
    EmailNotificationSink, LogNotificationSink, NotificationSink, Notifier,
};
use crate::service::quote_service::{QuoteService, QuoteServiceImpl};
use crate::service::user_service::{UserService, UserServiceImpl};
use crate::util::email::SmtpEmailService;
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};

pub struct App {
    config: AppConfig,
    router: Router,
}

/// Assembles every route behind the identity layer.
pub fn build_router(
    quotes: Arc<dyn QuoteService>,
    feedback: Arc<dyn FeedbackService>,
    users: Arc<dyn UserService>,
    resolver: Arc<dyn IdentityResolver>,
) -> Router {
    let auth_state = Arc::new(AuthState { resolver });
    Router::new()
        .merge(quote_router(QuoteRoutesState { quotes, feedback }))
        .merge(user_router(users))
        .route("/health", get(|| async { "OK" }))
        .layer(middleware::from_fn_with_state(auth_state, identify))
}

fn notification_sink() -> Arc<dyn NotificationSink> {
    let email_config = match EmailConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            warn!("Email not configured, lifecycle events will only be logged: {e}");
            return Arc::new(LogNotificationSink);
        }
    };
    let staff_email = email_config.notify_staff_email.clone();
    match SmtpEmailService::new(email_config) {
        Ok(service) => {
            info!("Email notifications enabled");
            Arc::new(EmailNotificationSink::new(Arc::new(service), staff_email))
        }
        Err(e) => {
            warn!("SMTP transport unavailable, lifecycle events will only be logged: {e}");
            Arc::new(LogNotificationSink)
        }
    }
}

impl App {
    pub async fn new() -> Result<Self, Box<dyn Error>> {
        let config = AppConfig::from_env();
        let jwt_config = JwtConfig::from_env()?;
        let mongo_config = MongoConfig::from_env()?;
        let lifecycle_config = LifecycleConfig::from_env()?;

        let db = mongo_config.connect().await?;
        let quote_repo = MongoQuoteRepository::new(&db, &mongo_config);
        let feedback_repo = MongoFeedbackRepository::new(&db, &mongo_config);
        let user_repo = MongoUserRepository::new(&db, &mongo_config);
        quote_repo.ensure_indexes().await?;
        feedback_repo.ensure_indexes().await?;
        user_repo.ensure_indexes().await?;
        let quote_repo = Arc::new(quote_repo);

        let jwt_utils: Arc<dyn JwtTokenUtils> = Arc::new(JwtTokenUtilsImpl::new(jwt_config));
        let notifier = Notifier::new(notification_sink());

        let users: Arc<dyn UserService> = Arc::new(UserServiceImpl::new(Arc::new(user_repo), jwt_utils.clone()));
        let quotes: Arc<dyn QuoteService> = Arc::new(QuoteServiceImpl::new(
            quote_repo.clone(),
            notifier.clone(),
            lifecycle_config.policy(),
            lifecycle_config.quote_id_prefix.clone(),
        ));
        let feedback: Arc<dyn FeedbackService> = Arc::new(FeedbackServiceImpl::new(
            quote_repo,
            Arc::new(feedback_repo),
            notifier,
        ));
        let resolver: Arc<dyn IdentityResolver> = Arc::new(JwtIdentityResolver::new(jwt_utils));

        match AdminUserConfig::from_env() {
            Ok(admin) => users.seed_admin(&admin).await?,
            Err(e) => warn!("Admin user config not loaded: {e}"),
        }

        Ok(App {
            config,
            router: build_router(quotes, feedback, users, resolver),
        })
    }

    pub async fn start(self) -> Result<(), Box<dyn Error>> {
        let addr = self.config.bind_address();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("🚀 Server running at http://{}", addr);
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}
