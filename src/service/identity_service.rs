//! Who is acting, and what that actor may do with a given quote.

use std::sync::Arc;

use bson::oid::ObjectId;
use tracing::{debug, warn};

use crate::model::actor::Actor;
use crate::model::quote::Quote;
use crate::model::user::UserRole;
use crate::util::jwt::{JwtError, JwtTokenUtils};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token has expired")]
    Expired,
}

impl From<JwtError> for IdentityError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenExpired => IdentityError::Expired,
            JwtError::InvalidToken => IdentityError::InvalidToken("missing or empty bearer token".to_string()),
            other => IdentityError::InvalidToken(other.to_string()),
        }
    }
}

/// Maps a bearer credential to the acting principal.
pub trait IdentityResolver: Send + Sync {
    fn resolve_identity(&self, token: &str) -> Result<Actor, IdentityError>;

    /// Resolves an `Authorization` header value. No header means anonymous.
    fn resolve_header(&self, header: Option<&str>) -> Result<Actor, IdentityError>;
}

pub struct JwtIdentityResolver {
    jwt: Arc<dyn JwtTokenUtils>,
}

impl JwtIdentityResolver {
    pub fn new(jwt: Arc<dyn JwtTokenUtils>) -> Self {
        JwtIdentityResolver { jwt }
    }
}

impl IdentityResolver for JwtIdentityResolver {
    fn resolve_identity(&self, token: &str) -> Result<Actor, IdentityError> {
        let claims = self.jwt.validate_access_token(token)?;
        let id = ObjectId::parse_str(&claims.sub).map_err(|_| {
            warn!("Token subject is not an account id");
            IdentityError::InvalidToken("subject is not an account id".to_string())
        })?;
        let email = normalize_email(&claims.email);
        debug!(role = claims.role.as_str(), "Resolved identity");
        Ok(match claims.role {
            UserRole::Admin => Actor::staff(id, email),
            UserRole::User => Actor::account(id, email),
        })
    }

    fn resolve_header(&self, header: Option<&str>) -> Result<Actor, IdentityError> {
        match header {
            None => Ok(Actor::Anonymous),
            Some(value) => {
                let token = self.jwt.extract_token_from_header(value)?;
                self.resolve_identity(&token)
            }
        }
    }
}

/// Emails are compared and stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Owner stamped on a new quote. Only a customer account owns what it submits;
/// anonymous and staff submissions stay unowned until claimed.
pub fn owner_for_new_quote(actor: &Actor) -> Option<ObjectId> {
    match actor {
        Actor::Account { id, .. } => Some(*id),
        Actor::Anonymous | Actor::Staff { .. } => None,
    }
}

/// How an actor relates to a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Staff,
    Owner,
    /// Unowned quote whose email matches the actor; must be claimed first.
    Claimable,
    Denied,
}

pub fn ownership(actor: &Actor, quote: &Quote) -> Ownership {
    match actor {
        Actor::Staff { .. } => Ownership::Staff,
        Actor::Anonymous => Ownership::Denied,
        Actor::Account { id, email } => match quote.user {
            Some(owner) if owner == *id => Ownership::Owner,
            Some(_) => Ownership::Denied,
            None if normalize_email(email) == quote.email => Ownership::Claimable,
            None => Ownership::Denied,
        },
    }
}
