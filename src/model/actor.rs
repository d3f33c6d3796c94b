use bson::oid::ObjectId;

/// The principal on whose behalf an operation runs.
///
/// Resolved once per request from the bearer token and passed explicitly into
/// every lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    Account { id: ObjectId, email: String },
    Staff { id: ObjectId, email: String },
}

impl Actor {
    pub fn account(id: ObjectId, email: impl Into<String>) -> Self {
        Actor::Account {
            id,
            email: email.into(),
        }
    }

    pub fn staff(id: ObjectId, email: impl Into<String>) -> Self {
        Actor::Staff {
            id,
            email: email.into(),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Actor::Staff { .. })
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Actor::Anonymous)
    }

    /// Account id of an authenticated actor.
    pub fn id(&self) -> Option<ObjectId> {
        match self {
            Actor::Anonymous => None,
            Actor::Account { id, .. } | Actor::Staff { id, .. } => Some(*id),
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Actor::Anonymous => None,
            Actor::Account { email, .. } | Actor::Staff { email, .. } => Some(email),
        }
    }
}
