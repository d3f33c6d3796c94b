use crate::model::quote_status::QuoteStatus;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveType {
    Household,
    Office,
    Vehicle,
    Storage,
    International,
}

/// How far the customer can shift the move date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flexibility {
    #[default]
    Exact,
    FewDays,
    Week,
    Flexible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Upi,
    Card,
    NetBanking,
    Wallet,
    Cash,
}

impl PaymentMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Upi => "upi",
            PaymentMethod::Card => "card",
            PaymentMethod::NetBanking => "net_banking",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Cash => "cash",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub amount: f64,
    pub paid_at: bson::DateTime,
}

/// Route and schedule of a submission. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveDetails {
    pub from_city: String,
    pub from_address: Option<String>,
    pub from_postal_code: Option<String>,
    pub to_city: String,
    pub to_address: Option<String>,
    pub to_postal_code: Option<String>,
    pub move_date: String,
    pub flexibility: Flexibility,
    pub move_type: MoveType,
    pub property_type: Option<String>,
    pub from_floor: i32,
    pub to_floor: i32,
    pub from_has_lift: bool,
    pub to_has_lift: bool,
    pub additional_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub quote_id: String,
    /// Owning account; null for anonymous submissions until claimed.
    pub user: Option<ObjectId>,

    pub full_name: String,
    /// Stored lower-cased so claim matching is exact.
    pub email: String,
    pub phone: String,

    #[serde(flatten)]
    pub details: MoveDetails,

    pub estimated_cost: Option<f64>,
    pub final_cost: Option<f64>,
    pub payment_status: PaymentStatus,
    pub payment_details: Option<PaymentDetails>,

    pub status: QuoteStatus,
    pub admin_notes: Option<String>,
    pub assigned_to: Option<ObjectId>,
    pub quoted_at: Option<bson::DateTime>,
    pub responded_at: Option<bson::DateTime>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,

    /// Bumped on every write; used for compare-and-swap updates.
    pub version: i64,
}

impl Quote {
    /// Builds a fresh `pending` quote for a submission.
    pub fn new_submission(
        quote_id: String,
        owner: Option<ObjectId>,
        full_name: String,
        email: String,
        phone: String,
        details: MoveDetails,
    ) -> Self {
        let now = bson::DateTime::now();
        Quote {
            id: ObjectId::new(),
            quote_id,
            user: owner,
            full_name,
            email,
            phone,
            details,
            estimated_cost: None,
            final_cost: None,
            payment_status: PaymentStatus::Unpaid,
            payment_details: None,
            status: QuoteStatus::Pending,
            admin_notes: None,
            assigned_to: None,
            quoted_at: None,
            responded_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}
