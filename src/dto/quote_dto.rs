use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::quote::{Flexibility, MoveDetails, MoveType, PaymentDetails, PaymentMethod, PaymentStatus, Quote};
use crate::model::quote_status::QuoteStatus;

// --- Requests ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    #[validate(length(min = 2, max = 100))]
    pub full_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 20))]
    pub phone: String,

    #[validate(length(min = 2, max = 100))]
    pub from_city: String,
    #[validate(length(max = 300))]
    pub from_address: Option<String>,
    #[validate(length(max = 12))]
    pub from_postal_code: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub to_city: String,
    #[validate(length(max = 300))]
    pub to_address: Option<String>,
    #[validate(length(max = 12))]
    pub to_postal_code: Option<String>,

    /// `YYYY-MM-DD`
    #[validate(length(equal = 10))]
    pub move_date: String,

    #[serde(default)]
    pub flexibility: Flexibility,

    pub move_type: MoveType,

    #[validate(length(max = 100))]
    pub property_type: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, max = 200))]
    pub from_floor: i32,
    #[serde(default)]
    #[validate(range(min = 0, max = 200))]
    pub to_floor: i32,
    #[serde(default)]
    pub from_has_lift: bool,
    #[serde(default)]
    pub to_has_lift: bool,

    #[validate(length(max = 2000))]
    pub additional_notes: Option<String>,
}

impl CreateQuoteRequest {
    pub fn move_details(&self) -> MoveDetails {
        MoveDetails {
            from_city: self.from_city.trim().to_string(),
            from_address: self.from_address.clone(),
            from_postal_code: self.from_postal_code.clone(),
            to_city: self.to_city.trim().to_string(),
            to_address: self.to_address.clone(),
            to_postal_code: self.to_postal_code.clone(),
            move_date: self.move_date.clone(),
            flexibility: self.flexibility,
            move_type: self.move_type,
            property_type: self.property_type.clone(),
            from_floor: self.from_floor,
            to_floor: self.to_floor,
            from_has_lift: self.from_has_lift,
            to_has_lift: self.to_has_lift,
            additional_notes: self.additional_notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetPriceRequest {
    #[validate(range(min = 0.0))]
    pub estimated_cost: f64,
    #[validate(length(max = 2000))]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AcceptQuoteRequest {
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub final_cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPaymentRequest {
    pub method: PaymentMethod,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuoteStatusRequest {
    pub status: QuoteStatus,
    #[validate(length(max = 2000))]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignQuoteRequest {
    #[validate(length(equal = 24))]
    pub staff_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT)
    }
}

// --- Responses ---

fn to_utc(value: bson::DateTime) -> DateTime<Utc> {
    value.to_chrono()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteResponse {
    pub quote_id: String,
    pub status: QuoteStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailsView {
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub amount: f64,
    pub paid_at: DateTime<Utc>,
}

impl From<&PaymentDetails> for PaymentDetailsView {
    fn from(details: &PaymentDetails) -> Self {
        PaymentDetailsView {
            method: details.method,
            transaction_id: details.transaction_id.clone(),
            amount: details.amount,
            paid_at: to_utc(details.paid_at),
        }
    }
}

/// Full quote as seen by its owner or by staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    pub quote_id: String,
    pub user: Option<String>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(flatten)]
    pub details: MoveDetails,
    pub estimated_cost: Option<f64>,
    pub final_cost: Option<f64>,
    pub payment_status: PaymentStatus,
    pub payment_details: Option<PaymentDetailsView>,
    pub status: QuoteStatus,
    pub admin_notes: Option<String>,
    pub assigned_to: Option<String>,
    pub quoted_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Quote> for QuoteView {
    fn from(quote: Quote) -> Self {
        QuoteView {
            payment_details: quote.payment_details.as_ref().map(PaymentDetailsView::from),
            quote_id: quote.quote_id,
            user: quote.user.map(|id| id.to_hex()),
            full_name: quote.full_name,
            email: quote.email,
            phone: quote.phone,
            details: quote.details,
            estimated_cost: quote.estimated_cost,
            final_cost: quote.final_cost,
            payment_status: quote.payment_status,
            status: quote.status,
            admin_notes: quote.admin_notes,
            assigned_to: quote.assigned_to.map(|id| id.to_hex()),
            quoted_at: quote.quoted_at.map(to_utc),
            responded_at: quote.responded_at.map(to_utc),
            created_at: to_utc(quote.created_at),
            updated_at: to_utc(quote.updated_at),
        }
    }
}

/// One row of the customer's quote list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub quote_id: String,
    pub status: QuoteStatus,
    pub from_city: String,
    pub to_city: String,
    pub move_date: String,
    pub move_type: MoveType,
    pub estimated_cost: Option<f64>,
    pub final_cost: Option<f64>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Quote> for QuoteSummary {
    fn from(quote: Quote) -> Self {
        QuoteSummary {
            quote_id: quote.quote_id,
            status: quote.status,
            from_city: quote.details.from_city,
            to_city: quote.details.to_city,
            move_date: quote.details.move_date,
            move_type: quote.details.move_type,
            estimated_cost: quote.estimated_cost,
            final_cost: quote.final_cost,
            payment_status: quote.payment_status,
            created_at: to_utc(quote.created_at),
        }
    }
}

/// What anyone holding a quote id may see. Carries no contact data, admin
/// notes or payment details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuoteView {
    pub quote_id: String,
    pub status: QuoteStatus,
    pub from_city: String,
    pub to_city: String,
    pub move_date: String,
    pub move_type: MoveType,
    pub flexibility: Flexibility,
    pub estimated_cost: Option<f64>,
    pub final_cost: Option<f64>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Quote> for PublicQuoteView {
    fn from(quote: Quote) -> Self {
        PublicQuoteView {
            quote_id: quote.quote_id,
            status: quote.status,
            from_city: quote.details.from_city,
            to_city: quote.details.to_city,
            move_date: quote.details.move_date,
            move_type: quote.details.move_type,
            flexibility: quote.details.flexibility,
            estimated_cost: quote.estimated_cost,
            final_cost: quote.final_cost,
            payment_status: quote.payment_status,
            created_at: to_utc(quote.created_at),
            updated_at: to_utc(quote.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePage {
    pub quotes: Vec<QuoteView>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceiptView {
    pub quote_id: String,
    pub transaction_id: String,
    pub amount: f64,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub claimed_count: u64,
}
