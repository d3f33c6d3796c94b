use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::dto::quote_dto::{
    AcceptQuoteRequest, AssignQuoteRequest, ClaimResponse, CreateQuoteRequest, CreateQuoteResponse, ListQuery,
    PaymentReceiptView, PublicQuoteView, QuotePage, QuoteSummary, QuoteView, SetPriceRequest, SubmitPaymentRequest,
    UpdateQuoteStatusRequest,
};
use crate::model::actor::Actor;
use crate::service::feedback_service::FeedbackService;
use crate::service::quote_service::QuoteService;
use crate::util::error::HandlerError;

/// Services shared by the quote and feedback routes.
#[derive(Clone)]
pub struct QuoteRoutesState {
    pub quotes: Arc<dyn QuoteService>,
    pub feedback: Arc<dyn FeedbackService>,
}

pub async fn create_quote_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateQuoteRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let quote = state.quotes.create_quote(payload, &actor).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateQuoteResponse {
            quote_id: quote.quote_id,
            status: quote.status,
        }),
    ))
}

pub async fn track_quote_handler(
    State(state): State<QuoteRoutesState>,
    Path(quote_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let quote = state.quotes.track_by_quote_id(&quote_id).await?;
    Ok(Json(PublicQuoteView::from(quote)))
}

pub async fn list_my_quotes_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, HandlerError> {
    let quotes = state.quotes.list_by_owner(&actor).await?;
    Ok(Json(quotes.into_iter().map(QuoteSummary::from).collect::<Vec<_>>()))
}

pub async fn claim_quotes_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, HandlerError> {
    let claimed_count = state.quotes.claim(&actor).await?;
    Ok(Json(ClaimResponse { claimed_count }))
}

pub async fn get_quote_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Path(quote_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let quote = state.quotes.get_by_quote_id(&quote_id, &actor).await?;
    Ok(Json(QuoteView::from(quote)))
}

pub async fn accept_quote_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Path(quote_id): Path<String>,
    Json(payload): Json<AcceptQuoteRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let quote = state.quotes.accept(&quote_id, payload.final_cost, &actor).await?;
    Ok(Json(QuoteView::from(quote)))
}

pub async fn submit_payment_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Path(quote_id): Path<String>,
    Json(payload): Json<SubmitPaymentRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let receipt = state
        .quotes
        .submit_payment(&quote_id, payload.method, payload.amount, &actor)
        .await?;
    Ok(Json(PaymentReceiptView {
        quote_id: receipt.quote.quote_id,
        transaction_id: receipt.transaction_id,
        amount: payload.amount,
        payment_status: receipt.quote.payment_status,
    }))
}

pub async fn cancel_quote_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Path(quote_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let quote = state.quotes.cancel(&quote_id, &actor).await?;
    Ok(Json(QuoteView::from(quote)))
}

pub async fn delete_own_quote_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Path(quote_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    state.quotes.delete_own(&quote_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Staff ---

pub async fn list_quotes_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let (page, limit) = (query.page(), query.limit());
    let (quotes, total) = state.quotes.list_all(page, limit, &actor).await?;
    Ok(Json(QuotePage {
        quotes: quotes.into_iter().map(QuoteView::from).collect(),
        total,
        page,
        limit,
    }))
}

pub async fn set_price_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Path(quote_id): Path<String>,
    Json(payload): Json<SetPriceRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let quote = state
        .quotes
        .set_price(&quote_id, payload.estimated_cost, payload.admin_notes, &actor)
        .await?;
    Ok(Json(QuoteView::from(quote)))
}

pub async fn update_quote_status_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Path(quote_id): Path<String>,
    Json(payload): Json<UpdateQuoteStatusRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let quote = state
        .quotes
        .update_status(&quote_id, payload.status, payload.admin_notes, &actor)
        .await?;
    Ok(Json(QuoteView::from(quote)))
}

pub async fn assign_quote_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Path(quote_id): Path<String>,
    Json(payload): Json<AssignQuoteRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let quote = state.quotes.assign(&quote_id, &payload.staff_id, &actor).await?;
    Ok(Json(QuoteView::from(quote)))
}

pub async fn delete_quote_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Path(quote_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    state.quotes.delete_any(&quote_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
