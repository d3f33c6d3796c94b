use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use validator::Validate;

use crate::dto::feedback_dto::{FeedbackView, SubmitFeedbackRequest};
use crate::handler::quote_handler::QuoteRoutesState;
use crate::model::actor::Actor;
use crate::util::error::{HandlerError, HandlerErrorKind};

pub async fn submit_feedback_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Path(quote_id): Path<String>,
    Json(payload): Json<SubmitFeedbackRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let feedback = state
        .feedback
        .submit_feedback(&quote_id, payload.rating, payload.comment, &actor)
        .await?;
    Ok(Json(FeedbackView::from(feedback)))
}

pub async fn get_feedback_handler(
    State(state): State<QuoteRoutesState>,
    Extension(actor): Extension<Actor>,
    Path(quote_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    match state.feedback.get_feedback(&quote_id, &actor).await? {
        Some(feedback) => Ok(Json(FeedbackView::from(feedback))),
        None => Err(HandlerError::new(
            HandlerErrorKind::NotFound,
            format!("No feedback for quote {}", quote_id),
        )),
    }
}
