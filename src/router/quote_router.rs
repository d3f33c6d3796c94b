use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handler::feedback_handler::{get_feedback_handler, submit_feedback_handler};
use crate::handler::quote_handler::{
    accept_quote_handler, assign_quote_handler, cancel_quote_handler, claim_quotes_handler, create_quote_handler,
    delete_own_quote_handler, delete_quote_handler, get_quote_handler, list_my_quotes_handler, list_quotes_handler,
    set_price_handler, submit_payment_handler, track_quote_handler, update_quote_status_handler, QuoteRoutesState,
};
use crate::middlewares::auth_middleware::{require_authenticated, require_staff};

pub fn quote_router(state: QuoteRoutesState) -> Router {
    // Open to anyone; an optional token links the quote to the account
    let public = Router::new()
        .route("/quotes", post(create_quote_handler))
        .route("/quotes/track/{quote_id}", get(track_quote_handler));

    let customer = Router::new()
        .route("/quotes/mine", get(list_my_quotes_handler))
        .route("/quotes/claim", post(claim_quotes_handler))
        .route("/quotes/{quote_id}", get(get_quote_handler).delete(delete_own_quote_handler))
        .route("/quotes/{quote_id}/accept", post(accept_quote_handler))
        .route("/quotes/{quote_id}/payment", post(submit_payment_handler))
        .route("/quotes/{quote_id}/cancel", post(cancel_quote_handler))
        .route(
            "/quotes/{quote_id}/feedback",
            post(submit_feedback_handler).get(get_feedback_handler),
        )
        .route_layer(middleware::from_fn(require_authenticated));

    let admin = Router::new()
        .route("/admin/quotes", get(list_quotes_handler))
        .route("/admin/quotes/{quote_id}", delete(delete_quote_handler))
        .route("/admin/quotes/{quote_id}/price", put(set_price_handler))
        .route("/admin/quotes/{quote_id}/status", put(update_quote_status_handler))
        .route("/admin/quotes/{quote_id}/assign", put(assign_quote_handler))
        .route_layer(middleware::from_fn(require_staff));

    public.merge(customer).merge(admin).with_state(state)
}
