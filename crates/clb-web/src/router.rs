use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{donate, events, pages, webhook, WebState};

pub fn build(state: WebState) -> Router {
    pages::mark_started();

    Router::new()
        .route("/", get(pages::index))
        .route("/health", get(pages::health))
        .route("/ok", get(pages::ok))
        .route("/cancel", get(pages::cancel))
        .route("/overlay", get(pages::overlay))
        .route("/events", get(events::stream))
        .route("/donar", get(donate::donar))
        .route("/stripe/webhook", post(webhook::stripe_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
