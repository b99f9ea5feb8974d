use std::sync::LazyLock;
use std::time::Instant;

use axum::{
    http::header,
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

const OVERLAY_HTML: &str = include_str!("../assets/overlay.html");

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// Uptime in seconds
    uptime: u64,
}

/// Start the uptime clock.
pub(crate) fn mark_started() {
    LazyLock::force(&START_TIME);
}

pub(crate) async fn index() -> &'static str {
    "Cosplay Live Bot läuft ✅"
}

pub(crate) async fn health() -> impl IntoResponse {
    let body = HealthResponse {
        status: "up",
        version: env!("CARGO_PKG_VERSION"),
        uptime: START_TIME.elapsed().as_secs(),
    };

    (
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(body),
    )
}

pub(crate) async fn ok() -> &'static str {
    "✅ Zahlung erfolgreich. Danke für deinen Support!"
}

pub(crate) async fn cancel() -> &'static str {
    "Zahlung abgebrochen."
}

pub(crate) async fn overlay() -> impl IntoResponse {
    ([(header::CACHE_CONTROL, "no-store")], Html(OVERLAY_HTML))
}
