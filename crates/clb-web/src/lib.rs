//! HTTP surface: donation checkout, Stripe webhook, OBS overlay.

use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::net::TcpListener;

use clb_core::{
    config::Config, messaging::port::MessagingPort, overlay::OverlayHub, ports::PaymentGateway,
    store::Store,
};

mod donate;
mod events;
mod pages;
pub mod router;
mod webhook;

#[cfg(test)]
mod test_support;

/// Everything the HTTP handlers share.
#[derive(Clone)]
pub struct WebState {
    pub cfg: Arc<Config>,
    pub store: Arc<Store>,
    pub overlay: OverlayHub,
    /// `None` when no Stripe secret key is configured.
    pub payments: Option<Arc<dyn PaymentGateway>>,
    /// `None` when the Telegram bot is not running.
    pub messenger: Option<Arc<dyn MessagingPort>>,
}

/// Bind `0.0.0.0:{cfg.port}` and serve until `shutdown` resolves.
pub async fn serve(
    state: WebState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.cfg.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "http server listening");

    axum::serve(listener, router::build(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed")
}
