use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use clb_core::{donation::DonationNotice, overlay::OverlayEvent};
use clb_stripe::webhook::{construct_event, donation_from_event, SIGNATURE_HEADER};

use crate::WebState;

/// Stripe event callback. Only `checkout.session.completed` triggers an announcement.
pub(crate) async fn stripe_webhook(
    State(state): State<WebState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let event = match construct_event(
        &body,
        signature,
        state.cfg.stripe_webhook_secret.as_deref(),
        state.cfg.webhook_tolerance,
        chrono::Utc::now().timestamp(),
    ) {
        Ok(ev) => ev,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting stripe webhook");
            return (StatusCode::BAD_REQUEST, "Webhook error");
        }
    };

    tracing::info!(event_id = event.id.as_deref().unwrap_or("-"), kind = %event.kind, "stripe event received");

    if let Some(notice) = donation_from_event(&event) {
        announce_donation(&state, &notice).await;
    }

    (StatusCode::OK, "OK")
}

async fn announce_donation(state: &WebState, notice: &DonationNotice) {
    state.overlay.publish(OverlayEvent::Donation {
        user: notice.user_name.clone(),
        label: notice.label.clone(),
        amount: notice.amount.clone(),
    });

    let Some(messenger) = state.messenger.as_ref() else {
        tracing::warn!("telegram not running, donation not announced in chat");
        return;
    };

    let model_name = state.store.snapshot().await.model_name;
    let html = notice.announcement_html(&model_name);
    for chat_id in notice.targets(state.cfg.donation_channel) {
        if let Err(e) = messenger.send_html(chat_id, &html).await {
            tracing::error!(chat_id = chat_id.0, error = %e, "sending donation announcement failed");
        }
    }
}
