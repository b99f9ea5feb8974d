use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use clb_core::{
    domain::{Amount, ChatId},
    donation::DEFAULT_LABEL,
    menu::DEFAULT_USER_NAME,
    ports::CheckoutRequest,
    store::MAX_PRICE,
};

use crate::WebState;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DonateQuery {
    amount: Option<String>,
    label: Option<String>,
    chat_id: Option<String>,
    user_name: Option<String>,
}

/// Create a Checkout Session for one menu item and send the payer to it.
pub(crate) async fn donar(State(state): State<WebState>, Query(q): Query<DonateQuery>) -> Response {
    let Some(payments) = state.payments.clone() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Stripe Secret Key fehlt").into_response();
    };

    let Some(req) = checkout_request(&state, q) else {
        return (StatusCode::BAD_REQUEST, "Ungültige Parameter").into_response();
    };

    match payments.create_checkout(&req).await {
        Ok(session) => Redirect::to(&session.url).into_response(),
        Err(e) => {
            tracing::error!(error = %e, label = %req.label, "creating checkout session failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Stripe Fehler").into_response()
        }
    }
}

fn checkout_request(state: &WebState, q: DonateQuery) -> Option<CheckoutRequest> {
    let amount = q.amount.as_deref().and_then(Amount::parse)?;
    if amount.is_zero() || amount > MAX_PRICE {
        return None;
    }
    let chat_id = q
        .chat_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i64>().ok())
        .map(ChatId)?;

    let label = non_blank(q.label).unwrap_or_else(|| DEFAULT_LABEL.to_string());
    let user_name = non_blank(q.user_name).unwrap_or_else(|| DEFAULT_USER_NAME.to_string());

    Some(CheckoutRequest {
        label,
        amount,
        currency: state.cfg.stripe_currency.clone(),
        chat_id,
        user_name,
        success_url: state.cfg.success_url(),
        cancel_url: state.cfg.cancel_url(),
    })
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::{router, test_support::*};

    async fn get(state: crate::WebState, uri: &str) -> (axum::http::StatusCode, String, Option<String>) {
        let resp = router::build(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let location = resp
            .headers()
            .get("location")
            .map(|v| v.to_str().unwrap().to_string());
        (status, body_string(resp).await, location)
    }

    #[tokio::test]
    async fn redirects_to_checkout() {
        let h = Harness::new();
        let (status, _, location) = get(
            h.state(),
            "/donar?amount=12.50&label=Nice+Pose&chat_id=-100&user_name=Ann",
        )
        .await;
        assert_eq!(status, 303);
        assert_eq!(location.as_deref(), Some("https://checkout.test/cs_1"));

        let reqs = h.payments.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].label, "Nice Pose");
        assert_eq!(reqs[0].amount.cents(), 1250);
        assert_eq!(reqs[0].chat_id.0, -100);
        assert_eq!(reqs[0].user_name, "Ann");
        assert_eq!(reqs[0].currency, "eur");
        assert_eq!(reqs[0].success_url, "https://live.test/ok");
        assert_eq!(reqs[0].cancel_url, "https://live.test/cancel");
    }

    #[tokio::test]
    async fn defaults_label_and_user() {
        let h = Harness::new();
        let (status, _, _) = get(h.state(), "/donar?amount=5&chat_id=1").await;
        assert_eq!(status, 303);
        let reqs = h.payments.requests();
        assert_eq!(reqs[0].label, "Support");
        assert_eq!(reqs[0].user_name, "Gast");
    }

    #[tokio::test]
    async fn rejects_bad_parameters() {
        let h = Harness::new();
        for uri in [
            "/donar",
            "/donar?amount=0&chat_id=1",
            "/donar?amount=-3&chat_id=1",
            "/donar?amount=abc&chat_id=1",
            "/donar?amount=20000&chat_id=1",
            "/donar?amount=5",
            "/donar?amount=5&chat_id=",
            "/donar?amount=5&chat_id=abc",
        ] {
            let (status, body, _) = get(h.state(), uri).await;
            assert_eq!(status, 400, "{uri}");
            assert_eq!(body, "Ungültige Parameter");
        }
        assert!(h.payments.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_stripe_key_is_server_error() {
        let h = Harness::new();
        let mut state = h.state();
        state.payments = None;
        let (status, body, _) = get(state, "/donar?amount=5&chat_id=1").await;
        assert_eq!(status, 500);
        assert_eq!(body, "Stripe Secret Key fehlt");
    }

    #[tokio::test]
    async fn gateway_failure_is_server_error() {
        let h = Harness::new();
        h.payments.fail_next();
        let (status, body, _) = get(h.state(), "/donar?amount=5&chat_id=1").await;
        assert_eq!(status, 500);
        assert_eq!(body, "Stripe Fehler");
    }
}
