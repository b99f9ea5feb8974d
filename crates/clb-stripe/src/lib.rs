//! Stripe adapter: Checkout Sessions and webhook verification.
//!
//! Talks to the REST API directly (form-encoded, bearer auth); the only calls
//! the bot needs are "create a one-item checkout" and "verify an event".

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use clb_core::{
    errors::Error,
    ports::{CheckoutRequest, CheckoutSession, PaymentGateway},
    Result,
};

pub mod webhook;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Clone, Debug)]
pub struct StripeClient {
    secret_key: String,
    api_base: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::External(format!("stripe http client: {e}")))?;
        Ok(Self {
            secret_key: secret_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            http,
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }
}

/// Form fields for `POST /v1/checkout/sessions` (Stripe's bracket notation).
pub fn checkout_form(req: &CheckoutRequest) -> Vec<(String, String)> {
    let amount = req.amount.to_string();
    [
        ("mode", "payment".to_string()),
        ("payment_method_types[0]", "card".to_string()),
        ("line_items[0][price_data][currency]", req.currency.clone()),
        ("line_items[0][price_data][product_data][name]", req.label.clone()),
        ("line_items[0][price_data][unit_amount]", req.amount.cents().to_string()),
        ("line_items[0][quantity]", "1".to_string()),
        ("success_url", req.success_url.clone()),
        ("cancel_url", req.cancel_url.clone()),
        ("metadata[chat_id]", req.chat_id.0.to_string()),
        ("metadata[user_name]", req.user_name.clone()),
        ("metadata[label]", req.label.clone()),
        ("metadata[amount]", amount),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout(&self, req: &CheckoutRequest) -> Result<CheckoutSession> {
        let resp = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&checkout_form(req))
            .send()
            .await
            .map_err(|e| Error::External(format!("stripe request error: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::External(format!("stripe response error: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .map(|e| {
                    format!(
                        "{}: {}",
                        e.error.kind.unwrap_or_else(|| "error".to_string()),
                        e.error.message.unwrap_or_default()
                    )
                })
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(Error::External(format!(
                "stripe checkout failed: {status} {detail}"
            )));
        }

        let session: SessionResponse = serde_json::from_str(&body)?;
        let url = session.url.ok_or_else(|| {
            Error::External(format!("stripe session {} has no url", session.id))
        })?;

        tracing::info!(session_id = %session.id, label = %req.label, amount = %req.amount, "checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}
