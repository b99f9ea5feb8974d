use async_trait::async_trait;

use crate::{
    domain::{Amount, ChatId},
    Result,
};

/// A single-item checkout for one menu entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub label: String,
    pub amount: Amount,
    pub currency: String,
    pub chat_id: ChatId,
    pub user_name: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Hosted payment page provider (Stripe Checkout).
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(&self, req: &CheckoutRequest) -> Result<CheckoutSession>;
}

/// Machine translation backend.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` (source language auto-detected) into `target` (ISO code, e.g. `de`).
    async fn translate(&self, text: &str, target: &str) -> Result<String>;
}
