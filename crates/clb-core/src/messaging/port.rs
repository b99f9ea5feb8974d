use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{LinkKeyboard, MessagingCapabilities},
    Result,
};

/// Outbound messenger port.
///
/// Telegram is the only implementation; the announcer and the payment webhook
/// talk to it through this trait so they can be tested with a fake.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    async fn send_link_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: LinkKeyboard,
    ) -> Result<MessageRef>;
}
