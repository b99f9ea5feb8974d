//! Completed donations, as announced to chats and the overlay.

use crate::{domain::ChatId, formatting::escape_html};

pub const DEFAULT_DONOR: &str = "Ein Fan";
pub const DEFAULT_LABEL: &str = "Support";

/// A paid menu item, reconstructed from checkout metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DonationNotice {
    /// Chat the menu was opened in; `None` if the metadata was missing or not numeric.
    pub chat_id: Option<ChatId>,
    pub user_name: String,
    pub label: String,
    /// Amount as displayed to the payer (e.g. `12.50`).
    pub amount: String,
}

impl DonationNotice {
    pub fn announcement_html(&self, model_name: &str) -> String {
        format!(
            "💥 Neue Spende!\n👤 <b>{}</b> hat <b>{}</b> für <b>{} €</b> gekauft.\n{} bedankt sich live! 🙏",
            escape_html(&self.user_name),
            escape_html(&self.label),
            escape_html(&self.amount),
            escape_html(model_name),
        )
    }

    /// Distinct targets: the originating chat, then the donation channel.
    pub fn targets(&self, channel: Option<ChatId>) -> Vec<ChatId> {
        let mut out = Vec::with_capacity(2);
        out.extend(self.chat_id);
        if let Some(c) = channel {
            if !out.contains(&c) {
                out.push(c);
            }
        }
        out
    }
}
