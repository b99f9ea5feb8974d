//! Tip menu rendering: message text, button labels and pay links.

use url::Url;

use crate::{
    domain::ChatId,
    errors::Error,
    formatting::escape_html,
    messaging::types::{LinkButton, LinkKeyboard},
    store::{Price, ShowData},
    Result,
};

pub const DEFAULT_USER_NAME: &str = "Gast";

/// Menu message (Telegram HTML).
pub fn menu_text(data: &ShowData) -> String {
    let mut lines = vec![format!(
        "🎬 <b>Menü der Show – {}</b>",
        escape_html(&data.model_name)
    )];
    if data.live {
        lines.push("🔴 <b>LIVE</b>".to_string());
    }

    if data.prices.is_empty() {
        lines.push("Noch keine Preise hinterlegt.".to_string());
        return lines.join("\n");
    }

    for p in &data.prices {
        lines.push(format!("• {} – {} EUR", escape_html(&p.name), p.price));
    }
    lines.push(String::new());
    lines.push("Drücke einen Button, um die Show zu unterstützen 🔥".to_string());
    lines.join("\n")
}

/// Button text; plain (Telegram does not parse markup in button labels).
pub fn button_label(price: &Price) -> String {
    format!("{} · {} EUR", price.name, price.price)
}

/// `{base}/donar?amount=..&label=..&chat_id=..&user_name=..`, query-encoded.
pub fn pay_url(base: &str, price: &Price, chat_id: ChatId, user_name: &str) -> Result<Url> {
    let user_name = if user_name.trim().is_empty() {
        DEFAULT_USER_NAME
    } else {
        user_name.trim()
    };

    let endpoint = format!("{}/donar", base.trim_end_matches('/'));
    Url::parse_with_params(
        &endpoint,
        &[
            ("amount", price.price.to_string()),
            ("label", price.name.clone()),
            ("chat_id", chat_id.0.to_string()),
            ("user_name", user_name.to_string()),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid public base url {base}: {e}")))
}

/// One URL button per price, in menu order.
pub fn menu_keyboard(
    data: &ShowData,
    base: &str,
    chat_id: ChatId,
    user_name: &str,
) -> Result<LinkKeyboard> {
    let buttons = data
        .prices
        .iter()
        .map(|p| {
            Ok(LinkButton {
                label: button_label(p),
                url: pay_url(base, p, chat_id, user_name)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(LinkKeyboard::new(buttons))
}
