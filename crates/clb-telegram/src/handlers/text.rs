use clb_core::{
    formatting::{escape_html, is_same_text},
    menu::DEFAULT_USER_NAME,
    overlay::OverlayEvent,
};

use super::{Incoming, Reply};
use crate::router::AppState;

/// Plain chat text (and captions): mirror to the overlay, then translate.
pub async fn handle_text(state: &AppState, incoming: &Incoming) -> Reply {
    if incoming.is_bot {
        return Reply::None;
    }
    let text = incoming.text.trim();
    if text.is_empty() {
        return Reply::None;
    }

    let user = if incoming.first_name.trim().is_empty() {
        DEFAULT_USER_NAME.to_string()
    } else {
        incoming.first_name.clone()
    };
    state.overlay.publish(OverlayEvent::Chat {
        user,
        text: text.to_string(),
    });

    let Some(translator) = state.translator.as_ref() else {
        return Reply::None;
    };

    if let Some(user_id) = incoming.user_id {
        let (allowed, retry_after) = state.translate_limiter.lock().await.check(user_id);
        if !allowed {
            tracing::debug!(
                user_id = user_id.0,
                retry_after_secs = retry_after.map(|d| d.as_secs()),
                "translation rate limited"
            );
            return Reply::None;
        }
    }

    match translator.translate(text, &state.cfg.translate_target).await {
        Ok(translated) if is_same_text(text, &translated) => Reply::None,
        Ok(translated) => Reply::Html(format!("🌐 {}", escape_html(translated.trim()))),
        Err(e) => {
            tracing::warn!(chat_id = incoming.chat_id.0, error = %e, "translation failed");
            Reply::None
        }
    }
}
