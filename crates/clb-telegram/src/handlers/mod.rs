//! Telegram update handlers.
//!
//! The teloxide endpoint only extracts an [`Incoming`] from the update; the
//! command and text logic below works on that plus [`AppState`], so it can be
//! driven without a live bot.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use clb_core::domain::{ChatId, UserId};

use crate::router::AppState;

pub mod commands;
pub mod text;

pub use commands::Reply;

/// What the handlers need from an incoming message.
#[derive(Clone, Debug)]
pub struct Incoming {
    pub chat_id: ChatId,
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub is_bot: bool,
    pub text: String,
    /// Commands are only recognized in message text, never in captions.
    pub is_caption: bool,
}

impl Incoming {
    pub fn from_message(msg: &Message) -> Option<Self> {
        let (text, is_caption) = match (msg.text(), msg.caption()) {
            (Some(t), _) => (t, false),
            (None, Some(c)) => (c, true),
            (None, None) => return None,
        };
        let user = msg.from();

        Some(Self {
            chat_id: ChatId(msg.chat.id.0),
            user_id: user.map(|u| UserId(u.id.0 as i64)),
            first_name: user.map(|u| u.first_name.clone()).unwrap_or_default(),
            is_bot: user.map(|u| u.is_bot).unwrap_or(false),
            text: text.to_string(),
            is_caption,
        })
    }

    pub fn is_command(&self) -> bool {
        !self.is_caption && self.text.starts_with('/')
    }
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(incoming) = Incoming::from_message(&msg) else {
        return Ok(());
    };

    let reply = if incoming.is_command() {
        commands::handle_command(&state, &incoming).await
    } else {
        text::handle_text(&state, &incoming).await
    };

    if let Err(e) = deliver(&state, incoming.chat_id, reply).await {
        tracing::error!(chat_id = incoming.chat_id.0, error = %e, "failed to send reply");
    }
    Ok(())
}

/// Send a handler's reply through the messenger.
pub async fn deliver(state: &AppState, chat_id: ChatId, reply: Reply) -> clb_core::Result<()> {
    match reply {
        Reply::None => {}
        Reply::Html(html) => {
            state.messenger.send_html(chat_id, &html).await?;
        }
        Reply::Keyboard { html, .. } if !state.messenger.capabilities().supports_inline_keyboards => {
            state.messenger.send_html(chat_id, &html).await?;
        }
        Reply::Keyboard { html, keyboard } => {
            state
                .messenger
                .send_link_keyboard(chat_id, &html, keyboard)
                .await?;
        }
    }
    Ok(())
}
