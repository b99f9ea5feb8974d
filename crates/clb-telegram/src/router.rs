use std::{sync::Arc, time::Duration};

use teloxide::{
    dispatching::Dispatcher, dptree, error_handlers::LoggingErrorHandler, prelude::*,
    types::BotCommand, update_listeners::Polling,
};

use tokio::sync::Mutex;

use clb_core::{
    announcer::Announcer,
    config::Config,
    messaging::port::MessagingPort,
    overlay::OverlayHub,
    ports::Translator,
    security::{merge_admins, RateLimiter},
    store::Store,
};

use crate::handlers;

/// Translations per user per minute.
const TRANSLATE_BURST: u32 = 10;
const TRANSLATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub store: Arc<Store>,
    pub overlay: OverlayHub,
    pub messenger: Arc<dyn MessagingPort>,
    pub announcer: Announcer,
    /// `None` when translation is disabled.
    pub translator: Option<Arc<dyn Translator>>,
    pub translate_limiter: Arc<Mutex<RateLimiter>>,
    /// This bot's `@username`, from `getMe`. Commands addressed to any other bot are ignored.
    pub bot_username: Option<String>,
}

impl AppState {
    pub fn new(
        cfg: Arc<Config>,
        store: Arc<Store>,
        overlay: OverlayHub,
        messenger: Arc<dyn MessagingPort>,
        announcer: Announcer,
        translator: Option<Arc<dyn Translator>>,
    ) -> Self {
        Self {
            cfg,
            store,
            overlay,
            messenger,
            announcer,
            translator,
            translate_limiter: Arc::new(Mutex::new(RateLimiter::new(
                true,
                TRANSLATE_BURST,
                TRANSLATE_WINDOW,
            ))),
            bot_username: None,
        }
    }

    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Admins from `ADMIN_IDS` plus the ones stored in the data file.
    pub async fn admins(&self) -> Vec<i64> {
        let stored = self.store.snapshot().await.admins;
        merge_admins(&self.cfg.admin_ids, &stored)
    }
}

fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("menu", "Preisliste & Buttons"),
        BotCommand::new("status", "Status der Show"),
        BotCommand::new("start", "Hilfe"),
    ]
}

/// Long-poll Telegram and dispatch until Ctrl-C.
pub async fn run_polling(bot: Bot, mut state: AppState) -> anyhow::Result<()> {
    match bot.get_me().await {
        Ok(me) => {
            tracing::info!(username = %me.username(), "telegram bot started");
            state = state.with_bot_username(me.username());
        }
        Err(e) => tracing::error!(error = %e, "telegram getMe failed"),
    }
    let state = Arc::new(state);
    tracing::info!(admins = state.admins().await.len(), "admin list loaded");

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        tracing::warn!(error = %e, "failed to register bot commands");
    }

    let resumed = state
        .announcer
        .resume(&state.store.snapshot().await.live_chats)
        .await;
    if resumed > 0 {
        tracing::info!(resumed, "live chats restored from data file");
    }

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let listener = Polling::builder(bot.clone())
        .drop_pending_updates()
        .build();

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state.clone()])
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("telegram update listener error"),
        )
        .await;

    state.announcer.stop_all().await;
    tracing::info!("telegram dispatcher stopped");
    Ok(())
}
