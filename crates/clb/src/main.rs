use std::sync::Arc;

use anyhow::Context;
use teloxide::Bot;

use clb_core::{
    announcer::Announcer,
    config::Config,
    messaging::port::MessagingPort,
    overlay::OverlayHub,
    ports::{PaymentGateway, Translator},
    store::Store,
};
use clb_stripe::StripeClient;
use clb_telegram::{router::AppState, TelegramMessenger};
use clb_translate::GoogleTranslator;
use clb_web::WebState;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    clb_core::logging::init("clb")?;

    let cfg = Arc::new(Config::load()?);
    let store = Arc::new(
        Store::open(&cfg.data_file)
            .await
            .with_context(|| format!("failed to open {}", cfg.data_file.display()))?,
    );
    let overlay = OverlayHub::default();

    let payments: Option<Arc<dyn PaymentGateway>> = match &cfg.stripe_secret_key {
        Some(key) => Some(Arc::new(StripeClient::new(key.clone())?)),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set, /donar will answer 500");
            None
        }
    };

    let Some(token) = cfg.telegram_token.clone() else {
        tracing::error!("TELEGRAM_TOKEN not set, running the web server only");
        let web = WebState {
            cfg,
            store,
            overlay,
            payments,
            messenger: None,
        };
        return clb_web::serve(web, shutdown_signal()).await;
    };

    let bot = Bot::new(token);
    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let announcer = Announcer::new(
        cfg.auto_ad_interval,
        cfg.auto_ad_text.clone(),
        store.clone(),
        messenger.clone(),
    );

    let translator: Option<Arc<dyn Translator>> = if cfg.translate_enabled {
        Some(Arc::new(GoogleTranslator::new()?))
    } else {
        None
    };

    let web = WebState {
        cfg: cfg.clone(),
        store: store.clone(),
        overlay: overlay.clone(),
        payments,
        messenger: Some(messenger.clone()),
    };
    let app = AppState::new(cfg, store, overlay, messenger, announcer, translator);

    tokio::select! {
        res = clb_web::serve(web, shutdown_signal()) => res,
        res = clb_telegram::router::run_polling(bot, app) => res,
    }
}
