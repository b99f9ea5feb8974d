use std::{env, path::PathBuf, time::Duration};

use crate::{domain::ChatId, errors::Error, Result};

pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://cosplaylive.onrender.com";
pub const DEFAULT_AUTO_AD_TEXT: &str =
    "🔥 Unterstütze die Show mit einem Klick!\nDas Model bedankt sich live.";

const MIN_AUTO_AD_INTERVAL_SECS: u64 = 10;

/// Typed configuration, read from the environment (and `.env` when present).
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_token: Option<String>,
    pub admin_ids: Vec<i64>,
    pub donation_channel: Option<ChatId>,

    // Stripe
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_currency: String,
    pub webhook_tolerance: Duration,

    // HTTP
    pub public_base_url: String,
    pub port: u16,

    // Storage
    pub data_file: PathBuf,

    // Announcements
    pub auto_ad_interval: Duration,
    pub auto_ad_text: String,

    // Translation
    pub translate_enabled: bool,
    pub translate_target: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_token: None,
            admin_ids: Vec::new(),
            donation_channel: None,
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            stripe_currency: "eur".to_string(),
            webhook_tolerance: Duration::from_secs(300),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            port: 10_000,
            data_file: PathBuf::from("data.json"),
            auto_ad_interval: Duration::from_secs(300),
            auto_ad_text: DEFAULT_AUTO_AD_TEXT.to_string(),
            translate_enabled: true,
            translate_target: "de".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // `.env` never overrides variables already set in the environment.
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::Config(format!("failed to read .env: {e}"))),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (env in production, a map in tests).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let str_of = |key: &str| get(key).and_then(non_empty);

        let telegram_token = str_of("TELEGRAM_TOKEN").or_else(|| str_of("TELEGRAM_BOT_TOKEN"));
        let admin_ids = parse_csv_i64(str_of("ADMIN_IDS").as_deref());
        let donation_channel = match str_of("DONATION_CHANNEL_ID") {
            Some(v) => Some(ChatId(v.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("DONATION_CHANNEL_ID is not a chat id: {v}"))
            })?)),
            None => None,
        };

        let stripe_secret_key = str_of("STRIPE_SECRET_KEY");
        let stripe_webhook_secret = str_of("STRIPE_WEBHOOK_SECRET");
        let stripe_currency = str_of("STRIPE_CURRENCY")
            .map(|s| s.trim().to_lowercase())
            .unwrap_or(defaults.stripe_currency);
        let webhook_tolerance = parse_u64(&str_of, "WEBHOOK_TOLERANCE_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.webhook_tolerance);

        let public_base_url = str_of("PUBLIC_BASE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.public_base_url);
        url::Url::parse(&public_base_url)
            .map_err(|e| Error::Config(format!("PUBLIC_BASE_URL is invalid: {e}")))?;

        let port = match str_of("PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PORT is not a port number: {v}")))?,
            None => defaults.port,
        };

        let data_file = str_of("DATA_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_file);

        let auto_ad_interval = parse_u64(&str_of, "AUTO_AD_INTERVAL_SECS")?
            .map(|s| Duration::from_secs(s.max(MIN_AUTO_AD_INTERVAL_SECS)))
            .unwrap_or(defaults.auto_ad_interval);
        let auto_ad_text = str_of("AUTO_AD_TEXT")
            .map(|s| s.replace("\\n", "\n"))
            .unwrap_or(defaults.auto_ad_text);

        let translate_enabled = str_of("TRANSLATE_ENABLED")
            .map(|s| parse_bool(&s))
            .unwrap_or(defaults.translate_enabled);
        let translate_target = str_of("TRANSLATE_TARGET")
            .map(|s| s.trim().to_lowercase())
            .unwrap_or(defaults.translate_target);

        Ok(Self {
            telegram_token,
            admin_ids,
            donation_channel,
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_currency,
            webhook_tolerance,
            public_base_url,
            port,
            data_file,
            auto_ad_interval,
            auto_ad_text,
            translate_enabled,
            translate_target,
        })
    }

    pub fn success_url(&self) -> String {
        format!("{}/ok", self.public_base_url)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/cancel", self.public_base_url)
    }
}

fn parse_u64(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(v) = get(key) else {
        return Ok(None);
    };
    v.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} is not a number: {v}")))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a comma separated id list; entries that are not integers are skipped.
pub fn parse_csv_i64(v: Option<&str>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
