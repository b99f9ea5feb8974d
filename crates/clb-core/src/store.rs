//! Persistent show data (`data.json`).
//!
//! The file is small and rewritten whole on every change: serialize to
//! `<file>.tmp`, then rename over the original so a crash never leaves a
//! half-written document behind.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    domain::{Amount, ChatId},
    errors::Error,
    Result,
};

pub const MAX_PRICE: Amount = Amount::from_units(10_000);
pub const MAX_PRICE_NAME_CHARS: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub name: String,
    pub price: Amount,
}

impl Price {
    pub fn new(name: impl Into<String>, price: Amount) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowData {
    pub admins: Vec<i64>,
    pub model_name: String,
    pub prices: Vec<Price>,
    pub live: bool,
    pub marketing_on: bool,
    pub live_chats: Vec<ChatId>,
}

impl Default for ShowData {
    fn default() -> Self {
        Self {
            admins: Vec::new(),
            model_name: "Model".to_string(),
            prices: default_prices(),
            live: false,
            marketing_on: true,
            live_chats: Vec::new(),
        }
    }
}

fn default_prices() -> Vec<Price> {
    [
        ("Cute Emoji", 5),
        ("Heart Emoji", 7),
        ("Nice Pose", 10),
        ("Dance Move", 15),
        ("Song Request", 20),
        ("VIP Shoutout", 25),
        ("Special Moment", 35),
    ]
    .into_iter()
    .map(|(name, eur)| Price::new(name, Amount::from_units(eur)))
    .collect()
}

impl ShowData {
    /// Insert a price, replacing one with the same name (case-insensitive).
    ///
    /// Returns `true` when an existing entry was replaced.
    pub fn upsert_price(&mut self, name: &str, price: Amount) -> Result<bool> {
        let name = validate_price_name(name)?;
        if price.is_zero() || price > MAX_PRICE {
            return Err(Error::InvalidInput(format!(
                "price must be between 0.01 and {MAX_PRICE} EUR"
            )));
        }

        if let Some(existing) = self
            .prices
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&name))
        {
            existing.name = name;
            existing.price = price;
            return Ok(true);
        }

        self.prices.push(Price::new(name, price));
        Ok(false)
    }

    /// Remove a price by name (case-insensitive). Returns whether one was removed.
    pub fn remove_price(&mut self, name: &str) -> bool {
        let name = name.trim();
        let before = self.prices.len();
        self.prices.retain(|p| !p.name.eq_ignore_ascii_case(name));
        self.prices.len() != before
    }

    pub fn find_price(&self, name: &str) -> Option<&Price> {
        let name = name.trim();
        self.prices.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn set_model_name(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("model name must not be empty".to_string()));
        }
        self.model_name = name.to_string();
        Ok(())
    }

    /// Returns `false` if the id was already an admin.
    pub fn add_admin(&mut self, user_id: i64) -> bool {
        if self.admins.contains(&user_id) {
            return false;
        }
        self.admins.push(user_id);
        true
    }

    pub fn mark_live(&mut self, chat_id: ChatId) {
        if !self.live_chats.contains(&chat_id) {
            self.live_chats.push(chat_id);
        }
        self.live = true;
    }

    pub fn mark_offline(&mut self, chat_id: ChatId) {
        self.live_chats.retain(|c| *c != chat_id);
        self.live = !self.live_chats.is_empty();
    }
}

fn validate_price_name(name: &str) -> Result<String> {
    let name = name.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_PRICE_NAME_CHARS {
        return Err(Error::InvalidInput(format!(
            "price name must be 1-{MAX_PRICE_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// Shared, file-backed [`ShowData`].
pub struct Store {
    path: PathBuf,
    data: RwLock<ShowData>,
}

impl Store {
    /// Open the data file. Missing or empty files yield the defaults (not written until the first update).
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = load_data_file(&path).await?.unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            prices = data.prices.len(),
            live_chats = data.live_chats.len(),
            "show data loaded"
        );
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// In-memory store (nothing is read); writes still go to `path`.
    pub fn with_data(path: impl Into<PathBuf>, data: ShowData) -> Self {
        Self {
            path: path.into(),
            data: RwLock::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> ShowData {
        self.data.read().await.clone()
    }

    /// Apply `f` and persist. If `f` fails, nothing is changed or written.
    pub async fn update<T>(&self, f: impl FnOnce(&mut ShowData) -> Result<T>) -> Result<T> {
        let mut guard = self.data.write().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        if next != *guard {
            save_data_file(&self.path, &next).await?;
            *guard = next;
        }
        Ok(out)
    }
}

async fn load_data_file(path: &Path) -> Result<Option<ShowData>> {
    let txt = match tokio::fs::read_to_string(path).await {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if txt.trim().is_empty() {
        return Ok(None);
    }
    let data: ShowData = serde_json::from_str(&txt)?;
    Ok(Some(data))
}

async fn save_data_file(path: &Path, data: &ShowData) -> Result<()> {
    let txt = serde_json::to_string_pretty(data)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&tmp, txt).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
