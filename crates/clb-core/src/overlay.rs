//! Fan-out of live events to overlay pages (OBS browser sources).
//!
//! Producers (Telegram handlers, the payment webhook) publish; each connected
//! overlay holds a broadcast receiver. Nobody listening is not an error.

use std::{collections::VecDeque, sync::Arc};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::formatting::truncate_chars;

pub const CHANNEL_CAPACITY: usize = 64;
pub const REPLAY_LEN: usize = 10;
const MAX_TEXT_CHARS: usize = 280;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayEvent {
    Chat {
        user: String,
        text: String,
    },
    Donation {
        user: String,
        label: String,
        amount: String,
    },
    Notice {
        text: String,
    },
}

impl OverlayEvent {
    fn clamped(self) -> Self {
        match self {
            Self::Chat { user, text } => Self::Chat {
                user,
                text: truncate_chars(&text, MAX_TEXT_CHARS),
            },
            Self::Notice { text } => Self::Notice {
                text: truncate_chars(&text, MAX_TEXT_CHARS),
            },
            other => other,
        }
    }
}

/// An event stamped with the time it was published.
#[derive(Clone, Debug, Serialize)]
pub struct OverlayMessage {
    pub at: String,
    #[serde(flatten)]
    pub event: OverlayEvent,
}

impl OverlayMessage {
    pub fn to_json(&self) -> String {
        // Only strings inside; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Clone)]
pub struct OverlayHub {
    tx: broadcast::Sender<Arc<OverlayMessage>>,
    recent: Arc<std::sync::Mutex<VecDeque<Arc<OverlayMessage>>>>,
}

impl Default for OverlayHub {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

impl OverlayHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            recent: Arc::new(std::sync::Mutex::new(VecDeque::with_capacity(REPLAY_LEN))),
        }
    }

    /// Publish to all current subscribers. Returns how many received it.
    pub fn publish(&self, event: OverlayEvent) -> usize {
        let msg = Arc::new(OverlayMessage {
            at: Utc::now().to_rfc3339(),
            event: event.clamped(),
        });

        if let Ok(mut recent) = self.recent.lock() {
            if recent.len() == REPLAY_LEN {
                recent.pop_front();
            }
            recent.push_back(msg.clone());
        }

        let delivered = self.tx.send(msg).unwrap_or(0);
        tracing::debug!(delivered, "overlay event published");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<OverlayMessage>> {
        self.tx.subscribe()
    }

    /// Last few events, oldest first, for overlays that just connected.
    pub fn recent(&self) -> Vec<Arc<OverlayMessage>> {
        self.recent
            .lock()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
