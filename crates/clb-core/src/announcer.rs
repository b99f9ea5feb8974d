//! Periodic show announcements, one repeating job per chat.
//!
//! - `start(chat)` replaces any running job for that chat; the first message goes out immediately
//! - each tick re-reads `marketing_on` from the store, so toggling it needs no restart
//! - send failures are logged and the job keeps its schedule

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::ChatId, formatting::escape_html, messaging::port::MessagingPort, store::Store,
    Result,
};

#[derive(Clone)]
pub struct Announcer {
    inner: Arc<AnnouncerInner>,
}

struct AnnouncerInner {
    interval: Duration,
    text: String,
    store: Arc<Store>,
    messenger: Arc<dyn MessagingPort>,
    jobs: tokio::sync::Mutex<HashMap<ChatId, JobEntry>>,
}

struct JobEntry {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl JobEntry {
    fn shutdown(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

impl Announcer {
    pub fn new(
        interval: Duration,
        text: impl Into<String>,
        store: Arc<Store>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            inner: Arc::new(AnnouncerInner {
                interval,
                text: text.into(),
                store,
                messenger,
                jobs: tokio::sync::Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// (Re)start announcements in `chat_id`. Returns `true` if a running job was replaced.
    pub async fn start(&self, chat_id: ChatId) -> bool {
        let cancel = CancellationToken::new();
        let announcer = self.clone();
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(async move {
            announcer.job_loop(chat_id, cancel_clone).await;
        });

        let mut jobs = self.inner.jobs.lock().await;
        let replaced = match jobs.insert(chat_id, JobEntry { cancel, handle }) {
            Some(old) => {
                old.shutdown();
                true
            }
            None => false,
        };

        tracing::info!(
            chat_id = chat_id.0,
            replaced,
            interval_secs = self.inner.interval.as_secs(),
            "announcements started"
        );
        replaced
    }

    /// Restart jobs for chats that were live before a restart.
    pub async fn resume(&self, chats: &[ChatId]) -> usize {
        for chat_id in chats {
            self.start(*chat_id).await;
        }
        if !chats.is_empty() {
            tracing::info!(count = chats.len(), "announcements resumed");
        }
        chats.len()
    }

    /// Stop announcements in `chat_id`. Returns `true` if a job was running.
    pub async fn stop(&self, chat_id: ChatId) -> bool {
        let entry = self.inner.jobs.lock().await.remove(&chat_id);
        let Some(entry) = entry else {
            return false;
        };
        entry.shutdown();
        tracing::info!(chat_id = chat_id.0, "announcements stopped");
        true
    }

    pub async fn stop_all(&self) {
        let mut jobs = self.inner.jobs.lock().await;
        for (_, job) in jobs.drain() {
            job.shutdown();
        }
    }

    pub async fn is_active(&self, chat_id: ChatId) -> bool {
        self.inner.jobs.lock().await.contains_key(&chat_id)
    }

    pub async fn active_chats(&self) -> Vec<ChatId> {
        let mut chats: Vec<ChatId> = self.inner.jobs.lock().await.keys().copied().collect();
        chats.sort();
        chats
    }

    /// One announcement tick. Returns whether a message was sent.
    pub async fn announce_once(&self, chat_id: ChatId) -> Result<bool> {
        if !self.inner.store.snapshot().await.marketing_on {
            tracing::debug!(chat_id = chat_id.0, "marketing off, announcement skipped");
            return Ok(false);
        }
        self.inner
            .messenger
            .send_html(chat_id, &escape_html(&self.inner.text))
            .await?;
        Ok(true)
    }

    async fn job_loop(&self, chat_id: ChatId, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.inner.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = tick.tick() => {
                if let Err(e) = self.announce_once(chat_id).await {
                  tracing::error!(chat_id = chat_id.0, error = %e, "announcement failed");
                }
              }
            }
        }
    }
}
