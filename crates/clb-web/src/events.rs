use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::{stream, Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

use clb_core::overlay::OverlayMessage;

use crate::WebState;

pub(crate) const EVENT_NAME: &str = "overlay";

fn to_sse(msg: &OverlayMessage) -> Event {
    Event::default().event(EVENT_NAME).data(msg.to_json())
}

/// Backlog first, then live messages. Whatever was published between
/// `subscribe` and reading the backlog is in both, so live copies of backlog
/// entries are dropped until the first new message.
fn feed(
    rx: broadcast::Receiver<Arc<OverlayMessage>>,
    backlog: Vec<Arc<OverlayMessage>>,
) -> impl Stream<Item = Arc<OverlayMessage>> {
    let replay = stream::iter(backlog.clone());
    let live = stream::unfold((rx, backlog), |(mut rx, mut seen)| async move {
        loop {
            match rx.recv().await {
                Ok(msg) if seen.iter().any(|m| Arc::ptr_eq(m, &msg)) => continue,
                Ok(msg) => {
                    seen.clear();
                    return Some((msg, (rx, seen)));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "overlay subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    replay.chain(live)
}

/// Server-Sent Events feed for overlay pages: recent backlog first, then live events.
pub(crate) async fn stream(
    State(state): State<WebState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe first so nothing published before the backlog read is missed.
    let rx = state.overlay.subscribe();
    let backlog: Vec<Arc<OverlayMessage>> = state.overlay.recent();
    tracing::debug!(
        subscribers = state.overlay.subscriber_count(),
        backlog = backlog.len(),
        "overlay connected"
    );

    let events = feed(rx, backlog).map(|m| Ok(to_sse(&m)));
    Sse::new(events).keep_alive(KeepAlive::default())
}
