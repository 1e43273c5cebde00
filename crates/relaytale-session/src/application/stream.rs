//! Live status stream: one polling task per subscribed client.
//!
//! Each task computes the session digest on a fixed interval and pushes it
//! only when it differs from the last one sent. The task stops when the
//! receiving side is dropped, or after pushing a terminal `Failed` event
//! when the session can no longer be read.

use std::sync::Arc;
use std::time::Duration;

use relaytale_core::clock::Clock;
use relaytale_core::repository::GameRepository;
use relaytale_core::settings::SettingsProvider;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::query_handlers::{StatusDigest, status_digest};

/// An event pushed to a stream subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The digest changed.
    Status(StatusDigest),
    /// Terminal: the session could not be read.
    Failed {
        /// What went wrong.
        message: String,
    },
}

/// Collaborators a stream task owns for its lifetime.
#[derive(Clone)]
pub struct StreamContext {
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Tunables.
    pub settings: Arc<dyn SettingsProvider>,
    /// Shared state.
    pub repo: Arc<dyn GameRepository>,
    /// Pause between polls.
    pub interval: Duration,
}

/// Polls `session_id` until `events` is closed or a read fails.
pub async fn run_status_stream(
    session_id: Uuid,
    context: StreamContext,
    events: mpsc::Sender<StreamEvent>,
) {
    let mut last_sent: Option<StatusDigest> = None;
    loop {
        if events.is_closed() {
            break;
        }

        match status_digest(
            session_id,
            context.clock.as_ref(),
            context.settings.as_ref(),
            context.repo.as_ref(),
        )
        .await
        {
            Ok(digest) if last_sent.as_ref() != Some(&digest) => {
                if events.send(StreamEvent::Status(digest.clone())).await.is_err() {
                    break;
                }
                last_sent = Some(digest);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(%session_id, error = %e, "status stream stopped");
                let _ = events
                    .send(StreamEvent::Failed {
                        message: e.to_string(),
                    })
                    .await;
                return;
            }
        }

        tokio::select! {
            () = events.closed() => break,
            () = tokio::time::sleep(context.interval) => {}
        }
    }
    debug!(%session_id, "status stream subscriber left");
}
