//! Long-polling fetch → advance-cursor → dispatch loop.

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    commands::CommandRouter,
    config::Config,
    domain::{Update, UpdateId},
    messaging::port::MessageService,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    /// Long-poll window handed to every fetch.
    pub poll_timeout: Duration,
    /// Fixed pause after a failed fetch. No growth, no retry limit.
    pub retry_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_secs(3),
        }
    }
}

impl From<&Config> for PollConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            poll_timeout: cfg.poll_timeout,
            retry_delay: cfg.retry_delay,
        }
    }
}

/// Fault-tolerant update loop.
///
/// Owns the cursor and the router. The cursor is advanced per update, before
/// that update is dispatched, so a failed dispatch is never refetched and
/// delivery to handlers is at-most-once.
pub struct PollLoop {
    service: Arc<dyn MessageService>,
    router: CommandRouter,
    cfg: PollConfig,
    cursor: UpdateId,
}

impl PollLoop {
    pub fn new(service: Arc<dyn MessageService>, router: CommandRouter, cfg: PollConfig) -> Self {
        Self {
            service,
            router,
            cfg,
            cursor: UpdateId::default(),
        }
    }

    /// Next update id to request: highest processed id + 1, or 0 at start.
    pub fn cursor(&self) -> UpdateId {
        self.cursor
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    /// Poll until `cancel` fires. Fetch failures are logged and retried with
    /// the same cursor after `retry_delay`.
    pub async fn run(&mut self, cancel: &CancellationToken) {
        info!(cursor = self.cursor.0, "polling loop started");

        while !cancel.is_cancelled() {
            match self.poll_once(cancel).await {
                Ok(_) => {}
                Err(e) if e.is_cancelled() || cancel.is_cancelled() => break,
                Err(e) => {
                    warn!(
                        error = %e,
                        cursor = self.cursor.0,
                        retry_in = ?self.cfg.retry_delay,
                        "fetching updates failed"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = sleep(self.cfg.retry_delay) => {}
                    }
                }
            }
        }

        info!(cursor = self.cursor.0, "polling loop stopped");
    }

    /// One fetch + dispatch cycle. Returns how many updates were consumed.
    pub async fn poll_once(&mut self, cancel: &CancellationToken) -> Result<usize> {
        let updates = self
            .service
            .fetch_updates(self.cursor, self.cfg.poll_timeout, cancel)
            .await?;

        let mut consumed = 0;
        for update in updates {
            // Leave the rest of the batch unacknowledged on shutdown.
            if cancel.is_cancelled() {
                break;
            }
            if update.id < self.cursor {
                debug!(
                    update_id = update.id.0,
                    cursor = self.cursor.0,
                    "skipping already consumed update"
                );
                continue;
            }

            self.cursor = update.id.next();
            consumed += 1;
            self.dispatch(update, cancel).await;
        }

        Ok(consumed)
    }

    /// Route one update and send its reply. Failures stay inside this update.
    async fn dispatch(&mut self, update: Update, cancel: &CancellationToken) {
        let Some(text) = update.text.as_deref() else {
            debug!(update_id = update.id.0, "update has no text");
            return;
        };

        let reply = self.router.handle(text);
        match self.service.send_text(update.chat_id, &reply, cancel).await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {
                debug!(update_id = update.id.0, "reply dropped on shutdown");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    update_id = update.id.0,
                    chat_id = update.chat_id.0,
                    "sending reply failed"
                );
            }
        }
    }
}
