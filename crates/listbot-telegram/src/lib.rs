//! Telegram adapter (teloxide).
//!
//! This crate implements the `listbot-core` MessageService over the Telegram
//! Bot API `getUpdates` long poll.

use std::{future::IntoFuture, time::Duration};

use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{AllowedUpdate, UpdateKind},
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub mod router;

use listbot_core::{
    domain::{self, ChatId, UpdateId},
    errors::Error,
    messaging::port::MessageService,
    Result,
};

/// Headroom on top of the long-poll window before the HTTP client gives up.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TelegramService {
    bot: Bot,
}

impl TelegramService {
    /// Build a bot whose HTTP client outlives a `poll_timeout` long poll.
    ///
    /// teloxide's default client times out after 17s, shorter than the 30s
    /// window the poll loop asks for.
    pub fn new(token: impl Into<String>, poll_timeout: Duration) -> Result<Self> {
        let client = http_client(poll_timeout)?;
        Ok(Self::from_bot(Bot::with_client(token, client)))
    }

    pub fn from_bot(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    /// The bot's username, from `getMe`.
    pub async fn username(&self, cancel: &CancellationToken) -> Result<String> {
        let me = self.with_retry(cancel, || self.bot.get_me()).await?;
        Ok(me.username().to_string())
    }

    /// Remove any registered webhook; `getUpdates` is refused while one is set.
    pub async fn clear_webhook(&self, cancel: &CancellationToken) -> Result<()> {
        self.with_retry(cancel, || self.bot.delete_webhook()).await?;
        Ok(())
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: impl FnMut() -> Fut,
    ) -> Result<T>
    where
        Fut: IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            let res = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                res = op().into_future() => res,
            };
            match res {
                Ok(v) => return Ok(v),
                Err(teloxide::RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = sleep(d) => {}
                    }
                }
                Err(other) => return Err(Self::map_err(other)),
            }
        }
    }
}

pub fn http_client(poll_timeout: Duration) -> Result<reqwest::Client> {
    teloxide::net::default_reqwest_settings()
        .timeout(poll_timeout + REQUEST_TIMEOUT_SLACK)
        .build()
        .map_err(|e| Error::Transport(format!("failed to build http client: {e}")))
}

fn is_webhook_conflict(e: &teloxide::RequestError) -> bool {
    matches!(
        e,
        teloxide::RequestError::Api(teloxide::ApiError::CantGetUpdates)
    )
}

/// Telegram's `offset` parameter is an i32.
fn offset_for(cursor: UpdateId) -> Result<i32> {
    i32::try_from(cursor.0)
        .map_err(|_| Error::Transport(format!("cursor {cursor} does not fit getUpdates offset")))
}

/// Reduce a Telegram update to the fields the bot acts on.
///
/// Only fresh messages carry text; edits, channel posts, and other kinds
/// consume a cursor slot without triggering a command.
pub fn to_domain(upd: &teloxide::types::Update) -> domain::Update {
    let id = i64::from(upd.id);
    match &upd.kind {
        UpdateKind::Message(msg) => match msg.text() {
            Some(text) => domain::Update::text(id, msg.chat.id.0, text),
            None => domain::Update::empty(id, msg.chat.id.0),
        },
        UpdateKind::EditedMessage(msg)
        | UpdateKind::ChannelPost(msg)
        | UpdateKind::EditedChannelPost(msg) => domain::Update::empty(id, msg.chat.id.0),
        _ => domain::Update::empty(id, 0),
    }
}

#[async_trait]
impl MessageService for TelegramService {
    async fn fetch_updates(
        &self,
        cursor: UpdateId,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<domain::Update>> {
        let offset = offset_for(cursor)?;
        let timeout_secs = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX);

        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            res = self
                .bot
                .get_updates()
                .offset(offset)
                .timeout(timeout_secs)
                .allowed_updates(vec![AllowedUpdate::Message])
                .into_future() => res,
        };

        match res {
            Ok(updates) => Ok(updates.iter().map(to_domain).collect()),
            Err(e) if is_webhook_conflict(&e) => {
                // Clear it here so the caller's next retry can succeed.
                warn!("getUpdates refused while a webhook is set; removing it");
                if let Err(clear) = self.clear_webhook(cancel).await {
                    if clear.is_cancelled() {
                        return Err(clear);
                    }
                    warn!(error = %clear, "failed to clear webhook");
                }
                Err(Self::map_err(e))
            }
            Err(e) => Err(Self::map_err(e)),
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.with_retry(cancel, || {
            self.bot
                .send_message(Self::tg_chat(chat_id), text.to_string())
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> teloxide::types::Update {
        serde_json::from_str(json).unwrap()
    }

    const TEXT_MESSAGE: &str = r#"{
        "update_id": 892252934,
        "message": {
            "message_id": 6557,
            "from": {
                "id": 218485655,
                "is_bot": false,
                "first_name": "Waffle",
                "username": "WaffleLapkin",
                "language_code": "en"
            },
            "chat": {
                "id": 218485655,
                "first_name": "Waffle",
                "username": "WaffleLapkin",
                "type": "private"
            },
            "date": 1569518342,
            "text": "/add book Dune"
        }
    }"#;

    #[test]
    fn maps_text_message() {
        let upd = to_domain(&parse(TEXT_MESSAGE));
        assert_eq!(upd, domain::Update::text(892252934, 218485655, "/add book Dune"));
    }

    #[test]
    fn edited_message_has_no_text() {
        let json = TEXT_MESSAGE
            .replace("\"message\"", "\"edited_message\"")
            .replace("\"date\": 1569518342,", "\"date\": 1569518342, \"edit_date\": 1569518400,");
        let upd = to_domain(&parse(&json));
        assert_eq!(upd.id, UpdateId(892252934));
        assert_eq!(upd.chat_id, ChatId(218485655));
        assert_eq!(upd.text, None);
    }

    #[test]
    fn unknown_kind_still_yields_an_id() {
        let upd = to_domain(&parse(r#"{"update_id": 77, "brand_new_kind": {"x": 1}}"#));
        assert_eq!(upd, domain::Update::empty(77, 0));
    }

    #[test]
    fn offset_must_fit_i32() {
        assert_eq!(offset_for(UpdateId(0)).unwrap(), 0);
        assert_eq!(offset_for(UpdateId(42)).unwrap(), 42);
        assert!(matches!(
            offset_for(UpdateId(i64::from(i32::MAX) + 1)),
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn only_webhook_conflicts_trigger_webhook_removal() {
        assert!(is_webhook_conflict(&teloxide::RequestError::Api(
            teloxide::ApiError::CantGetUpdates
        )));
        assert!(!is_webhook_conflict(&teloxide::RequestError::Api(
            teloxide::ApiError::BotBlocked
        )));
    }

    #[test]
    fn http_client_builds() {
        assert!(http_client(Duration::from_secs(30)).is_ok());
    }

    #[tokio::test]
    async fn cancelled_fetch_returns_promptly() {
        let svc = TelegramService::new("0:test", Duration::from_secs(30)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = svc
            .fetch_updates(UpdateId(0), Duration::from_secs(30), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_startup_calls_return_promptly() {
        let svc = TelegramService::new("0:test", Duration::from_secs(30)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(svc.username(&cancel).await.unwrap_err().is_cancelled());
        assert!(svc.clear_webhook(&cancel).await.unwrap_err().is_cancelled());
    }
}
