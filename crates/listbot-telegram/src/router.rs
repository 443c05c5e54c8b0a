use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use listbot_core::{
    commands::CommandRouter,
    config::Config,
    list_store::ListStore,
    messaging::port::MessageService,
    polling::{PollConfig, PollLoop},
};

use crate::TelegramService;

/// Wire the Telegram transport to a fresh poll loop and run until `cancel`.
pub async fn run_polling(cfg: Config, cancel: CancellationToken) -> anyhow::Result<()> {
    let poll_cfg = PollConfig::from(&cfg);
    let telegram = TelegramService::new(cfg.telegram_bot_token.clone(), poll_cfg.poll_timeout)?;

    // Basic startup info.
    match telegram.username(&cancel).await {
        Ok(username) => info!(username = %username, "bot started"),
        Err(e) if e.is_cancelled() => return Ok(()),
        Err(e) => warn!(error = %e, "getMe failed; continuing"),
    }

    // A failure here is retried by the fetch path on the first webhook conflict.
    match telegram.clear_webhook(&cancel).await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => return Ok(()),
        Err(e) => warn!(error = %e, "failed to clear webhook"),
    }

    let service: Arc<dyn MessageService> = Arc::new(telegram);
    let router = CommandRouter::new(ListStore::seeded()).with_reply_limit(cfg.reply_limit);
    let mut poller = PollLoop::new(service, router, poll_cfg);

    poller.run(&cancel).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn cancelled_before_start_returns_without_network() {
        let cfg = Config::from_lookup(|key: &str| {
            (key == "TELEGRAM_BOT_TOKEN").then(|| "0:test".to_string())
        })
        .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let res = tokio::time::timeout(Duration::from_secs(5), run_polling(cfg, cancel)).await;
        assert!(matches!(res, Ok(Ok(()))));
    }
}
