use listbot_core::config::Config;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), listbot_core::Error> {
    listbot_core::logging::init("listbot")?;

    let cfg = Config::load()?;
    info!(?cfg, "configuration loaded");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                return;
            }
            info!("interrupt received, shutting down");
            cancel.cancel();
        });
    }

    listbot_telegram::router::run_polling(cfg, cancel)
        .await
        .map_err(|e| listbot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
