use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ChatId, Update, UpdateId},
    Result,
};

/// Hexagonal port for the long-polling transport.
///
/// Both calls take the shutdown token and must return `Error::Cancelled`
/// promptly once it fires, even mid long-poll.
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Fetch updates with `id >= cursor`, waiting up to `timeout` for new data.
    ///
    /// Updates are returned in ascending id order.
    async fn fetch_updates(
        &self,
        cursor: UpdateId,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<Update>>;

    async fn send_text(&self, chat_id: ChatId, text: &str, cancel: &CancellationToken)
        -> Result<()>;
}
