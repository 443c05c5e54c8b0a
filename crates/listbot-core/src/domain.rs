/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Server-assigned update id. Strictly ascending within a bot's update stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UpdateId(pub i64);

impl UpdateId {
    /// The cursor value that acknowledges this update.
    pub fn next(self) -> UpdateId {
        UpdateId(self.0 + 1)
    }
}

impl std::fmt::Display for UpdateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An incoming update, reduced to what the bot acts on.
///
/// Non-text updates (stickers, joins, edits) arrive with `text: None`; they
/// still consume a cursor position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Update {
    pub id: UpdateId,
    pub chat_id: ChatId,
    pub text: Option<String>,
}

/// Shorthand constructors for transports and test fixtures.
impl Update {
    /// A text message from `chat_id`.
    pub fn text(id: i64, chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            id: UpdateId(id),
            chat_id: ChatId(chat_id),
            text: Some(text.into()),
        }
    }

    /// An update that carries no text (edits, joins, unknown kinds).
    pub fn empty(id: i64, chat_id: i64) -> Self {
        Self {
            id: UpdateId(id),
            chat_id: ChatId(chat_id),
            text: None,
        }
    }
}
