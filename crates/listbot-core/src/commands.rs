//! Text command parsing and dispatch.
//!
//! Every line of chat text maps to exactly one reply. Validation failures are
//! `CommandError`s whose `Display` is the user-facing reply; they never reach
//! the poll loop as faults.

use crate::list_store::{ListError, ListKind, ListStore};

const START_TEXT: &str = "Welcome!\n\
Available commands: books, products, help.\n\
• /add book <name>\n\
• /edit book <#> <new name>\n\
• /delete book <#>\n\
The same works for products.";

const HELP_TEXT: &str = "/start - start\n\
books - list books\n\
products - list products\n\
/add <entity> <name> - add\n\
/edit <entity> <#> <name> - edit\n\
/delete <entity> <#> - delete";

const ADD_USAGE: &str = "/add book|product <name>";
const EDIT_USAGE: &str = "/edit book|product <#> <new name>";
const DELETE_USAGE: &str = "/delete book|product <#>";

/// Default reply cap, under Telegram's 4096 UTF-16 code unit message limit.
pub const DEFAULT_REPLY_LIMIT: usize = 4000;
const MIN_REPLY_LIMIT: usize = 200;
const TRUNCATION_MARKER: &str = "\n… (truncated)";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown list \"{entity}\": use book or product.\nUsage: {usage}")]
    UnknownEntity { entity: String, usage: &'static str },

    #[error("Index must be a positive number.\nUsage: {0}")]
    BadIndex(&'static str),

    #[error("Index {index} is out of range: the list has {len} item(s).")]
    OutOfRange { index: usize, len: usize },

    #[error("Unknown command. Type help.")]
    UnknownCommand,
}

impl From<ListError> for CommandError {
    fn from(e: ListError) -> Self {
        match e {
            ListError::OutOfRange { index, len } => CommandError::OutOfRange { index, len },
        }
    }
}

/// A fully validated command, ready to run against a `ListStore`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Show(ListKind),
    Add {
        list: ListKind,
        name: String,
    },
    Edit {
        list: ListKind,
        index: usize,
        name: String,
    },
    Delete {
        list: ListKind,
        index: usize,
    },
}

impl Command {
    /// Parse one line of chat text.
    ///
    /// The line is split into at most three tokens: command, entity, and the
    /// rest of the line. `/edit` splits the rest once more into index + name.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let (head, tail) = split_token(text.trim());
        let (arg1, rest) = split_token(tail);

        // Telegram may send `/cmd@botname ...` in group chats.
        let cmd = head.split('@').next().unwrap_or("").to_lowercase();

        match cmd.as_str() {
            "/start" => Ok(Command::Start),
            "help" => Ok(Command::Help),
            "books" => Ok(Command::Show(ListKind::Books)),
            "products" => Ok(Command::Show(ListKind::Products)),
            "/add" => {
                if arg1.is_empty() || rest.is_empty() {
                    return Err(CommandError::Usage(ADD_USAGE));
                }
                Ok(Command::Add {
                    list: resolve(arg1, ADD_USAGE)?,
                    name: rest.to_string(),
                })
            }
            "/edit" => {
                let (index, name) = split_token(rest);
                if arg1.is_empty() || index.is_empty() || name.is_empty() {
                    return Err(CommandError::Usage(EDIT_USAGE));
                }
                let list = resolve(arg1, EDIT_USAGE)?;
                Ok(Command::Edit {
                    list,
                    index: parse_index(index, EDIT_USAGE)?,
                    name: name.to_string(),
                })
            }
            "/delete" => {
                if arg1.is_empty() || rest.is_empty() {
                    return Err(CommandError::Usage(DELETE_USAGE));
                }
                let list = resolve(arg1, DELETE_USAGE)?;
                Ok(Command::Delete {
                    list,
                    index: parse_index(rest, DELETE_USAGE)?,
                })
            }
            _ => Err(CommandError::UnknownCommand),
        }
    }
}

/// Routes chat text to handlers. Owns the list store it mutates.
#[derive(Clone, Debug)]
pub struct CommandRouter {
    store: ListStore,
    reply_limit: usize,
}

impl CommandRouter {
    pub fn new(store: ListStore) -> Self {
        Self {
            store,
            reply_limit: DEFAULT_REPLY_LIMIT,
        }
    }

    /// Cap replies at `limit` UTF-16 code units (never below 200).
    pub fn with_reply_limit(mut self, limit: usize) -> Self {
        self.reply_limit = limit.max(MIN_REPLY_LIMIT);
        self
    }

    pub fn store(&self) -> &ListStore {
        &self.store
    }

    /// Produce the single reply for a line of text, cut to fit one message.
    pub fn handle(&mut self, text: &str) -> String {
        let reply = match Command::parse(text).and_then(|cmd| self.execute(cmd)) {
            Ok(reply) => reply,
            Err(e) => e.to_string(),
        };
        fit_reply(reply, self.reply_limit)
    }

    pub fn execute(&mut self, cmd: Command) -> Result<String, CommandError> {
        match cmd {
            Command::Start => Ok(START_TEXT.to_string()),
            Command::Help => Ok(HELP_TEXT.to_string()),
            Command::Show(list) => Ok(self.store.get(list).render()),
            Command::Add { list, name } => {
                self.store.get_mut(list).append(name.clone());
                Ok(format!("✅ Added \"{name}\" to {}.", list.name()))
            }
            Command::Edit { list, index, name } => {
                self.store.get_mut(list).replace(index, name.clone())?;
                Ok(format!(
                    "✏️ Item #{index} in {} changed to \"{name}\".",
                    list.name()
                ))
            }
            Command::Delete { list, index } => {
                let removed = self.store.get_mut(list).remove(index)?;
                Ok(format!("🗑️ Deleted \"{removed}\" from {}.", list.name()))
            }
        }
    }
}

/// Split off the first whitespace-delimited token; the remainder is trimmed.
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Truncate `reply` to `limit` UTF-16 units, preferring whole lines, and mark
/// the cut.
fn fit_reply(reply: String, limit: usize) -> String {
    if utf16_len(&reply) <= limit {
        return reply;
    }

    let budget = limit.saturating_sub(utf16_len(TRUNCATION_MARKER));
    let mut out = String::new();
    let mut used = 0usize;
    for line in reply.split_inclusive('\n') {
        let n = utf16_len(line);
        if used + n > budget {
            break;
        }
        out.push_str(line);
        used += n;
    }

    // A single line longer than the budget is cut mid-line.
    if out.is_empty() {
        for ch in reply.chars() {
            let n = ch.len_utf16();
            if used + n > budget {
                break;
            }
            out.push(ch);
            used += n;
        }
    }

    format!("{}{TRUNCATION_MARKER}", out.trim_end_matches('\n'))
}

fn resolve(entity: &str, usage: &'static str) -> Result<ListKind, CommandError> {
    ListKind::from_entity(entity).ok_or_else(|| CommandError::UnknownEntity {
        entity: entity.to_string(),
        usage,
    })
}

fn parse_index(token: &str, usage: &'static str) -> Result<usize, CommandError> {
    match token.trim().parse::<usize>() {
        Ok(i) if i >= 1 => Ok(i),
        _ => Err(CommandError::BadIndex(usage)),
    }
}
