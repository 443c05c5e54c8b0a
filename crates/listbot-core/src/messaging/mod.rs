//! Transport abstraction (Telegram today).

pub mod port;
