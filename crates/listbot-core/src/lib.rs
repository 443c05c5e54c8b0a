//! Core domain + application logic for the list bot.
//!
//! This crate is framework-agnostic. The Telegram transport lives behind the
//! `MessageService` port, implemented in the `listbot-telegram` adapter crate.

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod list_store;
pub mod logging;
pub mod messaging;
pub mod polling;

pub use errors::{Error, Result};
