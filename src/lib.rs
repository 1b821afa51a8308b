//! CraftBot library
//!
//! A chat assistant for Minecraft servers. It follows each server's log for
//! chat lines that start with the trigger word, asks a text generator for an
//! answer and writes the answer back into chat over RCON.
//!
//! The moving parts, leaf first:
//! - [`chunk`] splits an answer into chat-sized segments.
//! - [`connection`] keeps one RCON session per server alive, with backoff.
//! - [`delivery`] paces segments out and serializes public answers.
//! - [`bot`] turns a chat message into a delivered answer.
//! - [`daemon`] wires every configured server together for `craftbot run`.
//!
//! # Platform Support
//!
//! Unix-like systems only (Linux, macOS): daemonizing uses `fork()` and
//! shutdown listens for SIGTERM.

pub mod bot;
pub mod chat;
pub mod check;
pub mod chunk;
pub mod config;
pub mod connection;
pub mod daemon;
pub mod delivery;
pub mod format;
pub mod generator;
pub mod logging;
pub mod prompt;

#[cfg(test)]
mod test_utils;

pub use bot::{Bot, BotError, BotRegistry, BotSettings};
pub use config::{Config, ConfigError, ServerConfig};
pub use connection::{ConnectionError, ConnectionManager, ConnectionState};
pub use delivery::{DeliveryJob, DeliveryPacer, DeliveryQueue, Destination, Pacing};
