//! Minimal async client for the Minecraft RCON protocol.
//!
//! Covers exactly what a chat bot needs: open an authenticated session,
//! send discrete commands, receive their replies, and notice when the
//! server goes away.
//!
//! # Example
//!
//! ```no_run
//! use craftbot_rcon::Client;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), craftbot_rcon::RconError> {
//! let client = Client::connect("127.0.0.1:25575", "secret", Duration::from_secs(5)).await?;
//! let reply = client.send("list").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod packet;

pub use client::Client;
pub use error::{RconError, Result};
pub use packet::{Packet, PacketType, MAX_COMMAND_LEN};
