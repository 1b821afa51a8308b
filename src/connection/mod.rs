//! Resilient RCON connection management.
//!
//! One [`ConnectionManager`] per server owns the only session to that server's
//! RCON port. It reconnects with exponential backoff and gives callers a
//! single `send` that survives one transient disconnect.

mod backoff;
mod manager;
mod transport;

pub use backoff::{BackoffState, ReconnectPolicy};
pub use manager::{ConnectionError, ConnectionManager, ConnectionState};
pub use transport::{Connector, RconConnector, Session};

#[cfg(test)]
mod tests;
