//! Seams between the connection manager and the RCON client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use craftbot_rcon::{Client, RconError};

/// One live, logged-in session.
#[async_trait]
pub trait Session: Send + Sync {
    /// Send one command and wait for its reply.
    async fn send(&self, command: &str) -> Result<String, RconError>;

    /// Resolves once the remote side has closed the session.
    async fn closed(&self);

    /// Close the session from our side.
    async fn close(&self);
}

/// Opens new sessions to a fixed endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn Session>, RconError>;
}

#[async_trait]
impl Session for Client {
    async fn send(&self, command: &str) -> Result<String, RconError> {
        Client::send(self, command).await
    }

    async fn closed(&self) {
        Client::closed(self).await
    }

    async fn close(&self) {
        Client::close(self).await
    }
}

/// [`Connector`] for a real RCON endpoint.
#[derive(Clone)]
pub struct RconConnector {
    address: String,
    password: String,
    timeout: Duration,
}

impl RconConnector {
    pub fn new(address: impl Into<String>, password: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
            timeout,
        }
    }
}

impl std::fmt::Debug for RconConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RconConnector")
            .field("address", &self.address)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for RconConnector {
    async fn connect(&self) -> Result<Arc<dyn Session>, RconError> {
        let client = Client::connect(self.address.as_str(), &self.password, self.timeout).await?;
        Ok(Arc::new(client))
    }
}
