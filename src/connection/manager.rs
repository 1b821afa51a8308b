//! Lifecycle of the single RCON session for one server.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use craftbot_rcon::RconError;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use super::backoff::{BackoffState, ReconnectPolicy};
use super::transport::{Connector, Session};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Errors surfaced by [`ConnectionManager::send`].
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No session could be established for this send.
    #[error("RCON for {server} is unavailable")]
    Unavailable { server: String },

    /// The command could not be delivered, even after one reconnect and retry.
    #[error("RCON send to {server} failed: {source}")]
    SendFailed {
        server: String,
        #[source]
        source: RconError,
    },
}

struct Inner {
    session: Option<Arc<dyn Session>>,
    /// Bumped on every successful connect so stale close notifications are ignored.
    generation: u64,
    backoff: BackoffState,
    reconnect_pending: bool,
}

/// Owns the RCON session for one server and keeps it alive.
///
/// Connect attempts are deduplicated: while one is in progress, other callers
/// wait for its outcome instead of starting their own. After a failed attempt
/// or an unsolicited disconnect a single reconnect timer is armed with the
/// current backoff delay.
pub struct ConnectionManager {
    server: String,
    connector: Arc<dyn Connector>,
    inner: Mutex<Inner>,
    state: watch::Sender<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(
        server: impl Into<String>,
        connector: Arc<dyn Connector>,
        policy: ReconnectPolicy,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Arc::new(Self {
            server: server.into(),
            connector,
            inner: Mutex::new(Inner {
                session: None,
                generation: 0,
                backoff: BackoffState::new(policy),
                reconnect_pending: false,
            }),
            state,
        })
    }

    /// Server name used in log output.
    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Initial connect attempt for a freshly built manager.
    pub async fn start(self: &Arc<Self>) -> ConnectionState {
        self.connect().await
    }

    /// Make sure a connect attempt has happened and return the resulting state.
    ///
    /// Joins an attempt already in progress rather than starting another. A
    /// failed attempt arms the reconnect timer; it is not reported as an error.
    ///
    /// Boxed because the reconnect timer calls back into it.
    pub fn connect(self: &Arc<Self>) -> BoxFuture<'_, ConnectionState> {
        Box::pin(async move {
            let claimed = self.state.send_if_modified(|state| {
                if *state == ConnectionState::Disconnected {
                    *state = ConnectionState::Connecting;
                    true
                } else {
                    false
                }
            });
            if claimed {
                return self.attempt().await;
            }

            let mut rx = self.state.subscribe();
            let settled = rx
                .wait_for(|state| *state != ConnectionState::Connecting)
                .await
                .map(|state| *state);
            settled.unwrap_or(ConnectionState::Disconnected)
        })
    }

    /// Send one command, reconnecting and retrying at most once.
    pub async fn send(self: &Arc<Self>, command: &str) -> Result<String, ConnectionError> {
        let (session, generation) = match self.current_session().await {
            Some(current) => current,
            None => {
                self.connect().await;
                self.current_session()
                    .await
                    .ok_or_else(|| ConnectionError::Unavailable {
                        server: self.server.clone(),
                    })?
            }
        };

        let first_error = match session.send(command).await {
            Ok(reply) => return Ok(reply),
            Err(e) if !e.is_fatal() => return Err(self.send_failed(e)),
            Err(e) => e,
        };
        tracing::warn!(
            server = %self.server,
            error = %first_error,
            "RCON send failed, reconnecting once to retry"
        );

        drop(session);
        self.invalidate(generation, false).await;
        self.connect().await;

        let Some((session, generation)) = self.current_session().await else {
            return Err(self.send_failed(first_error));
        };
        match session.send(command).await {
            Ok(reply) => {
                tracing::info!(server = %self.server, "RCON retry succeeded");
                Ok(reply)
            }
            Err(e) => {
                if e.is_fatal() {
                    self.invalidate(generation, true).await;
                }
                Err(self.send_failed(e))
            }
        }
    }

    fn send_failed(&self, source: RconError) -> ConnectionError {
        ConnectionError::SendFailed {
            server: self.server.clone(),
            source,
        }
    }

    async fn current_session(&self) -> Option<(Arc<dyn Session>, u64)> {
        let inner = self.inner.lock().await;
        inner
            .session
            .as_ref()
            .map(|session| (Arc::clone(session), inner.generation))
    }

    async fn attempt(self: &Arc<Self>) -> ConnectionState {
        tracing::info!(server = %self.server, "connecting to RCON");
        match self.connector.connect().await {
            Ok(session) => {
                let generation = {
                    let mut inner = self.inner.lock().await;
                    inner.generation += 1;
                    inner.session = Some(Arc::clone(&session));
                    inner.backoff.reset();
                    inner.generation
                };
                self.state.send_replace(ConnectionState::Connected);
                tracing::info!(server = %self.server, "RCON connected");
                self.spawn_monitor(session, generation);
                ConnectionState::Connected
            }
            Err(e) => {
                tracing::warn!(server = %self.server, error = %e, "RCON connect failed");
                self.state.send_replace(ConnectionState::Disconnected);
                self.schedule_reconnect().await;
                ConnectionState::Disconnected
            }
        }
    }

    /// Watch for the server closing this session.
    fn spawn_monitor(self: &Arc<Self>, session: Arc<dyn Session>, generation: u64) {
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            session.closed().await;
            drop(session);
            if let Some(manager) = manager.upgrade() {
                manager.on_remote_close(generation).await;
            }
        });
    }

    async fn on_remote_close(self: &Arc<Self>, generation: u64) {
        let current = {
            let mut inner = self.inner.lock().await;
            if inner.generation == generation {
                inner.session.take()
            } else {
                None
            }
        };
        // Already invalidated by a failed send or replaced by a newer session.
        if current.is_none() {
            return;
        }
        tracing::warn!(server = %self.server, "RCON connection closed");
        self.state.send_replace(ConnectionState::Disconnected);
        self.schedule_reconnect().await;
    }

    /// Drop the session of `generation`, if it is still the current one.
    async fn invalidate(self: &Arc<Self>, generation: u64, schedule: bool) {
        let session = {
            let mut inner = self.inner.lock().await;
            if inner.generation == generation {
                inner.session.take()
            } else {
                None
            }
        };
        let Some(session) = session else {
            return;
        };
        self.state.send_replace(ConnectionState::Disconnected);
        session.close().await;
        if schedule {
            self.schedule_reconnect().await;
        }
    }

    /// Arm the reconnect timer unless one is already pending.
    async fn schedule_reconnect(self: &Arc<Self>) {
        let delay = {
            let mut inner = self.inner.lock().await;
            if inner.reconnect_pending {
                return;
            }
            inner.reconnect_pending = true;
            inner.backoff.next_delay()
        };
        tracing::info!(server = %self.server, ?delay, "scheduling RCON reconnect");

        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(manager) = manager.upgrade() else {
                return;
            };
            manager.inner.lock().await.reconnect_pending = false;
            if manager.state() == ConnectionState::Connected {
                tracing::debug!(server = %manager.server, "already connected, skipping reconnect");
                return;
            }
            manager.connect().await;
        });
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("server", &self.server)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
