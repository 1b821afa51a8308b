//! Authenticated RCON connection.
//!
//! A [`Client`] owns one TCP connection. Writes go through a mutex-guarded
//! write half; a background reader task routes each response to the caller
//! waiting on its request id, so several commands may be in flight at once.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::{RconError, Result};
use crate::packet::{Packet, PacketType, MAX_COMMAND_LEN};

/// Request id used for the login packet.
const AUTH_REQUEST_ID: i32 = 0;

/// Request id the server answers with when the password is wrong.
const AUTH_FAILED_ID: i32 = -1;

type Responder = oneshot::Sender<Result<String>>;

/// State shared between the client handle and its reader task.
#[derive(Debug)]
struct Shared {
    pending: Mutex<HashMap<i32, Responder>>,
    closed: watch::Sender<bool>,
}

impl Shared {
    /// Flag the connection as closed and fail every waiting request.
    async fn mark_closed(&self) {
        self.closed.send_replace(true);
        let mut pending = self.pending.lock().await;
        for (_, responder) in pending.drain() {
            let _ = responder.send(Err(RconError::Closed));
        }
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// An authenticated RCON connection.
#[derive(Debug)]
pub struct Client {
    writer: Mutex<OwnedWriteHalf>,
    shared: Arc<Shared>,
    next_id: AtomicU32,
    peer: SocketAddr,
    reader: JoinHandle<()>,
}

impl Client {
    /// Connect to `addr` and log in with `password`.
    ///
    /// The whole handshake (TCP connect plus login round trip) must finish
    /// within `timeout`.
    ///
    /// # Errors
    ///
    /// - [`RconError::Timeout`] if the handshake does not finish in time
    /// - [`RconError::AuthFailed`] if the server rejects the password
    /// - [`RconError::Io`] for socket failures
    pub async fn connect<A: ToSocketAddrs>(
        addr: A,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        tokio::time::timeout(timeout, Self::handshake(addr, password))
            .await
            .map_err(|_| RconError::Timeout)?
    }

    async fn handshake<A: ToSocketAddrs>(addr: A, password: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let (mut read_half, mut write_half) = stream.into_split();

        Packet::auth(AUTH_REQUEST_ID, password)
            .write_to(&mut write_half)
            .await?;

        // Some servers send an empty ResponseValue ahead of the auth reply.
        loop {
            let packet = Packet::read_from(&mut read_half).await?;
            if packet.kind == PacketType::AuthResponse {
                if packet.id == AUTH_FAILED_ID {
                    return Err(RconError::AuthFailed);
                }
                break;
            }
        }
        tracing::debug!("RCON login accepted by {}", peer);

        let (closed, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            pending: Mutex::new(HashMap::new()),
            closed,
        });
        let reader = tokio::spawn(read_loop(read_half, Arc::clone(&shared)));

        Ok(Self {
            writer: Mutex::new(write_half),
            shared,
            next_id: AtomicU32::new(1),
            peer,
            reader,
        })
    }

    /// Address of the server this client is connected to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Returns `true` once the connection has ended.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Send a command and wait for the server's reply.
    ///
    /// Only the first response fragment is returned; Minecraft splits replies
    /// longer than 4096 bytes and the remaining fragments are discarded.
    pub async fn send(&self, command: &str) -> Result<String> {
        if command.len() > MAX_COMMAND_LEN {
            return Err(RconError::CommandTooLong {
                len: command.len(),
                max: MAX_COMMAND_LEN,
            });
        }

        let id = self.allocate_id();
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().await.insert(id, tx);

        // Checked after registering so a concurrent shutdown cannot strand us.
        if self.shared.is_closed() {
            self.shared.pending.lock().await.remove(&id);
            return Err(RconError::Closed);
        }

        let written = {
            let mut writer = self.writer.lock().await;
            Packet::command(id, command).write_to(&mut *writer).await
        };
        if let Err(e) = written {
            self.shared.pending.lock().await.remove(&id);
            return Err(e);
        }

        rx.await.unwrap_or(Err(RconError::Closed))
    }

    /// Resolves once the server closes the connection or the reader fails.
    pub async fn closed(&self) {
        let mut rx = self.shared.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Shut the connection down from our side.
    pub async fn close(&self) {
        {
            let mut writer = self.writer.lock().await;
            let _ = writer.shutdown().await;
        }
        self.reader.abort();
        self.shared.mark_closed().await;
    }

    /// Ids stay positive so they never collide with the auth-failure marker.
    fn allocate_id(&self) -> i32 {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        (n % (i32::MAX as u32)) as i32 + 1
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(mut reader: OwnedReadHalf, shared: Arc<Shared>) {
    let reason = loop {
        match Packet::read_from(&mut reader).await {
            Ok(packet) => {
                let responder = shared.pending.lock().await.remove(&packet.id);
                match responder {
                    Some(tx) => {
                        let _ = tx.send(Ok(packet.body));
                    }
                    None => tracing::trace!(id = packet.id, "dropping unsolicited RCON packet"),
                }
            }
            Err(e) => break e,
        }
    };
    tracing::debug!("RCON reader stopped: {}", reason);
    shared.mark_closed().await;
}
