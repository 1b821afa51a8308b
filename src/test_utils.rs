//! Test doubles for the RCON transport, rendering and text generation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use craftbot_rcon::RconError;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::connection::{Connector, Session};
use crate::delivery::Destination;
use crate::format::Renderer;
use crate::generator::{GenerationError, TextGenerator};

/// Commands that reached a session, shared by every session of a connector.
#[derive(Default)]
pub struct Wire {
    /// Successfully delivered commands with their send time.
    pub delivered: Mutex<Vec<(Instant, String)>>,
    /// Every transmission, including failed ones.
    pub transmissions: AtomicUsize,
    /// Upcoming transmissions that fail with an I/O error.
    pub failing_sends: AtomicUsize,
    /// Commands starting with one of these are rejected as too long.
    pub rejected_prefixes: Mutex<Vec<String>>,
    /// Time each send takes.
    pub send_latency: Mutex<Duration>,
}

impl Wire {
    pub fn delivered(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, command)| command.clone())
            .collect()
    }

    pub fn delivered_at(&self) -> Vec<(Instant, String)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn transmissions(&self) -> usize {
        self.transmissions.load(Ordering::SeqCst)
    }

    pub fn fail_next_sends(&self, n: usize) {
        self.failing_sends.store(n, Ordering::SeqCst);
    }

    pub fn reject_prefix(&self, prefix: &str) {
        self.rejected_prefixes.lock().unwrap().push(prefix.to_string());
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.send_latency.lock().unwrap() = latency;
    }
}

pub struct MockSession {
    wire: Arc<Wire>,
    closed: watch::Sender<bool>,
}

impl MockSession {
    /// Simulate the server dropping the connection.
    pub fn hang_up(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[async_trait]
impl Session for MockSession {
    async fn send(&self, command: &str) -> Result<String, RconError> {
        self.wire.transmissions.fetch_add(1, Ordering::SeqCst);
        let latency = *self.wire.send_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.is_closed() {
            return Err(RconError::Closed);
        }
        let failing = self
            .wire
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RconError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "broken pipe",
            )));
        }
        let rejected = self
            .wire
            .rejected_prefixes
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| command.starts_with(prefix.as_str()));
        if rejected {
            return Err(RconError::CommandTooLong {
                len: command.len(),
                max: 0,
            });
        }
        self.wire
            .delivered
            .lock()
            .unwrap()
            .push((Instant::now(), command.to_string()));
        Ok(String::new())
    }

    async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    async fn close(&self) {
        self.closed.send_replace(true);
    }
}

/// Connector that can be switched between reachable and unreachable.
pub struct MockConnector {
    pub wire: Arc<Wire>,
    attempts: Mutex<Vec<Instant>>,
    succeed_by_default: AtomicBool,
    connect_latency: Mutex<Duration>,
    sessions: Mutex<Vec<Arc<MockSession>>>,
}

impl MockConnector {
    /// Every attempt succeeds until `set_up(false)`.
    pub fn healthy() -> Arc<Self> {
        Self::with_default(true)
    }

    /// Every attempt fails until `set_up(true)`.
    pub fn down() -> Arc<Self> {
        Self::with_default(false)
    }

    fn with_default(ok: bool) -> Arc<Self> {
        Arc::new(Self {
            wire: Arc::new(Wire::default()),
            attempts: Mutex::new(Vec::new()),
            succeed_by_default: AtomicBool::new(ok),
            connect_latency: Mutex::new(Duration::ZERO),
            sessions: Mutex::new(Vec::new()),
        })
    }

    pub fn set_up(&self, up: bool) {
        self.succeed_by_default.store(up, Ordering::SeqCst);
    }

    pub fn set_connect_latency(&self, latency: Duration) {
        *self.connect_latency.lock().unwrap() = latency;
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.sessions.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Arc<dyn Session>, RconError> {
        self.attempts.lock().unwrap().push(Instant::now());
        let latency = *self.connect_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if !self.succeed_by_default.load(Ordering::SeqCst) {
            return Err(RconError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        let (closed, _) = watch::channel(false);
        let session = Arc::new(MockSession {
            wire: Arc::clone(&self.wire),
            closed,
        });
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        Ok(session)
    }
}

/// Renderer producing short, predictable commands.
pub struct TestRenderer;

impl TestRenderer {
    fn line(kind: &str, text: &str, show_header: bool, destination: &Destination) -> String {
        let header = if show_header { "[header] " } else { "" };
        format!("{} {} {}{}", kind, destination.selector(), header, text)
    }
}

impl Renderer for TestRenderer {
    fn render(&self, text: &str, show_header: bool, destination: &Destination) -> String {
        Self::line("styled", text, show_header, destination)
    }

    fn fallback(&self, text: &str, show_header: bool, destination: &Destination) -> String {
        Self::line("plain", text, show_header, destination)
    }
}

/// Generator returning a fixed reply and recording prompts.
pub struct StubGenerator {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Every call fails.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or(GenerationError::Empty)
    }
}
