//! Process lifecycle for `craftbot run`.
//!
//! Each configured server becomes a target: a log watch feeding chat events
//! into one dispatcher, and a bot with its own RCON connection and delivery
//! queue. A target that cannot be set up is logged and skipped; the others
//! keep running.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fork::{daemon, Fork};
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::bot::{Bot, BotRegistry, BotSettings};
use crate::chat::{watch_log, ChatEvent, ChatParser, LogWatch, WatchError};
use crate::config::schema::{Config, ServerConfig};
use crate::config::{xdg, ConfigError, ConfigLoader};
use crate::connection::{ConnectionManager, RconConnector, ReconnectPolicy};
use crate::delivery::{DeliveryPacer, DeliveryQueue, PacingConfig};
use crate::format::{Renderer, TellrawRenderer};
use crate::generator::{resolve_api_key, GeminiGenerator, GenerationError, TextGenerator};
use crate::logging;

/// Chat events buffered between the log watches and the dispatcher.
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generator(#[from] GenerationError),

    #[error("failed to daemonize: {0}")]
    Daemonize(String),

    #[error("failed to create tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("none of the configured servers could be started")]
    NoTargets,
}

/// Why one server target could not be started.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// Options for `craftbot run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit config file; the XDG location otherwise.
    pub config_path: Option<PathBuf>,
    /// Detach from the terminal.
    pub daemonize: bool,
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
///
/// If SIGTERM handler registration fails, falls back to SIGINT only.
pub async fn wait_for_shutdown() {
    match unix_signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("received SIGINT (Ctrl+C), shutting down");
                },
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                },
            }
        }
        Err(e) => {
            warn!(error = %e, "could not register SIGTERM handler, using SIGINT only");
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "failed waiting for SIGINT");
            } else {
                info!("received SIGINT (Ctrl+C), shutting down");
            }
        }
    }
}

/// Fork and detach from the terminal. The parent exits immediately.
///
/// Must run before the Tokio runtime is created: forking after Tokio
/// initialization corrupts its signal handling state.
pub fn daemonize_process(nochdir: bool, noclose: bool) -> Result<(), DaemonError> {
    match daemon(nochdir, noclose) {
        Ok(Fork::Child) => Ok(()),
        Ok(Fork::Parent(_)) => std::process::exit(0),
        Err(e) => Err(DaemonError::Daemonize(e.to_string())),
    }
}

/// Entry point for `craftbot run`.
///
/// Configuration and the API key are checked before forking so that mistakes
/// are reported on the terminal.
pub fn run_daemon(options: RunOptions) -> Result<(), DaemonError> {
    let config = ConfigLoader::load(options.config_path.as_deref())?;
    config.validate()?;
    resolve_api_key(&config.gemini.api_key_env)?;

    if options.daemonize {
        // Keep the working directory: relative log paths and .env stay valid.
        daemonize_process(true, false)?;
    }

    // Initialize logging after daemonize (stderr may be redirected)
    logging::init(config.logging.level);

    info!(
        servers = config.servers.len(),
        daemonize = options.daemonize,
        "craftbot starting"
    );

    let runtime = Runtime::new().map_err(DaemonError::Runtime)?;
    runtime.block_on(run(&config))?;

    info!("craftbot stopped");
    Ok(())
}

async fn run(config: &Config) -> Result<(), DaemonError> {
    let generator = GeminiGenerator::from_config(&config.gemini, config.gemini.timeout()?)?;
    info!(model = generator.model(), "text generator ready");
    serve(config, Arc::new(generator), wait_for_shutdown()).await
}

/// Settings every target is built from.
struct Shared {
    settings: BotSettings,
    renderer: Arc<dyn Renderer>,
    generator: Arc<dyn TextGenerator>,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    pacing: PacingConfig,
    queue_capacity: usize,
    queue_delay: Duration,
}

impl Shared {
    fn new(config: &Config, generator: Arc<dyn TextGenerator>) -> Result<Self, ConfigError> {
        Ok(Self {
            settings: BotSettings::from_config(config)?,
            renderer: Arc::new(TellrawRenderer::new(config)),
            generator,
            policy: config.reconnect.policy()?,
            connect_timeout: config.reconnect.connect_timeout()?,
            pacing: config.delays.pacing()?,
            queue_capacity: config.queue.capacity,
            queue_delay: config.delays.queue_delay()?,
        })
    }
}

/// A running server target.
struct Target {
    bot: Arc<Bot>,
    _watch: LogWatch,
}

async fn start_target(
    server: &ServerConfig,
    shared: &Shared,
    events: mpsc::Sender<ChatEvent>,
) -> Result<Target, TargetError> {
    let parser = ChatParser::from_regex(server.compile_chat_pattern()?);
    let poll_interval = server.poll_interval()?;
    let log_path = xdg::expand_tilde(&server.log_path);
    let watch = watch_log(&server.name, &log_path, parser, poll_interval, events).await?;

    let connector = RconConnector::new(
        server.rcon_address(),
        &server.rcon_password,
        shared.connect_timeout,
    );
    let connection = ConnectionManager::new(&server.name, Arc::new(connector), shared.policy);
    let state = connection.start().await;
    info!(server = %server.name, address = %server.rcon_address(), ?state, "server target ready");

    let pacer = DeliveryPacer::new(connection, Arc::clone(&shared.renderer), shared.pacing);
    let queue = DeliveryQueue::spawn(
        &server.name,
        pacer.clone(),
        shared.queue_capacity,
        shared.queue_delay,
    );
    let bot = Bot::new(
        &server.name,
        shared.settings.clone(),
        Arc::clone(&shared.generator),
        pacer,
        queue,
    );
    Ok(Target { bot, _watch: watch })
}

/// Run every configured server target until `shutdown` resolves.
///
/// Fails only if no target could be started.
pub async fn serve<F>(
    config: &Config,
    generator: Arc<dyn TextGenerator>,
    shutdown: F,
) -> Result<(), DaemonError>
where
    F: Future<Output = ()>,
{
    let shared = Shared::new(config, generator)?;
    let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);

    let mut registry = BotRegistry::new();
    let mut targets = Vec::new();
    for server in &config.servers {
        match start_target(server, &shared, events_tx.clone()).await {
            Ok(target) => {
                registry.insert(Arc::clone(&target.bot));
                targets.push(target);
            }
            Err(e) => {
                error!(server = %server.name, error = %e, "could not start server target, skipping it");
            }
        }
    }
    drop(events_tx);

    if registry.is_empty() {
        return Err(DaemonError::NoTargets);
    }
    info!(
        running = registry.len(),
        configured = config.servers.len(),
        trigger = %config.bot.trigger,
        "listening for prompts"
    );

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events_rx.recv() => {
                let Some(event) = event else {
                    warn!("every log watch has stopped");
                    break;
                };
                dispatch(&registry, event);
            }
        }
    }

    drop(targets);
    Ok(())
}

fn dispatch(registry: &BotRegistry, event: ChatEvent) {
    if let Err(e) = registry.submit_prompt(&event.server, &event.player, &event.message) {
        warn!(server = %event.server, error = %e, "dropping chat event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubGenerator;

    fn server(name: &str, log_path: &std::path::Path) -> ServerConfig {
        ServerConfig {
            name: name.to_string(),
            log_path: log_path.display().to_string(),
            // Nothing listens on port 1; the connection keeps retrying in the background.
            rcon_port: 1,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn serve_fails_when_no_target_starts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.servers.push(server("survival", &dir.path().join("missing.log")));

        let result = serve(&config, StubGenerator::replying("hi"), std::future::pending()).await;
        assert!(matches!(result, Err(DaemonError::NoTargets)));
    }

    #[tokio::test]
    async fn broken_target_does_not_stop_the_others() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("latest.log");
        std::fs::write(&log, "").expect("write log");

        let mut config = Config::default();
        config.reconnect.connect_timeout = "100ms".to_string();
        config.servers.push(server("creative", &dir.path().join("missing.log")));
        config.servers.push(server("survival", &log));

        let result = serve(&config, StubGenerator::replying("hi"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        })
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn invalid_settings_are_config_errors() {
        let mut config = Config::default();
        config.delays.queue = "soon".to_string();
        let result = serve(&config, StubGenerator::replying("hi"), std::future::pending()).await;
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }

    #[test]
    fn run_options_default_to_foreground() {
        let options = RunOptions::default();
        assert!(!options.daemonize);
        assert!(options.config_path.is_none());
    }
}
