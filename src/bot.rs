//! Per-server chat bots and the registry that routes prompts to them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::chunk;
use crate::config::error::ConfigError;
use crate::config::schema::Config;
use crate::delivery::{DeliveryJob, DeliveryPacer, DeliveryQueue, Destination, Pacing};
use crate::format;
use crate::generator::TextGenerator;
use crate::prompt::{sanitize_response, Prompt, PromptParser};

#[derive(Debug, Error)]
pub enum BotError {
    #[error("no bot is configured for server {0:?}")]
    UnknownServer(String),
}

/// Behavior shared by every server's bot, resolved once from config.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub parser: PromptParser,
    pub first_segment: usize,
    pub continuation_segment: usize,
    pub help_lines: Vec<String>,
    pub help_delay: Duration,
    pub fallback_help: String,
    pub generation_failed: String,
}

impl BotSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let parser = PromptParser::new(&config.bot.trigger, &config.contexts)
            .map_err(|e| ConfigError::invalid("contexts", e.to_string()))?;
        Ok(Self {
            parser,
            first_segment: config.chunking.first_segment,
            continuation_segment: config.chunking.continuation_segment,
            help_lines: format::help_lines(config),
            help_delay: config.delays.help_delay()?,
            fallback_help: format::fallback_help(config),
            generation_failed: config.messages.generation_failed.clone(),
        })
    }
}

/// Answers prompts on one server.
pub struct Bot {
    server: String,
    settings: BotSettings,
    generator: Arc<dyn TextGenerator>,
    pacer: DeliveryPacer,
    queue: DeliveryQueue,
}

impl Bot {
    pub fn new(
        server: impl Into<String>,
        settings: BotSettings,
        generator: Arc<dyn TextGenerator>,
        pacer: DeliveryPacer,
        queue: DeliveryQueue,
    ) -> Arc<Self> {
        Arc::new(Self {
            server: server.into(),
            settings,
            generator,
            pacer,
            queue,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    /// Handle a chat message in its own task if it starts with the trigger.
    pub fn submit(self: &Arc<Self>, player: &str, message: &str) -> Option<JoinHandle<()>> {
        let raw = self.settings.parser.strip_trigger(message)?;
        tracing::info!(server = %self.server, %player, prompt = %raw, "received prompt");
        let prompt = self.settings.parser.parse(raw);

        let bot = Arc::clone(self);
        let player = player.to_string();
        Some(tokio::spawn(async move { bot.handle(&player, prompt).await }))
    }

    async fn handle(&self, player: &str, prompt: Prompt) {
        if prompt.help {
            self.send_help().await;
            return;
        }

        let destination = if prompt.private {
            Destination::Player(player.to_string())
        } else {
            Destination::Broadcast
        };

        let text = match self.generator.generate(&prompt.generation_prompt()).await {
            Ok(text) => sanitize_response(&text, prompt.why),
            Err(e) => {
                tracing::error!(server = %self.server, %player, error = %e, "generation failed");
                let job = DeliveryJob::new(
                    destination,
                    vec![self.settings.generation_failed.clone()],
                    Pacing::Regular,
                );
                self.pacer.deliver(&job).await;
                return;
            }
        };

        let segments = chunk::split(
            &text,
            self.settings.first_segment,
            self.settings.continuation_segment,
        );
        tracing::debug!(server = %self.server, segments = segments.len(), "response ready");
        let job = DeliveryJob::new(destination, segments, prompt.pacing());

        if prompt.private {
            self.pacer.deliver_private(job, player).await;
        } else if let Err(e) = self.queue.enqueue(job).await {
            tracing::error!(server = %self.server, error = %e, "could not queue response");
        }
    }

    async fn send_help(&self) {
        let sent = self
            .pacer
            .deliver_sequence(&self.settings.help_lines, self.settings.help_delay)
            .await;
        if let Err(e) = sent {
            tracing::warn!(server = %self.server, error = %e, "styled help failed, sending short help");
            let job = DeliveryJob::broadcast(vec![self.settings.fallback_help.clone()], Pacing::Regular);
            self.pacer.deliver(&job).await;
        }
    }
}

/// Bots by server name.
#[derive(Default)]
pub struct BotRegistry {
    bots: HashMap<String, Arc<Bot>>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bot: Arc<Bot>) {
        self.bots.insert(bot.server().to_string(), bot);
    }

    pub fn get(&self, server: &str) -> Option<&Arc<Bot>> {
        self.bots.get(server)
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    /// Route a chat message to its server's bot.
    ///
    /// Returns the spawned prompt task, or `None` when the message does not
    /// start with the trigger.
    pub fn submit_prompt(
        &self,
        server: &str,
        player: &str,
        raw: &str,
    ) -> Result<Option<JoinHandle<()>>, BotError> {
        let bot = self
            .bots
            .get(server)
            .ok_or_else(|| BotError::UnknownServer(server.to_string()))?;
        Ok(bot.submit(player, raw))
    }
}
