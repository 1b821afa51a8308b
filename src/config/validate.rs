//! Semantic validation and resolution of parsed configuration.
//!
//! Parsing only checks types. This module turns humantime strings into
//! `Duration`s and enforces the invariants the runtime relies on, so a bad
//! value is reported once at startup with the field that caused it.

use std::collections::HashSet;
use std::time::Duration;

use regex::Regex;

use crate::config::error::ConfigError;
use crate::config::schema::{
    Config, DelaysConfig, GeminiConfig, ReconnectConfig, ServerConfig,
};
use crate::connection::ReconnectPolicy;
use crate::delivery::PacingConfig;

/// Parse a humantime duration, naming `field` in the error.
pub fn parse_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|e| {
        ConfigError::invalid(
            field,
            format!("expected a duration like \"500ms\" or \"15s\", got {:?} ({})", value, e),
        )
    })
}

impl ReconnectConfig {
    /// Backoff policy for connection managers.
    pub fn policy(&self) -> Result<ReconnectPolicy, ConfigError> {
        let initial = parse_duration("reconnect.initial_interval", &self.initial_interval)?;
        let max = parse_duration("reconnect.max_interval", &self.max_interval)?;
        if initial.is_zero() {
            return Err(ConfigError::invalid(
                "reconnect.initial_interval",
                "must be greater than zero",
            ));
        }
        if initial > max {
            return Err(ConfigError::invalid(
                "reconnect.max_interval",
                "must not be shorter than reconnect.initial_interval",
            ));
        }
        Ok(ReconnectPolicy::new(initial, max))
    }

    /// Deadline for one connect + login attempt.
    pub fn connect_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("reconnect.connect_timeout", &self.connect_timeout)
    }
}

impl DelaysConfig {
    /// Inter-segment pacing for regular and `-long` responses.
    pub fn pacing(&self) -> Result<PacingConfig, ConfigError> {
        Ok(PacingConfig {
            regular: parse_duration("delays.regular_response", &self.regular_response)?,
            extended: parse_duration("delays.long_response", &self.long_response)?,
        })
    }

    /// Pause between two consecutive public jobs.
    pub fn queue_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration("delays.queue", &self.queue)
    }

    /// Pause between help lines.
    pub fn help_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration("delays.help_message", &self.help_message)
    }
}

impl GeminiConfig {
    /// HTTP request timeout.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("gemini.timeout", &self.timeout)
    }
}

impl ServerConfig {
    fn field(&self, name: &str) -> String {
        format!("servers[{}].{}", self.name, name)
    }

    /// How often the log file is polled.
    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        let interval = parse_duration(&self.field("poll_interval"), &self.poll_interval)?;
        if interval.is_zero() {
            return Err(ConfigError::invalid(
                self.field("poll_interval"),
                "must be greater than zero",
            ));
        }
        Ok(interval)
    }

    /// Compile the chat pattern, requiring player and message capture groups.
    pub fn compile_chat_pattern(&self) -> Result<Regex, ConfigError> {
        let regex = Regex::new(self.chat_pattern())
            .map_err(|e| ConfigError::invalid(self.field("chat_pattern"), e.to_string()))?;
        // captures_len counts the implicit whole-match group.
        if regex.captures_len() < 3 {
            return Err(ConfigError::invalid(
                self.field("chat_pattern"),
                "needs two capture groups: player name and message",
            ));
        }
        Ok(regex)
    }
}

impl Config {
    /// Check every value the runtime depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.trigger.trim().is_empty() {
            return Err(ConfigError::invalid("bot.trigger", "must not be empty"));
        }
        if self.chunking.first_segment == 0 {
            return Err(ConfigError::invalid("chunking.first_segment", "must be positive"));
        }
        if self.chunking.continuation_segment == 0 {
            return Err(ConfigError::invalid(
                "chunking.continuation_segment",
                "must be positive",
            ));
        }
        if self.queue.capacity == 0 {
            return Err(ConfigError::invalid("queue.capacity", "must be positive"));
        }

        self.delays.pacing()?;
        self.delays.queue_delay()?;
        self.delays.help_delay()?;
        self.reconnect.policy()?;
        self.reconnect.connect_timeout()?;
        self.gemini.timeout()?;

        for (i, context) in self.contexts.iter().enumerate() {
            if !context.flag.starts_with('-') || context.flag.len() < 2 {
                return Err(ConfigError::invalid(
                    format!("contexts[{}].flag", i),
                    "must be a dash followed by a name, e.g. \"-mc\"",
                ));
            }
        }

        if self.servers.is_empty() {
            return Err(ConfigError::invalid(
                "servers",
                "at least one [[servers]] entry is required",
            ));
        }
        let mut names = HashSet::new();
        for (i, server) in self.servers.iter().enumerate() {
            if server.name.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("servers[{}].name", i),
                    "must not be empty",
                ));
            }
            if !names.insert(server.name.as_str()) {
                return Err(ConfigError::invalid(
                    format!("servers[{}].name", i),
                    format!("duplicate server name {:?}", server.name),
                ));
            }
            if server.log_path.trim().is_empty() {
                return Err(ConfigError::invalid(server.field("log_path"), "must not be empty"));
            }
            server.poll_interval()?;
            server.compile_chat_pattern()?;
        }
        Ok(())
    }
}
