//! TOML configuration schema types for craftbot.
//!
//! All structs derive `Deserialize` and `Serialize` with sensible defaults via
//! `#[serde(default)]`, so a config file only needs the `[[servers]]` entries.
//!
//! Duration fields use human-readable strings (e.g. `"15s"`, `"5m"`, `"500ms"`)
//! parsed by the `humantime` crate when the config is validated.

use serde::{Deserialize, Serialize};

/// Chat pattern matching vanilla and modded `[Server thread/INFO]` chat lines.
///
/// Capture group 1 is the player name, group 2 the message.
pub const DEFAULT_CHAT_PATTERN: &str =
    r"\[[^\]]+\] \[Server thread/INFO\](?:\s\[[^\]]+\])?: <(.+?)> (.*)";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration encompassing all sections.
///
/// ```toml
/// [bot]
/// [gemini]
/// [chunking]
/// [delays]
/// [reconnect]
/// [queue]
/// [styling]
/// [messages]
/// [[contexts]]
/// [logging]
/// [[servers]]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Trigger word and display name.
    pub bot: BotConfig,
    /// Text generation backend.
    pub gemini: GeminiConfig,
    /// Segment budgets for chat output.
    pub chunking: ChunkingConfig,
    /// Pacing between segments, jobs and help lines.
    pub delays: DelaysConfig,
    /// RCON reconnect policy.
    pub reconnect: ReconnectConfig,
    /// Public delivery queue settings.
    pub queue: QueueConfig,
    /// Colors used in chat payloads.
    pub styling: StylingConfig,
    /// Fixed texts shown to players.
    pub messages: MessagesConfig,
    /// Topic flags that prepend context to the prompt.
    pub contexts: Vec<ContextConfig>,
    /// Log verbosity.
    pub logging: LoggingConfig,
    /// Minecraft servers to serve.
    pub servers: Vec<ServerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            gemini: GeminiConfig::default(),
            chunking: ChunkingConfig::default(),
            delays: DelaysConfig::default(),
            reconnect: ReconnectConfig::default(),
            queue: QueueConfig::default(),
            styling: StylingConfig::default(),
            messages: MessagesConfig::default(),
            contexts: default_contexts(),
            logging: LoggingConfig::default(),
            servers: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

/// Bot identity.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    /// Prefix that addresses the bot in chat. Matched case-insensitively.
    pub trigger: String,
    /// Name shown in the chat header.
    pub name: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            trigger: "@gem".to_string(),
            name: "Gem".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

/// Gemini API settings. The key itself is read from the environment.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    /// Model identifier.
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// Request timeout.
    pub timeout: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout: "30s".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chunking
// ---------------------------------------------------------------------------

/// Character budgets for response segments.
///
/// The first segment carries the `[SERVER][name]:` header, so it gets less room.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Budget for the first segment.
    pub first_segment: usize,
    /// Budget for every following segment.
    pub continuation_segment: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            first_segment: 45,
            continuation_segment: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// Delays
// ---------------------------------------------------------------------------

/// Pacing delays, as humantime strings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DelaysConfig {
    /// Between segments of a regular response.
    pub regular_response: String,
    /// Between segments of a `-long` response.
    pub long_response: String,
    /// Between two consecutive public jobs.
    pub queue: String,
    /// Between lines of the help output.
    pub help_message: String,
}

impl Default for DelaysConfig {
    fn default() -> Self {
        Self {
            regular_response: "1s".to_string(),
            long_response: "2s".to_string(),
            queue: "500ms".to_string(),
            help_message: "1s".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconnect
// ---------------------------------------------------------------------------

/// RCON reconnect policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReconnectConfig {
    /// First backoff interval, restored after every successful connect.
    pub initial_interval: String,
    /// Upper bound for the doubling backoff.
    pub max_interval: String,
    /// Deadline for one connect + login attempt.
    pub connect_timeout: String,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_interval: "15s".to_string(),
            max_interval: "5m".to_string(),
            connect_timeout: "10s".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Public delivery queue.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Jobs that may wait before `enqueue` applies backpressure.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

// ---------------------------------------------------------------------------
// Styling
// ---------------------------------------------------------------------------

/// Minecraft text colors used in `tellraw` payloads.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StylingConfig {
    /// Color of response text.
    pub message_color: String,
    /// Colors of the `[SERVER][name]:` header.
    pub header: HeaderColors,
    /// Colors of the help output.
    pub help: HelpColors,
}

impl Default for StylingConfig {
    fn default() -> Self {
        Self {
            message_color: "white".to_string(),
            header: HeaderColors::default(),
            help: HelpColors::default(),
        }
    }
}

/// Header colors.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HeaderColors {
    pub bracket: String,
    pub server_text: String,
    pub bot_name: String,
    pub separator: String,
}

impl Default for HeaderColors {
    fn default() -> Self {
        Self {
            bracket: "gold".to_string(),
            server_text: "gray".to_string(),
            bot_name: "aqua".to_string(),
            separator: "gray".to_string(),
        }
    }
}

/// Help output colors.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HelpColors {
    pub title: String,
    pub accent: String,
    pub usage: String,
    pub flags: String,
    pub example: String,
    pub note: String,
    pub tip: String,
}

impl Default for HelpColors {
    fn default() -> Self {
        Self {
            title: "light_purple".to_string(),
            accent: "yellow".to_string(),
            usage: "green".to_string(),
            flags: "gold".to_string(),
            example: "aqua".to_string(),
            note: "gold".to_string(),
            tip: "gold".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Fixed player-facing texts. `{trigger}` is replaced with the bot trigger.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MessagesConfig {
    pub help_title: String,
    pub example_command: String,
    pub queue_note: String,
    pub fun_tip: String,
    /// Single-line help used when the styled help output fails.
    pub fallback_help: String,
    /// Sent when text generation fails.
    pub generation_failed: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            help_title: "CraftBot Help Guide".to_string(),
            example_command: "'{trigger} -mc -long what is redstone?'".to_string(),
            queue_note: "Public responses queue (one at a time). Use -me for instant private replies!"
                .to_string(),
            fun_tip: "Always ask why!".to_string(),
            fallback_help:
                "CraftBot Help: Use {trigger} with your questions. Try -help for more info!"
                    .to_string(),
            generation_failed: "I had a problem thinking about that. Please try again."
                .to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Contexts
// ---------------------------------------------------------------------------

/// A topic flag such as `-mc` that prepends context to the prompt.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    /// Flag as typed in chat, including the leading dash.
    pub flag: String,
    /// Short name shown in the help output.
    pub label: String,
    /// Text prepended to the prompt when the flag is present.
    pub prefix: String,
}

fn default_contexts() -> Vec<ContextConfig> {
    vec![
        ContextConfig {
            flag: "-mc".to_string(),
            label: "Minecraft".to_string(),
            prefix: "About Java Minecraft in general: ".to_string(),
        },
        ContextConfig {
            flag: "-t2".to_string(),
            label: "Tekkit2".to_string(),
            prefix: "About the Tekkit2 modpack for Minecraft: ".to_string(),
        },
        ContextConfig {
            flag: "-cm".to_string(),
            label: "Cobblemon".to_string(),
            prefix: "About the Cobblemon modpack for Minecraft: ".to_string(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging section. `CRAFTBOT_LOG` overrides it when set.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

/// Log verbosity levels (kebab-case in TOML).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Informational messages (default).
    #[default]
    Info,
    /// Debug-level detail.
    Debug,
    /// Full trace output.
    Trace,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

/// One Minecraft server: where its log lives and how to reach its RCON port.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Name used in log output; must be unique.
    pub name: String,
    /// Path to the server's `latest.log`. A leading `~` is expanded.
    pub log_path: String,
    pub rcon_host: String,
    pub rcon_port: u16,
    pub rcon_password: String,
    /// Override for [`DEFAULT_CHAT_PATTERN`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_pattern: Option<String>,
    /// How often the log file is polled for changes.
    pub poll_interval: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            log_path: String::new(),
            rcon_host: "127.0.0.1".to_string(),
            rcon_port: 25575,
            rcon_password: String::new(),
            chat_pattern: None,
            poll_interval: "1s".to_string(),
        }
    }
}

impl ServerConfig {
    /// Chat pattern in effect for this server.
    pub fn chat_pattern(&self) -> &str {
        self.chat_pattern.as_deref().unwrap_or(DEFAULT_CHAT_PATTERN)
    }

    /// `host:port` of the RCON endpoint.
    pub fn rcon_address(&self) -> String {
        format!("{}:{}", self.rcon_host, self.rcon_port)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
