//! Default configuration template and `config init` support.
//!
//! The template is commented TOML that parses to exactly `Config::default()`.
//! Server entries are left commented out because there is no sensible default
//! RCON password or log path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::error::ConfigError;
use crate::config::xdg;

/// Commented TOML template with every default value spelled out.
///
/// Every value here must match `Config::default()` from `schema.rs`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# craftbot configuration
#
# All values below are the built-in defaults. Add at least one [[servers]]
# entry (see the bottom of this file) before running `craftbot run`.
#
# Durations are human-readable: "500ms", "15s", "5m".
# The Gemini API key is read from the environment variable named in
# [gemini].api_key_env, or from a .env file in the working directory.

# ==============================================================================
# Bot
# ==============================================================================

[bot]

# Prefix that addresses the bot in chat (case-insensitive).
trigger = "@gem"

# Name shown in the [SERVER][name]: header.
name = "Gem"

# ==============================================================================
# Text generation
# ==============================================================================

[gemini]
model = "gemini-1.5-flash"
api_key_env = "GEMINI_API_KEY"
base_url = "https://generativelanguage.googleapis.com"
timeout = "30s"

# ==============================================================================
# Output shaping
# ==============================================================================

[chunking]

# The first segment carries the header, so it gets a smaller budget.
first_segment = 45
continuation_segment = 60

[delays]

# Pause between segments of a regular response.
regular_response = "1s"

# Pause between segments of a -long response.
long_response = "2s"

# Pause between two public responses while more are waiting.
queue = "500ms"

# Pause between lines of the -help output.
help_message = "1s"

[queue]

# Public responses that may wait before new ones are held back.
capacity = 64

# ==============================================================================
# RCON
# ==============================================================================

[reconnect]

# Backoff starts here, doubles after every failed attempt and resets after
# a successful connect.
initial_interval = "15s"
max_interval = "5m"

# Deadline for a single connect + login attempt.
connect_timeout = "10s"

# ==============================================================================
# Styling (Minecraft color names)
# ==============================================================================

[styling]
message_color = "white"

[styling.header]
bracket = "gold"
server_text = "gray"
bot_name = "aqua"
separator = "gray"

[styling.help]
title = "light_purple"
accent = "yellow"
usage = "green"
flags = "gold"
example = "aqua"
note = "gold"
tip = "gold"

# ==============================================================================
# Player-facing texts ({trigger} is replaced with [bot].trigger)
# ==============================================================================

[messages]
help_title = "CraftBot Help Guide"
example_command = "'{trigger} -mc -long what is redstone?'"
queue_note = "Public responses queue (one at a time). Use -me for instant private replies!"
fun_tip = "Always ask why!"
fallback_help = "CraftBot Help: Use {trigger} with your questions. Try -help for more info!"
generation_failed = "I had a problem thinking about that. Please try again."

# ==============================================================================
# Topic flags
# ==============================================================================

[[contexts]]
flag = "-mc"
label = "Minecraft"
prefix = "About Java Minecraft in general: "

[[contexts]]
flag = "-t2"
label = "Tekkit2"
prefix = "About the Tekkit2 modpack for Minecraft: "

[[contexts]]
flag = "-cm"
label = "Cobblemon"
prefix = "About the Cobblemon modpack for Minecraft: "

# ==============================================================================
# Logging
# ==============================================================================

[logging]

# Options: "error", "warn", "info", "debug", "trace".
# CRAFTBOT_LOG (an EnvFilter directive) takes precedence when set.
level = "info"

# ==============================================================================
# Servers
# ==============================================================================

# [[servers]]
# name = "survival"
# log_path = "/full/path/to/your/server/logs/latest.log"
# rcon_host = "127.0.0.1"
# rcon_port = 25575
# rcon_password = "your_survival_rcon_password"
# poll_interval = "1s"
# Optional; group 1 must capture the player, group 2 the message.
# chat_pattern = '\[[^\]]+\] \[Server thread/INFO\](?:\s\[[^\]]+\])?: <(.+?)> (.*)'
"#;

/// Writes the default template to the XDG config path.
///
/// - If the file exists and `force` is `false`, returns `ConfigError::AlreadyExists`.
/// - If the file exists and `force` is `true`, moves it to `config.toml.backup` first.
///
/// Returns the path that was written.
pub fn create_default_config(force: bool) -> Result<PathBuf, ConfigError> {
    let path = xdg::config_path();

    if path.exists() {
        if !force {
            return Err(ConfigError::AlreadyExists { path });
        }
        let backup_path = path.with_extension("toml.backup");
        fs::rename(&path, &backup_path).map_err(|e| ConfigError::WriteError {
            path: backup_path.clone(),
            source: e,
        })?;
        tracing::info!("Backed up existing config to {}", backup_path.display());
    }

    write_default_config(&path)?;
    Ok(path)
}

/// Writes the template with 0600 permissions; the file holds RCON passwords.
fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_error = |e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        xdg::ensure_dir(parent).map_err(write_error)?;
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(write_error)?;
    }

    Ok(())
}
