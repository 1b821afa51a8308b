//! `craftbot check`: configuration diagnostics.

use std::fmt;

use crate::chat::ChatParser;
use crate::config::schema::{Config, ServerConfig};
use crate::config::xdg;
use crate::generator::{resolve_api_key, GenerationError, TextGenerator};

pub const SAMPLE_VANILLA_LINE: &str = "[12:34:56] [Server thread/INFO]: <TestPlayer> hello world";
pub const SAMPLE_MODDED_LINE: &str =
    "[12:34:56] [Server thread/INFO] [SomeModName]: <TestPlayer> hello world";

/// Passwords from the sample configuration.
pub const PLACEHOLDER_PASSWORDS: &[&str] =
    &["your_survival_rcon_password", "your_creative_rcon_password"];
/// Appears in the sample configuration's log paths.
pub const PLACEHOLDER_PATH_MARKER: &str = "/full/path/to/your";

const PING_PROMPT: &str = "Say 'Hello from CraftBot test!'";
const PING_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Warn,
    Fail,
    Skipped,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Outcome::Pass => "ok",
            Outcome::Warn => "warn",
            Outcome::Fail => "FAIL",
            Outcome::Skipped => "skip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub outcome: Outcome,
    pub message: String,
}

impl Finding {
    fn new(outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            outcome,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub findings: Vec<Finding>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            findings: Vec::new(),
        }
    }

    fn push(&mut self, outcome: Outcome, message: impl Into<String>) {
        self.findings.push(Finding::new(outcome, message));
    }
}

/// Everything `craftbot check` found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub sections: Vec<Section>,
}

impl Report {
    /// No finding failed. Warnings do not count.
    pub fn passed(&self) -> bool {
        self.sections
            .iter()
            .flat_map(|s| &s.findings)
            .all(|f| f.outcome != Outcome::Fail)
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "{}", section.title)?;
            for finding in &section.findings {
                writeln!(f, "  [{:<4}] {}", finding.outcome.label(), finding.message)?;
            }
        }
        Ok(())
    }
}

/// Check every part of `config` that can be verified without network access.
pub fn check_config(config: &Config) -> Report {
    let mut report = Report::default();
    report.push(check_api_key(&config.gemini.api_key_env));

    let mut validation = Section::new("Configuration");
    match config.validate() {
        Ok(()) => validation.push(
            Outcome::Pass,
            format!("{} server(s) configured", config.servers.len()),
        ),
        Err(e) => validation.push(Outcome::Fail, e.to_string()),
    }
    report.push(validation);

    for server in &config.servers {
        report.push(check_server(server));
    }
    report
}

pub fn check_api_key(var: &str) -> Section {
    let mut section = Section::new("API key");
    match resolve_api_key(var) {
        Ok(_) => section.push(Outcome::Pass, format!("{var} is configured")),
        Err(e) => section.push(Outcome::Fail, e.to_string()),
    }
    section
}

pub fn check_server(server: &ServerConfig) -> Section {
    let mut section = Section::new(format!("Server {}", server.name));

    let log_path = xdg::expand_tilde(&server.log_path);
    if server.log_path.contains(PLACEHOLDER_PATH_MARKER) {
        section.push(Outcome::Fail, "log_path is still the sample placeholder");
    } else if log_path.is_file() {
        section.push(Outcome::Pass, format!("log file exists: {}", log_path.display()));
    } else {
        section.push(Outcome::Fail, format!("log file not found: {}", log_path.display()));
    }

    match server.compile_chat_pattern() {
        Ok(regex) => {
            section.push(Outcome::Pass, "chat pattern is valid");
            let parser = ChatParser::from_regex(regex);
            let matches_samples = parser.parse(SAMPLE_VANILLA_LINE).is_some()
                || parser.parse(SAMPLE_MODDED_LINE).is_some();
            if matches_samples {
                section.push(Outcome::Pass, "chat pattern matches standard log lines");
            } else {
                section.push(
                    Outcome::Warn,
                    "chat pattern does not match standard vanilla or modded log lines",
                );
            }
        }
        Err(e) => section.push(Outcome::Fail, e.to_string()),
    }

    if PLACEHOLDER_PASSWORDS.contains(&server.rcon_password.as_str()) {
        section.push(Outcome::Fail, "rcon_password is still the sample placeholder");
    } else if server.rcon_password.is_empty() {
        section.push(Outcome::Warn, "rcon_password is empty");
    }

    section
}

/// One live generation call.
pub async fn ping(generator: &dyn TextGenerator) -> Section {
    let mut section = Section::new("Text generation");
    match generator.generate(PING_PROMPT).await {
        Ok(reply) => {
            let preview: String = reply.chars().take(PING_PREVIEW_CHARS).collect();
            section.push(Outcome::Pass, format!("API reachable, replied: {preview}"));
        }
        Err(e @ GenerationError::Status { status: 400 | 401 | 403, .. }) => {
            section.push(
                Outcome::Fail,
                format!("{e}; check that the API key is valid and has access to the model"),
            );
        }
        Err(e) => section.push(Outcome::Fail, e.to_string()),
    }
    section
}

/// Placeholder section used when `--ping` is given but no key is configured.
pub fn ping_skipped(reason: &str) -> Section {
    let mut section = Section::new("Text generation");
    section.push(Outcome::Skipped, reason);
    section
}
