//! Chat line recognition.

use regex::Regex;

/// A player's chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub player: String,
    pub message: String,
}

/// Extracts player and message from server log lines.
///
/// The pattern's first capture group is the player, the second the message.
#[derive(Debug, Clone)]
pub struct ChatParser {
    regex: Regex,
}

impl ChatParser {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(Regex::new(pattern)?))
    }

    pub fn from_regex(regex: Regex) -> Self {
        Self { regex }
    }

    pub fn parse(&self, line: &str) -> Option<ChatLine> {
        let captures = self.regex.captures(line)?;
        let player = captures.get(1)?.as_str();
        let message = captures.get(2)?.as_str().trim();
        Some(ChatLine {
            player: player.to_string(),
            message: message.to_string(),
        })
    }
}
