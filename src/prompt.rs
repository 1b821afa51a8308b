//! Parsing of chat prompts addressed to the bot.
//!
//! Flags are plain substrings matched case-insensitively anywhere in the
//! prompt, exactly as players type them: `@gem -mc -long what is redstone?`.

use regex::Regex;

use crate::config::schema::ContextConfig;
use crate::delivery::Pacing;

pub const LONG_FLAG: &str = "-long";
pub const PRIVATE_FLAG: &str = "-me";
pub const HELP_FLAG: &str = "-help";

const BRIEF_INSTRUCTION: &str = "Give a very brief, concise answer (1-2 sentences only) to: ";
const DETAILED_INSTRUCTION: &str = "Give a detailed explanation (4-8 sentences in one paragraph) for: ";
const WHY_PREFIX: &str = "Why not? ";

/// A prompt with its flags decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Question text with flags removed.
    pub text: String,
    pub long: bool,
    pub private: bool,
    pub help: bool,
    /// The prompt mentions "why".
    pub why: bool,
    /// Prefix of the first configured context whose flag is present.
    pub context_prefix: Option<String>,
}

impl Prompt {
    /// Full prompt sent to the text generator.
    pub fn generation_prompt(&self) -> String {
        let instruction = if self.long {
            DETAILED_INSTRUCTION
        } else {
            BRIEF_INSTRUCTION
        };
        format!(
            "{}{}{}",
            instruction,
            self.context_prefix.as_deref().unwrap_or(""),
            self.text
        )
    }

    pub fn pacing(&self) -> Pacing {
        if self.long {
            Pacing::Extended
        } else {
            Pacing::Regular
        }
    }
}

/// Recognizes the trigger and decodes flags.
#[derive(Debug, Clone)]
pub struct PromptParser {
    trigger: String,
    contexts: Vec<ContextConfig>,
    /// Removed in order: `-long`, every context flag, `-me`.
    removals: Vec<Regex>,
}

impl PromptParser {
    pub fn new(trigger: &str, contexts: &[ContextConfig]) -> Result<Self, regex::Error> {
        let flags = std::iter::once(LONG_FLAG)
            .chain(contexts.iter().map(|c| c.flag.as_str()))
            .chain(std::iter::once(PRIVATE_FLAG));
        let removals = flags
            .map(|flag| Regex::new(&format!("(?i){}", regex::escape(flag))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            trigger: trigger.to_lowercase(),
            contexts: contexts.to_vec(),
            removals,
        })
    }

    /// The prompt following the trigger, or `None` if `message` is not for us.
    pub fn strip_trigger<'a>(&self, message: &'a str) -> Option<&'a str> {
        let message = message.trim();
        let head = message.get(..self.trigger.len())?;
        if head.to_lowercase() != self.trigger {
            return None;
        }
        Some(message[self.trigger.len()..].trim())
    }

    /// Decode the flags of a prompt (the text after the trigger).
    pub fn parse(&self, raw: &str) -> Prompt {
        let lower = raw.to_lowercase();
        let has = |flag: &str| lower.contains(&flag.to_lowercase());

        let context_prefix = self
            .contexts
            .iter()
            .find(|context| has(&context.flag))
            .map(|context| context.prefix.clone());

        let mut text = raw.to_string();
        for removal in &self.removals {
            text = removal.replace_all(&text, "").into_owned();
        }

        Prompt {
            text: text.trim().to_string(),
            long: has(LONG_FLAG),
            private: has(PRIVATE_FLAG),
            help: has(HELP_FLAG),
            why: lower.contains("why"),
            context_prefix,
        }
    }
}

/// Make generated text safe for one chat line.
///
/// Newlines become spaces and double quotes become single quotes. Answers to
/// "why" questions get a cheeky prefix.
pub fn sanitize_response(text: &str, why: bool) -> String {
    let cleaned = text.replace('\n', " ").replace('"', "'");
    if why {
        format!("{}{}", WHY_PREFIX, cleaned)
    } else {
        cleaned
    }
}
