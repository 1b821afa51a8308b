//! Chat payloads: styled `tellraw` JSON and plain `say`/`msg` fallbacks.

use serde_json::{json, Value};

use crate::config::schema::{Config, ContextConfig, HeaderColors, HelpColors};
use crate::delivery::Destination;

/// Turns segment text into RCON commands.
pub trait Renderer: Send + Sync {
    /// Styled command for `text`.
    fn render(&self, text: &str, show_header: bool, destination: &Destination) -> String;

    /// Plain-text command used when the styled one is rejected.
    fn fallback(&self, text: &str, show_header: bool, destination: &Destination) -> String;
}

/// Colors used for context flags in the help output, after the first.
const CONTEXT_FLAG_COLORS: &[&str] = &["blue", "light_purple", "dark_green", "red"];

fn part(text: &str, color: &str) -> Value {
    json!({ "text": text, "color": color })
}

fn bold(text: &str, color: &str) -> Value {
    json!({ "text": text, "color": color, "bold": true })
}

/// `[SERVER][name]: ` as tellraw components.
fn header_parts(colors: &HeaderColors, bot_name: &str) -> Vec<Value> {
    vec![
        part("[", &colors.bracket),
        part("SERVER", &colors.server_text),
        part("]", &colors.bracket),
        part("[", &colors.separator),
        part(bot_name, &colors.bot_name),
        part("]:", &colors.separator),
        part(" ", &colors.separator),
    ]
}

/// The leading empty string makes following components not inherit styles.
fn tellraw(selector: &str, parts: Vec<Value>) -> String {
    let mut payload = vec![Value::String(String::new())];
    payload.extend(parts);
    format!("tellraw {} {}", selector, Value::Array(payload))
}

/// Renders segments as `tellraw` with the configured colors.
#[derive(Debug, Clone)]
pub struct TellrawRenderer {
    bot_name: String,
    message_color: String,
    header: HeaderColors,
}

impl TellrawRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            bot_name: config.bot.name.clone(),
            message_color: config.styling.message_color.clone(),
            header: config.styling.header.clone(),
        }
    }
}

impl Renderer for TellrawRenderer {
    fn render(&self, text: &str, show_header: bool, destination: &Destination) -> String {
        let mut parts = if show_header {
            header_parts(&self.header, &self.bot_name)
        } else {
            Vec::new()
        };
        parts.push(part(text, &self.message_color));
        tellraw(destination.selector(), parts)
    }

    fn fallback(&self, text: &str, show_header: bool, destination: &Destination) -> String {
        let prefix = if show_header {
            format!("[SERVER][{}] ", self.bot_name)
        } else {
            String::new()
        };
        match destination {
            Destination::Broadcast => format!("say {}{}", prefix, text),
            Destination::Player(name) => format!("msg {} {}{}", name, prefix, text),
        }
    }
}

/// Split `text` around `word`, highlighting every occurrence.
fn highlight(text: &str, word: &str, base: &str, accent: &str) -> Vec<Value> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(at) = rest.find(word) {
        if at > 0 {
            parts.push(part(&rest[..at], base));
        }
        parts.push(part(word, accent));
        rest = &rest[at + word.len()..];
    }
    if !rest.is_empty() {
        parts.push(part(rest, base));
    }
    parts
}

fn context_flag(index: usize, context: &ContextConfig, colors: &HelpColors) -> Vec<Value> {
    let color = match index {
        0 => colors.usage.as_str(),
        n => CONTEXT_FLAG_COLORS[(n - 1) % CONTEXT_FLAG_COLORS.len()],
    };
    vec![
        part(&context.flag, color),
        part(&format!(" ({}) ", context.label), "gray"),
    ]
}

/// The styled `-help` guide, one `tellraw @a` command per chat line.
pub fn help_lines(config: &Config) -> Vec<String> {
    let colors = &config.styling.help;
    let messages = &config.messages;
    let trigger = config.bot.trigger.as_str();
    let indent = part("       ", "white");

    let mut title = header_parts(&config.styling.header, &config.bot.name);
    title.extend([
        part("* ", &colors.accent),
        bold(&messages.help_title, &colors.title),
        part(" *", &colors.accent),
    ]);

    let usage = vec![
        part("+ ", &colors.example),
        bold("Usage: ", "white"),
        part(trigger, &colors.usage),
        part(" [flags] ", &colors.accent),
        part("<your question>", "white"),
    ];

    let mut contexts = config.contexts.iter().enumerate();
    let mut flags = vec![
        part("- ", "red"),
        bold("Flags: ", "white"),
        part("-long", &colors.flags),
        part(" (detailed) ", "gray"),
    ];
    if let Some((i, context)) = contexts.next() {
        flags.extend(context_flag(i, context, colors));
    }

    let mut more_flags = vec![indent.clone()];
    for (i, context) in contexts {
        more_flags.extend(context_flag(i, context, colors));
    }
    more_flags.extend([part("-me", &colors.usage), part(" (private)", "gray")]);

    let help_flag = vec![
        indent,
        part("-help", &colors.accent),
        part(" (this guide)", "gray"),
    ];

    let example = vec![
        part("? ", &colors.accent),
        bold("Example: ", "white"),
        json!({
            "text": messages.example_command.replace("{trigger}", trigger),
            "color": colors.example,
            "italic": true,
        }),
    ];

    let mut note = vec![part("@ ", &colors.note), bold("Note: ", "white")];
    note.extend(highlight(&messages.queue_note, "-me", "gray", &colors.usage));

    let mut tip = vec![part("!! ", &colors.tip), bold("Fun Tip: ", "white")];
    tip.extend(highlight(&messages.fun_tip, "why", "gray", &colors.accent));

    [title, usage, flags, more_flags, help_flag, example, note, tip]
        .into_iter()
        .map(|parts| tellraw("@a", parts))
        .collect()
}

/// Single-line help used when the styled guide cannot be sent.
pub fn fallback_help(config: &Config) -> String {
    config
        .messages
        .fallback_help
        .replace("{trigger}", &config.bot.trigger)
}
