//! System prompt construction for the three handler configurations.

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;
use crate::llm::{ChatMessage, ChatRole};

/// Static biography used as the assistant's instructions.
pub const PERSONA: &str = "You are the assistant embedded in Nikshep Doggali's portfolio website. \
Nikshep is a developer who builds playful, fast-shipping web apps and AI experiments, including \
Kairos, CopiumAI, EntropyZero, InstaGen, RupeeRewind, Aellium and ValentineSpam. Answer questions \
about Nikshep, his skills and his projects. If you don't know something about him, say so instead \
of guessing. Be helpful, natural, and conversational.";

const LIVE_PREAMBLE: &str = "You have live, real-time knowledge of Nikshep Doggali's projects \
scraped directly from his apps right now. Use this to answer questions accurately. Here's what's \
currently on his sites:";

/// Which server-controlled system message, if any, precedes the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptMode {
    /// Plain proxy, caller messages are forwarded untouched.
    None,
    Persona,
    /// Persona plus the live site aggregate.
    #[default]
    Live,
}

impl PromptMode {
    pub fn needs_context(self) -> bool {
        matches!(self, PromptMode::Live)
    }
}

impl FromStr for PromptMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "plain" => Ok(PromptMode::None),
            "persona" => Ok(PromptMode::Persona),
            "live" => Ok(PromptMode::Live),
            other => Err(AppError::ConfigError(format!("Invalid PROMPT_MODE: {}", other))),
        }
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PromptMode::None => "none",
            PromptMode::Persona => "persona",
            PromptMode::Live => "live",
        };
        f.write_str(name)
    }
}

/// Builds the system message for `mode`. `context` is only read in live mode.
pub fn system_message(mode: PromptMode, context: Option<&str>) -> Option<ChatMessage> {
    match mode {
        PromptMode::None => None,
        PromptMode::Persona => Some(ChatMessage::system(PERSONA)),
        PromptMode::Live => {
            let context = context.unwrap_or_default();
            Some(ChatMessage::system(format!(
                "{LIVE_PREAMBLE}\n\n{context}\n\n{PERSONA}"
            )))
        }
    }
}

/// Prepends the server's system message to the caller's conversation.
///
/// When the server supplies one, caller-provided system messages are dropped
/// so the widget cannot override the instructions.
pub fn assemble(system: Option<ChatMessage>, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let Some(system) = system else {
        return messages;
    };

    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(system);
    out.extend(messages.into_iter().filter(|m| m.role != ChatRole::System));
    out
}
