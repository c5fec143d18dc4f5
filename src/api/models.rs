use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::llm::ChatMessage;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub reply: String,
}

impl ChatRequest {
    /// Parses a raw request body. Anything other than an object whose
    /// `messages` is an array of `{role, content}` is a client error.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let invalid = || AppError::BadRequest("Invalid messages".to_string());

        let value: Value = serde_json::from_slice(body).map_err(|_| invalid())?;
        let Some(messages) = value.get("messages").filter(|m| m.is_array()) else {
            return Err(invalid());
        };
        let messages = Vec::<ChatMessage>::deserialize(messages).map_err(|_| invalid())?;

        Ok(ChatRequest { messages })
    }
}
