//! Contracts for the external AI services the assistant talks to. The core
//! only supplies inputs and acts on outputs; none of these are implemented
//! here. Calls are awaited sequentially and never retried automatically.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::recipe::session::RecipeInit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Conversational language model: ordered role-tagged history in, one
/// assistant reply out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Speech-to-text. May fail or return empty/gibberish text; the engine
/// tolerates that by re-prompting instead of crashing.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Text-to-speech. Playback and barge-in are the UI's problem.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Recipe ingestion (URL fetch + structured extraction, or an LLM fallback
/// parse). Produces the payload `SessionRegistry::init_recipe` consumes.
#[async_trait]
pub trait RecipeIngestor: Send + Sync {
    async fn ingest(&self, source: &str) -> Result<RecipeInit>;
}
