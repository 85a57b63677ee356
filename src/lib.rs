//! Core of a hands-free cooking assistant: ingredient parsing, unit
//! conversion, recipe sessions, step classification and progression, and
//! voice-command interpretation. The AI collaborators (chat, STT, TTS,
//! ingestion) are traits the embedding application implements.

pub mod collaborator;
pub mod engine;
pub mod error;
pub mod recipe;
pub mod settings;
pub mod steps;
pub mod utils;
pub mod voice;

pub use collaborator::{ChatMessage, ChatModel, RecipeIngestor, Role, SpeechToText, TextToSpeech};
pub use engine::{AssistantEngine, EngineReply, ReplySource};
pub use error::{CoreError, CoreResult};
pub use recipe::{
    IngredientAnswer, RecipeInit, RecipeStepInput, SessionRegistry, StructuredIngredient, Unit,
    UnitSystem,
};
pub use settings::{SettingsStore, VoicePrefs};
pub use steps::{Classifier, RuleClassifier, StepController, StepEvent, StepPhase, StepSnapshot};
pub use voice::{interpret, Intent};
