use std::{collections::HashMap, sync::Arc};

use log::{info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};

use crate::{
    collaborator::{ChatMessage, ChatModel, RecipeIngestor},
    error::{CoreError, CoreResult},
    recipe::{convert::UnitSystem, session::RecipeInit, SessionRegistry},
    steps::{
        classify::{Classifier, RuleClassifier},
        controller::{StepController, StepEvent},
    },
    voice::{interpret, Intent},
};

/// System prompt seeding every conversation with the chat collaborator.
pub const SYSTEM_PROMPT: &str = "You are a friendly cooking assistant named Sous Chef. \
Guide the user through recipes one step at a time, never dumping the whole recipe at once. \
Give precise measurements, keep replies short and conversational, and wait for the user to \
confirm before continuing. While something bakes, rests, or boils, use the downtime to move \
other parts of the recipe forward.";

const DEFAULT_REPROMPT: &str = "Sorry, I didn't catch that. Could you say it again?";

/// Where a reply came from; local replies never touched a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplySource {
    Local,
    Model,
    Reprompt,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineReply {
    pub text: String,
    pub source: ReplySource,
}

impl EngineReply {
    fn local(text: impl Into<String>) -> Self {
        Self { text: text.into(), source: ReplySource::Local }
    }

    fn model(text: impl Into<String>) -> Self {
        Self { text: text.into(), source: ReplySource::Model }
    }

    fn reprompt(text: impl Into<String>) -> Self {
        Self { text: text.into(), source: ReplySource::Reprompt }
    }
}

/// Ties the whole pipeline together: transcript in, interpreted intent,
/// session/step mutation or collaborator round-trip, reply text out.
///
/// Recognized intents short-circuit before any external call; only free-form
/// chat reaches the language model.
pub struct AssistantEngine {
    registry: SessionRegistry,
    controllers: Mutex<HashMap<String, StepController>>,
    histories: Mutex<HashMap<String, Vec<ChatMessage>>>,
    chat: Arc<dyn ChatModel>,
    ingestor: Arc<dyn RecipeIngestor>,
    classifier: Arc<dyn Classifier>,
    events: mpsc::UnboundedSender<StepEvent>,
    reprompt_message: String,
}

impl AssistantEngine {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        ingestor: Arc<dyn RecipeIngestor>,
        events: mpsc::UnboundedSender<StepEvent>,
    ) -> Self {
        Self::with_classifier(chat, ingestor, events, Arc::new(RuleClassifier))
    }

    /// Swap in a different step classifier (the rule set is heuristic and
    /// deliberately pluggable).
    pub fn with_classifier(
        chat: Arc<dyn ChatModel>,
        ingestor: Arc<dyn RecipeIngestor>,
        events: mpsc::UnboundedSender<StepEvent>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            controllers: Mutex::new(HashMap::new()),
            histories: Mutex::new(HashMap::new()),
            chat,
            ingestor,
            classifier,
            events,
            reprompt_message: DEFAULT_REPROMPT.to_string(),
        }
    }

    pub fn set_reprompt_message(&mut self, message: impl Into<String>) {
        self.reprompt_message = message.into();
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn create_session(&self) -> String {
        let id = self.registry.create_session();
        let controller = StepController::new(id.clone(), self.events.clone(), self.classifier.clone());
        self.controllers.lock().await.insert(id.clone(), controller);
        self.histories
            .lock()
            .await
            .insert(id.clone(), vec![ChatMessage::system(SYSTEM_PROMPT)]);
        info!("created session {id}");
        id
    }

    pub async fn remove_session(&self, session_id: &str) {
        if let Some(controller) = self.controllers.lock().await.remove(session_id) {
            controller.end_session().await;
        }
        self.histories.lock().await.remove(session_id);
        self.registry.remove_session(session_id);
    }

    pub async fn controller(&self, session_id: &str) -> CoreResult<StepController> {
        self.controllers
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("unknown session {session_id}")))
    }

    /// Role-tagged conversation so far, system prompt included.
    pub async fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.histories
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Fetch and load a recipe through the ingestion collaborator, then seed
    /// the step machine at step zero.
    pub async fn ingest_recipe(&self, session_id: &str, source: &str) -> CoreResult<EngineReply> {
        let init = self
            .ingestor
            .ingest(source)
            .await
            .map_err(CoreError::external)?;
        self.load_recipe(session_id, init).await
    }

    /// Load an already-parsed recipe payload into the session and step
    /// machine. Validation failures leave both untouched.
    pub async fn load_recipe(&self, session_id: &str, init: RecipeInit) -> CoreResult<EngineReply> {
        let controller = self.controller(session_id).await?;
        // Reject step-less payloads before the registry is touched, so a
        // failed load leaves the previous recipe fully intact.
        if init.steps.is_empty() {
            return Err(CoreError::validation("recipe has no steps"));
        }
        let title = init
            .title
            .clone()
            .unwrap_or_else(|| "your recipe".to_string());
        let step_count = init.steps.len();
        let steps = init.steps.clone();

        self.registry.init_recipe(session_id, init)?;
        let snapshot = controller.seed_recipe(&steps).await?;

        let mut text = format!("Loaded {title} — {step_count} steps. ");
        match snapshot.current_step {
            Some(step) => text.push_str(&step.text),
            None => text.push_str("Say \"next\" when you're ready."),
        }
        controller.note_assistant_message(&text).await;
        Ok(EngineReply::local(text))
    }

    /// One full turn: transcript in, reply out. Garbled transcripts get a
    /// re-prompt with no state change and no collaborator call.
    pub async fn handle_transcript(
        &self,
        session_id: &str,
        transcript: &str,
    ) -> CoreResult<EngineReply> {
        let text = transcript.trim();
        if is_gibberish(text) {
            warn!("filtered gibberish transcript for session {session_id}: {text:?}");
            return Ok(EngineReply::reprompt(self.reprompt_message.clone()));
        }

        let controller = self.controller(session_id).await?;
        let in_step_flow = controller.in_step_flow().await;

        match interpret(text, in_step_flow) {
            Intent::EndSession => {
                controller.end_session().await;
                Ok(EngineReply::local("Happy cooking! Come back any time."))
            }
            Intent::Repeat => {
                let last = controller.repeat().await;
                if last.is_empty() {
                    Ok(EngineReply::local("I haven't said anything yet."))
                } else {
                    Ok(EngineReply::local(last))
                }
            }
            Intent::Pause => {
                let snapshot = controller.pause().await?;
                let mins = snapshot.remaining_ms.unwrap_or(0) as f64 / 60_000.0;
                let text = format!("Paused — about {} left on the timer.", fmt_minutes(mins));
                controller.note_assistant_message(&text).await;
                Ok(EngineReply::local(text))
            }
            Intent::Resume => {
                let snapshot = controller.resume().await?;
                let mins = snapshot.remaining_ms.unwrap_or(0) as f64 / 60_000.0;
                let text = format!("Back on — {} to go.", fmt_minutes(mins));
                controller.note_assistant_message(&text).await;
                Ok(EngineReply::local(text))
            }
            Intent::Scale(factor) => {
                let applied = self.registry.apply_scale(session_id, factor)?;
                let text = format!("Done — recipe scaled to {applied}x.");
                controller.note_assistant_message(&text).await;
                Ok(EngineReply::local(text))
            }
            Intent::ConvertUnits(target) => {
                let system = self.registry.apply_unit_conversion(session_id, target)?;
                let text = match system {
                    UnitSystem::Metric => "Okay, amounts are in metric now.".to_string(),
                    UnitSystem::Imperial => {
                        "Back to imperial. Amounts I couldn't translate stay as they were.".to_string()
                    }
                };
                controller.note_assistant_message(&text).await;
                Ok(EngineReply::local(text))
            }
            Intent::QuantityQuery(name) => {
                let answer = self.registry.ingredient_query(session_id, &name)?;
                let text = format!("You need {}.", answer.text);
                controller.note_assistant_message(&text).await;
                Ok(EngineReply::local(text))
            }
            Intent::NextStep => {
                let snapshot = controller.advance().await?;
                match snapshot.current_step {
                    Some(step) => {
                        controller.note_assistant_message(&step.text).await;
                        Ok(EngineReply::local(step.text))
                    }
                    // Ran past the preloaded steps; ask the model for more.
                    None => self.chat_turn(session_id, "What's the next step?").await,
                }
            }
            Intent::Chat(message) => self.chat_turn(session_id, &message).await,
        }
    }

    /// One round-trip to the chat collaborator. History is only committed
    /// after a successful reply, so a failed call mutates nothing.
    async fn chat_turn(&self, session_id: &str, user_text: &str) -> CoreResult<EngineReply> {
        let mut outgoing = self.history(session_id).await;
        if outgoing.is_empty() {
            return Err(CoreError::not_found(format!("unknown session {session_id}")));
        }
        outgoing.push(ChatMessage::user(user_text));

        let reply = self
            .chat
            .complete(&outgoing)
            .await
            .map_err(CoreError::external)?;

        {
            let mut histories = self.histories.lock().await;
            if let Some(history) = histories.get_mut(session_id) {
                history.push(ChatMessage::user(user_text));
                history.push(ChatMessage::assistant(reply.clone()));
            }
        }

        let controller = self.controller(session_id).await?;
        controller.on_assistant_reply(&reply).await?;
        Ok(EngineReply::model(reply))
    }
}

fn fmt_minutes(mins: f64) -> String {
    if mins >= 1.0 {
        let rounded = (mins * 10.0).round() / 10.0;
        format!("{rounded} minutes")
    } else {
        format!("{} seconds", (mins * 60.0).round())
    }
}

/// Filter for transcripts that are almost certainly microphone noise: too
/// short, vowel-free, one repeated character, or dominated by non-Latin
/// scripts the assistant doesn't speak.
pub fn is_gibberish(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() < 3 {
        return true;
    }
    if trimmed.chars().any(is_non_latin_script) {
        return true;
    }
    if !trimmed
        .chars()
        .any(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'))
    {
        return true;
    }
    let compact: Vec<char> = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() > 1 && compact.iter().all(|&c| c == compact[0]) {
        return true;
    }
    false
}

fn is_non_latin_script(c: char) -> bool {
    matches!(c,
        '\u{0400}'..='\u{04FF}'   // Cyrillic
        | '\u{0590}'..='\u{05FF}' // Hebrew
        | '\u{0600}'..='\u{06FF}' // Arabic
        | '\u{1100}'..='\u{11FF}' // Hangul Jamo
        | '\u{3040}'..='\u{309F}' // Hiragana
        | '\u{30A0}'..='\u{30FF}' // Katakana
        | '\u{4E00}'..='\u{9FFF}' // CJK ideographs
    )
}
