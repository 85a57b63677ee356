//! Interactive terminal shell for the assistant core: type what you would
//! have said out loud. Ships with a canned chat model and a built-in recipe
//! so the whole pipeline runs without network credentials.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::mpsc,
};

use preptalk::{
    collaborator::{ChatMessage, ChatModel, RecipeIngestor},
    engine::AssistantEngine,
    recipe::session::RecipeInit,
    settings::SettingsStore,
    steps::controller::StepEvent,
};

/// Offline stand-in for the language-model collaborator.
struct CannedChat;

#[async_trait]
impl ChatModel for CannedChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let last = messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(format!(
            "(canned reply) I heard: \"{last}\". Hook up a real chat model for proper answers."
        ))
    }
}

/// Serves one built-in recipe regardless of the requested source.
struct BuiltinIngestor;

#[async_trait]
impl RecipeIngestor for BuiltinIngestor {
    async fn ingest(&self, _source: &str) -> Result<RecipeInit> {
        let payload = serde_json::json!({
            "title": "Buttermilk Pancakes",
            "ingredients": [
                "2 cups all-purpose flour",
                "2 tbsp sugar",
                "1 1/2 cups buttermilk",
                "2 tbsp melted butter",
                "1 tsp baking soda"
            ],
            "steps": [
                { "step": 1, "instruction": "Whisk the flour, sugar, and baking soda together.", "estimated_time_min": 2 },
                { "step": 2, "instruction": "Stir in the buttermilk and melted butter until just combined.", "estimated_time_min": 2 },
                { "step": 3, "instruction": "Let the batter rest for 10 minutes.", "estimated_time_min": 10 },
                { "step": 4, "instruction": "Pour a quarter cup of batter per pancake onto a hot griddle and cook until bubbles form.", "estimated_time_min": 3 }
            ]
        });
        Ok(serde_json::from_value(payload)?)
    }
}

fn settings_path() -> PathBuf {
    std::env::var_os("PREPTALK_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("preptalk-settings.json"))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("PrepTalk shell starting up...");

    let settings = SettingsStore::new(settings_path())?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<StepEvent>();

    let mut engine = AssistantEngine::new(Arc::new(CannedChat), Arc::new(BuiltinIngestor), event_tx);
    engine.set_reprompt_message(settings.reprompt_message());
    let engine = Arc::new(engine);

    let session_id = engine.create_session().await;

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                StepEvent::TimerFinished { prompt, .. } => {
                    println!("\n[timer] {prompt}");
                }
                StepEvent::StateChanged { snapshot, .. } => {
                    log::debug!("state changed: {snapshot:?}");
                }
            }
        }
    });

    println!("PrepTalk shell. Commands: :load (built-in recipe), :quit. Anything else is a transcript.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            ":quit" | ":q" => break,
            ":load" => match engine.ingest_recipe(&session_id, "builtin").await {
                Ok(reply) => println!("{}", reply.text),
                Err(err) => println!("error: {err}"),
            },
            "" => {}
            transcript => match engine.handle_transcript(&session_id, transcript).await {
                Ok(reply) => println!("{}", reply.text),
                Err(err) => println!("error: {err}"),
            },
        }
    }

    engine.remove_session(&session_id).await;
    println!("Happy cooking!");
    Ok(())
}
