use std::sync::Arc;

use log::info;
use serde::Serialize;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::{self, Duration, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, CoreResult};
use crate::recipe::session::RecipeStepInput;

use super::{
    classify::{Classifier, StepType},
    state::{RecipeStep, StepModeState, StepPhase, StepSnapshot},
};

pub const TIMER_DONE_PROMPT: &str = "Time's up! Ready for the next step?";

/// Events the controller pushes to whoever renders/speaks them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StepEvent {
    #[serde(rename_all = "camelCase")]
    StateChanged {
        session_id: String,
        snapshot: StepSnapshot,
    },
    #[serde(rename_all = "camelCase")]
    TimerFinished {
        session_id: String,
        step_index: usize,
        prompt: String,
    },
}

/// A scheduled countdown the controller owns. Cancelling the token kills the
/// sleep before it fires; `started`/`target_ms` give the remaining time on
/// pause from a single monotonic read.
struct CountdownHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
    started: Instant,
    target_ms: u64,
}

impl CountdownHandle {
    fn remaining_ms(&self) -> u64 {
        let elapsed = self.started.elapsed().as_millis() as u64;
        self.target_ms.saturating_sub(elapsed)
    }
}

/// Drives one session's step progression: classifies incoming assistant
/// steps, owns the single scheduled countdown, and reacts to voice commands.
///
/// Starting a new countdown or pausing always cancels the previously
/// scheduled task first, so a stale timer can never fire twice.
#[derive(Clone)]
pub struct StepController {
    session_id: String,
    state: Arc<Mutex<StepModeState>>,
    countdown: Arc<Mutex<Option<CountdownHandle>>>,
    events: mpsc::UnboundedSender<StepEvent>,
    classifier: Arc<dyn Classifier>,
}

impl StepController {
    pub fn new(
        session_id: String,
        events: mpsc::UnboundedSender<StepEvent>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            session_id,
            state: Arc::new(Mutex::new(StepModeState::new())),
            countdown: Arc::new(Mutex::new(None)),
            events,
            classifier,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn snapshot(&self) -> StepSnapshot {
        let mut snapshot = self.state.lock().await.snapshot();
        // Show the live countdown, not the value at the last transition.
        if snapshot.phase == StepPhase::Timing {
            if let Some(handle) = self.countdown.lock().await.as_ref() {
                snapshot.remaining_ms = Some(handle.remaining_ms());
            }
        }
        snapshot
    }

    /// Whether a next/done confirmation makes sense right now: blocked on a
    /// confirmation, or mid-countdown (early confirmation is allowed).
    pub async fn in_step_flow(&self) -> bool {
        let state = self.state.lock().await;
        state.waiting_for_confirm
            || matches!(state.phase, StepPhase::Timing | StepPhase::Paused)
    }

    /// Replace the machine with a freshly ingested recipe: classify every
    /// instruction, reset to step zero, and immediately enter it.
    pub async fn seed_recipe(&self, steps: &[RecipeStepInput]) -> CoreResult<StepSnapshot> {
        if steps.is_empty() {
            return Err(CoreError::validation("recipe has no steps"));
        }
        self.cancel_countdown().await;

        let classified: Vec<RecipeStep> = steps
            .iter()
            .map(|input| {
                let c = self.classifier.classify(&input.instruction);
                RecipeStep {
                    text: input.instruction.clone(),
                    step_type: c.step_type,
                    expected_duration_ms: c.expected_duration_ms,
                }
            })
            .collect();

        {
            let mut state = self.state.lock().await;
            state.seed(classified);
        }
        info!(
            "seeded {} steps for session {}",
            steps.len(),
            self.session_id
        );
        self.enter_current().await
    }

    /// A new assistant utterance arrived. Always remembered for "repeat";
    /// when a recipe is active it is classified and becomes the current step.
    pub async fn on_assistant_reply(&self, text: &str) -> CoreResult<StepSnapshot> {
        {
            let mut state = self.state.lock().await;
            state.last_assistant_message = text.to_string();
            if !state.is_recipe_mode() {
                return Ok(state.snapshot());
            }
        }

        let c = self.classifier.classify(text);
        let step = RecipeStep {
            text: text.to_string(),
            step_type: c.step_type,
            expected_duration_ms: c.expected_duration_ms,
        };
        self.cancel_countdown().await;
        {
            let mut state = self.state.lock().await;
            state.push_step(step);
        }
        self.enter_current().await
    }

    /// Record a locally synthesized assistant message (confirmations,
    /// prompts) without running it through step classification.
    pub async fn note_assistant_message(&self, text: &str) {
        self.state.lock().await.last_assistant_message = text.to_string();
    }

    /// Suspend a running countdown, preserving the remaining time.
    ///
    /// The whole transition happens under the state lock: the countdown task
    /// is cancelled and aborted before `Paused` is stored, so a sleep that
    /// elapsed in the same instant can never fire over the paused state.
    pub async fn pause(&self) -> CoreResult<StepSnapshot> {
        let (snapshot, remaining_ms) = {
            let mut state = self.state.lock().await;
            if state.phase != StepPhase::Timing {
                return Err(CoreError::validation("no running timer to pause"));
            }
            let handle = {
                let mut countdown = self.countdown.lock().await;
                countdown
                    .take()
                    .ok_or_else(|| CoreError::validation("no running timer to pause"))?
            };
            handle.token.cancel();
            handle.task.abort();
            let remaining_ms = handle.remaining_ms();
            state.pause(remaining_ms);
            (state.snapshot(), remaining_ms)
        };
        info!(
            "paused timer for session {} with {}ms remaining",
            self.session_id, remaining_ms
        );
        self.emit_state(snapshot.clone());
        Ok(snapshot)
    }

    /// Restart a paused countdown with the stored remaining time.
    pub async fn resume(&self) -> CoreResult<StepSnapshot> {
        let remaining_ms = {
            let mut state = self.state.lock().await;
            if state.phase != StepPhase::Paused {
                return Err(CoreError::validation("no paused timer to resume"));
            }
            state
                .resume()
                .ok_or_else(|| CoreError::validation("paused timer lost its remaining time"))?
        };
        self.start_countdown(remaining_ms).await;
        let snapshot = self.state.lock().await.snapshot();
        self.emit_state(snapshot.clone());
        Ok(snapshot)
    }

    /// User confirmed the current step (or confirmed early while a timer was
    /// still running): cancel any countdown and move on. If the next step is
    /// already known it is entered immediately; otherwise the machine waits
    /// for the next classified step.
    pub async fn advance(&self) -> CoreResult<StepSnapshot> {
        {
            let state = self.state.lock().await;
            if !state.is_recipe_mode() {
                return Err(CoreError::validation("no active recipe to advance"));
            }
        }
        self.cancel_countdown().await;
        {
            let mut state = self.state.lock().await;
            state.advance();
        }
        self.enter_current().await
    }

    /// Re-deliver the last assistant message. No state change.
    pub async fn repeat(&self) -> String {
        self.state.lock().await.last_assistant_message.clone()
    }

    /// Reset the whole machine to idle: steps, index, flags, timer.
    pub async fn end_session(&self) -> StepSnapshot {
        self.cancel_countdown().await;
        let snapshot = {
            let mut state = self.state.lock().await;
            state.reset();
            state.snapshot()
        };
        info!("step machine reset for session {}", self.session_id);
        self.emit_state(snapshot.clone());
        snapshot
    }

    /// Enter the step at the current index, picking the phase its
    /// classification warrants, or fall back to awaiting the next step.
    async fn enter_current(&self) -> CoreResult<StepSnapshot> {
        let (snapshot, start_ms) = {
            let mut state = self.state.lock().await;
            let start_ms = match state.current_step() {
                Some(step) => match (step.step_type, step.expected_duration_ms) {
                    (StepType::Action, _) => {
                        state.enter_action();
                        None
                    }
                    (StepType::Duration, Some(ms)) if ms > 0 => {
                        state.enter_timing(ms);
                        Some(ms)
                    }
                    _ => {
                        state.enter_awaiting();
                        None
                    }
                },
                None => {
                    state.enter_awaiting();
                    None
                }
            };
            (state.snapshot(), start_ms)
        };

        if let Some(ms) = start_ms {
            self.start_countdown(ms).await;
        }
        self.emit_state(snapshot.clone());
        Ok(snapshot)
    }

    /// Schedule the single countdown task, cancelling any predecessor so only
    /// one "timer finished" can ever fire.
    async fn start_countdown(&self, duration_ms: u64) {
        let mut countdown = self.countdown.lock().await;
        if let Some(old) = countdown.take() {
            old.token.cancel();
            old.task.abort();
        }

        let token = CancellationToken::new();
        let child = token.clone();
        let state = self.state.clone();
        let events = self.events.clone();
        let session_id = self.session_id.clone();
        // Anchor the deadline at schedule time, not the task's first poll,
        // so the countdown matches the handle's `started` instant.
        let started = Instant::now();
        let deadline = started + Duration::from_millis(duration_ms);

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline) => {
                    let fired = {
                        let mut guard = state.lock().await;
                        // A pause or advance may have won the race while the
                        // elapsed sleep waited on this lock; only a still-live
                        // countdown gets to fire.
                        if guard.phase == StepPhase::Timing {
                            guard.on_timer_finished();
                            Some((guard.snapshot(), guard.current_step_index))
                        } else {
                            None
                        }
                    };
                    if let Some((snapshot, step_index)) = fired {
                        info!("timer finished for session {session_id} step {step_index}");
                        let _ = events.send(StepEvent::TimerFinished {
                            session_id: session_id.clone(),
                            step_index,
                            prompt: TIMER_DONE_PROMPT.to_string(),
                        });
                        let _ = events.send(StepEvent::StateChanged {
                            session_id,
                            snapshot,
                        });
                    }
                }
                _ = child.cancelled() => {}
            }
        });

        *countdown = Some(CountdownHandle {
            token,
            task,
            started,
            target_ms: duration_ms,
        });
    }

    async fn cancel_countdown(&self) {
        if let Some(handle) = self.countdown.lock().await.take() {
            handle.token.cancel();
            handle.task.abort();
        }
    }

    fn emit_state(&self, snapshot: StepSnapshot) {
        let _ = self.events.send(StepEvent::StateChanged {
            session_id: self.session_id.clone(),
            snapshot,
        });
    }
}
