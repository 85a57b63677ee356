use serde::{Deserialize, Serialize};

use super::classify::StepType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum StepPhase {
    /// No recipe loaded.
    #[default]
    Idle,
    /// Recipe active, waiting for the next classified step.
    AwaitingStep,
    /// Current step is an action; blocked on explicit user confirmation.
    ActionPending,
    /// Current step is a duration; countdown running.
    Timing,
    /// Countdown suspended, remaining time preserved.
    Paused,
}

/// One classified instruction. Never mutated after creation; a recipe
/// re-seed replaces the whole sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStep {
    pub text: String,
    pub step_type: StepType,
    pub expected_duration_ms: Option<u64>,
}

/// Step-progression state. Pure data plus transitions; scheduling the actual
/// countdown task is the controller's job.
///
/// Invariants: `waiting_for_confirm` and a live countdown (`Timing`) are
/// mutually exclusive, and `current_step_index <= steps.len()` with equality
/// only while awaiting the next step.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepModeState {
    pub phase: StepPhase,
    pub current_step_index: usize,
    pub steps: Vec<RecipeStep>,
    pub waiting_for_confirm: bool,
    /// Milliseconds left on the countdown, captured when pausing. Stored
    /// explicitly rather than recomputed from wall-clock reads so repeated
    /// pause/resume cycles cannot drift.
    pub remaining_ms: Option<u64>,
    #[serde(skip)]
    pub last_assistant_message: String,
}

/// Serializable view the controller emits on every transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSnapshot {
    pub is_recipe_mode: bool,
    pub phase: StepPhase,
    pub current_step_index: usize,
    pub total_steps: usize,
    pub current_step: Option<RecipeStep>,
    pub waiting_for_confirm: bool,
    pub remaining_ms: Option<u64>,
}

impl StepModeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recipe_mode(&self) -> bool {
        self.phase != StepPhase::Idle
    }

    pub fn current_step(&self) -> Option<&RecipeStep> {
        self.steps.get(self.current_step_index)
    }

    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            is_recipe_mode: self.is_recipe_mode(),
            phase: self.phase,
            current_step_index: self.current_step_index,
            total_steps: self.steps.len(),
            current_step: self.current_step().cloned(),
            waiting_for_confirm: self.waiting_for_confirm,
            remaining_ms: self.remaining_ms,
        }
    }

    /// Replace the whole step sequence and point at step zero. The caller
    /// then enters step zero, which picks the real phase.
    pub fn seed(&mut self, steps: Vec<RecipeStep>) {
        let last = std::mem::take(&mut self.last_assistant_message);
        *self = Self {
            phase: StepPhase::AwaitingStep,
            steps,
            last_assistant_message: last,
            ..Self::default()
        };
    }

    /// Append a freshly classified step and make it current.
    pub fn push_step(&mut self, step: RecipeStep) {
        self.steps.push(step);
        self.current_step_index = self.steps.len() - 1;
    }

    pub fn enter_action(&mut self) {
        self.phase = StepPhase::ActionPending;
        self.waiting_for_confirm = true;
        self.remaining_ms = None;
        self.check_invariants();
    }

    pub fn enter_timing(&mut self, duration_ms: u64) {
        self.phase = StepPhase::Timing;
        self.waiting_for_confirm = false;
        self.remaining_ms = Some(duration_ms);
        self.check_invariants();
    }

    pub fn enter_awaiting(&mut self) {
        self.phase = StepPhase::AwaitingStep;
        self.waiting_for_confirm = false;
        self.remaining_ms = None;
        self.check_invariants();
    }

    /// The countdown elapsed naturally: no timer left, but block on the
    /// user's go-ahead like a pending action.
    pub fn on_timer_finished(&mut self) {
        self.phase = StepPhase::ActionPending;
        self.waiting_for_confirm = true;
        self.remaining_ms = None;
        self.check_invariants();
    }

    pub fn pause(&mut self, remaining_ms: u64) {
        self.phase = StepPhase::Paused;
        self.waiting_for_confirm = false;
        self.remaining_ms = Some(remaining_ms);
        self.check_invariants();
    }

    /// Leave `Paused`, handing back the stored remaining time for the
    /// controller to reschedule.
    pub fn resume(&mut self) -> Option<u64> {
        let remaining = self.remaining_ms.take();
        self.phase = StepPhase::Timing;
        self.remaining_ms = remaining;
        self.check_invariants();
        remaining
    }

    /// Confirmed/advanced past the current step. The index may now equal
    /// `steps.len()`, transiently, until the next step arrives.
    pub fn advance(&mut self) {
        self.current_step_index += 1;
        self.phase = StepPhase::AwaitingStep;
        self.waiting_for_confirm = false;
        self.remaining_ms = None;
        self.check_invariants();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn check_invariants(&self) {
        debug_assert!(
            !(self.waiting_for_confirm && self.phase == StepPhase::Timing),
            "waiting_for_confirm and a live countdown are mutually exclusive"
        );
        debug_assert!(self.current_step_index <= self.steps.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(step_type: StepType, ms: Option<u64>) -> RecipeStep {
        RecipeStep {
            text: "step".to_string(),
            step_type,
            expected_duration_ms: ms,
        }
    }

    #[test]
    fn seed_points_at_step_zero() {
        let mut state = StepModeState::new();
        state.seed(vec![step(StepType::Action, None), step(StepType::Info, None)]);
        assert_eq!(state.phase, StepPhase::AwaitingStep);
        assert_eq!(state.current_step_index, 0);
        assert_eq!(state.steps.len(), 2);
        assert!(!state.waiting_for_confirm);
    }

    #[test]
    fn action_and_timing_are_mutually_exclusive() {
        let mut state = StepModeState::new();
        state.seed(vec![step(StepType::Duration, Some(60_000))]);
        state.enter_timing(60_000);
        assert!(!state.waiting_for_confirm);
        assert_eq!(state.remaining_ms, Some(60_000));

        state.on_timer_finished();
        assert!(state.waiting_for_confirm);
        assert_eq!(state.remaining_ms, None);
        assert_eq!(state.phase, StepPhase::ActionPending);
    }

    #[test]
    fn pause_stores_remaining_and_resume_returns_it() {
        let mut state = StepModeState::new();
        state.seed(vec![step(StepType::Duration, Some(600_000))]);
        state.enter_timing(600_000);
        state.pause(360_000);
        assert_eq!(state.phase, StepPhase::Paused);
        assert_eq!(state.remaining_ms, Some(360_000));

        let remaining = state.resume();
        assert_eq!(remaining, Some(360_000));
        assert_eq!(state.phase, StepPhase::Timing);
    }

    #[test]
    fn advance_may_transiently_pass_the_end() {
        let mut state = StepModeState::new();
        state.seed(vec![step(StepType::Action, None)]);
        state.enter_action();
        state.advance();
        assert_eq!(state.current_step_index, 1);
        assert_eq!(state.current_step_index, state.steps.len());
        assert!(state.current_step().is_none());
        assert_eq!(state.phase, StepPhase::AwaitingStep);
    }

    #[test]
    fn push_step_makes_it_current() {
        let mut state = StepModeState::new();
        state.seed(vec![step(StepType::Action, None)]);
        state.enter_action();
        state.advance();
        state.push_step(step(StepType::Info, None));
        assert_eq!(state.current_step_index, 1);
        assert_eq!(state.current_step().unwrap().step_type, StepType::Info);
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = StepModeState::new();
        state.seed(vec![step(StepType::Duration, Some(1_000))]);
        state.enter_timing(1_000);
        state.reset();
        assert_eq!(state.phase, StepPhase::Idle);
        assert!(state.steps.is_empty());
        assert_eq!(state.remaining_ms, None);
        assert!(!state.is_recipe_mode());
    }
}
