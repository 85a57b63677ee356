//! End-to-end step progression with a real tokio runtime on a paused clock:
//! countdown scheduling, pause/resume with exact remaining time, early
//! confirmation, and natural timer expiry.

use std::sync::Arc;

use tokio::{
    sync::mpsc::{self, error::TryRecvError, UnboundedReceiver},
    task::yield_now,
    time::{advance, Duration},
};

use preptalk::{
    error::CoreError,
    recipe::session::RecipeStepInput,
    steps::{
        classify::RuleClassifier,
        controller::{StepController, StepEvent},
        state::StepPhase,
    },
};

fn controller() -> (StepController, UnboundedReceiver<StepEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = StepController::new("test-session".to_string(), tx, Arc::new(RuleClassifier));
    (controller, rx)
}

fn input(step: u32, instruction: &str) -> RecipeStepInput {
    RecipeStepInput {
        step,
        instruction: instruction.to_string(),
        estimated_time_min: None,
    }
}

/// Let the spawned countdown task run after the clock moved.
async fn settle() {
    for _ in 0..5 {
        yield_now().await;
    }
}

fn drain(rx: &mut UnboundedReceiver<StepEvent>) -> Vec<StepEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return events,
        }
    }
}

fn timer_finished(events: &[StepEvent]) -> bool {
    events
        .iter()
        .any(|e| matches!(e, StepEvent::TimerFinished { .. }))
}

#[tokio::test(start_paused = true)]
async fn duration_step_starts_a_countdown() {
    let (controller, mut rx) = controller();
    let snapshot = controller
        .seed_recipe(&[input(1, "Let the batter rest for 10 minutes.")])
        .await
        .unwrap();

    assert_eq!(snapshot.phase, StepPhase::Timing);
    assert_eq!(snapshot.remaining_ms, Some(600_000));
    assert!(!snapshot.waiting_for_confirm);
    assert!(!drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn pause_preserves_exact_remaining_time() {
    let (controller, mut rx) = controller();
    controller
        .seed_recipe(&[input(1, "Simmer the sauce for 10 minutes.")])
        .await
        .unwrap();

    advance(Duration::from_secs(240)).await;
    settle().await;

    let paused = controller.pause().await.unwrap();
    assert_eq!(paused.phase, StepPhase::Paused);
    assert_eq!(paused.remaining_ms, Some(360_000));

    let resumed = controller.resume().await.unwrap();
    assert_eq!(resumed.phase, StepPhase::Timing);
    assert_eq!(resumed.remaining_ms, Some(360_000));
    drain(&mut rx);

    // One millisecond short of the remaining time: still running.
    advance(Duration::from_millis(359_999)).await;
    settle().await;
    assert!(!timer_finished(&drain(&mut rx)));

    advance(Duration::from_millis(2)).await;
    settle().await;
    let events = drain(&mut rx);
    assert!(timer_finished(&events));

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, StepPhase::ActionPending);
    assert!(snapshot.waiting_for_confirm);
}

#[tokio::test(start_paused = true)]
async fn repeated_pause_resume_does_not_drift() {
    let (controller, _rx) = controller();
    controller
        .seed_recipe(&[input(1, "Bake for 30 minutes.")])
        .await
        .unwrap();

    let mut expected: u64 = 1_800_000;
    for _ in 0..3 {
        advance(Duration::from_secs(60)).await;
        settle().await;
        expected -= 60_000;
        let paused = controller.pause().await.unwrap();
        assert_eq!(paused.remaining_ms, Some(expected));
        controller.resume().await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn pause_at_the_expiry_boundary_never_double_fires() {
    let (controller, mut rx) = controller();
    controller
        .seed_recipe(&[input(1, "Steep the tea for 5 minutes.")])
        .await
        .unwrap();
    drain(&mut rx);

    // Move the clock exactly to expiry and pause before letting the
    // countdown task settle. Whichever side wins the state lock, the other
    // must stand down: a successful pause means the timer never fires.
    advance(Duration::from_millis(300_000)).await;
    match controller.pause().await {
        Ok(paused) => {
            assert_eq!(paused.phase, StepPhase::Paused);
            settle().await;
            assert!(!timer_finished(&drain(&mut rx)));
            let snapshot = controller.snapshot().await;
            assert_eq!(snapshot.phase, StepPhase::Paused);
            assert!(!snapshot.waiting_for_confirm);
        }
        Err(CoreError::Validation(_)) => {
            // The timer beat the pause; it fired exactly once.
            settle().await;
            let events = drain(&mut rx);
            assert_eq!(
                events
                    .iter()
                    .filter(|e| matches!(e, StepEvent::TimerFinished { .. }))
                    .count(),
                1
            );
            assert_eq!(controller.snapshot().await.phase, StepPhase::ActionPending);
        }
        Err(other) => panic!("unexpected pause failure: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn early_confirmation_cancels_the_countdown() {
    let (controller, mut rx) = controller();
    controller
        .seed_recipe(&[
            input(1, "Boil the pasta for 8 minutes."),
            input(2, "Stir the sauce into the drained pasta."),
        ])
        .await
        .unwrap();
    assert!(controller.in_step_flow().await);
    drain(&mut rx);

    advance(Duration::from_secs(60)).await;
    settle().await;

    // "next" mid-countdown: skip ahead, the old timer must never fire.
    let snapshot = controller.advance().await.unwrap();
    assert_eq!(snapshot.current_step_index, 1);
    assert_eq!(snapshot.phase, StepPhase::ActionPending);

    advance(Duration::from_secs(600)).await;
    settle().await;
    assert!(!timer_finished(&drain(&mut rx)));
}

#[tokio::test(start_paused = true)]
async fn natural_expiry_blocks_on_confirmation() {
    let (controller, mut rx) = controller();
    controller
        .seed_recipe(&[
            input(1, "Rest the dough for 5 minutes."),
            input(2, "Knead the dough until smooth."),
        ])
        .await
        .unwrap();
    drain(&mut rx);

    advance(Duration::from_secs(301)).await;
    settle().await;

    let events = drain(&mut rx);
    assert!(timer_finished(&events));
    if let Some(StepEvent::TimerFinished { step_index, prompt, .. }) = events
        .iter()
        .find(|e| matches!(e, StepEvent::TimerFinished { .. }))
    {
        assert_eq!(*step_index, 0);
        assert!(!prompt.is_empty());
    }

    // Expiry does not auto-advance; the user confirms first.
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.current_step_index, 0);
    assert!(snapshot.waiting_for_confirm);

    let next = controller.advance().await.unwrap();
    assert_eq!(next.current_step_index, 1);
    assert_eq!(next.phase, StepPhase::ActionPending);
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_outside_timing_are_rejected() {
    let (controller, _rx) = controller();
    controller
        .seed_recipe(&[input(1, "Chop the onions.")])
        .await
        .unwrap();

    assert!(matches!(
        controller.pause().await,
        Err(CoreError::Validation(_))
    ));
    assert!(matches!(
        controller.resume().await,
        Err(CoreError::Validation(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn advance_without_a_recipe_is_rejected() {
    let (controller, _rx) = controller();
    assert!(matches!(
        controller.advance().await,
        Err(CoreError::Validation(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn seed_rejects_empty_recipes() {
    let (controller, _rx) = controller();
    assert!(matches!(
        controller.seed_recipe(&[]).await,
        Err(CoreError::Validation(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn end_session_resets_and_cancels() {
    let (controller, mut rx) = controller();
    controller
        .seed_recipe(&[input(1, "Simmer for 20 minutes.")])
        .await
        .unwrap();
    drain(&mut rx);

    let snapshot = controller.end_session().await;
    assert_eq!(snapshot.phase, StepPhase::Idle);
    assert!(!snapshot.is_recipe_mode);

    advance(Duration::from_secs(1_300)).await;
    settle().await;
    assert!(!timer_finished(&drain(&mut rx)));
}
