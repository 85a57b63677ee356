use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepType {
    /// Immediate instruction: block until the user confirms it's done.
    Action,
    /// Passive wait ("rest for 10 minutes"): run a countdown.
    Duration,
    /// Purely informational, nothing to wait for.
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepClassification {
    pub step_type: StepType,
    pub expected_duration_ms: Option<u64>,
}

/// Labels a natural-language instruction so the step machine knows whether
/// to wait for confirmation, run a timer, or just keep going. Heuristic by
/// nature, so it is swappable: the controller only sees this trait.
pub trait Classifier: Send + Sync {
    fn classify(&self, instruction: &str) -> StepClassification;
}

// First "<integer> <time unit>" mention wins; later mentions in the same
// sentence are ignored.
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*(hours?|hrs?|minutes?|mins?|seconds?|secs?)\b").unwrap());

// Imperative cooking verbs, as a leading word or anywhere as a separate word.
static ACTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(add|mix|stir|whisk|knead|chop|dice|slice|preheat|simmer|boil|bake|fold|pour|season|salt|pepper)\b",
    )
    .unwrap()
});

/// Regex-rule classifier: duration mention first, then imperative verb,
/// otherwise informational.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleClassifier;

impl Classifier for RuleClassifier {
    fn classify(&self, instruction: &str) -> StepClassification {
        if let Some(caps) = DURATION_RE.captures(instruction) {
            let amount: u64 = caps[1].parse().unwrap_or(0);
            let per_unit_ms = match caps[2].to_lowercase().as_str() {
                s if s.starts_with("hour") || s.starts_with("hr") => 3_600_000,
                s if s.starts_with("min") => 60_000,
                _ => 1_000,
            };
            return StepClassification {
                step_type: StepType::Duration,
                expected_duration_ms: Some(amount * per_unit_ms),
            };
        }

        if ACTION_RE.is_match(instruction) {
            return StepClassification {
                step_type: StepType::Action,
                expected_duration_ms: None,
            };
        }

        StepClassification {
            step_type: StepType::Info,
            expected_duration_ms: None,
        }
    }
}
