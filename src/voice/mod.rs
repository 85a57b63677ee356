//! Maps transcribed user utterances to control intents. Every intent except
//! free-form chat is handled locally, before any call to the language-model
//! collaborator reaches the network.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::recipe::convert::UnitSystem;

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Wrap up and reset the step machine ("thanks chef", "end session").
    EndSession,
    /// Say the last assistant message again.
    Repeat,
    /// Suspend the running countdown.
    Pause,
    /// Restart a paused countdown.
    Resume,
    /// Multiply the recipe by this factor.
    Scale(f64),
    /// Switch the session's unit system.
    ConvertUnits(UnitSystem),
    /// "How much flour do I need?" — the captured ingredient name.
    QuantityQuery(String),
    /// Confirm the current step and move on.
    NextStep,
    /// Nothing matched: pass through to the language model unmodified.
    Chat(String),
}

static END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(thanks,?\s+chef|thank\s+you,?\s+chef|end\s+(the\s+)?session|stop\s+cooking|wrap\s+it\s+up|goodbye)\b")
        .unwrap()
});

static REPEAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(repeat(\s+that)?|say\s+(that|it)\s+again|say\s+again|one\s+more\s+time|come\s+again)\b")
        .unwrap()
});

static PAUSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(pause|hold\s+on|hang\s+on)\b").unwrap());

static RESUME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(resume|unpause|restart\s+the\s+timer|start\s+the\s+timer\s+again)\b")
        .unwrap()
});

static DOUBLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bdouble\b").unwrap());
static TRIPLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btriple\b").unwrap());
static HALVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(halve|cut\s+(it|that|the\s+recipe)\s+in\s+half|half\s+(it|that|the\s+recipe))\b")
        .unwrap()
});
static SCALE_TO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bscale\s+(?:it\s+|this\s+|the\s+recipe\s+)?to\s+(\d+(?:\.\d+)?)\b").unwrap()
});
static TIMES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*x\b").unwrap());

static CONVERT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:convert|switch|change)\b.*?\b(?:to|into)\s+(metric|grams?|ml|milliliters?|imperial|cups?|ounces?)\b",
    )
    .unwrap()
});

static QUANTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:how\s+much|how\s+many|what\s+amount\s+of|quantity\s+of)\s+(?:of\s+)?(.+?)\s*$")
        .unwrap()
});
static QUANTITY_TRAILER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\b(do\s+(i|we)\s+(need|use)|is\s+needed|needed|goes?\s+in(to)?\s+(it|this))\b.*$")
        .unwrap()
});

static NEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(next(\s+step)?|continue|go\s+on|keep\s+going|done|finished|i'?m\s+ready|what'?s\s+next|ready)\b")
        .unwrap()
});

/// Classify one utterance. Pattern classes are checked in fixed priority
/// order and the first match wins; next/done phrases are only recognized
/// when the step machine is actually waiting on the user (`in_step_flow`).
pub fn interpret(utterance: &str, in_step_flow: bool) -> Intent {
    let text = utterance.trim();

    if END_RE.is_match(text) {
        return Intent::EndSession;
    }
    if REPEAT_RE.is_match(text) {
        return Intent::Repeat;
    }
    if PAUSE_RE.is_match(text) {
        return Intent::Pause;
    }
    if RESUME_RE.is_match(text) {
        return Intent::Resume;
    }
    if let Some(factor) = scale_factor(text) {
        return Intent::Scale(factor);
    }
    if let Some(caps) = CONVERT_RE.captures(text) {
        return Intent::ConvertUnits(target_system(&caps[1]));
    }
    if let Some(name) = quantity_query(text) {
        return Intent::QuantityQuery(name);
    }
    if in_step_flow && NEXT_RE.is_match(text) {
        return Intent::NextStep;
    }
    Intent::Chat(text.to_string())
}

fn scale_factor(text: &str) -> Option<f64> {
    if DOUBLE_RE.is_match(text) {
        return Some(2.0);
    }
    if TRIPLE_RE.is_match(text) {
        return Some(3.0);
    }
    if HALVE_RE.is_match(text) {
        return Some(0.5);
    }
    if let Some(caps) = SCALE_TO_RE.captures(text) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = TIMES_RE.captures(text) {
        return caps[1].parse().ok();
    }
    None
}

fn target_system(token: &str) -> UnitSystem {
    let token = token.to_lowercase();
    if token == "metric" || token.starts_with("gram") || token.starts_with("ml") || token.starts_with("milliliter") {
        UnitSystem::Metric
    } else {
        UnitSystem::Imperial
    }
}

fn quantity_query(text: &str) -> Option<String> {
    let caps = QUANTITY_RE.captures(text)?;
    let raw = caps[1].trim_end_matches(['?', '.', '!']).trim();
    let cleaned = QUANTITY_TRAILER_RE.replace(raw, "");
    let name = cleaned.trim().trim_end_matches(['?', '.', '!']).trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}
