//! Human-mimicking typing plan generation
//!
//! Uniform per-character intervals are a well-known automation signature.
//! Instead of sleeping inline, the metadata step first generates a complete
//! [`KeyAction`] plan from an RNG (randomized per-character delays, an
//! occasional wrong-character-then-correction, longer pauses between words)
//! and then executes it. Keeping generation pure makes the distribution
//! testable with a seeded RNG.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing distribution for humanized typing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingProfile {
    /// Per-character delay range in milliseconds
    pub char_delay_ms: (u64, u64),

    /// Probability of injecting a wrong character before a non-final character
    pub typo_probability: f64,

    /// Probability of a longer pause after a word boundary
    pub word_pause_probability: f64,

    /// Longer inter-word pause range in milliseconds
    pub word_pause_ms: (u64, u64),

    /// Delay between a typo and its correction, in milliseconds
    pub correction_delay_ms: (u64, u64),
}

impl Default for TypingProfile {
    fn default() -> Self {
        Self {
            char_delay_ms: (60, 180),
            typo_probability: 0.05,
            word_pause_probability: 0.15,
            word_pause_ms: (350, 900),
            correction_delay_ms: (120, 300),
        }
    }
}

impl TypingProfile {
    /// Profile with all delays zeroed, for tests and dry runs
    pub fn instant() -> Self {
        Self {
            char_delay_ms: (0, 1),
            typo_probability: 0.05,
            word_pause_probability: 0.15,
            word_pause_ms: (0, 1),
            correction_delay_ms: (0, 1),
        }
    }

    fn sample(&self, range: (u64, u64), rng: &mut impl Rng) -> Duration {
        let (lo, hi) = range;
        let ms = if hi > lo { rng.gen_range(lo..hi) } else { lo };
        Duration::from_millis(ms)
    }
}

/// One step of a typing plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Type a single character
    Type(char),
    /// Press backspace once
    Backspace,
    /// Wait before the next action
    Pause(Duration),
}

/// Generate a full humanized typing plan for `text`
pub fn plan_typing(text: &str, profile: &TypingProfile, rng: &mut impl Rng) -> Vec<KeyAction> {
    let chars: Vec<char> = text.chars().collect();
    let mut plan = Vec::with_capacity(chars.len() * 2);

    for (i, &c) in chars.iter().enumerate() {
        plan.push(KeyAction::Pause(profile.sample(profile.char_delay_ms, rng)));

        let is_final = i + 1 == chars.len();
        if !is_final && rng.gen_bool(profile.typo_probability) {
            // Inject a wrong character, hesitate, then correct it
            plan.push(KeyAction::Type(wrong_char_for(c, rng)));
            plan.push(KeyAction::Pause(
                profile.sample(profile.correction_delay_ms, rng),
            ));
            plan.push(KeyAction::Backspace);
            plan.push(KeyAction::Pause(
                profile.sample(profile.correction_delay_ms, rng),
            ));
        }

        plan.push(KeyAction::Type(c));

        if c.is_whitespace() && rng.gen_bool(profile.word_pause_probability) {
            plan.push(KeyAction::Pause(profile.sample(profile.word_pause_ms, rng)));
        }
    }

    plan
}

/// Pick a plausible stray keystroke distinct from the intended character
fn wrong_char_for(intended: char, rng: &mut impl Rng) -> char {
    loop {
        let candidate = (b'a' + rng.gen_range(0..26)) as char;
        if candidate != intended {
            return candidate;
        }
    }
}

/// Total typed text a plan would leave in the field
///
/// Replays Type/Backspace actions against an editor buffer; used by tests to
/// verify corrections always restore the intended text.
pub fn replay_plan(plan: &[KeyAction]) -> String {
    let mut buffer = String::new();
    for action in plan {
        match action {
            KeyAction::Type(c) => buffer.push(*c),
            KeyAction::Backspace => {
                buffer.pop();
            }
            KeyAction::Pause(_) => {}
        }
    }
    buffer
}
