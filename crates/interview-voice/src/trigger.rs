//! Keyword heuristic that spots the assistant announcing a coding exercise.

use std::collections::VecDeque;

/// Phrases that mark the hand-off to the code editor. Matched case-insensitively.
pub const TRIGGER_PHRASES: [&str; 3] = ["coding question", "coding problem", "coding challenge"];

/// Previous assistant utterances scanned together with the current one.
pub const LOOKBACK: usize = 5;

/// Sliding window over final assistant utterances.
///
/// The phrase may be split across consecutive utterances, so each check joins the current
/// utterance with the previous [`LOOKBACK`] ones before matching.
#[derive(Debug, Clone, Default)]
pub struct TriggerDetector {
    history: VecDeque<String>,
}

impl TriggerDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one final assistant utterance. Returns `true` when the window contains a phrase.
    pub fn observe(&mut self, utterance: &str) -> bool {
        let current = utterance.to_lowercase();
        let window = self
            .history
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(current.as_str()))
            .collect::<Vec<_>>()
            .join(" ");
        let hit = TRIGGER_PHRASES.iter().any(|phrase| window.contains(phrase));

        self.history.push_back(current);
        while self.history.len() > LOOKBACK {
            self.history.pop_front();
        }
        hit
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}
