//! Encouragement and hint selection
//!
//! Selecting a feedback line carries no correctness obligation beyond returning
//! one of the configured candidates, so the strategy is pluggable.

use rand::Rng;

/// Strategy for choosing one string out of a candidate list
pub trait EncouragementPicker: Send {
    /// Return the index of the chosen candidate, or `None` for an empty list
    fn pick_index(&mut self, candidates: &[String]) -> Option<usize>;

    /// Return the chosen candidate
    fn pick<'a>(&mut self, candidates: &'a [String]) -> Option<&'a str> {
        self.pick_index(candidates)
            .and_then(|i| candidates.get(i))
            .map(String::as_str)
    }
}

/// Uniformly random selection
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPicker;

impl EncouragementPicker for RandomPicker {
    fn pick_index(&mut self, candidates: &[String]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        Some(rand::rng().random_range(0..candidates.len()))
    }
}

/// Always the first candidate; useful where output must be reproducible
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstPicker;

impl EncouragementPicker for FirstPicker {
    fn pick_index(&mut self, candidates: &[String]) -> Option<usize> {
        if candidates.is_empty() {
            None
        } else {
            Some(0)
        }
    }
}
