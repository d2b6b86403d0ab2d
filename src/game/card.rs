//! Core card types for the memory grid.

use serde::{Deserialize, Serialize};

/// Visibility state of a single card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
    /// Face down, value unknown.
    Hidden,
    /// Face up, awaiting or showing its revealed value.
    Flipped,
    /// Permanently face up as part of a matched pair.
    Matched,
}

/// A single card in the grid.
///
/// The value stays `None` until the match authority reveals it; the core
/// never learns unrevealed cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    state: CardState,
    value: Option<String>,
}

impl Card {
    /// Creates a face-down card with no known value.
    pub fn hidden() -> Self {
        Self {
            state: CardState::Hidden,
            value: None,
        }
    }

    /// Current visibility state.
    pub fn state(&self) -> CardState {
        self.state
    }

    /// Revealed value, if the authority has disclosed it.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub(crate) fn set_state(&mut self, state: CardState) {
        self.state = state;
    }

    pub(crate) fn reveal(&mut self, value: String) {
        self.value = Some(value);
    }

    /// Returns the card to face-down; the value is forgotten along with it.
    pub(crate) fn conceal(&mut self) {
        self.state = CardState::Hidden;
        self.value = None;
    }
}
