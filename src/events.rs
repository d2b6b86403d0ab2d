//! Presentation-layer signals emitted by the session controller.

use crate::game::CardState;
use std::time::Duration;

/// Messages sent from the session controller to a presentation adapter.
///
/// Ticks are informational only; nothing in the game logic keys off them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// A session started (or restarted) with the given deck.
    SessionStarted {
        /// Number of cards dealt.
        deck_size: usize,
        /// Environment the deck was drawn from.
        environment: String,
    },
    /// A card changed visibility state.
    CardChanged {
        /// Card index.
        index: usize,
        /// New state.
        state: CardState,
        /// Revealed value, when the authority has disclosed it.
        value: Option<String>,
    },
    /// The move counter advanced (one event per completed comparison).
    MovesUpdated(u32),
    /// One second of session time elapsed.
    TimeTick(Duration),
    /// All pairs were found; the session is over.
    SessionCompleted {
        /// Final move count.
        moves: u32,
        /// Final elapsed time.
        elapsed: Duration,
    },
    /// An authority call failed; the affected flip was rolled back and may be
    /// retried.
    AuthorityError(String),
}
