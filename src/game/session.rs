//! The flip/match state machine.
//!
//! [`GameSession`] owns the card collection for one playthrough and is the
//! only place card state changes. It is pure and synchronous: the async
//! controller feeds it flip requests and authority responses and acts on the
//! returned [`FlipOutcome`].

use super::card::{Card, CardState};
use super::moves::MoveCounter;
use derive_getters::Getters;
use tracing::{debug, info, instrument, warn};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No deck yet; flips are rejected.
    Idle,
    /// Deck dealt, flips accepted.
    Running,
    /// All pairs found. Terminal until a restart replaces the session.
    Completed,
}

/// Result of resolving one authority response - explicit state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlipOutcome {
    /// Only one card is face up; nothing to compare yet.
    FirstRevealed,
    /// The two face-up cards matched and are now locked in.
    Matched([usize; 2]),
    /// The two face-up cards matched and that was the final pair.
    Completed([usize; 2]),
    /// The two face-up cards did not match; they stay visible until a
    /// deferred reversion hides them again.
    Mismatched([usize; 2]),
}

/// One playthrough of the memory grid.
///
/// Replaced wholesale on restart; never reset in place.
#[derive(Debug, Clone, Getters)]
pub struct GameSession {
    /// The card collection, indexed 0..deck_size.
    cards: Vec<Card>,
    /// Indices currently face up and unresolved (at most 2).
    active_flips: Vec<usize>,
    /// Union of the authority's `matched` sets seen for the active pair.
    ///
    /// Responses for the two flips can arrive in either order and only the
    /// response the authority adjudicated carries the matched indices, so
    /// they accumulate here until the comparison resolves.
    pending_matched: Vec<usize>,
    /// Pairs matched so far.
    matched_pairs: u32,
    /// Completed-comparison counter.
    moves: MoveCounter,
    /// Lifecycle state.
    status: SessionStatus,
}

impl GameSession {
    /// Creates an idle session with no cards.
    pub fn new() -> Self {
        Self {
            cards: Vec::new(),
            active_flips: Vec::new(),
            pending_matched: Vec::new(),
            matched_pairs: 0,
            moves: MoveCounter::new(),
            status: SessionStatus::Idle,
        }
    }

    /// Creates a running session with `deck_size` face-down cards.
    ///
    /// A zero deck size yields the degenerate empty grid rather than an
    /// error; such a session accepts no flips.
    #[instrument]
    pub fn with_deck_size(deck_size: usize) -> Self {
        if deck_size == 0 {
            warn!("authority reported an empty deck, starting a zero-card session");
        }
        info!(deck_size, "dealing new session");
        Self {
            cards: (0..deck_size).map(|_| Card::hidden()).collect(),
            active_flips: Vec::new(),
            pending_matched: Vec::new(),
            matched_pairs: 0,
            moves: MoveCounter::new(),
            status: SessionStatus::Running,
        }
    }

    /// Number of cards in the deck.
    pub fn deck_size(&self) -> usize {
        self.cards.len()
    }

    /// Number of pairs needed to complete the session.
    pub fn total_pairs(&self) -> u32 {
        (self.cards.len() / 2) as u32
    }

    /// The card at `index`, if it exists.
    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    /// Attempts to turn the card at `index` face up.
    ///
    /// This is the re-entrancy guard: the request is a silent no-op (returns
    /// `false`) unless the session is running, the index exists, the card is
    /// face down, and fewer than two cards are already active. On success the
    /// card is `Flipped` and the index joins `active_flips`.
    #[instrument(skip(self))]
    pub fn begin_flip(&mut self, index: usize) -> bool {
        if self.status != SessionStatus::Running {
            debug!(index, status = ?self.status, "flip ignored, session not running");
            return false;
        }
        if self.active_flips.len() >= 2 {
            debug!(index, "flip ignored, two cards already active");
            return false;
        }
        let Some(card) = self.cards.get_mut(index) else {
            debug!(index, "flip ignored, no such card");
            return false;
        };
        if card.state() != CardState::Hidden {
            debug!(index, state = ?card.state(), "flip ignored, card not face down");
            return false;
        }

        card.set_state(CardState::Flipped);
        self.active_flips.push(index);
        debug!(index, active = self.active_flips.len(), "card flipped");
        true
    }

    /// Applies an authority response for the card at `index`.
    ///
    /// Records the revealed value, and once both active cards are revealed
    /// compares them against the authority's `matched` set. Membership is
    /// order-independent: both active indices must appear in the set.
    ///
    /// The matched set rides on whichever response the authority adjudicated,
    /// which is not necessarily the last one to arrive here, so every
    /// response's set is folded into `pending_matched` before comparing.
    #[instrument(skip(self, value, matched))]
    pub fn resolve_flip(&mut self, index: usize, value: String, matched: &[usize]) -> FlipOutcome {
        if let Some(card) = self.cards.get_mut(index) {
            card.reveal(value);
        }
        for &i in matched {
            if !self.pending_matched.contains(&i) {
                self.pending_matched.push(i);
            }
        }

        if self.active_flips.len() < 2 {
            return FlipOutcome::FirstRevealed;
        }
        let pair = [self.active_flips[0], self.active_flips[1]];
        let both_revealed = pair
            .iter()
            .all(|&i| self.cards.get(i).is_some_and(|c| c.value().is_some()));
        if !both_revealed {
            // The other card's response is still outstanding; compare when it
            // lands.
            return FlipOutcome::FirstRevealed;
        }

        // Comparison resolves the move either way. active_flips clears now so
        // new flips are accepted; mismatched cards lag visually.
        self.active_flips.clear();
        self.moves.record_comparison();
        let matched = std::mem::take(&mut self.pending_matched);

        if pair.iter().all(|i| matched.contains(i)) {
            for &i in &pair {
                self.cards[i].set_state(CardState::Matched);
            }
            self.matched_pairs += 1;
            info!(
                pair = ?pair,
                matched_pairs = self.matched_pairs,
                total_pairs = self.total_pairs(),
                "pair matched"
            );
            if self.matched_pairs == self.total_pairs() {
                self.status = SessionStatus::Completed;
                info!(moves = self.moves.count(), "session completed");
                FlipOutcome::Completed(pair)
            } else {
                FlipOutcome::Matched(pair)
            }
        } else {
            debug!(pair = ?pair, "pair mismatched");
            FlipOutcome::Mismatched(pair)
        }
    }

    /// Recovers from a failed authority call: the optimistic flip at `index`
    /// goes back to face down and frees its `active_flips` slot.
    #[instrument(skip(self))]
    pub fn fail_flip(&mut self, index: usize) {
        self.active_flips.retain(|&i| i != index);
        self.pending_matched.clear();
        if let Some(card) = self.cards.get_mut(index) {
            if card.state() == CardState::Flipped {
                card.conceal();
            }
        }
    }

    /// Applies a deferred mismatch reversion, returning the indices that
    /// actually went back to face down.
    ///
    /// Cards that changed state since the mismatch (a restart replaced the
    /// session, or recovery already hid them) are left alone.
    #[instrument(skip(self))]
    pub fn revert_pair(&mut self, pair: [usize; 2]) -> Vec<usize> {
        let mut reverted = Vec::with_capacity(2);
        for index in pair {
            if let Some(card) = self.cards.get_mut(index) {
                if card.state() == CardState::Flipped {
                    card.conceal();
                    reverted.push(index);
                }
            }
        }
        debug!(pair = ?pair, reverted = ?reverted, "mismatched cards hidden again");
        reverted
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}
