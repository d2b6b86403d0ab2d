//! Application state for the terminal client.

use crate::events::GameEvent;
use crate::game::CardState;
use crate::timer::format_elapsed;
use std::time::Duration;
use tracing::debug;

/// Cards per grid row.
pub const GRID_COLUMNS: usize = 4;

/// What the UI knows about one card.
#[derive(Debug, Clone)]
pub struct CardView {
    /// Visibility state.
    pub state: CardState,
    /// Revealed value, when known.
    pub value: Option<String>,
}

/// Main application state, kept in sync by consuming [`GameEvent`]s.
pub struct App {
    environment: String,
    cards: Vec<CardView>,
    cursor: usize,
    moves: u32,
    elapsed: Duration,
    status_message: String,
    completed: bool,
}

impl App {
    /// Creates the application for the given environment.
    pub fn new(environment: String) -> Self {
        Self {
            environment,
            cards: Vec::new(),
            cursor: 0,
            moves: 0,
            elapsed: Duration::ZERO,
            status_message: "Connecting to match authority...".to_string(),
            completed: false,
        }
    }

    /// Selected environment.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Current card views.
    pub fn cards(&self) -> &[CardView] {
        &self.cards
    }

    /// Cursor position in the grid.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves made so far.
    pub fn moves(&self) -> u32 {
        self.moves
    }

    /// Elapsed session time.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Current status line.
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Whether the session has been completed.
    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Applies one game event to the view state.
    pub fn handle_event(&mut self, event: GameEvent) {
        debug!(?event, "handling game event");
        match event {
            GameEvent::SessionStarted {
                deck_size,
                environment,
            } => {
                self.cards = (0..deck_size)
                    .map(|_| CardView {
                        state: CardState::Hidden,
                        value: None,
                    })
                    .collect();
                self.environment = environment;
                self.cursor = 0;
                self.moves = 0;
                self.elapsed = Duration::ZERO;
                self.completed = false;
                self.status_message = if deck_size == 0 {
                    "The authority dealt an empty deck. Press 'r' to retry.".to_string()
                } else {
                    format!("Find all {} pairs!", deck_size / 2)
                };
            }
            GameEvent::CardChanged { index, state, value } => {
                if let Some(card) = self.cards.get_mut(index) {
                    card.state = state;
                    card.value = value;
                }
            }
            GameEvent::MovesUpdated(moves) => {
                self.moves = moves;
            }
            GameEvent::TimeTick(elapsed) => {
                self.elapsed = elapsed;
            }
            GameEvent::SessionCompleted { moves, elapsed } => {
                self.moves = moves;
                self.elapsed = elapsed;
                self.completed = true;
                self.status_message = format!(
                    "All pairs found in {} moves and {}! Press 'r' to play again or 'q' to quit.",
                    moves,
                    format_elapsed(elapsed)
                );
            }
            GameEvent::AuthorityError(message) => {
                self.status_message = format!("Authority error: {message} (flip again to retry)");
            }
        }
    }

    /// Moves the cursor one cell left.
    pub fn cursor_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    /// Moves the cursor one cell right.
    pub fn cursor_right(&mut self) {
        if self.cursor + 1 < self.cards.len() {
            self.cursor += 1;
        }
    }

    /// Moves the cursor one row up.
    pub fn cursor_up(&mut self) {
        if self.cursor >= GRID_COLUMNS {
            self.cursor -= GRID_COLUMNS;
        }
    }

    /// Moves the cursor one row down.
    pub fn cursor_down(&mut self) {
        if self.cursor + GRID_COLUMNS < self.cards.len() {
            self.cursor += GRID_COLUMNS;
        }
    }
}
