//! Pure game domain: cards, move accounting, and the flip/match state
//! machine. No I/O lives here.

mod card;
mod moves;
mod session;

pub use card::{Card, CardState};
pub use moves::MoveCounter;
pub use session::{FlipOutcome, GameSession, SessionStatus};
