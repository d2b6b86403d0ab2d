//! Pairmatch - a memory-matching card game.
//!
//! The player faces a grid of face-down cards and flips them two at a time;
//! a remote **match authority** owns the true deck and decides which indices
//! match, so the client never learns unrevealed cards.
//!
//! # Architecture
//!
//! - **Game core**: the flip/match state machine and session lifecycle
//!   ([`GameSession`], [`SessionController`]) - commands in, [`GameEvent`]s
//!   out.
//! - **Authority client**: the two remote calls ([`MatchAuthority`],
//!   [`HttpAuthority`]).
//! - **Server**: a local match authority ([`server::Authority`], axum).
//! - **TUI**: a ratatui presentation adapter consuming the event stream.
//!
//! # Example
//!
//! ```no_run
//! use pairmatch::{HttpAuthority, SessionController};
//! use tokio::sync::mpsc;
//!
//! # async fn example() {
//! let (event_tx, mut event_rx) = mpsc::unbounded_channel();
//! let authority = HttpAuthority::new("http://127.0.0.1:3000");
//! let (controller, handle) = SessionController::new(authority, event_tx);
//! tokio::spawn(controller.run());
//!
//! handle.start("fruits");
//! handle.flip(0);
//! while let Some(event) = event_rx.recv().await {
//!     println!("{event:?}");
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod authority;
mod controller;
mod events;
mod game;
mod timer;

// Public surfaces with their own namespaces
pub mod cli;
pub mod server;
pub mod tui;

// Crate-level exports - authority protocol
pub use authority::{
    AuthorityError, ErrorResponse, FlipCardRequest, FlipCardResponse, HttpAuthority,
    MatchAuthority, StartGameRequest, StartGameResponse,
};

// Crate-level exports - session orchestration
pub use controller::{Command, ControllerHandle, SessionController, MISMATCH_DELAY};

// Crate-level exports - events and timing
pub use events::GameEvent;
pub use timer::{format_elapsed, TimerController};

// Crate-level exports - game domain
pub use game::{Card, CardState, FlipOutcome, GameSession, MoveCounter, SessionStatus};
