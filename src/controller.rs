//! Session orchestration: commands in, events out.
//!
//! [`SessionController`] owns the [`GameSession`] for the lifetime of the
//! process and runs as a single task, so all card mutation is serialized
//! through its command loop. Authority calls and the mismatch-reversion
//! delay run as spawned continuations that post epoch-tagged commands back
//! into the loop; a restart bumps the epoch and stale continuations are
//! dropped on receipt.

use crate::authority::{AuthorityError, FlipCardResponse, MatchAuthority};
use crate::events::GameEvent;
use crate::game::{CardState, FlipOutcome, GameSession, SessionStatus};
use crate::timer::TimerController;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

/// How long mismatched cards stay visible before they turn back over.
pub const MISMATCH_DELAY: Duration = Duration::from_millis(1000);

/// Commands accepted by the session controller.
#[derive(Debug)]
pub enum Command {
    /// Begin a new session with the given environment.
    Start {
        /// Theme key for the deck; opaque to game logic.
        environment: String,
    },
    /// Request a flip of the card at `index`. Invalid requests are silently
    /// ignored.
    Flip {
        /// Card index.
        index: usize,
    },
    /// Begin a new session with the previously selected environment.
    Restart,
    /// Stop the controller loop.
    Shutdown,
    /// Internal: an authority call for a flip finished.
    FlipResolved {
        /// Session epoch the call was issued under.
        epoch: u64,
        /// Card index the call was for.
        index: usize,
        /// The authority's answer.
        result: Result<FlipCardResponse, AuthorityError>,
    },
    /// Internal: the mismatch-reversion delay elapsed.
    Revert {
        /// Session epoch the mismatch happened under.
        epoch: u64,
        /// The mismatched pair to hide again.
        pair: [usize; 2],
    },
}

/// Cheap handle for sending commands to a running controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ControllerHandle {
    /// Starts a session with the given environment.
    pub fn start(&self, environment: impl Into<String>) {
        self.send(Command::Start {
            environment: environment.into(),
        });
    }

    /// Requests a flip of the card at `index`.
    pub fn flip(&self, index: usize) {
        self.send(Command::Flip { index });
    }

    /// Restarts with the previously selected environment.
    pub fn restart(&self) {
        self.send(Command::Restart);
    }

    /// Stops the controller.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("session controller is gone, command dropped");
        }
    }
}

/// Drives one game session at a time against a match authority.
pub struct SessionController<A> {
    authority: Arc<A>,
    session: GameSession,
    environment: Option<String>,
    epoch: u64,
    timer: TimerController,
    events: mpsc::UnboundedSender<GameEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    loopback: mpsc::UnboundedSender<Command>,
    mismatch_delay: Duration,
}

impl<A: MatchAuthority> SessionController<A> {
    /// Creates a controller emitting on `events`, plus the handle that feeds
    /// it commands.
    pub fn new(authority: A, events: mpsc::UnboundedSender<GameEvent>) -> (Self, ControllerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            authority: Arc::new(authority),
            session: GameSession::new(),
            environment: None,
            epoch: 0,
            timer: TimerController::new(),
            events,
            commands: rx,
            loopback: tx.clone(),
            mismatch_delay: MISMATCH_DELAY,
        };
        (controller, ControllerHandle { tx })
    }

    /// Overrides the mismatch-reversion delay. Tests shorten it.
    pub fn with_mismatch_delay(mut self, delay: Duration) -> Self {
        self.mismatch_delay = delay;
        self
    }

    /// Runs the command loop until [`Command::Shutdown`] or all handles drop.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!("session controller running");
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Start { environment } => self.start_session(environment).await,
                Command::Flip { index } => self.request_flip(index),
                Command::Restart => self.restart().await,
                Command::FlipResolved {
                    epoch,
                    index,
                    result,
                } => self.on_flip_resolved(epoch, index, result),
                Command::Revert { epoch, pair } => self.on_revert(epoch, pair),
                Command::Shutdown => {
                    info!("session controller shutting down");
                    self.timer.stop();
                    return;
                }
            }
        }
        debug!("command senders dropped, controller exiting");
        self.timer.stop();
    }

    /// Starts a fresh session, superseding any previous one.
    ///
    /// Bumping the epoch first means any in-flight flip continuation or
    /// pending reversion from the old session is discarded when it lands.
    #[instrument(skip(self))]
    async fn start_session(&mut self, environment: String) {
        self.epoch += 1;
        self.timer.stop();

        match self.authority.begin_session(&environment).await {
            Ok(response) => {
                let deck_size = response.deck_size;
                self.session = GameSession::with_deck_size(deck_size);
                self.timer.start(self.events.clone());
                self.environment = Some(environment.clone());
                info!(deck_size, environment = %environment, epoch = self.epoch, "session started");
                self.emit(GameEvent::SessionStarted {
                    deck_size,
                    environment,
                });
                self.emit(GameEvent::MovesUpdated(0));
            }
            Err(e) => {
                error!(error = %e, environment = %environment, "failed to start session");
                // The old session is already superseded by the epoch bump;
                // an idle replacement keeps it from accepting further flips
                // whose reversions would never land.
                self.session = GameSession::new();
                self.emit(GameEvent::AuthorityError(e.to_string()));
            }
        }
    }

    /// Restarts with the remembered environment.
    async fn restart(&mut self) {
        match self.environment.clone() {
            Some(environment) => self.start_session(environment).await,
            None => warn!("restart requested before any session was started"),
        }
    }

    /// Validates a flip request and, if accepted, issues the authority call.
    ///
    /// The card turns face up optimistically so the UI responds at once; the
    /// value arrives with the authority's answer.
    #[instrument(skip(self))]
    fn request_flip(&mut self, index: usize) {
        if !self.session.begin_flip(index) {
            return;
        }
        self.emit(GameEvent::CardChanged {
            index,
            state: CardState::Flipped,
            value: None,
        });

        let authority = Arc::clone(&self.authority);
        let loopback = self.loopback.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = authority.flip_card(index).await;
            let _ = loopback.send(Command::FlipResolved {
                epoch,
                index,
                result,
            });
        });
    }

    /// Applies an authority answer for a flip.
    #[instrument(skip(self, result))]
    fn on_flip_resolved(
        &mut self,
        epoch: u64,
        index: usize,
        result: Result<FlipCardResponse, AuthorityError>,
    ) {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, index, "dropping stale flip response");
            return;
        }
        let response = match result {
            Ok(response) => response,
            Err(e) => return self.recover_failed_flip(index, e),
        };
        let value = match response.revealed_value(index, self.session.deck_size()) {
            Ok(value) => value.to_string(),
            Err(e) => return self.recover_failed_flip(index, e),
        };

        // The revealed value always reaches the UI before any match or
        // mismatch determination.
        self.emit(GameEvent::CardChanged {
            index,
            state: CardState::Flipped,
            value: Some(value.clone()),
        });

        match self.session.resolve_flip(index, value, &response.matched) {
            FlipOutcome::FirstRevealed => {}
            FlipOutcome::Matched(pair) => self.finish_match(pair),
            FlipOutcome::Completed(pair) => {
                self.finish_match(pair);
                let elapsed = self.timer.elapsed();
                self.timer.stop();
                let moves = self.session.moves().count();
                info!(moves, ?elapsed, "all pairs found");
                self.emit(GameEvent::SessionCompleted { moves, elapsed });
            }
            FlipOutcome::Mismatched(pair) => {
                self.emit(GameEvent::MovesUpdated(self.session.moves().count()));
                self.schedule_reversion(pair);
            }
        }
    }

    /// Emits the matched-pair state changes and the move count.
    fn finish_match(&mut self, pair: [usize; 2]) {
        for index in pair {
            let value = self
                .session
                .card(index)
                .and_then(|card| card.value())
                .map(str::to_string);
            self.emit(GameEvent::CardChanged {
                index,
                state: CardState::Matched,
                value,
            });
        }
        self.emit(GameEvent::MovesUpdated(self.session.moves().count()));
    }

    /// Schedules the delayed hide-again of a mismatched pair, tagged with the
    /// current epoch so a restart cancels it.
    fn schedule_reversion(&self, pair: [usize; 2]) {
        let loopback = self.loopback.clone();
        let epoch = self.epoch;
        let delay = self.mismatch_delay;
        debug!(?pair, ?delay, "scheduling mismatch reversion");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = loopback.send(Command::Revert { epoch, pair });
        });
    }

    /// Handles a failed or malformed authority response for a flip: the card
    /// goes back to face down and the error is surfaced as recoverable.
    fn recover_failed_flip(&mut self, index: usize, error: AuthorityError) {
        warn!(index, error = %error, "flip failed, reverting card");
        self.session.fail_flip(index);
        self.emit(GameEvent::CardChanged {
            index,
            state: CardState::Hidden,
            value: None,
        });
        self.emit(GameEvent::AuthorityError(error.to_string()));
    }

    /// Applies a due mismatch reversion unless it belongs to a superseded
    /// session.
    fn on_revert(&mut self, epoch: u64, pair: [usize; 2]) {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "dropping stale reversion");
            return;
        }
        if *self.session.status() != SessionStatus::Running {
            return;
        }
        for index in self.session.revert_pair(pair) {
            self.emit(GameEvent::CardChanged {
                index,
                state: CardState::Hidden,
                value: None,
            });
        }
    }

    fn emit(&self, event: GameEvent) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }
}
