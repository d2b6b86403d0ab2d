//! Tests for the session controller against a scripted match authority.

use async_trait::async_trait;
use pairmatch::{
    AuthorityError, CardState, FlipCardResponse, GameEvent, MatchAuthority, SessionController,
    StartGameResponse,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// In-process authority holding a known deck, mirroring the wire semantics
/// of the real server.
#[derive(Clone)]
struct ScriptedAuthority {
    deck: Vec<String>,
    /// Indices whose flip calls fail with a transport-style error.
    failing: HashSet<usize>,
    /// When set, `begin_session` calls fail.
    failing_start: Arc<AtomicBool>,
    state: Arc<Mutex<ScriptedState>>,
}

#[derive(Default)]
struct ScriptedState {
    flipped: Vec<usize>,
    matched: Vec<usize>,
}

impl ScriptedAuthority {
    fn new(deck: &[&str]) -> Self {
        Self {
            deck: deck.iter().map(|s| s.to_string()).collect(),
            failing: HashSet::new(),
            failing_start: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(ScriptedState::default())),
        }
    }

    fn failing_on(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }
}

#[async_trait]
impl MatchAuthority for ScriptedAuthority {
    async fn begin_session(&self, _environment: &str) -> Result<StartGameResponse, AuthorityError> {
        if self.failing_start.load(Ordering::SeqCst) {
            return Err(AuthorityError::Malformed {
                reason: "scripted start failure".to_string(),
            });
        }
        let mut state = self.state.lock().unwrap();
        *state = ScriptedState::default();
        Ok(StartGameResponse {
            deck_size: self.deck.len(),
        })
    }

    async fn flip_card(&self, index: usize) -> Result<FlipCardResponse, AuthorityError> {
        if self.failing.contains(&index) {
            return Err(AuthorityError::Malformed {
                reason: "scripted failure".to_string(),
            });
        }
        let mut state = self.state.lock().unwrap();
        state.flipped.push(index);

        let mut revealed: Vec<usize> = state.flipped.clone();
        revealed.extend(state.matched.iter().copied());

        let mut matched_now = Vec::new();
        if state.flipped.len() == 2 {
            let (a, b) = (state.flipped[0], state.flipped[1]);
            if self.deck[a] == self.deck[b] {
                state.matched.extend([a, b]);
                matched_now = vec![a, b];
            }
            state.flipped.clear();
        }

        let mut deck = vec![None; self.deck.len()];
        for i in revealed {
            deck[i] = Some(self.deck[i].clone());
        }
        Ok(FlipCardResponse {
            deck,
            matched: matched_now,
        })
    }
}

/// Receives the next event that isn't a timer tick.
async fn next_event(rx: &mut mpsc::UnboundedReceiver<GameEvent>) -> GameEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        if !matches!(event, GameEvent::TimeTick(_)) {
            return event;
        }
    }
}

/// Drains everything currently queued, dropping timer ticks.
fn drain(rx: &mut mpsc::UnboundedReceiver<GameEvent>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if !matches!(event, GameEvent::TimeTick(_)) {
            events.push(event);
        }
    }
    events
}

fn spawn_controller(
    authority: impl MatchAuthority,
    mismatch_delay: Duration,
) -> (
    pairmatch::ControllerHandle,
    mpsc::UnboundedReceiver<GameEvent>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (controller, handle) = SessionController::new(authority, event_tx);
    let controller = controller.with_mismatch_delay(mismatch_delay);
    tokio::spawn(controller.run());
    (handle, event_rx)
}

/// Flips a card and waits for its value reveal, returning the value.
async fn flip_and_reveal(
    handle: &pairmatch::ControllerHandle,
    rx: &mut mpsc::UnboundedReceiver<GameEvent>,
    index: usize,
) -> String {
    handle.flip(index);
    // Optimistic face-up, no value yet
    assert_eq!(
        next_event(rx).await,
        GameEvent::CardChanged {
            index,
            state: CardState::Flipped,
            value: None
        }
    );
    // Authority's reveal
    match next_event(rx).await {
        GameEvent::CardChanged {
            index: i,
            state: CardState::Flipped,
            value: Some(value),
        } if i == index => value,
        other => panic!("expected reveal for card {index}, got {other:?}"),
    }
}

#[tokio::test]
async fn start_deals_deck_and_resets_moves() {
    let (handle, mut rx) = spawn_controller(
        ScriptedAuthority::new(&["A", "B", "A", "B"]),
        Duration::from_millis(20),
    );
    handle.start("fruits");

    assert_eq!(
        next_event(&mut rx).await,
        GameEvent::SessionStarted {
            deck_size: 4,
            environment: "fruits".to_string()
        }
    );
    assert_eq!(next_event(&mut rx).await, GameEvent::MovesUpdated(0));
}

#[tokio::test]
async fn matching_pair_locks_in() {
    let (handle, mut rx) = spawn_controller(
        ScriptedAuthority::new(&["A", "B", "A", "B"]),
        Duration::from_millis(20),
    );
    handle.start("fruits");
    next_event(&mut rx).await; // SessionStarted
    next_event(&mut rx).await; // MovesUpdated(0)

    assert_eq!(flip_and_reveal(&handle, &mut rx, 0).await, "A");
    assert_eq!(flip_and_reveal(&handle, &mut rx, 2).await, "A");

    // Reveal precedes the match determination; now both lock in
    for expected in [0, 2] {
        match next_event(&mut rx).await {
            GameEvent::CardChanged {
                index,
                state: CardState::Matched,
                value: Some(value),
            } => {
                assert_eq!(index, expected);
                assert_eq!(value, "A");
            }
            other => panic!("expected matched card, got {other:?}"),
        }
    }
    assert_eq!(next_event(&mut rx).await, GameEvent::MovesUpdated(1));
}

#[tokio::test]
async fn mismatched_pair_reverts_after_delay() {
    let (handle, mut rx) = spawn_controller(
        ScriptedAuthority::new(&["A", "B", "A", "B"]),
        Duration::from_millis(20),
    );
    handle.start("fruits");
    next_event(&mut rx).await;
    next_event(&mut rx).await;

    flip_and_reveal(&handle, &mut rx, 0).await;
    flip_and_reveal(&handle, &mut rx, 1).await;

    // The move resolves immediately...
    assert_eq!(next_event(&mut rx).await, GameEvent::MovesUpdated(1));

    // ...and the cards hide again after the delay
    for expected in [0, 1] {
        assert_eq!(
            next_event(&mut rx).await,
            GameEvent::CardChanged {
                index: expected,
                state: CardState::Hidden,
                value: None
            }
        );
    }
}

#[tokio::test]
async fn final_match_completes_session() {
    let (handle, mut rx) = spawn_controller(
        ScriptedAuthority::new(&["A", "A"]),
        Duration::from_millis(20),
    );
    handle.start("fruits");
    next_event(&mut rx).await;
    next_event(&mut rx).await;

    flip_and_reveal(&handle, &mut rx, 0).await;
    flip_and_reveal(&handle, &mut rx, 1).await;
    next_event(&mut rx).await; // Matched 0
    next_event(&mut rx).await; // Matched 1
    assert_eq!(next_event(&mut rx).await, GameEvent::MovesUpdated(1));

    match next_event(&mut rx).await {
        GameEvent::SessionCompleted { moves, .. } => assert_eq!(moves, 1),
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn restart_cancels_pending_reversion() {
    let (handle, mut rx) = spawn_controller(
        ScriptedAuthority::new(&["A", "B", "A", "B"]),
        Duration::from_millis(300),
    );
    handle.start("fruits");
    next_event(&mut rx).await;
    next_event(&mut rx).await;

    flip_and_reveal(&handle, &mut rx, 0).await;
    flip_and_reveal(&handle, &mut rx, 1).await;
    assert_eq!(next_event(&mut rx).await, GameEvent::MovesUpdated(1));

    // Restart while the reversion is still pending
    handle.restart();
    assert_eq!(
        next_event(&mut rx).await,
        GameEvent::SessionStarted {
            deck_size: 4,
            environment: "fruits".to_string()
        }
    );
    assert_eq!(next_event(&mut rx).await, GameEvent::MovesUpdated(0));

    // Give the stale reversion time to fire; it must be discarded
    tokio::time::sleep(Duration::from_millis(500)).await;
    let leaked: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, GameEvent::CardChanged { .. }))
        .collect();
    assert!(leaked.is_empty(), "stale reversion leaked: {leaked:?}");
}

#[tokio::test]
async fn failed_flip_recovers_and_can_retry() {
    let authority = ScriptedAuthority::new(&["A", "B", "A", "B"]).failing_on(1);
    let (handle, mut rx) = spawn_controller(authority, Duration::from_millis(20));
    handle.start("fruits");
    next_event(&mut rx).await;
    next_event(&mut rx).await;

    flip_and_reveal(&handle, &mut rx, 0).await;

    // Second flip fails at the authority
    handle.flip(1);
    assert_eq!(
        next_event(&mut rx).await,
        GameEvent::CardChanged {
            index: 1,
            state: CardState::Flipped,
            value: None
        }
    );
    assert_eq!(
        next_event(&mut rx).await,
        GameEvent::CardChanged {
            index: 1,
            state: CardState::Hidden,
            value: None
        }
    );
    assert!(matches!(
        next_event(&mut rx).await,
        GameEvent::AuthorityError(_)
    ));

    // No stuck double-flip lock: the first card is still up, and a new
    // second flip resolves normally
    assert_eq!(flip_and_reveal(&handle, &mut rx, 2).await, "A");
    for expected in [0, 2] {
        match next_event(&mut rx).await {
            GameEvent::CardChanged {
                index,
                state: CardState::Matched,
                ..
            } => assert_eq!(index, expected),
            other => panic!("expected matched card, got {other:?}"),
        }
    }
    assert_eq!(next_event(&mut rx).await, GameEvent::MovesUpdated(1));
}

#[tokio::test]
async fn third_flip_is_silently_ignored() {
    let authority = ScriptedAuthority::new(&["A", "B", "A", "B"]);
    let (handle, mut rx) = spawn_controller(authority, Duration::from_millis(200));
    handle.start("fruits");
    next_event(&mut rx).await;
    next_event(&mut rx).await;

    flip_and_reveal(&handle, &mut rx, 0).await;
    flip_and_reveal(&handle, &mut rx, 1).await;
    // Mismatch: move counted, reversion pending
    assert_eq!(next_event(&mut rx).await, GameEvent::MovesUpdated(1));

    // Both cards are still visually up and no longer active; flipping one of
    // them again must be a no-op
    handle.flip(0);
    handle.flip(1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(drain(&mut rx).is_empty());
}

/// Authority whose response for the first flip lags behind the second's.
///
/// Deck is [A, B, A, B]; flipping 0 then 2 means the adjudicated response
/// (carrying `matched: [0, 2]`) comes back before card 0's value does.
struct SlowFirstFlipAuthority;

#[async_trait]
impl MatchAuthority for SlowFirstFlipAuthority {
    async fn begin_session(&self, _environment: &str) -> Result<StartGameResponse, AuthorityError> {
        Ok(StartGameResponse { deck_size: 4 })
    }

    async fn flip_card(&self, index: usize) -> Result<FlipCardResponse, AuthorityError> {
        let mut deck = vec![None; 4];
        match index {
            0 => {
                tokio::time::sleep(Duration::from_millis(100)).await;
                deck[0] = Some("A".to_string());
                Ok(FlipCardResponse {
                    deck,
                    matched: Vec::new(),
                })
            }
            2 => {
                deck[0] = Some("A".to_string());
                deck[2] = Some("A".to_string());
                Ok(FlipCardResponse {
                    deck,
                    matched: vec![0, 2],
                })
            }
            _ => Err(AuthorityError::Malformed {
                reason: "unscripted flip".to_string(),
            }),
        }
    }
}

#[tokio::test]
async fn match_reported_before_partner_value_still_locks_in() {
    let (handle, mut rx) = spawn_controller(SlowFirstFlipAuthority, Duration::from_millis(20));
    handle.start("fruits");
    next_event(&mut rx).await;
    next_event(&mut rx).await;

    // Both flips in flight at once; the second response overtakes the first
    handle.flip(0);
    handle.flip(2);
    for expected in [0, 2] {
        assert_eq!(
            next_event(&mut rx).await,
            GameEvent::CardChanged {
                index: expected,
                state: CardState::Flipped,
                value: None
            }
        );
    }

    // Card 2 reveals first, then the delayed card 0
    for expected in [2, 0] {
        assert_eq!(
            next_event(&mut rx).await,
            GameEvent::CardChanged {
                index: expected,
                state: CardState::Flipped,
                value: Some("A".to_string())
            }
        );
    }

    // The match rode on the earlier response; the pair must still lock in
    for expected in [0, 2] {
        match next_event(&mut rx).await {
            GameEvent::CardChanged {
                index,
                state: CardState::Matched,
                ..
            } => assert_eq!(index, expected),
            other => panic!("expected matched card, got {other:?}"),
        }
    }
    assert_eq!(next_event(&mut rx).await, GameEvent::MovesUpdated(1));

    // And nothing reverts afterwards
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn failed_restart_leaves_session_inert() {
    let authority = ScriptedAuthority::new(&["A", "B", "A", "B"]);
    let failing_start = Arc::clone(&authority.failing_start);
    let (handle, mut rx) = spawn_controller(authority, Duration::from_millis(300));
    handle.start("fruits");
    next_event(&mut rx).await;
    next_event(&mut rx).await;

    // Leave a mismatch reversion pending
    flip_and_reveal(&handle, &mut rx, 0).await;
    flip_and_reveal(&handle, &mut rx, 1).await;
    assert_eq!(next_event(&mut rx).await, GameEvent::MovesUpdated(1));

    // Restart against an authority that now refuses to deal
    failing_start.store(true, Ordering::SeqCst);
    handle.restart();
    assert!(matches!(
        next_event(&mut rx).await,
        GameEvent::AuthorityError(_)
    ));

    // The superseded session must not keep playing: new flips are rejected
    // and the stale reversion never lands
    handle.flip(2);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn empty_deck_starts_degenerate_session() {
    let (handle, mut rx) = spawn_controller(ScriptedAuthority::new(&[]), Duration::from_millis(20));
    handle.start("fruits");

    assert_eq!(
        next_event(&mut rx).await,
        GameEvent::SessionStarted {
            deck_size: 0,
            environment: "fruits".to_string()
        }
    );
    next_event(&mut rx).await; // MovesUpdated(0)

    handle.flip(0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(drain(&mut rx).is_empty());
}
