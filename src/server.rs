//! Local match authority.
//!
//! Speaks the wire contract the game core depends on: `POST /start_game`,
//! `POST /flip_card`, and a `GET /get_score` readout. The authority owns the
//! true deck; responses reveal only the cards currently face up or matched,
//! so a client never learns the rest of the deck.

use crate::authority::{
    ErrorResponse, FlipCardRequest, FlipCardResponse, StartGameRequest, StartGameResponse,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Available card environments and their symbol sets.
pub const ENVIRONMENTS: &[(&str, [&str; 8])] = &[
    ("fruits", ["🍎", "🍌", "🍇", "🍓", "🍍", "🍉", "🍒", "🥝"]),
    ("birds", ["🦜", "🦉", "🦢", "🦩", "🐦", "🐤", "🐧", "🦆"]),
    ("cars", ["🚗", "🚕", "🚙", "🚓", "🏎️", "🚑", "🚒", "🚐"]),
    ("clothes", ["👗", "👚", "👕", "👖", "👔", "🧥", "👘", "👠"]),
    ("electronics", ["💻", "📱", "🖥️", "🖨️", "🎧", "📷", "⌨️", "🕹️"]),
    ("animals", ["🐶", "🐱", "🐭", "🐹", "🐰", "🦊", "🐻", "🐼"]),
    ("nature", ["🌳", "🌷", "🌵", "🍂", "🍁", "🌴", "🌺", "🌊"]),
];

/// Looks up the symbol set for an environment key.
pub fn symbols_for(environment: &str) -> Option<&'static [&'static str; 8]> {
    ENVIRONMENTS
        .iter()
        .find(|(name, _)| *name == environment)
        .map(|(_, symbols)| symbols)
}

/// Score readout for `GET /get_score`.
#[derive(Debug, Clone, Serialize)]
struct ScoreResponse {
    moves: u32,
    elapsed_time: f64,
    matched_pairs: usize,
    total_pairs: usize,
    game_complete: bool,
}

/// One dealt deck and its progress.
#[derive(Debug)]
struct ActiveGame {
    deck: Vec<String>,
    flipped: Vec<usize>,
    matched: Vec<usize>,
    moves: u32,
    started_at: Instant,
}

/// The match authority: deals decks and adjudicates flips.
///
/// Serves one game at a time; starting a new one replaces the old.
#[derive(Debug, Clone)]
pub struct Authority {
    /// When set, `start_game` deals this deck instead of shuffling.
    fixed_deck: Option<Vec<String>>,
    game: Arc<Mutex<Option<ActiveGame>>>,
}

impl Authority {
    /// Creates an authority that shuffles a fresh deck per game.
    pub fn new() -> Self {
        Self {
            fixed_deck: None,
            game: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates an authority dealing the given deck verbatim, for tests and
    /// demos that need predictable card positions.
    pub fn with_deck(deck: Vec<String>) -> Self {
        Self {
            fixed_deck: Some(deck),
            game: Arc::new(Mutex::new(None)),
        }
    }

    /// Builds the axum router exposing the authority endpoints.
    pub fn router(self) -> Router {
        Router::new()
            .route("/start_game", post(start_game))
            .route("/flip_card", post(flip_card))
            .route("/get_score", get(get_score))
            .with_state(self)
    }

    fn deal(&self, environment: &str) -> Option<Vec<String>> {
        if let Some(deck) = &self.fixed_deck {
            return Some(deck.clone());
        }
        let symbols = symbols_for(environment)?;
        // Two of each symbol, shuffled
        let mut deck: Vec<String> = symbols
            .iter()
            .chain(symbols.iter())
            .map(|s| s.to_string())
            .collect();
        deck.shuffle(&mut rand::thread_rng());
        Some(deck)
    }
}

impl Default for Authority {
    fn default() -> Self {
        Self::new()
    }
}

fn reject(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    let message = message.into();
    warn!(message = %message, "rejecting request");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: message }),
    )
}

/// Deals a new deck for the requested environment.
#[instrument(skip(authority))]
async fn start_game(
    State(authority): State<Authority>,
    Json(request): Json<StartGameRequest>,
) -> Result<Json<StartGameResponse>, (StatusCode, Json<ErrorResponse>)> {
    let deck = authority
        .deal(&request.environment)
        .ok_or_else(|| reject(format!("Invalid environment '{}'", request.environment)))?;
    let deck_size = deck.len();

    let mut game = authority.game.lock().unwrap();
    *game = Some(ActiveGame {
        deck,
        flipped: Vec::new(),
        matched: Vec::new(),
        moves: 0,
        started_at: Instant::now(),
    });

    info!(environment = %request.environment, deck_size, "game started");
    Ok(Json(StartGameResponse { deck_size }))
}

/// Reveals one card and, when it completes a pair of face-up cards,
/// adjudicates the match.
#[instrument(skip(authority))]
async fn flip_card(
    State(authority): State<Authority>,
    Json(request): Json<FlipCardRequest>,
) -> Result<Json<FlipCardResponse>, (StatusCode, Json<ErrorResponse>)> {
    let index = request.index;
    let mut slot = authority.game.lock().unwrap();
    let game = slot.as_mut().ok_or_else(|| reject("No active game"))?;

    if index >= game.deck.len() {
        return Err(reject("Invalid card index"));
    }
    if game.flipped.contains(&index) || game.matched.contains(&index) {
        return Err(reject("Card already flipped"));
    }

    game.flipped.push(index);

    // Everything face up right now stays revealed in the response, including
    // a pair about to be resolved below.
    let mut revealed: Vec<usize> = game.flipped.clone();
    revealed.extend(game.matched.iter().copied());

    let mut matched_now = Vec::new();
    if game.flipped.len() == 2 {
        let (first, second) = (game.flipped[0], game.flipped[1]);
        if game.deck[first] == game.deck[second] {
            game.matched.extend([first, second]);
            matched_now = vec![first, second];
            info!(first, second, "pair matched");
        } else {
            debug!(first, second, "pair mismatched");
        }
        game.flipped.clear();
        game.moves += 1;
    }

    let mut deck = vec![None; game.deck.len()];
    for i in revealed {
        deck[i] = Some(game.deck[i].clone());
    }

    Ok(Json(FlipCardResponse {
        deck,
        matched: matched_now,
    }))
}

/// Reports progress for the active game.
#[instrument(skip(authority))]
async fn get_score(
    State(authority): State<Authority>,
) -> Result<Json<ScoreResponse>, (StatusCode, Json<ErrorResponse>)> {
    let slot = authority.game.lock().unwrap();
    let game = slot.as_ref().ok_or_else(|| reject("Game not started"))?;

    Ok(Json(ScoreResponse {
        moves: game.moves,
        elapsed_time: game.started_at.elapsed().as_secs_f64(),
        matched_pairs: game.matched.len() / 2,
        total_pairs: game.deck.len() / 2,
        game_complete: game.matched.len() == game.deck.len(),
    }))
}
