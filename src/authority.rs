//! Match authority protocol: wire types, client trait, and the HTTP client.
//!
//! The authority owns the true deck and decides which indices match; the
//! game core only ever sees what these responses reveal.

use async_trait::async_trait;
use derive_more::{Display, Error, From};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Body of `POST /start_game`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartGameRequest {
    /// Theme key selecting a card set. Opaque to game logic.
    pub environment: String,
}

/// Response to `POST /start_game`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartGameResponse {
    /// Number of cards dealt. A missing or zero size means an empty grid.
    #[serde(default)]
    pub deck_size: usize,
}

/// Body of `POST /flip_card`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlipCardRequest {
    /// Index of the card to reveal.
    pub index: usize,
}

/// Response to `POST /flip_card`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlipCardResponse {
    /// Sparse deck view: `Some(value)` only at indices the authority has
    /// revealed.
    #[serde(default)]
    pub deck: Vec<Option<String>>,
    /// Indices resolved as a match by this flip; empty when nothing matched.
    #[serde(default)]
    pub matched: Vec<usize>,
}

impl FlipCardResponse {
    /// Validates the response shape and extracts the value revealed for the
    /// just-flipped `index`.
    ///
    /// A response that omits the flipped card's value or names matched
    /// indices outside the deck is malformed; callers treat that like a
    /// failed call rather than guessing.
    pub fn revealed_value(&self, index: usize, deck_size: usize) -> Result<&str, AuthorityError> {
        if let Some(&out_of_range) = self.matched.iter().find(|&&i| i >= deck_size) {
            return Err(AuthorityError::Malformed {
                reason: format!("matched index {} outside deck of {}", out_of_range, deck_size),
            });
        }
        self.deck
            .get(index)
            .and_then(|value| value.as_deref())
            .ok_or_else(|| AuthorityError::Malformed {
                reason: format!("no revealed value for flipped index {}", index),
            })
    }
}

/// Error body the authority uses for rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable rejection reason.
    pub error: String,
}

/// Errors from talking to the match authority.
///
/// All of these are recoverable: the affected flip is rolled back and the
/// user may retry, or restart the session.
#[derive(Debug, Display, Error, From)]
pub enum AuthorityError {
    /// The request never completed.
    #[display("authority request failed: {_0}")]
    Transport(reqwest::Error),
    /// The authority answered with a non-success status.
    #[display("authority rejected request ({code}): {message}")]
    Rejected {
        /// HTTP status code.
        code: u16,
        /// Server-provided reason, when one was given.
        #[error(not(source))]
        message: String,
    },
    /// The response decoded but its shape was unusable.
    #[display("malformed authority response: {reason}")]
    Malformed {
        /// What was wrong with it.
        #[error(not(source))]
        reason: String,
    },
}

/// The two remote calls the game core depends on.
///
/// [`HttpAuthority`] is the real implementation; tests script their own.
#[async_trait]
pub trait MatchAuthority: Send + Sync + 'static {
    /// Asks the authority to deal a fresh deck for `environment`.
    async fn begin_session(&self, environment: &str) -> Result<StartGameResponse, AuthorityError>;

    /// Asks the authority to reveal the card at `index`.
    async fn flip_card(&self, index: usize) -> Result<FlipCardResponse, AuthorityError>;
}

/// HTTP client for a remote match authority.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    /// Base URL of the authority, without a trailing slash.
    base_url: String,
    /// Shared HTTP client.
    client: reqwest::Client,
}

impl HttpAuthority {
    /// Creates a client for the authority at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Decodes a JSON response, mapping rejections and decode failures to
    /// [`AuthorityError`].
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthorityError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| "no error detail".to_string());
            warn!(code = status.as_u16(), message = %message, "authority rejected request");
            return Err(AuthorityError::Rejected {
                code: status.as_u16(),
                message,
            });
        }
        response.json::<T>().await.map_err(|e| {
            warn!(error = %e, "authority response did not decode");
            AuthorityError::Malformed {
                reason: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl MatchAuthority for HttpAuthority {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn begin_session(&self, environment: &str) -> Result<StartGameResponse, AuthorityError> {
        debug!(environment, "requesting new deck");
        let response = self
            .client
            .post(format!("{}/start_game", self.base_url))
            .json(&StartGameRequest {
                environment: environment.to_string(),
            })
            .send()
            .await?;
        Self::decode(response).await
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn flip_card(&self, index: usize) -> Result<FlipCardResponse, AuthorityError> {
        debug!(index, "requesting card reveal");
        let response = self
            .client
            .post(format!("{}/flip_card", self.base_url))
            .json(&FlipCardRequest { index })
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revealed_value_reads_sparse_deck() {
        let response = FlipCardResponse {
            deck: vec![Some("🍎".to_string()), None, None, None],
            matched: vec![],
        };
        assert_eq!(response.revealed_value(0, 4).unwrap(), "🍎");
    }

    #[test]
    fn missing_value_is_malformed() {
        let response = FlipCardResponse {
            deck: vec![None, None],
            matched: vec![],
        };
        assert!(matches!(
            response.revealed_value(0, 2),
            Err(AuthorityError::Malformed { .. })
        ));
    }

    #[test]
    fn out_of_range_matched_index_is_malformed() {
        let response = FlipCardResponse {
            deck: vec![Some("🍎".to_string()), None],
            matched: vec![0, 7],
        };
        assert!(matches!(
            response.revealed_value(0, 2),
            Err(AuthorityError::Malformed { .. })
        ));
    }
}
