use crate::keys::KeyError;
use blackjack_house_types::{Move, ObjectId};
use thiserror::Error;

/// Reasons a house move can fail. Every stage returns the first error it hits.
#[derive(Debug, Error)]
pub enum Error {
    #[error("game {0} not found")]
    NotFound(ObjectId),
    #[error("game {object} is malformed: {reason}")]
    MalformedState { object: ObjectId, reason: String },
    #[error("state of {object} unavailable: {reason}")]
    StateUnavailable { object: ObjectId, reason: String },
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),
    #[error("no {player_move} request for game {game} at player sum {player_sum}")]
    NoMatchingAuthorization {
        game: ObjectId,
        player_move: Move,
        player_sum: u16,
    },
    #[error("sponsor unavailable: {0}")]
    SponsorUnavailable(String),
    #[error("sponsor rejected transaction: {0}")]
    SponsorRejected(String),
    #[error("transaction {digest} failed with status {status}: {}", .error.as_deref().unwrap_or("no error reported"))]
    SubmissionFailed {
        digest: String,
        status: String,
        error: Option<String>,
    },
    #[error("transaction {digest} succeeded without a hit event")]
    EventMissing { digest: String },
    #[error("hit event in transaction {digest} is malformed: {reason}")]
    MalformedEvent { digest: String, reason: String },
    #[error("ledger {context} failed: {reason}")]
    Ledger {
        context: &'static str,
        reason: String,
    },
}

/// Result type for house operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn ledger(context: &'static str, err: impl std::fmt::Display) -> Self {
        Error::Ledger {
            context,
            reason: err.to_string(),
        }
    }
}
