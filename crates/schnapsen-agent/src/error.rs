use schnapsen_core::model::card::Card;
use thiserror::Error;

/// The task names a game or mode no registered identity serves. Rejection
/// has no side effects, so redelivery to another consumer is safe.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no identity serves {game}/{mode} for {ai_id}")]
pub struct TaskMismatch {
    pub ai_id: String,
    pub game: String,
    pub mode: String,
}

/// The predictor could not produce a card: transport trouble, a timeout, or
/// a response that is not a card token.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("predictor transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("predictor returned an unusable token {token:?}")]
    Malformed { token: String },
}

/// Why a predictor answer was discarded in favor of the random fallback.
#[derive(Debug, Error)]
pub enum DecisionRejection {
    #[error(transparent)]
    Service(#[from] PredictError),
    #[error("predicted card {card} is outside the legal move set")]
    IllegalMove { card: Card },
}

/// A protocol command the server refused or that could not be sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{command} command failed: {reason}")]
pub struct CommandError {
    pub command: &'static str,
    pub reason: String,
}

impl CommandError {
    pub fn new(command: &'static str, reason: impl Into<String>) -> Self {
        Self {
            command,
            reason: reason.into(),
        }
    }
}

/// Opening the protocol connection for an accepted task failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("connecting to {address} failed: {reason}")]
pub struct ConnectError {
    pub address: String,
    pub reason: String,
}
