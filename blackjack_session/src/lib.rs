//! Stateless blackjack sessions. The round lives entirely inside a signed token that
//! the client sends back with every action, so the server never stores a session.

pub mod codec;
pub mod handler;

pub use blackjack_lib::{Action, RoundState, Status, View};
pub use codec::{SigningKey, StateToken, DEV_SECRET};
pub use handler::{handle, GameRequest, GameResponse, DEFAULT_BET, DEFAULT_CURRENCY};

pub mod prelude {
    pub use super::{
        handle, GameRequest, GameResponse, RoundState, SessionError, SigningKey, Status, View,
        DEV_SECRET,
    };
}

/// Everything that can reject a single request. None of these are fatal to the server.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token's payload does not match its signature under the current secret.
    #[error("Invalid state signature")]
    InvalidSignature,
    #[error("Malformed state token")]
    MalformedToken,
    #[error("Missing stateToken")]
    MissingToken,
    #[error("Unknown action")]
    UnknownAction,
    #[error("Invalid bet")]
    InvalidBet,
    #[error("unable to encode round state: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    /// Whether the error was caused by the request rather than by the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, SessionError::Serialization(_))
    }
}
