//! Rules engine for a single-player round of blackjack against a dealer.
//!
//! The crate knows nothing about transport or signing: it deals from a [`Shoe`],
//! scores hands, moves a [`RoundState`] through its statuses and projects the
//! client-facing [`View`]. Everything here is a pure, in-memory computation.

pub mod card;
pub mod hand;
pub mod round;
pub mod shoe;
pub mod view;

pub use card::{Card, Rank, Suit};
pub use hand::{hand_value, is_natural, is_soft};
pub use round::{Action, RoundState, Status, DEALER_STANDS_ON};
pub use shoe::{Shoe, NUM_DECKS};
pub use view::{DealerCard, View, FACE_DOWN};

pub mod prelude {
    pub use super::{
        hand_value, is_natural, Action, BlackjackGameError, Card, DealerCard, Rank, RoundState,
        Shoe, Status, Suit, View,
    };
}

/// Errors raised while reading game data from untrusted text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlackjackGameError {
    #[error("invalid card: {0:?}")]
    InvalidCard(String),
    #[error("unknown action: {0:?}")]
    UnknownAction(String),
}
