//! The round state machine. A `RoundState` is the full, authoritative snapshot of a
//! round: it is what gets signed and handed to the client between requests.

use crate::hand::{hand_value, is_natural};
use crate::shoe::Shoe;
use crate::{BlackjackGameError, Card};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// The dealer draws while below this total and stands on it, soft or hard.
pub const DEALER_STANDS_ON: u8 = 17;

/// Where a round currently is. Every status except `Playing` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Playing,
    Push,
    PlayerBlackjack,
    DealerBlackjack,
    PlayerBust,
    DealerBust,
    PlayerWin,
    DealerWin,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Playing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Playing => "playing",
            Status::Push => "push",
            Status::PlayerBlackjack => "player_blackjack",
            Status::DealerBlackjack => "dealer_blackjack",
            Status::PlayerBust => "player_bust",
            Status::DealerBust => "dealer_bust",
            Status::PlayerWin => "player_win",
            Status::DealerWin => "dealer_win",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A player decision applied to a round in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Hit,
    Stand,
    Double,
}

impl FromStr for Action {
    type Err = BlackjackGameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hit" => Ok(Action::Hit),
            "stand" => Ok(Action::Stand),
            "double" => Ok(Action::Double),
            _ => Err(BlackjackGameError::UnknownAction(s.to_string())),
        }
    }
}

/// Full state of a single round. Field names on the wire are fixed, previously
/// issued tokens depend on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundState {
    /// Unix time, in seconds, at which the round was dealt.
    #[serde(rename = "t")]
    pub timestamp: u64,
    pub deck: Shoe,
    pub player: Vec<Card>,
    pub dealer: Vec<Card>,
    pub bet: f64,
    pub currency: String,
    #[serde(rename = "publicKey")]
    pub public_key: Option<String>,
    pub status: Status,
    pub doubled: bool,
    #[serde(rename = "revealDealer")]
    pub reveal_dealer: bool,
}

impl RoundState {
    /// Deals a new round from `deck`: two cards to the player, then two to the dealer.
    /// Naturals are settled immediately, in which case the round starts out terminal
    /// with the dealer's hole card revealed.
    pub fn start(
        mut deck: Shoe,
        bet: f64,
        currency: String,
        public_key: Option<String>,
        timestamp: u64,
    ) -> RoundState {
        let player = vec![deck.deal(), deck.deal()];
        let dealer = vec![deck.deal(), deck.deal()];

        let status = match (is_natural(&player), is_natural(&dealer)) {
            (true, true) => Status::Push,
            (true, false) => Status::PlayerBlackjack,
            (false, true) => Status::DealerBlackjack,
            (false, false) => Status::Playing,
        };

        RoundState {
            timestamp,
            deck,
            player,
            dealer,
            bet,
            currency,
            public_key,
            status,
            doubled: false,
            reveal_dealer: status.is_terminal(),
        }
    }

    /// Applies `action` to the round. Actions against a finished round are ignored
    /// and leave the state exactly as it was.
    ///
    /// A double that is no longer allowed (already doubled, or more than two cards)
    /// is played as a plain hit.
    pub fn apply(&mut self, action: Action) {
        if self.status.is_terminal() {
            return;
        }

        match action {
            Action::Hit => self.hit(),
            Action::Double if self.can_double() => {
                self.doubled = true;
                self.bet *= 2.0;
                self.hit();
                if !self.status.is_terminal() {
                    self.stand();
                }
            }
            Action::Double => self.hit(),
            Action::Stand => self.stand(),
        }
    }

    /// Doubling is only offered on the first two cards of a live round.
    pub fn can_double(&self) -> bool {
        self.status == Status::Playing && self.player.len() == 2 && !self.doubled
    }

    /// Splitting is not supported.
    pub fn can_split(&self) -> bool {
        false
    }

    pub fn player_value(&self) -> u8 {
        hand_value(&self.player)
    }

    pub fn dealer_value(&self) -> u8 {
        hand_value(&self.dealer)
    }

    fn hit(&mut self) {
        let card = self.deck.deal();
        self.player.push(card);
        if self.player_value() > 21 {
            self.status = Status::PlayerBust;
            self.reveal_dealer = true;
        }
    }

    /// Plays out the dealer's hand and settles the round.
    fn stand(&mut self) {
        while self.dealer_value() < DEALER_STANDS_ON {
            let card = self.deck.deal();
            self.dealer.push(card);
        }

        let (player_value, dealer_value) = (self.player_value(), self.dealer_value());
        self.status = if dealer_value > 21 {
            Status::DealerBust
        } else if player_value > dealer_value {
            Status::PlayerWin
        } else if player_value < dealer_value {
            Status::DealerWin
        } else {
            Status::Push
        };
        self.reveal_dealer = true;
    }
}
