//! Client-facing projection of a round. Views are derived on every response and
//! never signed, so the dealer's hole card must not leak into one.

use crate::hand::hand_value;
use crate::round::{RoundState, Status};
use crate::Card;
use serde::{Serialize, Serializer};

/// Marker shown in place of a card the player is not allowed to see.
pub const FACE_DOWN: &str = "🂠";

/// A dealer card as the player sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealerCard {
    Up(Card),
    FaceDown,
}

impl Serialize for DealerCard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DealerCard::Up(card) => card.serialize(serializer),
            DealerCard::FaceDown => serializer.serialize_str(FACE_DOWN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub player: Vec<Card>,
    pub dealer: Vec<DealerCard>,
    pub status: Status,
    pub bet: f64,
    pub can_double: bool,
    pub can_split: bool,
    pub reveal_dealer: bool,
    pub player_total: u8,
    /// Total of the dealer cards shown in `dealer`, hidden cards excluded.
    pub dealer_total: u8,
}

impl View {
    /// Projects `state` into what the player may see. The dealer is shown in full once
    /// the round is over or the state says so; otherwise only the up card is shown.
    pub fn project(state: &RoundState) -> View {
        let reveal_dealer = state.reveal_dealer || state.status.is_terminal();
        let visible = if reveal_dealer {
            &state.dealer[..]
        } else {
            &state.dealer[..state.dealer.len().min(1)]
        };

        let mut dealer: Vec<DealerCard> = visible.iter().copied().map(DealerCard::Up).collect();
        dealer.resize(state.dealer.len(), DealerCard::FaceDown);

        View {
            player: state.player.clone(),
            dealer,
            status: state.status,
            bet: state.bet,
            can_double: state.can_double(),
            can_split: state.can_split(),
            reveal_dealer,
            player_total: state.player_value(),
            dealer_total: hand_value(visible),
        }
    }
}
