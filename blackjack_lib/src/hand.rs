//! Hand scoring.

use crate::card::Card;

/// Computes the blackjack value of `hand`. Every ace starts out worth 11 and is
/// knocked down to 1, one at a time, while the total is over 21.
pub fn hand_value(hand: &[Card]) -> u8 {
    let (total, _) = total_and_soft_aces(hand);
    total
}

/// True when the hand is a natural, i.e. exactly two cards worth 21.
pub fn is_natural(hand: &[Card]) -> bool {
    hand.len() == 2 && hand_value(hand) == 21
}

/// True when at least one ace in the hand is still being counted as 11.
pub fn is_soft(hand: &[Card]) -> bool {
    let (_, soft_aces) = total_and_soft_aces(hand);
    soft_aces > 0
}

fn total_and_soft_aces(hand: &[Card]) -> (u8, u8) {
    let mut total: u32 = 0;
    let mut aces: u8 = 0;
    for card in hand {
        total += card.val() as u32;
        if card.is_ace() {
            aces += 1;
        }
    }
    while total > 21 && aces > 0 {
        total -= 10;
        aces -= 1;
    }
    (total.min(u8::MAX as u32) as u8, aces)
}
