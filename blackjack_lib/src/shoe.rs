use crate::card::{Card, Rank, Suit};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Number of 52 card decks combined into one shoe.
pub const NUM_DECKS: usize = 4;

/// The shoe the round is dealt from. Cards are dealt from the back of the vector,
/// so the last element is always the next card out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shoe {
    cards: Vec<Card>,
}

impl Shoe {
    /// Associated function to build a freshly shuffled shoe of `NUM_DECKS` decks.
    pub fn new() -> Shoe {
        let mut cards = Vec::with_capacity(52 * NUM_DECKS);
        for _ in 0..NUM_DECKS {
            for suit in Suit::ALL {
                for rank in Rank::ALL {
                    cards.push(Card::new(rank, suit));
                }
            }
        }
        cards.shuffle(&mut rand::thread_rng());
        Shoe { cards }
    }

    /// Builds a shoe with an exact card order, the last card given is dealt first.
    pub fn from_cards(cards: Vec<Card>) -> Shoe {
        Shoe { cards }
    }

    /// Removes and returns the next card.
    ///
    /// # Panics
    /// Panics if the shoe is empty. A single round can never draw a full shoe,
    /// so running out means the state itself is corrupt.
    pub fn deal(&mut self) -> Card {
        match self.cards.pop() {
            Some(card) => card,
            None => panic!("shoe exhausted"),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[cfg(test)]
    fn cards(&self) -> &[Card] {
        &self.cards
    }
}
