use crate::model::rank::Rank;
use crate::model::suit::Suit;
use core::fmt;
use serde::{Deserialize, Serialize};

pub const DECK_SIZE: usize = Suit::ALL.len() * Rank::ORDERED.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// Total mapping onto `0..DECK_SIZE`; the inverse of [`Card::from_deck_index`].
    pub const fn deck_index(self) -> usize {
        self.suit.index() * Rank::ORDERED.len() + self.rank.index()
    }

    pub const fn from_deck_index(index: usize) -> Option<Self> {
        let ranks = Rank::ORDERED.len();
        match (
            Suit::from_index(index / ranks),
            Rank::from_index(index % ranks),
        ) {
            (Some(suit), Some(rank)) => Some(Card::new(rank, suit)),
            _ => None,
        }
    }

    /// Parses a predictor token: rank letter followed by the canonical suit
    /// name, e.g. `JHearts` or `ABells`.
    pub fn from_token(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        let rank = Rank::from_letter(chars.next()?)?;
        let suit = Suit::from_name(chars.as_str())?;
        Some(Card::new(rank, suit))
    }

    pub fn deck() -> impl Iterator<Item = Card> {
        (0..DECK_SIZE).filter_map(Card::from_deck_index)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[cfg(test)]
mod tests {
    use super::{Card, DECK_SIZE};
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;

    #[test]
    fn deck_index_is_total_and_unique() {
        let mut seen = [false; DECK_SIZE];
        for card in Card::deck() {
            let index = card.deck_index();
            assert!(!seen[index]);
            seen[index] = true;
            assert_eq!(Card::from_deck_index(index), Some(card));
        }
        assert!(seen.iter().all(|slot| *slot));
    }

    #[test]
    fn deck_has_twenty_cards() {
        assert_eq!(Card::deck().count(), 20);
    }

    #[test]
    fn tokens_round_trip() {
        let card = Card::new(Rank::Jack, Suit::Hearts);
        assert_eq!(card.to_string(), "JHearts");
        assert_eq!(Card::from_token("JHearts"), Some(card));
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert_eq!(Card::from_token(""), None);
        assert_eq!(Card::from_token("ZHearts"), None);
        assert_eq!(Card::from_token("JDiamonds"), None);
        assert_eq!(Card::from_token("prediction failed"), None);
    }
}
