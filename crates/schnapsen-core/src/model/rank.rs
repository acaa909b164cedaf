use core::fmt;
use serde::{Deserialize, Serialize};

/// The five Schnapsen ranks, discriminants doubling as trick values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rank {
    Jack = 2,
    Queen = 3,
    King = 4,
    Ten = 10,
    Ace = 11,
}

impl Rank {
    pub const ORDERED: [Rank; 5] = [Rank::Jack, Rank::Queen, Rank::King, Rank::Ten, Rank::Ace];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Rank::Jack),
            1 => Some(Rank::Queen),
            2 => Some(Rank::King),
            3 => Some(Rank::Ten),
            4 => Some(Rank::Ace),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Rank::Jack => 0,
            Rank::Queen => 1,
            Rank::King => 2,
            Rank::Ten => 3,
            Rank::Ace => 4,
        }
    }

    pub const fn value(self) -> u8 {
        self as u8
    }

    pub const fn letter(self) -> char {
        match self {
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ten => 'T',
            Rank::Ace => 'A',
        }
    }

    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'J' => Some(Rank::Jack),
            'Q' => Some(Rank::Queen),
            'K' => Some(Rank::King),
            'T' => Some(Rank::Ten),
            'A' => Some(Rank::Ace),
            _ => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[cfg(test)]
mod tests {
    use super::Rank;

    #[test]
    fn letters_round_trip() {
        for rank in Rank::ORDERED {
            assert_eq!(Rank::from_letter(rank.letter()), Some(rank));
        }
        assert_eq!(Rank::from_letter('X'), None);
    }

    #[test]
    fn values_match_trick_points() {
        assert_eq!(Rank::Jack.value(), 2);
        assert_eq!(Rank::Ace.value(), 11);
    }

    #[test]
    fn index_round_trips() {
        for (idx, rank) in Rank::ORDERED.iter().enumerate() {
            assert_eq!(rank.index(), idx);
            assert_eq!(Rank::from_index(idx), Some(*rank));
        }
    }
}
