use core::fmt;
use serde::{Deserialize, Serialize};

/// Canonical German suits. The protocol wire speaks French suit names; the
/// translation lives at the connection boundary, never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Suit {
    Hearts = 0,
    Acorns = 1,
    Leaves = 2,
    Bells = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Acorns, Suit::Leaves, Suit::Bells];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Suit::Hearts),
            1 => Some(Suit::Acorns),
            2 => Some(Suit::Leaves),
            3 => Some(Suit::Bells),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Suit::Hearts => "Hearts",
            Suit::Acorns => "Acorns",
            Suit::Leaves => "Leaves",
            Suit::Bells => "Bells",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Suit::ALL.iter().copied().find(|suit| suit.name() == name)
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::Suit;

    #[test]
    fn from_index_maps_valid_values() {
        assert_eq!(Suit::from_index(1), Some(Suit::Acorns));
        assert_eq!(Suit::from_index(4), None);
    }

    #[test]
    fn names_round_trip() {
        for suit in Suit::ALL {
            assert_eq!(Suit::from_name(suit.name()), Some(suit));
        }
        assert_eq!(Suit::from_name("Diamonds"), None);
    }
}
