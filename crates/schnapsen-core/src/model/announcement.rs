use crate::model::card::Card;
use serde::{Deserialize, Serialize};

/// A declared king+queen combination, worth 40 in trump and 20 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub cards: [Card; 2],
    pub kind: AnnounceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AnnounceKind {
    Twenty = 20,
    Forty = 40,
}

impl AnnounceKind {
    pub const fn points(self) -> u8 {
        self as u8
    }
}

impl Announcement {
    pub const fn new(cards: [Card; 2], kind: AnnounceKind) -> Self {
        Self { cards, kind }
    }

    /// The card the announcing player leads with after declaring.
    pub const fn lead_card(self) -> Card {
        self.cards[0]
    }
}
