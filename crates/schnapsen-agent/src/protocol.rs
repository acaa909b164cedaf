use crate::error::CommandError;
use async_trait::async_trait;
use schnapsen_core::model::announcement::Announcement;
use schnapsen_core::model::card::Card;
use schnapsen_core::model::suit::Suit;

/// Protocol traffic the session consumes, already translated out of the wire
/// vocabulary. Events arrive in emission order; the session performs no
/// reordering or deduplication of its own.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    AllowAnnounce,
    AllowPlayCard,
    AllowDrawCard,
    TrumpChangePossible { card: Card },
    AllowSwapTrump,
    CardAvailable { card: Card },
    CardUnavailable { card: Card },
    TrumpChange { suit: Option<Suit> },
    PlayCard { user_id: String, card: Card },
    Trick { cards: Vec<Card> },
    Score { user_id: String, points: u32 },
    CloseTalon,
    RoundResult { winner: Option<String> },
    Reset,
    Timeout { user_id: String },
    Error { message: String },
}

/// One attached match connection. The protocol layer keeps the queryable
/// live state (legal moves, announceable combinations, talon size) current;
/// legality itself is enforced server-side.
#[async_trait]
pub trait GameConnection: Send + Sync + 'static {
    /// The participant id this connection is authenticated as.
    fn user_id(&self) -> &str;

    fn playable_cards(&self) -> Vec<Card>;

    fn announcable(&self) -> Vec<Announcement>;

    fn talon_size(&self) -> usize;

    async fn play_card(&self, card: Card) -> Result<(), CommandError>;

    async fn announce_20(&self, cards: [Card; 2]) -> Result<(), CommandError>;

    async fn announce_40(&self) -> Result<(), CommandError>;

    async fn swap_trump(&self, card: Card) -> Result<(), CommandError>;

    async fn draw_card(&self) -> Result<(), CommandError>;
}
