//! Socket.io binding for the game protocol. Translates the wire vocabulary
//! (French suit names, `{value, suit}` card objects, flattened `timestamp`
//! fields) into typed [`GameEvent`]s and keeps the queryable live state the
//! session reads: legal moves, announceable combinations, talon size.

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use rust_socketio::asynchronous::{Client, ClientBuilder};
use rust_socketio::{Event, Payload};
use schnapsen_agent::dispatcher::{Connector, Task};
use schnapsen_agent::error::{CommandError, ConnectError};
use schnapsen_agent::protocol::{GameConnection, GameEvent};
use schnapsen_core::model::announcement::{AnnounceKind, Announcement};
use schnapsen_core::model::card::{Card, DECK_SIZE};
use schnapsen_core::model::rank::Rank;
use schnapsen_core::model::suit::Suit;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const TARGET: &str = "schnapsen_app::net";
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Wire card: rank spelled out, French suit names.
#[derive(Debug, Clone, Deserialize)]
struct WireCard {
    value: String,
    suit: String,
}

impl WireCard {
    fn decode(&self) -> Option<Card> {
        let rank = match self.value.as_str() {
            "Jack" => Rank::Jack,
            "Queen" => Rank::Queen,
            "King" => Rank::King,
            "Ten" => Rank::Ten,
            "Ace" => Rank::Ace,
            _ => return None,
        };
        let suit = match self.suit.as_str() {
            "Hearts" => Suit::Hearts,
            "Clubs" => Suit::Acorns,
            "Spades" => Suit::Leaves,
            "Diamonds" => Suit::Bells,
            _ => return None,
        };
        Some(Card::new(rank, suit))
    }
}

fn encode_card(card: Card) -> Value {
    let value = match card.rank {
        Rank::Jack => "Jack",
        Rank::Queen => "Queen",
        Rank::King => "King",
        Rank::Ten => "Ten",
        Rank::Ace => "Ace",
    };
    let suit = match card.suit {
        Suit::Hearts => "Hearts",
        Suit::Acorns => "Clubs",
        Suit::Leaves => "Spades",
        Suit::Bells => "Diamonds",
    };
    json!({ "value": value, "suit": suit })
}

#[derive(Debug, Deserialize)]
struct CardPayload {
    card: WireCard,
}

#[derive(Debug, Deserialize)]
struct PlayPayload {
    user_id: String,
    card: WireCard,
}

#[derive(Debug, Deserialize)]
struct TrickPayload {
    cards: Vec<WireCard>,
}

#[derive(Debug, Deserialize)]
struct ScorePayload {
    user_id: String,
    points: u32,
}

#[derive(Debug, Deserialize)]
struct TrumpChangePayload {
    card: Option<WireCard>,
}

#[derive(Debug, Deserialize)]
struct ResultPayload {
    winner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimeoutPayload {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct AnnouncePayload {
    cards: Vec<WireCard>,
    announce_type: String,
}

impl AnnouncePayload {
    fn decode(&self) -> Option<Announcement> {
        let kind = match self.announce_type.as_str() {
            "Twenty" => AnnounceKind::Twenty,
            "Forty" => AnnounceKind::Forty,
            _ => return None,
        };
        let [first, second] = self.cards.as_slice() else {
            return None;
        };
        Some(Announcement::new([first.decode()?, second.decode()?], kind))
    }
}

#[derive(Debug, Deserialize)]
struct DeckCountPayload {
    count: usize,
}

/// Mirror of the server-maintained per-player state, fed by wire events.
struct LiveState {
    playable: Vec<Card>,
    announcable: Vec<Announcement>,
    talon: usize,
}

impl Default for LiveState {
    fn default() -> Self {
        Self {
            playable: Vec::new(),
            announcable: Vec::new(),
            // Nonzero until the server reports a real count; the session
            // treats zero as "stock exhausted".
            talon: DECK_SIZE,
        }
    }
}

pub struct SocketConnection {
    user_id: String,
    live: Arc<RwLock<LiveState>>,
    client: Client,
}

impl SocketConnection {
    async fn emit(&self, command: &'static str, payload: Value) -> Result<(), CommandError> {
        self.client
            .emit(command, payload)
            .await
            .map_err(|err| CommandError::new(command, err.to_string()))
    }
}

#[async_trait]
impl GameConnection for SocketConnection {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn playable_cards(&self) -> Vec<Card> {
        self.live.read().playable.clone()
    }

    fn announcable(&self) -> Vec<Announcement> {
        self.live.read().announcable.clone()
    }

    fn talon_size(&self) -> usize {
        self.live.read().talon
    }

    async fn play_card(&self, card: Card) -> Result<(), CommandError> {
        self.emit("play_card", encode_card(card)).await
    }

    async fn announce_20(&self, cards: [Card; 2]) -> Result<(), CommandError> {
        self.emit(
            "announce_20",
            json!({ "cards": [encode_card(cards[0]), encode_card(cards[1])] }),
        )
        .await
    }

    async fn announce_40(&self) -> Result<(), CommandError> {
        self.emit("announce_40", json!({})).await
    }

    async fn swap_trump(&self, card: Card) -> Result<(), CommandError> {
        self.emit("swap_trump", encode_card(card)).await
    }

    async fn draw_card(&self) -> Result<(), CommandError> {
        self.emit("draw_card", json!({})).await
    }
}

/// Opens one socket.io connection per accepted task: namespace from the read
/// channel, write token as the auth payload.
#[derive(Debug, Default)]
pub struct SocketConnector;

impl SocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for SocketConnector {
    type Conn = SocketConnection;

    async fn connect(
        &self,
        task: &Task,
    ) -> Result<(Arc<SocketConnection>, mpsc::Receiver<GameEvent>), ConnectError> {
        let url = normalize_address(&task.address);
        let live = Arc::new(RwLock::new(LiveState::default()));
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let handler_live = live.clone();
        let client = ClientBuilder::new(url)
            .namespace(format!("/{}", task.read))
            .on_any(move |event: Event, payload: Payload, _client: Client| {
                let live = handler_live.clone();
                let tx = tx.clone();
                async move {
                    if let Some(event) = translate(&event, payload, &live) {
                        // A closed receiver just means the session ended
                        // first; late events are harmless.
                        if tx.send(event).await.is_err() {
                            debug!(target: TARGET, "session gone, dropping event");
                        }
                    }
                }
                .boxed()
            })
            .connect()
            .await
            .map_err(|err| ConnectError {
                address: task.address.clone(),
                reason: err.to_string(),
            })?;

        client
            .emit("auth", json!(task.write))
            .await
            .map_err(|err| ConnectError {
                address: task.address.clone(),
                reason: format!("auth failed: {err}"),
            })?;

        Ok((
            Arc::new(SocketConnection {
                user_id: task.ai_id.clone(),
                live,
                client,
            }),
            rx,
        ))
    }
}

fn normalize_address(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

fn first_value(payload: Payload) -> Option<Value> {
    match payload {
        Payload::Text(mut values) if !values.is_empty() => Some(values.remove(0)),
        _ => None,
    }
}

fn parse<T: serde::de::DeserializeOwned>(data: Option<Value>) -> Option<T> {
    serde_json::from_value(data?).ok()
}

/// Wire event -> session event. Events that only feed the live state return
/// `None`; so does anything unknown, after a log. Payloads carry a
/// flattened `timestamp` field which deserialization ignores.
fn translate(event: &Event, payload: Payload, live: &RwLock<LiveState>) -> Option<GameEvent> {
    let name = match event {
        Event::Custom(name) => name.as_str(),
        Event::Error => "error",
        _ => return None,
    };
    let data = first_value(payload);

    match name {
        "allow_announce" => Some(GameEvent::AllowAnnounce),
        "allow_play_card" => Some(GameEvent::AllowPlayCard),
        "allow_draw_card" => Some(GameEvent::AllowDrawCard),
        "allow_swap_trump" => Some(GameEvent::AllowSwapTrump),
        "trump_change_possible" => {
            let payload: CardPayload = parse(data)?;
            Some(GameEvent::TrumpChangePossible {
                card: payload.card.decode()?,
            })
        }
        "card_available" => {
            let payload: CardPayload = parse(data)?;
            Some(GameEvent::CardAvailable {
                card: payload.card.decode()?,
            })
        }
        "card_unavailable" => {
            let payload: CardPayload = parse(data)?;
            Some(GameEvent::CardUnavailable {
                card: payload.card.decode()?,
            })
        }
        "card_playable" => {
            if let Some(card) = parse::<CardPayload>(data).and_then(|p| p.card.decode()) {
                let mut live = live.write();
                if !live.playable.contains(&card) {
                    live.playable.push(card);
                }
            }
            None
        }
        "card_not_playable" => {
            if let Some(card) = parse::<CardPayload>(data).and_then(|p| p.card.decode()) {
                live.write().playable.retain(|other| *other != card);
            }
            None
        }
        "can_announce" => {
            if let Some(announcement) = parse::<AnnouncePayload>(data).and_then(|p| p.decode()) {
                let mut live = live.write();
                if !live.announcable.contains(&announcement) {
                    live.announcable.push(announcement);
                }
            }
            None
        }
        "cannot_announce" => {
            match parse::<AnnouncePayload>(data).and_then(|p| p.decode()) {
                Some(announcement) => live
                    .write()
                    .announcable
                    .retain(|other| *other != announcement),
                None => live.write().announcable.clear(),
            }
            None
        }
        "deck_card_count" => {
            if let Some(payload) = parse::<DeckCountPayload>(data) {
                live.write().talon = payload.count;
            }
            None
        }
        "trump_change" => {
            let payload: TrumpChangePayload = parse(data)?;
            Some(GameEvent::TrumpChange {
                suit: payload.card.and_then(|card| card.decode()).map(|c| c.suit),
            })
        }
        "play_card" => {
            let payload: PlayPayload = parse(data)?;
            Some(GameEvent::PlayCard {
                user_id: payload.user_id,
                card: payload.card.decode()?,
            })
        }
        "trick" => {
            let payload: TrickPayload = parse(data)?;
            let cards: Vec<Card> = payload
                .cards
                .iter()
                .filter_map(WireCard::decode)
                .collect();
            Some(GameEvent::Trick { cards })
        }
        "score" => {
            let payload: ScorePayload = parse(data)?;
            Some(GameEvent::Score {
                user_id: payload.user_id,
                points: payload.points,
            })
        }
        "close_talon" => Some(GameEvent::CloseTalon),
        // A bummerl final result reaches the session as one more round
        // result; the server closes the connection afterwards.
        "round_result" | "result" | "final_result" => {
            let winner = parse::<ResultPayload>(data).and_then(|p| p.winner);
            Some(GameEvent::RoundResult { winner })
        }
        "reset" => Some(GameEvent::Reset),
        "timeout" => {
            let payload: TimeoutPayload = parse(data)?;
            Some(GameEvent::Timeout {
                user_id: payload.user_id,
            })
        }
        "error" => {
            let message = match data {
                Some(Value::String(message)) => message,
                Some(other) => other.to_string(),
                None => "unspecified protocol error".to_string(),
            };
            Some(GameEvent::Error { message })
        }
        "active" | "inactive" | "announce" | "receive_card" | "finished_distribution" => None,
        other => {
            warn!(target: TARGET, event = other, "unhandled wire event");
            None
        }
    }
}
