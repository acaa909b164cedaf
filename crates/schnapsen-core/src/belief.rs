use crate::mode::UnavailablePolicy;
use crate::model::card::{Card, DECK_SIZE};
use crate::model::suit::Suit;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// What the agent knows about a single deck slot. Transitions are monotonic:
/// `Unknown -> InHand -> Resolved` or `Unknown -> Resolved`, never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CardFact {
    #[default]
    Unknown,
    InHand,
    Resolved,
}

impl CardFact {
    const fn wire_name(self) -> &'static str {
        match self {
            CardFact::Unknown => "unknown",
            CardFact::InHand => "mine",
            CardFact::Resolved => "resolved",
        }
    }
}

/// Everything one match session currently believes about its match. Pure
/// data and update rules; the session feeds it protocol events in delivery
/// order and ships snapshots to the predictor.
#[derive(Debug, Clone)]
pub struct BeliefState {
    facts: [CardFact; DECK_SIZE],
    trump_suit: Option<Suit>,
    last_opponent_card: Option<Card>,
    follow_suit: bool,
    own_points: u32,
    opponent_points: u32,
    skill_level: u8,
}

impl BeliefState {
    pub fn new(skill_level: u8) -> Self {
        Self {
            facts: [CardFact::Unknown; DECK_SIZE],
            trump_suit: None,
            last_opponent_card: None,
            follow_suit: false,
            own_points: 0,
            opponent_points: 0,
            skill_level,
        }
    }

    pub fn fact(&self, card: Card) -> CardFact {
        self.facts[card.deck_index()]
    }

    pub fn trump_suit(&self) -> Option<Suit> {
        self.trump_suit
    }

    pub fn last_opponent_card(&self) -> Option<Card> {
        self.last_opponent_card
    }

    pub fn follow_suit(&self) -> bool {
        self.follow_suit
    }

    pub fn own_points(&self) -> u32 {
        self.own_points
    }

    pub fn opponent_points(&self) -> u32 {
        self.opponent_points
    }

    pub fn skill_level(&self) -> u8 {
        self.skill_level
    }

    /// Round boundary: back to defaults, keeping only the fixed skill level.
    pub fn reset_round(&mut self) {
        *self = Self::new(self.skill_level);
    }

    pub fn note_card_available(&mut self, card: Card) {
        self.advance(card, CardFact::InHand);
    }

    /// Informational in the default configuration; some deployments resolve
    /// the card instead.
    pub fn note_card_unavailable(&mut self, card: Card, policy: UnavailablePolicy) {
        match policy {
            UnavailablePolicy::Ignore => {}
            UnavailablePolicy::Resolve => self.advance(card, CardFact::Resolved),
        }
    }

    pub fn note_trick(&mut self, cards: &[Card]) {
        for &card in cards {
            self.advance(card, CardFact::Resolved);
        }
        self.last_opponent_card = None;
    }

    pub fn note_trump_change(&mut self, suit: Option<Suit>) {
        if let Some(suit) = suit {
            self.trump_suit = Some(suit);
        }
    }

    pub fn note_card_played(&mut self, actor: &str, own_id: &str, card: Card) {
        if actor != own_id {
            self.last_opponent_card = Some(card);
        }
    }

    /// Latched for the rest of the round; the talon never reopens.
    pub fn note_talon_closed(&mut self) {
        self.follow_suit = true;
    }

    pub fn note_score(&mut self, actor: &str, own_id: &str, points: u32) {
        if actor == own_id {
            self.own_points = points;
        } else {
            self.opponent_points = points;
        }
    }

    /// The card surrendered in a trump swap is gone for good.
    pub fn note_trump_swap(&mut self, card: Card) {
        self.advance(card, CardFact::Resolved);
    }

    fn advance(&mut self, card: Card, next: CardFact) {
        let slot = &mut self.facts[card.deck_index()];
        if next > *slot {
            *slot = next;
        }
    }
}

impl Serialize for BeliefState {
    /// Predictor request body: a flat object with one `<Suit>_<RankLetter>`
    /// entry per deck slot plus the scalar fields, canonical suit names
    /// throughout.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(DECK_SIZE + 6))?;
        for card in Card::deck() {
            let key = format!("{}_{}", card.suit, card.rank.letter());
            map.serialize_entry(&key, self.fact(card).wire_name())?;
        }
        map.serialize_entry("trump_suit", &self.trump_suit.map(Suit::name))?;
        map.serialize_entry(
            "last_enemy_card",
            &self.last_opponent_card.map(|card| card.to_string()),
        )?;
        map.serialize_entry("follow_suit", &self.follow_suit)?;
        map.serialize_entry("own_points", &self.own_points)?;
        map.serialize_entry("enemy_points", &self.opponent_points)?;
        map.serialize_entry("skill_level", &self.skill_level)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::{BeliefState, CardFact};
    use crate::mode::UnavailablePolicy;
    use crate::model::card::Card;
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;

    fn jack_of_hearts() -> Card {
        Card::new(Rank::Jack, Suit::Hearts)
    }

    #[test]
    fn available_card_moves_into_hand() {
        let mut belief = BeliefState::new(3);
        assert_eq!(belief.fact(jack_of_hearts()), CardFact::Unknown);
        belief.note_card_available(jack_of_hearts());
        assert_eq!(belief.fact(jack_of_hearts()), CardFact::InHand);
    }

    #[test]
    fn trick_resolves_every_listed_card() {
        let mut belief = BeliefState::new(3);
        let queen = Card::new(Rank::Queen, Suit::Acorns);
        belief.note_card_available(jack_of_hearts());
        belief.note_trick(&[jack_of_hearts(), queen]);
        assert_eq!(belief.fact(jack_of_hearts()), CardFact::Resolved);
        assert_eq!(belief.fact(queen), CardFact::Resolved);
    }

    #[test]
    fn card_knowledge_never_regresses() {
        let mut belief = BeliefState::new(3);
        belief.note_trick(&[jack_of_hearts()]);
        belief.note_card_available(jack_of_hearts());
        assert_eq!(belief.fact(jack_of_hearts()), CardFact::Resolved);
    }

    #[test]
    fn null_trump_change_keeps_previous_suit() {
        let mut belief = BeliefState::new(3);
        belief.note_trump_change(Some(Suit::Bells));
        belief.note_trump_change(None);
        assert_eq!(belief.trump_suit(), Some(Suit::Bells));
    }

    #[test]
    fn unavailable_card_is_a_noop_by_default() {
        let mut belief = BeliefState::new(3);
        belief.note_card_available(jack_of_hearts());
        belief.note_card_unavailable(jack_of_hearts(), UnavailablePolicy::Ignore);
        assert_eq!(belief.fact(jack_of_hearts()), CardFact::InHand);
        belief.note_card_unavailable(jack_of_hearts(), UnavailablePolicy::Resolve);
        assert_eq!(belief.fact(jack_of_hearts()), CardFact::Resolved);
    }

    #[test]
    fn opponent_play_is_remembered_until_the_trick_falls() {
        let mut belief = BeliefState::new(3);
        let ten = Card::new(Rank::Ten, Suit::Leaves);
        belief.note_card_played("them", "me", ten);
        assert_eq!(belief.last_opponent_card(), Some(ten));
        belief.note_card_played("me", "me", jack_of_hearts());
        assert_eq!(belief.last_opponent_card(), Some(ten));
        belief.note_trick(&[ten, jack_of_hearts()]);
        assert_eq!(belief.last_opponent_card(), None);
    }

    #[test]
    fn scores_route_by_actor_id() {
        let mut belief = BeliefState::new(3);
        belief.note_score("me", "me", 24);
        belief.note_score("them", "me", 12);
        assert_eq!(belief.own_points(), 24);
        assert_eq!(belief.opponent_points(), 12);
    }

    #[test]
    fn reset_keeps_only_the_skill_level() {
        let mut belief = BeliefState::new(7);
        belief.note_card_available(jack_of_hearts());
        belief.note_trump_change(Some(Suit::Acorns));
        belief.note_talon_closed();
        belief.note_score("me", "me", 40);
        belief.reset_round();
        assert_eq!(belief.fact(jack_of_hearts()), CardFact::Unknown);
        assert_eq!(belief.trump_suit(), None);
        assert!(!belief.follow_suit());
        assert_eq!(belief.own_points(), 0);
        assert_eq!(belief.skill_level(), 7);
    }

    #[test]
    fn serializes_to_the_predictor_vocabulary() {
        let mut belief = BeliefState::new(5);
        belief.note_card_available(jack_of_hearts());
        belief.note_trump_change(Some(Suit::Bells));
        belief.note_card_played("them", "me", Card::new(Rank::Ace, Suit::Acorns));

        let value = serde_json::to_value(&belief).expect("belief serializes");
        assert_eq!(value["Hearts_J"], "mine");
        assert_eq!(value["Bells_A"], "unknown");
        assert_eq!(value["trump_suit"], "Bells");
        assert_eq!(value["last_enemy_card"], "AAcorns");
        assert_eq!(value["follow_suit"], false);
        assert_eq!(value["skill_level"], 5);
        assert_eq!(value.as_object().map(|map| map.len()), Some(26));
    }
}
