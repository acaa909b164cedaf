use crate::error::{DecisionRejection, PredictError};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use schnapsen_core::belief::BeliefState;
use schnapsen_core::model::card::Card;
use std::time::Duration;
use tracing::{debug, warn};

const TARGET: &str = "schnapsen_agent::decision";

/// The external move oracle. One call per decision, no retries; a failed
/// call is equivalent to an illegal answer.
#[async_trait]
pub trait MovePredictor: Send + Sync + 'static {
    async fn predict(&self, belief: &BeliefState) -> Result<Card, PredictError>;
}

/// Synchronous HTTP predictor: POSTs the serialized belief state, expects a
/// bare card token back. The request timeout bounds how long a session can
/// hang on the oracle.
pub struct HttpPredictor {
    client: reqwest::Client,
    endpoint: String,
    credential: String,
}

impl HttpPredictor {
    pub fn new(
        endpoint: impl Into<String>,
        credential: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PredictError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            credential: credential.into(),
        })
    }
}

#[async_trait]
impl MovePredictor for HttpPredictor {
    async fn predict(&self, belief: &BeliefState) -> Result<Card, PredictError> {
        let body = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.credential)
            .json(belief)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let token = body.trim().trim_matches('"');
        Card::from_token(token).ok_or_else(|| PredictError::Malformed {
            token: token.to_string(),
        })
    }
}

/// Consults the predictor and guarantees a legal answer: any transport
/// failure, malformed token, or out-of-set card falls back to a uniformly
/// random member of the legal move set.
pub struct DecisionEngine<P> {
    predictor: P,
}

impl<P: MovePredictor> DecisionEngine<P> {
    pub fn new(predictor: P) -> Self {
        Self { predictor }
    }

    /// `legal` is never empty when the session asks for a decision.
    pub async fn decide(&self, belief: &BeliefState, legal: &[Card]) -> Card {
        match self.vet(belief, legal).await {
            Ok(card) => {
                debug!(target: TARGET, %card, "predictor answer accepted");
                card
            }
            Err(rejection) => {
                let card = random_legal(legal);
                warn!(target: TARGET, %rejection, fallback = %card, "predictor answer discarded");
                card
            }
        }
    }

    async fn vet(&self, belief: &BeliefState, legal: &[Card]) -> Result<Card, DecisionRejection> {
        let card = self.predictor.predict(belief).await?;
        if legal.contains(&card) {
            Ok(card)
        } else {
            Err(DecisionRejection::IllegalMove { card })
        }
    }
}

pub(crate) fn random_legal(legal: &[Card]) -> Card {
    legal
        .choose(&mut rand::thread_rng())
        .copied()
        .expect("legal move set is non-empty at decision time")
}

#[cfg(test)]
mod tests {
    use super::{DecisionEngine, MovePredictor};
    use crate::error::PredictError;
    use async_trait::async_trait;
    use schnapsen_core::belief::BeliefState;
    use schnapsen_core::model::card::Card;
    use schnapsen_core::model::rank::Rank;
    use schnapsen_core::model::suit::Suit;

    enum Scripted {
        Card(Card),
        Garbage(&'static str),
    }

    #[async_trait]
    impl MovePredictor for Scripted {
        async fn predict(&self, _belief: &BeliefState) -> Result<Card, PredictError> {
            match self {
                Scripted::Card(card) => Ok(*card),
                Scripted::Garbage(token) => Err(PredictError::Malformed {
                    token: (*token).to_string(),
                }),
            }
        }
    }

    fn legal_moves() -> Vec<Card> {
        vec![
            Card::new(Rank::Jack, Suit::Hearts),
            Card::new(Rank::Ten, Suit::Bells),
            Card::new(Rank::Ace, Suit::Leaves),
        ]
    }

    #[tokio::test]
    async fn legal_prediction_is_used_verbatim() {
        let wanted = Card::new(Rank::Ten, Suit::Bells);
        let engine = DecisionEngine::new(Scripted::Card(wanted));
        let chosen = engine.decide(&BeliefState::new(1), &legal_moves()).await;
        assert_eq!(chosen, wanted);
    }

    #[tokio::test]
    async fn illegal_prediction_falls_back_to_the_legal_set() {
        let outsider = Card::new(Rank::Ace, Suit::Acorns);
        let engine = DecisionEngine::new(Scripted::Card(outsider));
        let legal = legal_moves();
        for _ in 0..16 {
            let chosen = engine.decide(&BeliefState::new(1), &legal).await;
            assert!(legal.contains(&chosen));
        }
    }

    #[tokio::test]
    async fn failure_token_never_becomes_a_card() {
        let engine = DecisionEngine::new(Scripted::Garbage("prediction failed"));
        let legal = legal_moves();
        for _ in 0..16 {
            let chosen = engine.decide(&BeliefState::new(1), &legal).await;
            assert!(legal.contains(&chosen));
        }
    }

    #[tokio::test]
    async fn single_legal_move_is_forced() {
        let only = Card::new(Rank::King, Suit::Hearts);
        let engine = DecisionEngine::new(Scripted::Garbage("?"));
        let chosen = engine.decide(&BeliefState::new(1), &[only]).await;
        assert_eq!(chosen, only);
    }
}
