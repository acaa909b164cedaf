use crate::decision::{DecisionEngine, MovePredictor, random_legal};
use crate::protocol::{GameConnection, GameEvent};
use schnapsen_core::belief::BeliefState;
use schnapsen_core::mode::ModePolicy;
use schnapsen_core::model::announcement::AnnounceKind;
use schnapsen_core::model::card::Card;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

const TARGET: &str = "schnapsen_agent::session";

/// Fixed delays before each outbound action. The server runs its own
/// transition after granting an allowance; acting immediately races it.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub pre_play: Duration,
    pub pre_announce: Duration,
    pub post_announce: Duration,
    pub pre_swap: Duration,
    pub pre_draw: Duration,
    pub pre_recovery: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            pre_play: Duration::from_millis(600),
            pre_announce: Duration::from_millis(700),
            post_announce: Duration::from_millis(800),
            pre_swap: Duration::from_millis(500),
            pre_draw: Duration::from_millis(400),
            pre_recovery: Duration::from_millis(900),
        }
    }
}

impl Pacing {
    /// No delays at all; only useful for driving a session in tests.
    pub const fn instant() -> Self {
        Self {
            pre_play: Duration::ZERO,
            pre_announce: Duration::ZERO,
            post_announce: Duration::ZERO,
            pre_swap: Duration::ZERO,
            pre_draw: Duration::ZERO,
            pre_recovery: Duration::ZERO,
        }
    }
}

/// Delayed-action scheduler, one per session. Pending actions are spawned
/// so fresh events can interleave with them; a terminal event cancels the
/// lot instead of letting stale actions fire into a dead match.
#[derive(Default)]
struct ActionPacer {
    pending: StdMutex<Vec<AbortHandle>>,
    cancelled: AtomicBool,
}

impl ActionPacer {
    fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            action.await;
        });
        let mut pending = self.pending.lock().expect("pacer mutex poisoned");
        pending.retain(|earlier| !earlier.is_finished());
        pending.push(handle.abort_handle());
    }

    fn cancel_all(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        for handle in self
            .pending
            .lock()
            .expect("pacer mutex poisoned")
            .drain(..)
        {
            handle.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingAnnounceDecision,
    AwaitingTrumpSwapDecision,
    AwaitingPlayDecision,
    Error,
    Terminal,
}

/// Eligibility and execution authority for a trump swap arrive as two
/// separate events; the card travels with the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwapState {
    Idle,
    Eligible(Card),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Completed,
    TimedOut,
    ConnectionClosed,
}

struct Inner {
    belief: BeliefState,
    phase: Phase,
    swap: SwapState,
    /// An announcement is in flight; it plays the committing card itself.
    suspend_play: bool,
    /// A card has already been submitted for the current turn.
    card_committed: bool,
    /// The one-shot error recovery has fired since the last reset.
    retry_used: bool,
}

/// One attached match: reacts to protocol events, keeps the belief state
/// current, and asks the decision engine whenever the server allows a play.
///
/// Belief updates are applied synchronously in delivery order; the acting
/// continuations sleep first and are therefore interleavable with later
/// events. `suspend_play` and `card_committed` serialize the
/// announce-then-play and play-once invariants across those interleavings.
pub struct MatchSession<C, P> {
    conn: Arc<C>,
    engine: Arc<DecisionEngine<P>>,
    policy: ModePolicy,
    pacing: Pacing,
    inner: Mutex<Inner>,
    pacer: ActionPacer,
}

impl<C: GameConnection, P: MovePredictor> MatchSession<C, P> {
    pub fn new(
        conn: Arc<C>,
        engine: Arc<DecisionEngine<P>>,
        policy: ModePolicy,
        pacing: Pacing,
        belief: BeliefState,
    ) -> Arc<Self> {
        Arc::new(Self {
            conn,
            engine,
            policy,
            pacing,
            inner: Mutex::new(Inner {
                belief,
                phase: Phase::Idle,
                swap: SwapState::Idle,
                suspend_play: false,
                card_committed: false,
                retry_used: false,
            }),
            pacer: ActionPacer::default(),
        })
    }

    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.phase
    }

    pub async fn belief_snapshot(&self) -> BeliefState {
        self.inner.lock().await.belief.clone()
    }

    /// Consumes the event stream until the match ends or the connection
    /// drops. Pending delayed actions are cancelled on the way out.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<GameEvent>) -> SessionEnd {
        let end = loop {
            let Some(event) = events.recv().await else {
                break SessionEnd::ConnectionClosed;
            };
            if let Some(end) = self.dispatch(event).await {
                break end;
            }
        };
        self.pacer.cancel_all();
        self.inner.lock().await.phase = Phase::Terminal;
        debug!(target: TARGET, ?end, "session released");
        end
    }

    async fn dispatch(self: &Arc<Self>, event: GameEvent) -> Option<SessionEnd> {
        let mut inner = self.inner.lock().await;
        match event {
            GameEvent::CardAvailable { card } => inner.belief.note_card_available(card),
            GameEvent::CardUnavailable { card } => inner
                .belief
                .note_card_unavailable(card, self.policy.unavailable),
            GameEvent::TrumpChange { suit } => inner.belief.note_trump_change(suit),
            GameEvent::PlayCard { user_id, card } => {
                inner
                    .belief
                    .note_card_played(&user_id, self.conn.user_id(), card)
            }
            GameEvent::Trick { cards } => inner.belief.note_trick(&cards),
            GameEvent::Score { user_id, points } => {
                inner
                    .belief
                    .note_score(&user_id, self.conn.user_id(), points)
            }
            GameEvent::CloseTalon => inner.belief.note_talon_closed(),
            GameEvent::AllowAnnounce => {
                if self.policy.announce_enabled {
                    inner.suspend_play = true;
                    inner.phase = Phase::AwaitingAnnounceDecision;
                    let session = self.clone();
                    self.pacer
                        .schedule(self.pacing.pre_announce, async move {
                            session.announce_flow().await;
                        });
                }
            }
            GameEvent::AllowPlayCard => {
                inner.card_committed = false;
                inner.phase = Phase::AwaitingPlayDecision;
                let session = self.clone();
                self.pacer.schedule(self.pacing.pre_play, async move {
                    session.play_flow().await;
                });
            }
            GameEvent::AllowDrawCard => {
                if self.policy.draw_enabled {
                    let session = self.clone();
                    self.pacer.schedule(self.pacing.pre_draw, async move {
                        session.draw_flow().await;
                    });
                }
            }
            GameEvent::TrumpChangePossible { card } => {
                inner.swap = SwapState::Eligible(card);
                inner.phase = Phase::AwaitingTrumpSwapDecision;
            }
            GameEvent::AllowSwapTrump => match inner.swap {
                SwapState::Eligible(card) => {
                    inner.swap = SwapState::Idle;
                    let session = self.clone();
                    self.pacer.schedule(self.pacing.pre_swap, async move {
                        session.swap_flow(card).await;
                    });
                }
                SwapState::Idle => {
                    debug!(target: TARGET, "swap authorized without prior eligibility, ignoring")
                }
            },
            GameEvent::Error { message } => {
                if inner.retry_used {
                    inner.phase = Phase::Error;
                    warn!(target: TARGET, %message, "protocol error, recovery spent, logging only");
                } else {
                    inner.retry_used = true;
                    warn!(target: TARGET, %message, "protocol error, attempting one-shot recovery");
                    let session = self.clone();
                    self.pacer
                        .schedule(self.pacing.pre_recovery, async move {
                            session.recovery_flow().await;
                        });
                }
            }
            GameEvent::Reset => {
                info!(target: TARGET, "round reset");
                Self::rearm(&mut inner);
            }
            GameEvent::RoundResult { winner } => {
                info!(
                    target: TARGET,
                    winner = winner.as_deref().unwrap_or("unknown"),
                    "round finished"
                );
                if self.policy.multi_round {
                    Self::rearm(&mut inner);
                } else {
                    return Some(SessionEnd::Completed);
                }
            }
            GameEvent::Timeout { user_id } => {
                warn!(target: TARGET, %user_id, "participant timed out, match over");
                return Some(SessionEnd::TimedOut);
            }
        }
        None
    }

    fn rearm(inner: &mut Inner) {
        inner.belief.reset_round();
        inner.phase = Phase::Idle;
        inner.swap = SwapState::Idle;
        inner.suspend_play = false;
        inner.card_committed = false;
        inner.retry_used = false;
    }

    async fn announce_flow(self: Arc<Self>) {
        let combination = {
            let mut inner = self.inner.lock().await;
            if inner.card_committed {
                debug!(target: TARGET, "card already committed this turn, declining announce");
                inner.suspend_play = false;
                inner.phase = Phase::Idle;
                return;
            }
            match self.conn.announcable().first().copied() {
                Some(combination) => combination,
                None => {
                    debug!(target: TARGET, "nothing announceable, declining announce");
                    inner.suspend_play = false;
                    inner.phase = Phase::Idle;
                    return;
                }
            }
        };

        let announced = match combination.kind {
            AnnounceKind::Forty => self.conn.announce_40().await,
            AnnounceKind::Twenty => self.conn.announce_20(combination.cards).await,
        };
        if let Err(err) = announced {
            warn!(target: TARGET, %err, "announce rejected");
            let mut inner = self.inner.lock().await;
            inner.suspend_play = false;
            inner.phase = Phase::Idle;
            return;
        }
        info!(target: TARGET, kind = combination.kind.points(), "announced");

        tokio::time::sleep(self.pacing.post_announce).await;

        self.inner.lock().await.card_committed = true;
        if let Err(err) = self.conn.play_card(combination.lead_card()).await {
            warn!(target: TARGET, %err, card = %combination.lead_card(), "announced lead rejected");
        }

        let mut inner = self.inner.lock().await;
        inner.suspend_play = false;
        inner.phase = Phase::Idle;
    }

    async fn play_flow(self: Arc<Self>) {
        let (belief, legal) = {
            let mut inner = self.inner.lock().await;
            if inner.suspend_play || inner.card_committed {
                debug!(target: TARGET, "announcement owns this turn, leaving the play to it");
                return;
            }
            inner.card_committed = true;
            if self.conn.talon_size() == 0 {
                inner.belief.note_talon_closed();
            }
            let legal = self.conn.playable_cards();
            if legal.is_empty() {
                warn!(target: TARGET, "play allowed with an empty legal move set, skipping");
                inner.phase = Phase::Idle;
                return;
            }
            (inner.belief.clone(), legal)
        };

        let card = self.engine.decide(&belief, &legal).await;
        if let Err(err) = self.conn.play_card(card).await {
            warn!(target: TARGET, %err, %card, "play rejected");
        }
        self.inner.lock().await.phase = Phase::Idle;
    }

    async fn swap_flow(self: Arc<Self>, card: Card) {
        self.inner.lock().await.belief.note_trump_swap(card);
        if let Err(err) = self.conn.swap_trump(card).await {
            warn!(target: TARGET, %err, %card, "trump swap rejected");
        } else {
            info!(target: TARGET, %card, "swapped trump");
        }
        self.inner.lock().await.phase = Phase::Idle;
    }

    async fn draw_flow(self: Arc<Self>) {
        if let Err(err) = self.conn.draw_card().await {
            warn!(target: TARGET, %err, "draw rejected");
        }
    }

    /// Conservative one-shot repair: a uniformly random legal card.
    async fn recovery_flow(self: Arc<Self>) {
        let legal = self.conn.playable_cards();
        if legal.is_empty() {
            warn!(target: TARGET, "recovery skipped, no playable cards");
            return;
        }
        let card = random_legal(&legal);
        info!(target: TARGET, %card, "recovering with a random legal card");
        if let Err(err) = self.conn.play_card(card).await {
            warn!(target: TARGET, %err, "recovery play rejected");
        }
    }
}
