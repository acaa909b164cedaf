use crate::decision::{DecisionEngine, MovePredictor};
use crate::error::{ConnectError, TaskMismatch};
use crate::protocol::{GameConnection, GameEvent};
use crate::session::{MatchSession, Pacing};
use async_trait::async_trait;
use schnapsen_core::belief::BeliefState;
use schnapsen_core::mode::ModePolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

const TARGET: &str = "schnapsen_agent::dispatcher";

/// The one game this agent plays.
pub const GAME: &str = "Schnapsen";

/// A match assignment from the broker. Consumed exactly once per delivery.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Task {
    pub ai_id: String,
    pub game: String,
    pub mode: String,
    #[serde(default)]
    pub ai_level: Option<u8>,
    pub address: String,
    pub read: String,
    pub write: String,
    #[serde(default)]
    pub players: Vec<String>,
}

/// One registrable identity×mode pair, published so the matchmaker can
/// route tasks to it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AgentProfile {
    pub game: String,
    pub mode: String,
    pub elo: u32,
    pub display_name: String,
}

/// A playable identity as configured in the roster file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IdentityConfig {
    pub name: String,
    pub display_name: String,
    pub elo: u32,
    pub skill_level: u8,
    pub modes: Vec<String>,
}

/// Configuration-driven identity table; the dispatcher never hardcodes who
/// it plays as.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    identities: Vec<IdentityConfig>,
}

impl Roster {
    pub fn new(identities: Vec<IdentityConfig>) -> Self {
        Self { identities }
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn skill_for(&self, name: &str, mode: &str) -> Option<u8> {
        self.identities
            .iter()
            .find(|identity| identity.name == name && identity.modes.iter().any(|m| m == mode))
            .map(|identity| identity.skill_level)
    }

    pub fn profiles(&self, game: &str) -> Vec<AgentProfile> {
        self.identities
            .iter()
            .flat_map(|identity| {
                identity.modes.iter().map(|mode| AgentProfile {
                    game: game.to_string(),
                    mode: mode.clone(),
                    elo: identity.elo,
                    display_name: identity.display_name.clone(),
                })
            })
            .collect()
    }
}

/// Opens the protocol connection for an accepted task and hands back the
/// connected session object plus its event stream.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Conn: GameConnection;

    async fn connect(
        &self,
        task: &Task,
    ) -> Result<(Arc<Self::Conn>, mpsc::Receiver<GameEvent>), ConnectError>;
}

/// Outcome of screening an assignment, carried into the launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acceptance {
    pub skill_level: u8,
    pub policy: ModePolicy,
}

/// Screens broker assignments and runs one independent session per accepted
/// task. A fault inside a session never reaches the dispatcher or its
/// siblings; sessions run on their own spawned tasks.
pub struct Dispatcher<C, P> {
    roster: Roster,
    connector: C,
    engine: Arc<DecisionEngine<P>>,
    pacing: Pacing,
}

impl<C: Connector, P: MovePredictor> Dispatcher<C, P> {
    pub fn new(roster: Roster, connector: C, engine: Arc<DecisionEngine<P>>) -> Self {
        Self {
            roster,
            connector,
            engine,
            pacing: Pacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Pure accept/reject decision. Performs no side effects, so a rejected
    /// delivery can be redelivered (here or elsewhere) any number of times.
    pub fn screen(&self, task: &Task) -> Result<Acceptance, TaskMismatch> {
        let mismatch = || TaskMismatch {
            ai_id: task.ai_id.clone(),
            game: task.game.clone(),
            mode: task.mode.clone(),
        };

        if task.game != GAME {
            return Err(mismatch());
        }
        let policy = ModePolicy::for_mode(&task.mode).ok_or_else(mismatch)?;
        let roster_skill = self
            .roster
            .skill_for(&task.ai_id, &task.mode)
            .ok_or_else(mismatch)?;

        Ok(Acceptance {
            skill_level: task.ai_level.unwrap_or(roster_skill),
            policy,
        })
    }

    /// Everyone this process can play as, for the registration channel.
    pub fn profiles(&self) -> Vec<AgentProfile> {
        self.roster.profiles(GAME)
    }

    /// Connects and spawns the session for an already-acknowledged task.
    pub async fn launch(&self, task: Task, acceptance: Acceptance) -> Result<(), ConnectError> {
        let (conn, events) = self.connector.connect(&task).await?;
        let session = MatchSession::new(
            conn,
            self.engine.clone(),
            acceptance.policy,
            self.pacing,
            BeliefState::new(acceptance.skill_level),
        );

        info!(
            target: TARGET,
            ai_id = %task.ai_id,
            mode = %task.mode,
            address = %task.address,
            skill = acceptance.skill_level,
            "session starting"
        );

        let ai_id = task.ai_id;
        tokio::spawn(async move {
            let end = session.run(events).await;
            info!(target: TARGET, %ai_id, ?end, "session finished");
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{IdentityConfig, Roster, Task};

    fn test_roster() -> Roster {
        Roster::new(vec![
            IdentityConfig {
                name: "Bugo Hoss".to_string(),
                display_name: "Bugo Hoss".to_string(),
                elo: 1200,
                skill_level: 3,
                modes: vec!["speed".to_string(), "bummerl".to_string()],
            },
            IdentityConfig {
                name: "Gamma Ray".to_string(),
                display_name: "Gamma".to_string(),
                elo: 900,
                skill_level: 1,
                modes: vec!["speed".to_string()],
            },
        ])
    }

    #[test]
    fn skill_lookup_requires_the_mode_to_be_supported() {
        let roster = test_roster();
        assert_eq!(roster.skill_for("Bugo Hoss", "speed"), Some(3));
        assert_eq!(roster.skill_for("Bugo Hoss", "bummerl"), Some(3));
        assert_eq!(roster.skill_for("Gamma Ray", "bummerl"), None);
        assert_eq!(roster.skill_for("Nobody", "speed"), None);
    }

    #[test]
    fn profiles_cover_every_identity_mode_pair() {
        let roster = test_roster();
        let profiles = roster.profiles(super::GAME);
        assert_eq!(profiles.len(), 3);
        assert!(
            profiles
                .iter()
                .all(|profile| profile.game == super::GAME && profile.elo > 0)
        );
    }

    #[test]
    fn task_json_shape_parses() {
        let raw = r#"{
            "ai_id": "Bugo Hoss",
            "game": "Schnapsen",
            "mode": "speed",
            "address": "host:1234",
            "read": "r1",
            "write": "w1",
            "players": ["Bugo Hoss", "human"]
        }"#;
        let parsed: Task = serde_json::from_str(raw).expect("task parses");
        assert_eq!(parsed.ai_id, "Bugo Hoss");
        assert_eq!(parsed.ai_level, None);
        assert_eq!(parsed.players.len(), 2);
    }
}
