use anyhow::{Context, Result, bail};
use schnapsen_agent::dispatcher::IdentityConfig;
use schnapsen_core::mode::ModePolicy;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TASK_QUEUE: &str = "tasks";
const DEFAULT_PREDICTOR_TIMEOUT_MS: u64 = 4_000;

/// Environment-level configuration. Everything here is passthrough plumbing;
/// none of it changes the session logic.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub amqp_url: String,
    pub task_queue: String,
    pub registration_queue: Option<String>,
    pub predictor_url: String,
    pub predictor_token: String,
    pub predictor_timeout: Duration,
    /// Addresses forwarded to the optional match-serving side.
    pub host_addr: Option<String>,
    pub public_addr: Option<String>,
    pub private_addr: Option<String>,
    pub debug: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_reader(|key| std::env::var(key).ok())
    }

    fn from_reader<F>(mut read: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let predictor_timeout_ms = match read("PREDICTOR_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("invalid PREDICTOR_TIMEOUT_MS: {raw}"))?,
            None => DEFAULT_PREDICTOR_TIMEOUT_MS,
        };

        Ok(Self {
            amqp_url: required(&mut read, "AMQP_URL")?,
            task_queue: optional(&mut read, "TASK_QUEUE")
                .unwrap_or_else(|| DEFAULT_TASK_QUEUE.to_string()),
            registration_queue: optional(&mut read, "REGISTRATION_QUEUE"),
            predictor_url: required(&mut read, "PREDICTOR_URL")?,
            predictor_token: required(&mut read, "PREDICTOR_TOKEN")?,
            predictor_timeout: Duration::from_millis(predictor_timeout_ms),
            host_addr: optional(&mut read, "HOST_ADDR"),
            public_addr: optional(&mut read, "PUBLIC_ADDR"),
            private_addr: optional(&mut read, "PRIVATE_ADDR"),
            debug: flag(&mut read, "SCHNAPSEN_DEBUG"),
        })
    }
}

fn required<F>(read: &mut F, key: &str) -> Result<String>
where
    F: FnMut(&str) -> Option<String>,
{
    match optional(read, key) {
        Some(value) => Ok(value),
        None => bail!("missing required env: {key}"),
    }
}

fn optional<F>(read: &mut F, key: &str) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    read(key).filter(|value| !value.trim().is_empty())
}

fn flag<F>(read: &mut F, key: &str) -> bool
where
    F: FnMut(&str) -> Option<String>,
{
    read(key)
        .map(|raw| matches!(raw.trim(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(false)
}

/// The playable identities, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterFile {
    pub identities: Vec<IdentityConfig>,
}

impl RosterFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("opening roster at {}", path.display()))?;
        let roster: RosterFile = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing roster at {}", path.display()))?;
        Ok(roster)
    }

    pub fn validate(&self) -> Result<()> {
        if self.identities.is_empty() {
            bail!("roster lists no identities");
        }
        for identity in &self.identities {
            if identity.modes.is_empty() {
                bail!("identity {:?} supports no modes", identity.name);
            }
            for mode in &identity.modes {
                if ModePolicy::for_mode(mode).is_none() {
                    bail!("identity {:?} names unknown mode {:?}", identity.name, mode);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, RosterFile};
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn config_requires_broker_and_predictor() {
        let vars = env(&[("AMQP_URL", "amqp://localhost:5672")]);
        let result = AppConfig::from_reader(|key| vars.get(key).cloned());
        assert!(result.is_err());
    }

    #[test]
    fn config_applies_defaults() {
        let vars = env(&[
            ("AMQP_URL", "amqp://localhost:5672"),
            ("PREDICTOR_URL", "http://predictor:8080/move"),
            ("PREDICTOR_TOKEN", "secret"),
        ]);
        let config = AppConfig::from_reader(|key| vars.get(key).cloned()).expect("config parses");
        assert_eq!(config.task_queue, "tasks");
        assert_eq!(config.registration_queue, None);
        assert_eq!(config.predictor_timeout.as_millis(), 4_000);
        assert!(!config.debug);
    }

    #[test]
    fn debug_flag_accepts_common_spellings() {
        for raw in ["1", "true", "on"] {
            let vars = env(&[
                ("AMQP_URL", "amqp://localhost"),
                ("PREDICTOR_URL", "http://p"),
                ("PREDICTOR_TOKEN", "t"),
                ("SCHNAPSEN_DEBUG", raw),
            ]);
            let config =
                AppConfig::from_reader(|key| vars.get(key).cloned()).expect("config parses");
            assert!(config.debug);
        }
    }

    #[test]
    fn roster_yaml_parses_and_validates() {
        let raw = r#"
identities:
  - name: "Bugo Hoss"
    display_name: "Bugo Hoss"
    elo: 1200
    skill_level: 3
    modes: [speed, bummerl]
"#;
        let roster: RosterFile = serde_yaml::from_str(raw).expect("roster parses");
        roster.validate().expect("roster is valid");
        assert_eq!(roster.identities[0].skill_level, 3);
    }

    #[test]
    fn roster_rejects_unknown_modes() {
        let raw = r#"
identities:
  - name: "Bugo Hoss"
    display_name: "Bugo Hoss"
    elo: 1200
    skill_level: 3
    modes: [tarock]
"#;
        let roster: RosterFile = serde_yaml::from_str(raw).expect("roster parses");
        assert!(roster.validate().is_err());
    }

    #[test]
    fn empty_roster_is_invalid() {
        let roster = RosterFile { identities: vec![] };
        assert!(roster.validate().is_err());
    }
}
